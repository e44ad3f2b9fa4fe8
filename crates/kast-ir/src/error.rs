//! Errors raised while recording a function.
//!
//! Every error is fatal for the build in progress: the builder makes no
//! attempt to repair an inconsistent AST.

use crate::types::Type;
use crate::variable::ResourceHandle;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum BuildError {
    // Nesting
    #[error("kernel definitions cannot be nested (context stack depth {depth})")]
    NestedKernel { depth: usize },

    #[error("no function is being defined")]
    EmptyContextStack,

    #[error("invalid pop: expected builder #{expected} on stack top, found {found:?}")]
    MismatchedPop { expected: u64, found: Option<u64> },

    #[error("scope stack is empty")]
    EmptyScopeStack,

    #[error("invalid scope pop: scope {requested} is not the innermost open scope ({top:?})")]
    MismatchedScopePop { requested: usize, top: Option<usize> },

    #[error("scope {0} is already open")]
    ScopeAlreadyOpen(usize),

    #[error("scope {index} would become its own ancestor")]
    ScopeCycle { index: usize },

    #[error("scope {index} is already the child of another statement")]
    ScopeAlreadyAttached { index: usize },

    #[error("function '{name}' finished with {open} unclosed nested scope(s)")]
    UnclosedScopes { name: String, open: usize },

    // Aliasing
    #[error(
        "aliasing in implicitly captured buffer \
         (handle = {handle}, original offset = {original}, requested offset = {requested})"
    )]
    BufferOffsetAlias {
        handle: ResourceHandle,
        original: usize,
        requested: usize,
    },

    #[error(
        "aliasing in implicitly captured {resource} \
         (handle = {handle}, original type = {original}, requested type = {requested})"
    )]
    CaptureTypeAlias {
        resource: &'static str,
        handle: ResourceHandle,
        original: Type,
        requested: Type,
    },

    // Shape
    #[error("invalid swizzle size {0}")]
    InvalidSwizzleSize(usize),

    #[error("swizzle code {code:#x} has bits set beyond its {size} component(s)")]
    SwizzleCodeOverflow { size: usize, code: u64 },

    #[error("invalid swizzle index {index} (count = {size})")]
    SwizzleIndexOutOfRange { index: usize, size: usize },

    #[error("swizzle component {component} out of range for {dimension}-component vector")]
    SwizzleComponentOutOfRange { component: usize, dimension: usize },

    #[error("invalid member index in swizzled member expression")]
    FieldIndexOnSwizzle,

    #[error("member expression is not a swizzle")]
    NotASwizzle,

    #[error("member index {index} out of range for {ty}")]
    MemberIndexOutOfRange { index: u32, ty: Type },

    #[error("constant data must be an array, found {0}")]
    ConstantNotArray(Type),

    #[error("constant data for {ty} has {found} element(s), expected {expected}")]
    ConstantLengthMismatch {
        ty: Type,
        expected: usize,
        found: usize,
    },

    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: &'static str,
        expected: String,
        found: String,
    },

    #[error("expression handle {index} out of bounds (arena size: {size})")]
    BadHandle { index: usize, size: usize },

    #[error("scope handle {index} out of bounds (arena size: {size})")]
    BadScope { index: usize, size: usize },

    #[error("expression handle {index} belongs to another function")]
    ForeignHandle { index: usize },

    #[error("scope handle {index} belongs to another function")]
    ForeignScope { index: usize },

    #[error("expression {index} is not assignable")]
    NotAssignable { index: usize },

    // Structural
    #[error("multiple non-void return statements are not allowed")]
    MultipleReturns,

    #[error(
        "callable '{name}' may not have builtin, shared or captured variables \
         ({builtins} builtin, {shared} shared, {buffers} buffer, {textures} texture, {heaps} heap)"
    )]
    CallableCapturesKernelState {
        name: String,
        builtins: usize,
        shared: usize,
        buffers: usize,
        textures: usize,
        heaps: usize,
    },

    #[error("calling non-callable function '{name}' in device code")]
    NotCallable { name: String },

    #[error("call to '{name}' expects {expected} argument(s), found {found}")]
    ArgumentCountMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    // Leaks
    #[error("found leaked call expression {index} ({callee}) in function '{name}'")]
    LeakedCall {
        name: String,
        index: usize,
        callee: String,
    },
}

//! Finished functions.

use std::fmt;
use std::sync::Arc;

use crate::arena::{Arena, Handle};
use crate::expr::{CallOp, Expression};
use crate::stmt::Scope;
use crate::types::Type;
use crate::variable::{
    BufferBinding, ConstantBinding, TextureBinding, TextureHeapBinding, Usage, Variable,
};

/// Whether a function is dispatched or called.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum FunctionTag {
    Kernel,
    Callable,
}

/// Everything recorded for one function. Owned by the builder while
/// recording, then frozen behind an `Arc` in [`Function`].
#[derive(Debug)]
pub(crate) struct FunctionData {
    pub(crate) name: Option<String>,
    pub(crate) tag: FunctionTag,
    pub(crate) expressions: Arena<Expression>,
    pub(crate) expression_usages: Vec<Usage>,
    pub(crate) scopes: Arena<Scope>,
    pub(crate) body: Handle<Scope>,
    pub(crate) variables: Vec<Variable>,
    pub(crate) variable_usages: Vec<Usage>,
    pub(crate) arguments: Vec<Variable>,
    pub(crate) builtin_variables: Vec<Variable>,
    pub(crate) shared_variables: Vec<Variable>,
    pub(crate) captured_buffers: Vec<BufferBinding>,
    pub(crate) captured_textures: Vec<TextureBinding>,
    pub(crate) captured_texture_heaps: Vec<TextureHeapBinding>,
    pub(crate) captured_constants: Vec<ConstantBinding>,
    pub(crate) used_builtin_ops: Vec<CallOp>,
    pub(crate) used_callables: Vec<Function>,
    pub(crate) return_type: Option<Type>,
    pub(crate) raytracing: bool,
    pub(crate) hash: u64,
}

impl FunctionData {
    pub(crate) fn new(tag: FunctionTag, expected_expressions: usize) -> Self {
        let mut scopes = Arena::new();
        let body = scopes.append(Scope::default());
        Self {
            name: None,
            tag,
            expressions: Arena::with_capacity(expected_expressions),
            expression_usages: Vec::with_capacity(expected_expressions),
            scopes,
            body,
            variables: Vec::new(),
            variable_usages: Vec::new(),
            arguments: Vec::new(),
            builtin_variables: Vec::new(),
            shared_variables: Vec::new(),
            captured_buffers: Vec::new(),
            captured_textures: Vec::new(),
            captured_texture_heaps: Vec::new(),
            captured_constants: Vec::new(),
            used_builtin_ops: Vec::new(),
            used_callables: Vec::new(),
            return_type: None,
            raytracing: false,
            hash: 0,
        }
    }

    pub(crate) fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

/// An immutable, finalized function.
///
/// Cheap to clone; every call site referencing a callable shares the same
/// underlying data.
#[derive(Clone)]
pub struct Function(Arc<FunctionData>);

impl Function {
    pub(crate) fn new(data: FunctionData) -> Self {
        Self(Arc::new(data))
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn tag(&self) -> FunctionTag {
        self.0.tag
    }

    pub fn is_callable(&self) -> bool {
        self.0.tag == FunctionTag::Callable
    }

    /// Declared parameters in declaration order.
    pub fn arguments(&self) -> &[Variable] {
        &self.0.arguments
    }

    pub fn builtin_variables(&self) -> &[Variable] {
        &self.0.builtin_variables
    }

    pub fn shared_variables(&self) -> &[Variable] {
        &self.0.shared_variables
    }

    pub fn captured_buffers(&self) -> &[BufferBinding] {
        &self.0.captured_buffers
    }

    pub fn captured_textures(&self) -> &[TextureBinding] {
        &self.0.captured_textures
    }

    pub fn captured_texture_heaps(&self) -> &[TextureHeapBinding] {
        &self.0.captured_texture_heaps
    }

    pub fn captured_constants(&self) -> &[ConstantBinding] {
        &self.0.captured_constants
    }

    /// Every variable allocated in this function, indexed by uid.
    pub fn variables(&self) -> &[Variable] {
        &self.0.variables
    }

    /// Accumulated usage of the variable with `uid`; `NONE` for unknown uids.
    pub fn variable_usage(&self, uid: u32) -> Usage {
        self.0
            .variable_usages
            .get(uid as usize)
            .copied()
            .unwrap_or_default()
    }

    /// Captured buffers paired with their final access mode.
    pub fn buffer_usages(&self) -> impl Iterator<Item = (&BufferBinding, Usage)> + '_ {
        self.0
            .captured_buffers
            .iter()
            .map(|b| (b, self.variable_usage(b.variable.uid())))
    }

    /// Captured textures paired with their final access mode.
    pub fn texture_usages(&self) -> impl Iterator<Item = (&TextureBinding, Usage)> + '_ {
        self.0
            .captured_textures
            .iter()
            .map(|t| (t, self.variable_usage(t.variable.uid())))
    }

    pub fn expressions(&self) -> &Arena<Expression> {
        &self.0.expressions
    }

    pub fn expression_usage(&self, expr: Handle<Expression>) -> Usage {
        if !self.0.expressions.owns(expr) {
            return Usage::NONE;
        }
        self.0
            .expression_usages
            .get(expr.index())
            .copied()
            .unwrap_or_default()
    }

    pub fn scopes(&self) -> &Arena<Scope> {
        &self.0.scopes
    }

    /// Handle of the root scope.
    pub fn body(&self) -> Handle<Scope> {
        self.0.body
    }

    pub fn body_scope(&self) -> &Scope {
        &self.0.scopes[self.0.body]
    }

    pub fn return_type(&self) -> Option<&Type> {
        self.0.return_type.as_ref()
    }

    /// Whether the function was marked as needing ray-tracing support.
    pub fn raytracing(&self) -> bool {
        self.0.raytracing
    }

    /// Builtin ops called directly by this function, first use first.
    pub fn used_builtin_ops(&self) -> &[CallOp] {
        &self.0.used_builtin_ops
    }

    /// Custom callables called directly by this function, first use first.
    pub fn used_callables(&self) -> &[Function] {
        &self.0.used_callables
    }

    /// Every callable reachable from this function, each listed once and
    /// after all of its own dependencies.
    pub fn collect_callables(&self) -> Vec<Function> {
        fn visit(f: &Function, out: &mut Vec<Function>) {
            for callee in f.used_callables() {
                if out.iter().any(|seen| seen.ptr_eq(callee)) {
                    continue;
                }
                visit(callee, out);
                out.push(callee.clone());
            }
        }
        let mut out = Vec::new();
        visit(self, &mut out);
        out
    }

    /// Structural hash of the finished AST.
    pub fn hash(&self) -> u64 {
        self.0.hash
    }

    /// Returns `true` if both values share the same definition.
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.0.display_name())
            .field("tag", &self.0.tag)
            .field("hash", &format_args!("{:016x}", self.0.hash))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn functions_are_shareable() {
        assert_send_sync::<Function>();
    }

    #[test]
    fn empty_function() {
        let mut data = FunctionData::new(FunctionTag::Callable, 0);
        data.name = Some("noop".into());
        let f = Function::new(data);
        assert_eq!(f.name(), Some("noop"));
        assert!(f.is_callable());
        assert!(f.arguments().is_empty());
        assert!(f.body_scope().is_empty());
        assert!(f.return_type().is_none());
        assert_eq!(f.variable_usage(0), Usage::NONE);
        assert!(f.collect_callables().is_empty());
    }

    #[test]
    fn clones_share_identity() {
        let f = Function::new(FunctionData::new(FunctionTag::Kernel, 0));
        let g = f.clone();
        let h = Function::new(FunctionData::new(FunctionTag::Kernel, 0));
        assert!(f.ptr_eq(&g));
        assert!(!f.ptr_eq(&h));
    }
}

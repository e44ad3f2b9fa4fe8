//! The per-function builder.
//!
//! A [`FunctionBuilder`] owns every node recorded for one function together
//! with the scope stack, the variable usage table and the capture tables.
//! Usage is propagated eagerly: factories mark their operands when the node
//! is created and statements mark the expressions they consume.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::arena::Handle;
use crate::error::BuildError;
use crate::expr::{
    BinaryOp, CallOp, Callee, CastOp, ConstantData, Expression, ExpressionKind, Literal,
    MemberAccess, Swizzle, UnaryOp,
};
use crate::func::{Function, FunctionData, FunctionTag};
use crate::hash::hash_function;
use crate::stmt::{AssignOp, Scope, Statement};
use crate::types::{Type, TypeInner, VectorSize};
use crate::variable::{
    BufferBinding, ConstantBinding, ResourceHandle, TextureBinding, TextureHeapBinding, Usage,
    Variable, VariableTag,
};

static NEXT_BUILDER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a builder, used to verify context-stack pops.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct BuilderId(u64);

impl BuilderId {
    fn next() -> Self {
        Self(NEXT_BUILDER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Knobs applied to every builder created by a [`BuilderStack`](crate::BuilderStack).
#[derive(Clone, Debug)]
pub struct BuilderOptions {
    /// Reject functions holding value-producing calls whose result was
    /// never consumed.
    pub check_leaks: bool,
    /// Initial capacity of the expression arena.
    pub expected_expressions: usize,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            check_leaks: true,
            expected_expressions: 64,
        }
    }
}

/// Mutable recording state for one kernel or callable.
#[derive(Debug)]
pub struct FunctionBuilder {
    id: BuilderId,
    options: BuilderOptions,
    data: FunctionData,
    scope_stack: Vec<Handle<Scope>>,
    /// Parent of each scope once a statement adopts it, indexed like
    /// `data.scopes`. The body never has one.
    scope_parents: Vec<Option<Handle<Scope>>>,
    call_expressions: Vec<Handle<Expression>>,
}

impl FunctionBuilder {
    pub fn new(tag: FunctionTag) -> Self {
        Self::with_options(tag, BuilderOptions::default())
    }

    pub fn with_options(tag: FunctionTag, options: BuilderOptions) -> Self {
        let data = FunctionData::new(tag, options.expected_expressions);
        let scope_stack = vec![data.body];
        let scope_parents = vec![None; data.scopes.len()];
        Self {
            id: BuilderId::next(),
            options,
            data,
            scope_stack,
            scope_parents,
            call_expressions: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.data.name = Some(name.into());
        self
    }

    pub fn id(&self) -> BuilderId {
        self.id
    }

    pub fn tag(&self) -> FunctionTag {
        self.data.tag
    }

    pub fn name(&self) -> Option<&str> {
        self.data.name.as_deref()
    }

    /// Handle of the root scope.
    pub fn body(&self) -> Handle<Scope> {
        self.data.body
    }

    /// The scope statements are currently appended to.
    pub fn current_scope(&self) -> Option<Handle<Scope>> {
        self.scope_stack.last().copied()
    }

    pub fn scope_depth(&self) -> usize {
        self.scope_stack.len()
    }

    pub fn expression(&self, expr: Handle<Expression>) -> Option<&Expression> {
        self.data.expressions.try_get(expr)
    }

    pub fn expression_usage(&self, expr: Handle<Expression>) -> Usage {
        if !self.data.expressions.owns(expr) {
            return Usage::NONE;
        }
        self.data
            .expression_usages
            .get(expr.index())
            .copied()
            .unwrap_or_default()
    }

    pub fn variable_usage(&self, uid: u32) -> Usage {
        self.data
            .variable_usages
            .get(uid as usize)
            .copied()
            .unwrap_or_default()
    }

    /// Every variable allocated so far, indexed by uid.
    pub fn variables(&self) -> &[Variable] {
        &self.data.variables
    }

    pub fn scope(&self, scope: Handle<Scope>) -> Option<&Scope> {
        self.data.scopes.try_get(scope)
    }

    pub fn arguments(&self) -> &[Variable] {
        &self.data.arguments
    }

    pub fn builtin_variables(&self) -> &[Variable] {
        &self.data.builtin_variables
    }

    pub fn shared_variables(&self) -> &[Variable] {
        &self.data.shared_variables
    }

    pub fn captured_buffers(&self) -> &[BufferBinding] {
        &self.data.captured_buffers
    }

    pub fn captured_textures(&self) -> &[TextureBinding] {
        &self.data.captured_textures
    }

    pub fn captured_texture_heaps(&self) -> &[TextureHeapBinding] {
        &self.data.captured_texture_heaps
    }

    pub fn captured_constants(&self) -> &[ConstantBinding] {
        &self.data.captured_constants
    }

    pub fn used_builtin_ops(&self) -> &[CallOp] {
        &self.data.used_builtin_ops
    }

    pub fn used_callables(&self) -> &[Function] {
        &self.data.used_callables
    }

    pub fn return_type(&self) -> Option<&Type> {
        self.data.return_type.as_ref()
    }

    pub fn raytracing(&self) -> bool {
        self.data.raytracing
    }

    /// Flags the function as needing ray-tracing support from the backend.
    pub fn mark_raytracing(&mut self) {
        self.data.raytracing = true;
    }

    // ---- usage propagation ----

    /// ORs `usage` into `expr` and forwards it through the node:
    /// references record it against their variable, member and access nodes
    /// forward it to the value they select from, every other node stops.
    pub fn mark(&mut self, expr: Handle<Expression>, usage: Usage) -> Result<(), BuildError> {
        self.check(expr)?;
        self.propagate(expr, usage);
        Ok(())
    }

    fn propagate(&mut self, mut expr: Handle<Expression>, usage: Usage) {
        loop {
            self.data.expression_usages[expr.index()] |= usage;
            let (uid, next) = match self.data.expressions[expr].kind() {
                ExpressionKind::Ref(v) => (Some(v.uid()), None),
                ExpressionKind::Access { range, .. } => (None, Some(*range)),
                ExpressionKind::Member { base, .. } => (None, Some(*base)),
                _ => (None, None),
            };
            if let Some(uid) = uid {
                self.data.variable_usages[uid as usize] |= usage;
            }
            match next {
                Some(next) => expr = next,
                None => return,
            }
        }
    }

    // ---- internal helpers ----

    fn check(&self, expr: Handle<Expression>) -> Result<&Expression, BuildError> {
        if !self.data.expressions.owns(expr) {
            return Err(BuildError::ForeignHandle {
                index: expr.index(),
            });
        }
        self.data
            .expressions
            .try_get(expr)
            .ok_or(BuildError::BadHandle {
                index: expr.index(),
                size: self.data.expressions.len(),
            })
    }

    fn value_type(&self, expr: Handle<Expression>) -> Result<Type, BuildError> {
        self.check(expr)?
            .ty()
            .cloned()
            .ok_or_else(|| BuildError::TypeMismatch {
                context: "operand",
                expected: "a value".into(),
                found: "void".into(),
            })
    }

    fn check_scope(&self, scope: Handle<Scope>) -> Result<(), BuildError> {
        if !self.data.scopes.owns(scope) {
            return Err(BuildError::ForeignScope {
                index: scope.index(),
            });
        }
        if self.data.scopes.contains(scope) {
            Ok(())
        } else {
            Err(BuildError::BadScope {
                index: scope.index(),
                size: self.data.scopes.len(),
            })
        }
    }

    /// Makes `children` the nested scopes of a statement about to be
    /// appended to the innermost open scope. Nothing is recorded unless
    /// every child is valid, so the scopes keep forming a tree.
    fn adopt(&mut self, children: &[Handle<Scope>]) -> Result<(), BuildError> {
        let parent = *self
            .scope_stack
            .last()
            .ok_or(BuildError::EmptyScopeStack)?;
        for (i, &child) in children.iter().enumerate() {
            self.check_scope(child)?;
            if child == self.data.body || self.scope_stack.contains(&child) {
                return Err(BuildError::ScopeCycle {
                    index: child.index(),
                });
            }
            if self.scope_parents[child.index()].is_some() || children[..i].contains(&child) {
                return Err(BuildError::ScopeAlreadyAttached {
                    index: child.index(),
                });
            }
            let mut ancestor = Some(parent);
            while let Some(scope) = ancestor {
                if scope == child {
                    return Err(BuildError::ScopeCycle {
                        index: child.index(),
                    });
                }
                ancestor = self.scope_parents[scope.index()];
            }
        }
        for &child in children {
            self.scope_parents[child.index()] = Some(parent);
        }
        Ok(())
    }

    fn expect_type(context: &'static str, expected: &Type, found: &Type) -> Result<(), BuildError> {
        if expected == found {
            Ok(())
        } else {
            Err(BuildError::TypeMismatch {
                context,
                expected: expected.to_string(),
                found: found.to_string(),
            })
        }
    }

    fn alloc(&mut self, ty: Option<Type>, kind: ExpressionKind) -> Handle<Expression> {
        let handle = self.data.expressions.append(Expression::new(ty, kind));
        self.data.expression_usages.push(Usage::NONE);
        handle
    }

    fn next_variable(&mut self, ty: Type, tag: VariableTag) -> Variable {
        let uid = u32::try_from(self.data.variable_usages.len())
            .unwrap_or_else(|_| panic!("variable uid overflow in '{}'", self.data.display_name()));
        self.data.variable_usages.push(Usage::NONE);
        let variable = Variable::new(ty, tag, uid);
        self.data.variables.push(variable.clone());
        variable
    }

    fn reference(&mut self, variable: Variable) -> Handle<Expression> {
        let ty = variable.ty().clone();
        self.alloc(Some(ty), ExpressionKind::Ref(variable))
    }

    fn append(&mut self, statement: Statement) -> Result<(), BuildError> {
        let top = *self
            .scope_stack
            .last()
            .ok_or(BuildError::EmptyScopeStack)?;
        log::trace!(
            "'{}': appending {:?} to scope {:?}",
            self.data.display_name(),
            statement,
            top
        );
        let size = self.data.scopes.len();
        self.data
            .scopes
            .get_mut(top)
            .ok_or(BuildError::BadScope {
                index: top.index(),
                size,
            })?
            .push(statement);
        Ok(())
    }

    // ---- scopes ----

    /// Allocates an empty scope. It records nothing until pushed.
    pub fn new_scope(&mut self) -> Handle<Scope> {
        self.scope_parents.push(None);
        self.data.scopes.append(Scope::default())
    }

    pub fn push_scope(&mut self, scope: Handle<Scope>) -> Result<(), BuildError> {
        self.check_scope(scope)?;
        if self.scope_stack.contains(&scope) {
            return Err(BuildError::ScopeAlreadyOpen(scope.index()));
        }
        self.scope_stack.push(scope);
        Ok(())
    }

    /// Closes `scope`, which must be the innermost open scope.
    pub fn pop_scope(&mut self, scope: Handle<Scope>) -> Result<(), BuildError> {
        match self.scope_stack.last() {
            Some(&top) if top == scope => {
                self.scope_stack.pop();
                Ok(())
            }
            top => Err(BuildError::MismatchedScopePop {
                requested: scope.index(),
                top: top.map(|s| s.index()),
            }),
        }
    }

    // ---- statements ----

    pub fn break_(&mut self) -> Result<(), BuildError> {
        self.append(Statement::Break)
    }

    pub fn continue_(&mut self) -> Result<(), BuildError> {
        self.append(Statement::Continue)
    }

    /// Appends a return. A value return fixes the function's return type
    /// and may appear at most once.
    pub fn return_(&mut self, value: Option<Handle<Expression>>) -> Result<(), BuildError> {
        if let Some(value) = value {
            let ty = self.value_type(value)?;
            if self.data.return_type.is_some() {
                return Err(BuildError::MultipleReturns);
            }
            self.propagate(value, Usage::READ);
            self.data.return_type = Some(ty);
        }
        self.append(Statement::Return { value })
    }

    pub fn if_(
        &mut self,
        condition: Handle<Expression>,
        accept: Handle<Scope>,
        reject: Option<Handle<Scope>>,
    ) -> Result<(), BuildError> {
        self.check(condition)?;
        match reject {
            Some(reject) => self.adopt(&[accept, reject])?,
            None => self.adopt(&[accept])?,
        }
        self.propagate(condition, Usage::READ);
        self.append(Statement::If {
            condition,
            accept,
            reject,
        })
    }

    pub fn while_(
        &mut self,
        condition: Handle<Expression>,
        body: Handle<Scope>,
    ) -> Result<(), BuildError> {
        self.check(condition)?;
        self.adopt(&[body])?;
        self.propagate(condition, Usage::READ);
        self.append(Statement::While { condition, body })
    }

    pub fn for_(
        &mut self,
        init: Handle<Scope>,
        condition: Handle<Expression>,
        update: Handle<Scope>,
        body: Handle<Scope>,
    ) -> Result<(), BuildError> {
        self.check(condition)?;
        self.adopt(&[init, update, body])?;
        self.propagate(condition, Usage::READ);
        self.append(Statement::For {
            init,
            condition,
            update,
            body,
        })
    }

    pub fn switch_(
        &mut self,
        selector: Handle<Expression>,
        body: Handle<Scope>,
    ) -> Result<(), BuildError> {
        self.check(selector)?;
        self.adopt(&[body])?;
        self.propagate(selector, Usage::READ);
        self.append(Statement::Switch { selector, body })
    }

    pub fn case_(&mut self, value: Handle<Expression>, body: Handle<Scope>) -> Result<(), BuildError> {
        self.check(value)?;
        self.adopt(&[body])?;
        self.propagate(value, Usage::READ);
        self.append(Statement::Case { value, body })
    }

    pub fn default_(&mut self, body: Handle<Scope>) -> Result<(), BuildError> {
        self.adopt(&[body])?;
        self.append(Statement::Default { body })
    }

    /// Appends `lhs op= rhs`. The destination is marked written (and read
    /// for compound operators); the source is marked read.
    pub fn assign(
        &mut self,
        op: AssignOp,
        lhs: Handle<Expression>,
        rhs: Handle<Expression>,
    ) -> Result<(), BuildError> {
        let lhs_ty = self.value_type(lhs)?;
        let rhs_ty = self.value_type(rhs)?;
        if !self.data.expressions[lhs].is_lvalue() {
            return Err(BuildError::NotAssignable { index: lhs.index() });
        }
        if op == AssignOp::Assign {
            Self::expect_type("assignment", &lhs_ty, &rhs_ty)?;
        }
        let dest_usage = if op.is_compound() {
            Usage::READ_WRITE
        } else {
            Usage::WRITE
        };
        self.propagate(lhs, dest_usage);
        self.propagate(rhs, Usage::READ);
        self.append(Statement::Assign { op, lhs, rhs })
    }

    // ---- variables ----

    /// Declares a local variable initialized from `initializers` and
    /// returns a reference to it.
    pub fn local(
        &mut self,
        ty: Type,
        initializers: &[Handle<Expression>],
    ) -> Result<Handle<Expression>, BuildError> {
        match initializers {
            [] => {}
            [single] => {
                let init_ty = self.value_type(*single)?;
                Self::expect_type("local initializer", &ty, &init_ty)?;
            }
            many => {
                for &init in many {
                    self.value_type(init)?;
                }
                if let Some(dim) = ty.dimension() {
                    if dim != many.len() {
                        return Err(BuildError::TypeMismatch {
                            context: "local initializer",
                            expected: format!("{dim} initializer(s) for {ty}"),
                            found: many.len().to_string(),
                        });
                    }
                }
            }
        }
        for &init in initializers {
            self.propagate(init, Usage::READ);
        }
        let variable = self.next_variable(ty, VariableTag::Local);
        self.append(Statement::Declare {
            variable: variable.clone(),
            initializers: initializers.to_vec(),
        })?;
        Ok(self.reference(variable))
    }

    /// Allocates block-shared memory. Shared variables are declared with
    /// the function signature, so no statement is emitted.
    pub fn shared(&mut self, ty: Type) -> Handle<Expression> {
        let variable = self.next_variable(ty, VariableTag::Shared);
        self.data.shared_variables.push(variable.clone());
        self.reference(variable)
    }

    /// Declares a by-value parameter: uniform for kernels, local for callables.
    pub fn argument(&mut self, ty: Type) -> Handle<Expression> {
        let tag = match self.data.tag {
            FunctionTag::Kernel => VariableTag::Uniform,
            FunctionTag::Callable => VariableTag::Local,
        };
        let variable = self.next_variable(ty, tag);
        self.data.arguments.push(variable.clone());
        self.reference(variable)
    }

    /// Declares a buffer parameter holding `element`s.
    pub fn buffer(&mut self, element: Type) -> Handle<Expression> {
        let variable = self.next_variable(Type::buffer(element), VariableTag::Buffer);
        self.data.arguments.push(variable.clone());
        self.reference(variable)
    }

    /// Declares a texture parameter. `ty` must be a texture type.
    pub fn texture(&mut self, ty: Type) -> Result<Handle<Expression>, BuildError> {
        Self::require_texture(&ty)?;
        let variable = self.next_variable(ty, VariableTag::Texture);
        self.data.arguments.push(variable.clone());
        Ok(self.reference(variable))
    }

    pub fn texture_heap(&mut self) -> Handle<Expression> {
        let variable = self.next_variable(Type::texture_heap(), VariableTag::TextureHeap);
        self.data.arguments.push(variable.clone());
        self.reference(variable)
    }

    fn require_texture(ty: &Type) -> Result<(), BuildError> {
        if ty.is_texture() {
            Ok(())
        } else {
            Err(BuildError::TypeMismatch {
                context: "texture",
                expected: "a texture type".into(),
                found: ty.to_string(),
            })
        }
    }

    /// Captures the buffer `handle` viewed at `offset_bytes`. Capturing the
    /// same handle again yields the same variable, provided offset and
    /// element type agree.
    pub fn buffer_binding(
        &mut self,
        element: Type,
        handle: ResourceHandle,
        offset_bytes: usize,
    ) -> Result<Handle<Expression>, BuildError> {
        let requested = Type::buffer(element);
        if let Some(i) = self
            .data
            .captured_buffers
            .iter()
            .position(|b| b.handle == handle)
        {
            let binding = &self.data.captured_buffers[i];
            if binding.offset_bytes != offset_bytes {
                return Err(BuildError::BufferOffsetAlias {
                    handle,
                    original: binding.offset_bytes,
                    requested: offset_bytes,
                });
            }
            if binding.variable.ty() != &requested {
                return Err(BuildError::CaptureTypeAlias {
                    resource: "buffer",
                    handle,
                    original: binding.variable.ty().clone(),
                    requested,
                });
            }
            let variable = binding.variable.clone();
            return Ok(self.reference(variable));
        }
        let variable = self.next_variable(requested, VariableTag::Buffer);
        log::debug!(
            "'{}': captured buffer {handle:#x} (offset {offset_bytes}) as uid {}",
            self.data.display_name(),
            variable.uid()
        );
        self.data.captured_buffers.push(BufferBinding {
            variable: variable.clone(),
            handle,
            offset_bytes,
        });
        Ok(self.reference(variable))
    }

    pub fn texture_binding(
        &mut self,
        ty: Type,
        handle: ResourceHandle,
    ) -> Result<Handle<Expression>, BuildError> {
        Self::require_texture(&ty)?;
        if let Some(i) = self
            .data
            .captured_textures
            .iter()
            .position(|b| b.handle == handle)
        {
            let binding = &self.data.captured_textures[i];
            if binding.variable.ty() != &ty {
                return Err(BuildError::CaptureTypeAlias {
                    resource: "texture",
                    handle,
                    original: binding.variable.ty().clone(),
                    requested: ty,
                });
            }
            let variable = binding.variable.clone();
            return Ok(self.reference(variable));
        }
        let variable = self.next_variable(ty, VariableTag::Texture);
        log::debug!(
            "'{}': captured texture {handle:#x} as uid {}",
            self.data.display_name(),
            variable.uid()
        );
        self.data.captured_textures.push(TextureBinding {
            variable: variable.clone(),
            handle,
        });
        Ok(self.reference(variable))
    }

    pub fn texture_heap_binding(&mut self, handle: ResourceHandle) -> Handle<Expression> {
        if let Some(binding) = self
            .data
            .captured_texture_heaps
            .iter()
            .find(|b| b.handle == handle)
        {
            let variable = binding.variable.clone();
            return self.reference(variable);
        }
        let variable = self.next_variable(Type::texture_heap(), VariableTag::TextureHeap);
        log::debug!(
            "'{}': captured texture heap {handle:#x} as uid {}",
            self.data.display_name(),
            variable.uid()
        );
        self.data.captured_texture_heaps.push(TextureHeapBinding {
            variable: variable.clone(),
            handle,
        });
        self.reference(variable)
    }

    pub fn thread_id(&mut self) -> Handle<Expression> {
        self.builtin(VariableTag::ThreadId)
    }

    pub fn block_id(&mut self) -> Handle<Expression> {
        self.builtin(VariableTag::BlockId)
    }

    pub fn dispatch_id(&mut self) -> Handle<Expression> {
        self.builtin(VariableTag::DispatchId)
    }

    pub fn dispatch_size(&mut self) -> Handle<Expression> {
        self.builtin(VariableTag::DispatchSize)
    }

    fn builtin(&mut self, tag: VariableTag) -> Handle<Expression> {
        if let Some(v) = self
            .data
            .builtin_variables
            .iter()
            .find(|v| v.tag() == tag)
        {
            let variable = v.clone();
            return self.reference(variable);
        }
        let variable = self.next_variable(Type::uint3(), tag);
        self.data.builtin_variables.push(variable.clone());
        self.reference(variable)
    }

    // ---- expressions ----

    pub fn literal(&mut self, value: impl Into<Literal>) -> Handle<Expression> {
        let value = value.into();
        self.alloc(Some(value.ty()), ExpressionKind::Literal(value))
    }

    pub fn unary(
        &mut self,
        ty: Type,
        op: UnaryOp,
        operand: Handle<Expression>,
    ) -> Result<Handle<Expression>, BuildError> {
        self.value_type(operand)?;
        self.propagate(operand, Usage::READ);
        Ok(self.alloc(Some(ty), ExpressionKind::Unary { op, operand }))
    }

    pub fn binary(
        &mut self,
        ty: Type,
        op: BinaryOp,
        lhs: Handle<Expression>,
        rhs: Handle<Expression>,
    ) -> Result<Handle<Expression>, BuildError> {
        self.value_type(lhs)?;
        self.value_type(rhs)?;
        self.propagate(lhs, Usage::READ);
        self.propagate(rhs, Usage::READ);
        Ok(self.alloc(Some(ty), ExpressionKind::Binary { op, lhs, rhs }))
    }

    /// Selects field `index` of a struct, or component `index` of a vector
    /// or matrix. The base is marked only when the member itself is used.
    pub fn member(
        &mut self,
        ty: Type,
        base: Handle<Expression>,
        index: u32,
    ) -> Result<Handle<Expression>, BuildError> {
        let base_ty = self.value_type(base)?;
        let expected = match base_ty.inner() {
            TypeInner::Struct { members, .. } => members.get(index as usize).cloned(),
            TypeInner::Vector { .. } | TypeInner::Matrix { .. } => {
                if (index as usize) < base_ty.dimension().unwrap_or(0) {
                    base_ty.element()
                } else {
                    None
                }
            }
            _ => None,
        };
        let Some(expected) = expected else {
            return Err(BuildError::MemberIndexOutOfRange { index, ty: base_ty });
        };
        Self::expect_type("member", &expected, &ty)?;
        Ok(self.alloc(
            Some(ty),
            ExpressionKind::Member {
                base,
                access: MemberAccess::Field(index),
            },
        ))
    }

    /// Selects `size` vector components packed in `code` (4 bits each).
    pub fn swizzle(
        &mut self,
        ty: Type,
        base: Handle<Expression>,
        size: usize,
        code: u64,
    ) -> Result<Handle<Expression>, BuildError> {
        let swizzle = Swizzle::new(size, code)?;
        let base_ty = self.value_type(base)?;
        let TypeInner::Vector {
            size: source_size,
            scalar,
        } = *base_ty.inner()
        else {
            return Err(BuildError::TypeMismatch {
                context: "swizzle",
                expected: "a vector".into(),
                found: base_ty.to_string(),
            });
        };
        for component in swizzle.components() {
            if component >= source_size.count() {
                return Err(BuildError::SwizzleComponentOutOfRange {
                    component,
                    dimension: source_size.count(),
                });
            }
        }
        let expected = match VectorSize::from_len(size) {
            Some(n) => Type::vector(n, scalar),
            None => Type::scalar(scalar),
        };
        Self::expect_type("swizzle", &expected, &ty)?;
        Ok(self.alloc(
            Some(ty),
            ExpressionKind::Member {
                base,
                access: MemberAccess::Swizzle(swizzle),
            },
        ))
    }

    /// Indexes into an array, vector, matrix, or buffer. The index is read
    /// exactly once, here; the range is marked only when the access is used.
    pub fn access(
        &mut self,
        ty: Type,
        range: Handle<Expression>,
        index: Handle<Expression>,
    ) -> Result<Handle<Expression>, BuildError> {
        let range_ty = self.value_type(range)?;
        let index_ty = self.value_type(index)?;
        let Some(element) = range_ty.element() else {
            return Err(BuildError::TypeMismatch {
                context: "access",
                expected: "an array, vector, matrix or buffer".into(),
                found: range_ty.to_string(),
            });
        };
        if !index_ty.is_index() {
            return Err(BuildError::TypeMismatch {
                context: "access index",
                expected: "an integer scalar".into(),
                found: index_ty.to_string(),
            });
        }
        Self::expect_type("access", &element, &ty)?;
        self.propagate(index, Usage::READ);
        Ok(self.alloc(Some(ty), ExpressionKind::Access { range, index }))
    }

    pub fn cast(
        &mut self,
        ty: Type,
        op: CastOp,
        source: Handle<Expression>,
    ) -> Result<Handle<Expression>, BuildError> {
        self.value_type(source)?;
        self.propagate(source, Usage::READ);
        Ok(self.alloc(Some(ty), ExpressionKind::Cast { op, source }))
    }

    /// Embeds constant array data. Constants are recorded as-is; callers
    /// deduplicate them if they care to.
    pub fn constant(
        &mut self,
        ty: Type,
        data: impl Into<ConstantData>,
    ) -> Result<Handle<Expression>, BuildError> {
        let data = data.into();
        let TypeInner::Array { base, length } = ty.inner() else {
            return Err(BuildError::ConstantNotArray(ty));
        };
        Self::expect_type("constant element", base, &Type::scalar(data.scalar()))?;
        if *length as usize != data.len() {
            return Err(BuildError::ConstantLengthMismatch {
                expected: *length as usize,
                found: data.len(),
                ty,
            });
        }
        self.data.captured_constants.push(ConstantBinding {
            ty: ty.clone(),
            data: data.clone(),
        });
        Ok(self.alloc(Some(ty), ExpressionKind::Constant(data)))
    }

    // ---- calls ----

    /// Records a value-producing call. Its result must be consumed before
    /// the function is finished.
    pub fn call(
        &mut self,
        ty: Type,
        callee: impl Into<Callee>,
        arguments: &[Handle<Expression>],
    ) -> Result<Handle<Expression>, BuildError> {
        let expr = self.make_call(Some(ty), callee.into(), arguments)?;
        self.call_expressions.push(expr);
        Ok(expr)
    }

    /// Records a call kept purely for its side effect as an expression
    /// statement. Such calls are never reported as leaked.
    pub fn call_void(
        &mut self,
        callee: impl Into<Callee>,
        arguments: &[Handle<Expression>],
    ) -> Result<(), BuildError> {
        let expr = self.make_call(None, callee.into(), arguments)?;
        self.propagate(expr, Usage::READ);
        self.append(Statement::Expr(expr))
    }

    fn make_call(
        &mut self,
        ty: Option<Type>,
        callee: Callee,
        arguments: &[Handle<Expression>],
    ) -> Result<Handle<Expression>, BuildError> {
        let mut argument_types = Vec::with_capacity(arguments.len());
        for &arg in arguments {
            argument_types.push(self.value_type(arg)?);
        }
        let usages = match &callee {
            Callee::Builtin(op) => {
                let mut usages = vec![Usage::READ; arguments.len()];
                if *op == CallOp::ImageWrite {
                    if let Some(first) = usages.first_mut() {
                        *first = Usage::WRITE;
                    }
                }
                usages
            }
            Callee::Custom(f) => Self::custom_call_usages(f, ty.as_ref(), &argument_types)?,
        };
        for (&arg, usage) in arguments.iter().zip(usages) {
            self.propagate(arg, usage);
        }
        match &callee {
            Callee::Builtin(op) => {
                if !self.data.used_builtin_ops.contains(op) {
                    self.data.used_builtin_ops.push(*op);
                }
            }
            Callee::Custom(f) => {
                if !self.data.used_callables.iter().any(|g| g.ptr_eq(f)) {
                    log::debug!(
                        "'{}': first call to callable '{}'",
                        self.data.display_name(),
                        f.name().unwrap_or("<unnamed>")
                    );
                    self.data.used_callables.push(f.clone());
                }
            }
        }
        Ok(self.alloc(
            ty,
            ExpressionKind::Call {
                callee,
                arguments: arguments.to_vec(),
            },
        ))
    }

    /// Resource parameters forward the usage they have inside the callee;
    /// everything else is read.
    fn custom_call_usages(
        callee: &Function,
        ty: Option<&Type>,
        argument_types: &[Type],
    ) -> Result<Vec<Usage>, BuildError> {
        let name = callee.name().unwrap_or("<unnamed>");
        if !callee.is_callable() {
            return Err(BuildError::NotCallable { name: name.into() });
        }
        let params = callee.arguments();
        if params.len() != argument_types.len() {
            return Err(BuildError::ArgumentCountMismatch {
                name: name.into(),
                expected: params.len(),
                found: argument_types.len(),
            });
        }
        for (param, arg_ty) in params.iter().zip(argument_types) {
            Self::expect_type("call argument", param.ty(), arg_ty)?;
        }
        if let (Some(ty), Some(ret)) = (ty, callee.return_type()) {
            Self::expect_type("call result", ret, ty)?;
        }
        Ok(params
            .iter()
            .map(|param| {
                if param.tag().is_resource() {
                    callee.variable_usage(param.uid())
                } else {
                    Usage::READ
                }
            })
            .collect())
    }

    // ---- finalization ----

    /// Validates the recorded function and freezes it.
    pub(crate) fn finish(self) -> Result<Function, BuildError> {
        let data = &self.data;
        let name = data.display_name().to_string();

        if data.tag == FunctionTag::Callable
            && !(data.builtin_variables.is_empty()
                && data.shared_variables.is_empty()
                && data.captured_buffers.is_empty()
                && data.captured_textures.is_empty()
                && data.captured_texture_heaps.is_empty())
        {
            log::warn!("callable '{name}' holds kernel-only state");
            return Err(BuildError::CallableCapturesKernelState {
                name,
                builtins: data.builtin_variables.len(),
                shared: data.shared_variables.len(),
                buffers: data.captured_buffers.len(),
                textures: data.captured_textures.len(),
                heaps: data.captured_texture_heaps.len(),
            });
        }

        let open = self
            .scope_stack
            .iter()
            .filter(|&&s| s != data.body)
            .count();
        if open > 0 {
            return Err(BuildError::UnclosedScopes { name, open });
        }

        if self.options.check_leaks {
            for &expr in &self.call_expressions {
                if data.expression_usages[expr.index()].is_none() {
                    let callee = match data.expressions[expr].kind() {
                        ExpressionKind::Call {
                            callee: Callee::Builtin(op),
                            ..
                        } => op.to_string(),
                        ExpressionKind::Call {
                            callee: Callee::Custom(f),
                            ..
                        } => format!("callable '{}'", f.name().unwrap_or("<unnamed>")),
                        _ => String::from("<not a call>"),
                    };
                    log::warn!("'{name}': call expression {expr:?} ({callee}) is never used");
                    return Err(BuildError::LeakedCall {
                        name,
                        index: expr.index(),
                        callee,
                    });
                }
            }
        }

        let mut data = self.data;
        data.hash = hash_function(&data);
        log::debug!(
            "finished {:?} '{}' ({} expressions, {} variables, hash {:016x})",
            data.tag,
            data.display_name(),
            data.expressions.len(),
            data.variables.len(),
            data.hash
        );
        Ok(Function::new(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Scalar, TextureDim};

    fn kernel() -> FunctionBuilder {
        FunctionBuilder::new(FunctionTag::Kernel).named("test")
    }

    fn callable() -> FunctionBuilder {
        FunctionBuilder::new(FunctionTag::Callable).named("helper")
    }

    #[test]
    fn uids_are_dense() {
        let mut b = kernel();
        b.argument(Type::f32());
        b.buffer(Type::f32());
        b.shared(Type::array(Type::f32(), 64));
        b.thread_id();
        b.local(Type::i32(), &[]).unwrap();
        for (i, v) in b.variables().iter().enumerate() {
            assert_eq!(v.uid() as usize, i);
        }
        assert_eq!(b.variables().len(), 5);
    }

    #[test]
    fn builtins_are_deduplicated() {
        let mut b = kernel();
        let a = b.thread_id();
        let c = b.thread_id();
        b.block_id();
        assert_ne!(a, c);
        assert_eq!(b.builtin_variables().len(), 2);
        let uid = |b: &FunctionBuilder, h| b.expression(h).unwrap().as_variable().unwrap().uid();
        assert_eq!(uid(&b, a), uid(&b, c));
    }

    #[test]
    fn buffer_capture_dedup() {
        let mut b = kernel();
        let x = b.buffer_binding(Type::f32(), 0x10, 0).unwrap();
        let y = b.buffer_binding(Type::f32(), 0x10, 0).unwrap();
        assert_eq!(b.captured_buffers().len(), 1);
        let vx = b.expression(x).unwrap().as_variable().unwrap().uid();
        let vy = b.expression(y).unwrap().as_variable().unwrap().uid();
        assert_eq!(vx, vy);
    }

    #[test]
    fn buffer_capture_aliasing() {
        let mut b = kernel();
        b.buffer_binding(Type::f32(), 7, 0).unwrap();
        assert_eq!(
            b.buffer_binding(Type::f32(), 7, 16),
            Err(BuildError::BufferOffsetAlias {
                handle: 7,
                original: 0,
                requested: 16,
            })
        );
        assert!(matches!(
            b.buffer_binding(Type::u32(), 7, 0),
            Err(BuildError::CaptureTypeAlias {
                resource: "buffer",
                handle: 7,
                ..
            })
        ));
    }

    #[test]
    fn texture_capture_aliasing() {
        let mut b = kernel();
        let rgba = Type::texture(TextureDim::D2, Scalar::F32);
        b.texture_binding(rgba.clone(), 3).unwrap();
        b.texture_binding(rgba, 3).unwrap();
        assert_eq!(b.captured_textures().len(), 1);
        assert!(matches!(
            b.texture_binding(Type::texture(TextureDim::D3, Scalar::F32), 3),
            Err(BuildError::CaptureTypeAlias {
                resource: "texture",
                ..
            })
        ));
        assert!(b.texture_binding(Type::f32(), 4).is_err());

        b.texture_heap_binding(9);
        b.texture_heap_binding(9);
        assert_eq!(b.captured_texture_heaps().len(), 1);
    }

    #[test]
    fn access_marks_range_not_index() {
        let mut b = kernel();
        let buf = b.buffer(Type::f32());
        let tid = b.thread_id();
        let x = b.member(Type::u32(), tid, 0).unwrap();
        let elem = b.access(Type::f32(), buf, x).unwrap();
        assert_eq!(b.expression_usage(x), Usage::READ);
        assert_eq!(b.expression_usage(buf), Usage::NONE);

        b.mark(elem, Usage::WRITE).unwrap();
        assert_eq!(b.expression_usage(elem), Usage::WRITE);
        assert_eq!(b.expression_usage(buf), Usage::WRITE);
        assert_eq!(b.expression_usage(x), Usage::READ);

        let uid = b.expression(buf).unwrap().as_variable().unwrap().uid();
        assert_eq!(b.variable_usage(uid), Usage::WRITE);
    }

    #[test]
    fn member_forwards_to_base() {
        let mut b = kernel();
        let v = b
            .local(Type::vector(VectorSize::Quad, Scalar::F32), &[])
            .unwrap();
        let y = b.member(Type::f32(), v, 1).unwrap();
        b.mark(y, Usage::READ_WRITE).unwrap();
        assert_eq!(b.expression_usage(v), Usage::READ_WRITE);
    }

    #[test]
    fn member_bounds() {
        let mut b = kernel();
        let tid = b.thread_id();
        assert!(matches!(
            b.member(Type::u32(), tid, 3),
            Err(BuildError::MemberIndexOutOfRange { index: 3, .. })
        ));
        assert!(matches!(
            b.member(Type::f32(), tid, 0),
            Err(BuildError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn swizzle_checks() {
        let mut b = kernel();
        let tid = b.thread_id();
        let yx = b
            .swizzle(Type::vector(VectorSize::Bi, Scalar::U32), tid, 2, 0x01)
            .unwrap();
        assert!(matches!(
            b.expression(yx).unwrap().kind(),
            ExpressionKind::Member {
                access: MemberAccess::Swizzle(_),
                ..
            }
        ));
        assert_eq!(
            b.swizzle(Type::u32(), tid, 0, 0),
            Err(BuildError::InvalidSwizzleSize(0))
        );
        // .w on a three-component vector
        assert_eq!(
            b.swizzle(Type::u32(), tid, 1, 0x3),
            Err(BuildError::SwizzleComponentOutOfRange {
                component: 3,
                dimension: 3,
            })
        );
    }

    #[test]
    fn image_write_usage() {
        let mut b = kernel();
        let tex = b
            .texture(Type::texture(TextureDim::D2, Scalar::F32))
            .unwrap();
        let tid = b.thread_id();
        let zero = b.literal(0.0f32);
        b.call_void(CallOp::ImageWrite, &[tex, tid, zero]).unwrap();
        assert_eq!(b.expression_usage(tex), Usage::WRITE);
        assert_eq!(b.expression_usage(tid), Usage::READ);
        assert_eq!(b.expression_usage(zero), Usage::READ);
        assert_eq!(b.used_builtin_ops(), &[CallOp::ImageWrite]);
    }

    #[test]
    fn builtin_calls_read_everything() {
        let mut b = kernel();
        let x = b.argument(Type::f32());
        let y = b.argument(Type::f32());
        let m = b.call(Type::f32(), CallOp::Max, &[x, y]).unwrap();
        b.call(Type::f32(), CallOp::Max, &[m, x]).unwrap();
        assert_eq!(b.expression_usage(x), Usage::READ);
        assert_eq!(b.expression_usage(y), Usage::READ);
        assert_eq!(b.used_builtin_ops().len(), 1);
    }

    #[test]
    fn leaked_call_is_rejected() {
        let mut b = kernel();
        let x = b.argument(Type::f32());
        b.call(Type::f32(), CallOp::Sqrt, &[x]).unwrap();
        assert!(matches!(
            b.finish(),
            Err(BuildError::LeakedCall { index: 1, .. })
        ));
    }

    #[test]
    fn consumed_call_finalizes() {
        let mut b = kernel();
        let x = b.argument(Type::f32());
        let r = b.call(Type::f32(), CallOp::Sqrt, &[x]).unwrap();
        b.local(Type::f32(), &[r]).unwrap();
        assert!(b.finish().is_ok());
    }

    #[test]
    fn leak_check_can_be_disabled() {
        let options = BuilderOptions {
            check_leaks: false,
            ..BuilderOptions::default()
        };
        let mut b = FunctionBuilder::with_options(FunctionTag::Kernel, options);
        let x = b.argument(Type::f32());
        b.call(Type::f32(), CallOp::Sqrt, &[x]).unwrap();
        assert!(b.finish().is_ok());
    }

    #[test]
    fn callable_rejects_kernel_state() {
        let mut b = callable();
        b.shared(Type::array(Type::f32(), 4));
        assert!(matches!(
            b.finish(),
            Err(BuildError::CallableCapturesKernelState { shared: 1, .. })
        ));

        let mut b = callable();
        b.buffer_binding(Type::f32(), 1, 0).unwrap();
        assert!(matches!(
            b.finish(),
            Err(BuildError::CallableCapturesKernelState { buffers: 1, .. })
        ));

        let mut b = callable();
        let x = b.argument(Type::f32());
        b.return_(Some(x)).unwrap();
        let f = b.finish().unwrap();
        assert_eq!(f.return_type(), Some(&Type::f32()));
        assert_eq!(f.arguments()[0].tag(), VariableTag::Local);
    }

    #[test]
    fn kernel_arguments_are_uniform() {
        let mut b = kernel();
        b.argument(Type::u32());
        assert_eq!(b.arguments()[0].tag(), VariableTag::Uniform);
    }

    #[test]
    fn second_value_return_fails() {
        let mut b = callable();
        let x = b.argument(Type::i32());
        b.return_(Some(x)).unwrap();
        b.return_(None).unwrap();
        assert_eq!(b.return_(Some(x)), Err(BuildError::MultipleReturns));
    }

    #[test]
    fn scope_discipline() {
        let mut b = kernel();
        let outer = b.new_scope();
        let inner = b.new_scope();
        b.push_scope(outer).unwrap();
        b.push_scope(inner).unwrap();
        assert_eq!(b.push_scope(outer), Err(BuildError::ScopeAlreadyOpen(outer.index())));
        assert_eq!(
            b.pop_scope(outer),
            Err(BuildError::MismatchedScopePop {
                requested: outer.index(),
                top: Some(inner.index()),
            })
        );
        b.break_().unwrap();
        b.pop_scope(inner).unwrap();
        assert_eq!(b.scope(inner).unwrap().len(), 1);
        assert_eq!(b.current_scope(), Some(outer));
        assert!(matches!(
            b.finish(),
            Err(BuildError::UnclosedScopes { open: 1, .. })
        ));
    }

    #[test]
    fn emptied_scope_stack_rejects_statements() {
        let mut b = kernel();
        let body = b.body();
        b.pop_scope(body).unwrap();
        assert_eq!(b.continue_(), Err(BuildError::EmptyScopeStack));
        assert!(b.finish().is_ok());
    }

    #[test]
    fn statements_keep_emission_order() {
        let mut b = kernel();
        let n = b.argument(Type::u32());
        let i = b.local(Type::u32(), &[]).unwrap();
        let cond = b.binary(Type::bool(), BinaryOp::Less, i, n).unwrap();
        let body = b.new_scope();
        b.while_(cond, body).unwrap();
        b.push_scope(body).unwrap();
        let one = b.literal(1u32);
        b.assign(AssignOp::AddAssign, i, one).unwrap();
        b.pop_scope(body).unwrap();
        b.return_(None).unwrap();

        let root = b.scope(b.body()).unwrap().statements();
        assert!(matches!(root[0], Statement::Declare { .. }));
        assert!(matches!(root[1], Statement::While { .. }));
        assert!(matches!(root[2], Statement::Return { value: None }));
        assert_eq!(b.expression_usage(i), Usage::READ_WRITE);
        assert_eq!(b.expression_usage(cond), Usage::READ);
    }

    #[test]
    fn assign_requires_lvalue_and_matching_types() {
        let mut b = kernel();
        let x = b.local(Type::f32(), &[]).unwrap();
        let one = b.literal(1.0f32);
        let two = b.literal(2u32);
        assert_eq!(
            b.assign(AssignOp::Assign, one, x),
            Err(BuildError::NotAssignable { index: one.index() })
        );
        assert!(matches!(
            b.assign(AssignOp::Assign, x, two),
            Err(BuildError::TypeMismatch {
                context: "assignment",
                ..
            })
        ));
        b.assign(AssignOp::Assign, x, one).unwrap();
        assert_eq!(b.expression_usage(x), Usage::WRITE);
    }

    #[test]
    fn local_initializer_checks() {
        let mut b = kernel();
        let one = b.literal(1.0f32);
        let two = b.literal(2.0f32);
        let v2 = Type::vector(VectorSize::Bi, Scalar::F32);
        b.local(v2.clone(), &[one, two]).unwrap();
        assert!(b.local(v2, &[one]).is_err());
        assert!(b.local(Type::vector(VectorSize::Tri, Scalar::F32), &[one, two]).is_err());
        assert_eq!(b.expression_usage(one), Usage::READ);
    }

    #[test]
    fn constant_checks() {
        let mut b = kernel();
        let ty = Type::array(Type::f32(), 3);
        let c = b.constant(ty.clone(), vec![1.0f32, 2.0, 3.0]).unwrap();
        assert_eq!(b.captured_constants().len(), 1);
        assert_eq!(b.expression(c).unwrap().ty(), Some(&ty));
        assert_eq!(
            b.constant(Type::f32(), vec![1.0f32]),
            Err(BuildError::ConstantNotArray(Type::f32()))
        );
        assert!(matches!(
            b.constant(ty.clone(), vec![1.0f32]),
            Err(BuildError::ConstantLengthMismatch {
                expected: 3,
                found: 1,
                ..
            })
        ));
        assert!(b.constant(ty, vec![1u32, 2, 3]).is_err());
    }

    #[test]
    fn bad_handles_are_reported() {
        let mut b = kernel();
        let mut other = kernel();
        other.literal(1u32);
        let foreign = other.literal(2u32);
        assert_eq!(
            b.mark(foreign, Usage::READ),
            Err(BuildError::ForeignHandle { index: 1 })
        );

        // same index, different function
        let local = b.literal(0u32);
        let twin = b.literal(1u32);
        assert_eq!(twin.index(), foreign.index());
        assert_ne!(twin, foreign);
        assert_eq!(
            b.binary(Type::u32(), BinaryOp::Add, local, foreign),
            Err(BuildError::ForeignHandle { index: 1 })
        );
        assert_eq!(b.expression_usage(foreign), Usage::NONE);

        let scope = other.new_scope();
        assert_eq!(
            b.while_(local, scope),
            Err(BuildError::ForeignScope {
                index: scope.index()
            })
        );
    }

    #[test]
    fn scopes_cannot_contain_themselves() {
        let mut b = kernel();
        let t = b.literal(true);
        let body = b.body();
        assert_eq!(
            b.if_(t, body, None),
            Err(BuildError::ScopeCycle {
                index: body.index()
            })
        );

        let outer = b.new_scope();
        b.push_scope(outer).unwrap();
        assert_eq!(
            b.while_(t, outer),
            Err(BuildError::ScopeCycle {
                index: outer.index()
            })
        );

        // outer -> inner, then inner -> outer from inside inner
        let inner = b.new_scope();
        b.while_(t, inner).unwrap();
        b.pop_scope(outer).unwrap();
        b.push_scope(inner).unwrap();
        assert_eq!(
            b.while_(t, outer),
            Err(BuildError::ScopeCycle {
                index: outer.index()
            })
        );
        b.pop_scope(inner).unwrap();
        assert!(b.scope(inner).unwrap().is_empty());

        b.while_(t, outer).unwrap();
        let f = b.finish().unwrap();
        assert_eq!(f.body_scope().len(), 1);
    }

    #[test]
    fn scopes_are_attached_once() {
        let mut b = kernel();
        let t = b.literal(true);
        let shared_body = b.new_scope();
        b.if_(t, shared_body, None).unwrap();
        assert_eq!(
            b.while_(t, shared_body),
            Err(BuildError::ScopeAlreadyAttached {
                index: shared_body.index()
            })
        );

        let branch = b.new_scope();
        assert_eq!(
            b.if_(t, branch, Some(branch)),
            Err(BuildError::ScopeAlreadyAttached {
                index: branch.index()
            })
        );
        // a rejected statement leaves its scopes free
        let other = b.new_scope();
        b.if_(t, branch, Some(other)).unwrap();

        let init = b.new_scope();
        let body = b.new_scope();
        assert!(matches!(
            b.for_(init, t, body, body),
            Err(BuildError::ScopeAlreadyAttached { .. })
        ));
        let update = b.new_scope();
        b.for_(init, t, update, body).unwrap();
        assert_eq!(b.scope(b.body()).unwrap().len(), 3);
    }

    #[test]
    fn raytracing_flag() {
        let mut b = kernel();
        assert!(!b.raytracing());
        b.mark_raytracing();
        b.mark_raytracing();
        assert!(b.raytracing());
        let marked = b.finish().unwrap();
        assert!(marked.raytracing());
        assert!(crate::dump_function(&marked).contains("requires raytracing"));

        let plain = kernel().finish().unwrap();
        assert!(!plain.raytracing());
        assert_ne!(marked.hash(), plain.hash());
    }

    #[test]
    fn custom_calls_forward_resource_usage() {
        let mut c = callable();
        let out = c.buffer(Type::f32());
        let idx = c.argument(Type::u32());
        let val = c.argument(Type::f32());
        let dst = c.access(Type::f32(), out, idx).unwrap();
        c.assign(AssignOp::Assign, dst, val).unwrap();
        let store = c.finish().unwrap();
        assert_eq!(store.variable_usage(0), Usage::WRITE);

        let mut k = kernel();
        let buf = k.buffer_binding(Type::f32(), 42, 0).unwrap();
        let i = k.literal(0u32);
        let v = k.literal(1.0f32);
        k.call_void(&store, &[buf, i, v]).unwrap();
        assert_eq!(k.expression_usage(buf), Usage::WRITE);
        assert_eq!(k.expression_usage(i), Usage::READ);
        assert_eq!(k.used_callables().len(), 1);
        assert!(matches!(
            k.call_void(&store, &[buf, i]),
            Err(BuildError::ArgumentCountMismatch {
                expected: 3,
                found: 2,
                ..
            })
        ));
        assert!(matches!(
            k.call_void(&store, &[buf, v, v]),
            Err(BuildError::TypeMismatch { .. })
        ));
        let f = k.finish().unwrap();
        assert_eq!(f.variable_usage(0), Usage::WRITE);
    }

    #[test]
    fn kernels_are_not_callable() {
        let target = kernel().finish().unwrap();
        let mut b = kernel();
        assert_eq!(
            b.call_void(&target, &[]),
            Err(BuildError::NotCallable {
                name: "test".into()
            })
        );
    }
}

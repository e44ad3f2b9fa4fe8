//! The builder context stack.
//!
//! Only the top builder is current. Defining a callable while another
//! function is being recorded pushes a fresh builder, records into it, pops
//! it into an immutable [`Function`] and resumes the outer builder with the
//! callable available as a call target.

use crate::builder::{BuilderId, BuilderOptions, FunctionBuilder};
use crate::error::BuildError;
use crate::func::{Function, FunctionTag};

/// Stack of active builders owned by one construction session.
#[derive(Debug, Default)]
pub struct BuilderStack {
    builders: Vec<FunctionBuilder>,
    options: BuilderOptions,
}

impl BuilderStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: BuilderOptions) -> Self {
        Self {
            builders: Vec::new(),
            options,
        }
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    pub fn depth(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    pub fn current_id(&self) -> Option<BuilderId> {
        self.builders.last().map(FunctionBuilder::id)
    }

    /// Installs `builder` as current. Kernels can only start on an empty stack.
    pub fn push(&mut self, builder: FunctionBuilder) -> Result<BuilderId, BuildError> {
        if builder.tag() == FunctionTag::Kernel && !self.builders.is_empty() {
            return Err(BuildError::NestedKernel {
                depth: self.builders.len(),
            });
        }
        let id = builder.id();
        log::debug!(
            "push {:?} '{}' (depth {})",
            builder.tag(),
            builder.name().unwrap_or("<unnamed>"),
            self.builders.len()
        );
        self.builders.push(builder);
        Ok(id)
    }

    /// Creates a builder with this stack's options and pushes it.
    pub fn begin(
        &mut self,
        tag: FunctionTag,
        name: impl Into<String>,
    ) -> Result<BuilderId, BuildError> {
        let builder = FunctionBuilder::with_options(tag, self.options.clone()).named(name);
        self.push(builder)
    }

    /// Removes the top builder and finalizes it.
    ///
    /// The top must be the builder identified by `expected`; otherwise the
    /// stack is left untouched.
    pub fn pop(&mut self, expected: BuilderId) -> Result<Function, BuildError> {
        match self.current_id() {
            Some(top) if top == expected => {}
            found => {
                return Err(BuildError::MismatchedPop {
                    expected: expected.raw(),
                    found: found.map(BuilderId::raw),
                });
            }
        }
        let builder = self.builders.pop().ok_or(BuildError::EmptyContextStack)?;
        log::debug!(
            "pop {:?} '{}' (depth {})",
            builder.tag(),
            builder.name().unwrap_or("<unnamed>"),
            self.builders.len()
        );
        builder.finish()
    }

    /// The builder currently receiving nodes.
    pub fn current(&mut self) -> Result<&mut FunctionBuilder, BuildError> {
        self.builders.last_mut().ok_or(BuildError::EmptyContextStack)
    }

    /// Records a function through `body` and returns it finalized.
    ///
    /// The builder is always removed again: on success it is finalized, on
    /// failure it is discarded together with anything `body` left pushed,
    /// and the previous top is current again either way.
    pub fn define<F>(
        &mut self,
        tag: FunctionTag,
        name: impl Into<String>,
        body: F,
    ) -> Result<Function, BuildError>
    where
        F: FnOnce(&mut BuilderStack) -> Result<(), BuildError>,
    {
        let depth = self.builders.len();
        let id = self.begin(tag, name)?;
        let result = body(self).and_then(|()| self.pop(id));
        if self.builders.len() > depth {
            log::debug!(
                "discarding {} unfinished builder(s)",
                self.builders.len() - depth
            );
            self.builders.truncate(depth);
        }
        result
    }

    pub fn define_kernel<F>(&mut self, name: impl Into<String>, body: F) -> Result<Function, BuildError>
    where
        F: FnOnce(&mut BuilderStack) -> Result<(), BuildError>,
    {
        self.define(FunctionTag::Kernel, name, body)
    }

    pub fn define_callable<F>(
        &mut self,
        name: impl Into<String>,
        body: F,
    ) -> Result<Function, BuildError>
    where
        F: FnOnce(&mut BuilderStack) -> Result<(), BuildError>,
    {
        self.define(FunctionTag::Callable, name, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    #[test]
    fn empty_stack_has_no_current() {
        let mut stack = BuilderStack::new();
        assert!(stack.is_empty());
        assert!(matches!(stack.current(), Err(BuildError::EmptyContextStack)));
    }

    #[test]
    fn nested_kernel_is_rejected() {
        let mut stack = BuilderStack::new();
        stack.begin(FunctionTag::Kernel, "outer").unwrap();
        assert_eq!(
            stack.begin(FunctionTag::Kernel, "inner"),
            Err(BuildError::NestedKernel { depth: 1 })
        );
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn callable_under_kernel() {
        let mut stack = BuilderStack::new();
        let outer = stack.begin(FunctionTag::Kernel, "outer").unwrap();
        let inner = stack.begin(FunctionTag::Callable, "inner").unwrap();
        assert_eq!(stack.current_id(), Some(inner));

        let f = stack.pop(inner).unwrap();
        assert!(f.is_callable());
        assert_eq!(stack.current_id(), Some(outer));
        assert_eq!(stack.current().unwrap().name(), Some("outer"));
    }

    #[test]
    fn mismatched_pop_keeps_builder() {
        let mut stack = BuilderStack::new();
        let outer = stack.begin(FunctionTag::Kernel, "outer").unwrap();
        let inner = stack.begin(FunctionTag::Callable, "inner").unwrap();
        assert_eq!(
            stack.pop(outer),
            Err(BuildError::MismatchedPop {
                expected: outer.raw(),
                found: Some(inner.raw()),
            })
        );
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn define_restores_previous_top_on_error() {
        let mut stack = BuilderStack::new();
        let outer = stack.begin(FunctionTag::Kernel, "outer").unwrap();
        let result = stack.define_callable("broken", |s| {
            s.current()?.shared(Type::f32());
            Ok(())
        });
        assert!(matches!(
            result,
            Err(BuildError::CallableCapturesKernelState { .. })
        ));
        assert_eq!(stack.current_id(), Some(outer));

        let result = stack.define_callable("early", |s| {
            s.begin(FunctionTag::Callable, "dangling")?;
            Err(BuildError::EmptyScopeStack)
        });
        assert_eq!(result.unwrap_err(), BuildError::EmptyScopeStack);
        assert_eq!(stack.current_id(), Some(outer));
    }

    #[test]
    fn define_kernel_on_empty_stack() {
        let mut stack = BuilderStack::new();
        let f = stack
            .define_kernel("k", |s| {
                let b = s.current()?;
                let tid = b.thread_id();
                let x = b.local(Type::uint3(), &[tid])?;
                b.mark(x, crate::variable::Usage::READ)
            })
            .unwrap();
        assert_eq!(f.name(), Some("k"));
        assert!(stack.is_empty());
    }
}

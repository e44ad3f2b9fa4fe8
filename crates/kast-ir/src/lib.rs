//! Kast kernel AST.
//!
//! An arena-based AST for GPU kernels and device callables recorded from
//! host code. A [`BuilderStack`] tracks the functions being recorded; each
//! [`FunctionBuilder`] shape-checks nodes as they are created, propagates
//! read/write usage through the expression graph and records implicitly
//! captured resources. Finished functions are immutable [`Function`] values
//! consumed by code generation.

pub mod arena;
mod builder;
mod context;
mod display;
mod error;
mod expr;
mod func;
mod hash;
mod stmt;
mod types;
mod variable;

pub use arena::{Arena, Handle};
pub use builder::{BuilderId, BuilderOptions, FunctionBuilder};
pub use context::BuilderStack;
pub use display::dump_function;
pub use error::BuildError;
pub use expr::{
    BinaryOp, CallOp, Callee, CastOp, ConstantData, Expression, ExpressionKind, ExpressionTag,
    Literal, MemberAccess, Swizzle, UnaryOp,
};
pub use func::{Function, FunctionTag};
pub use stmt::{AssignOp, Scope, Statement};
pub use types::{Bytes, Scalar, ScalarKind, TextureDim, Type, TypeInner, VectorSize};
pub use variable::{
    BufferBinding, ConstantBinding, ResourceHandle, TextureBinding, TextureHeapBinding, Usage,
    Variable, VariableTag,
};

//! Structural hashing of finished functions.
//!
//! The hash identifies a function for compiled-code caching. It covers the
//! signature, capture tables, usage tables, the body tree and the hashes of
//! called callables. Arena handles are never hashed directly: every node is
//! hashed by content, so the result only depends on what was recorded.

use std::hash::{Hash, Hasher};
use std::mem;

use rustc_hash::FxHasher;

use crate::arena::Handle;
use crate::expr::{Callee, ExpressionKind};
use crate::func::FunctionData;
use crate::stmt::{Scope, Statement};

pub(crate) fn hash_function(data: &FunctionData) -> u64 {
    let mut state = FxHasher::default();
    data.tag.hash(&mut state);
    data.name.hash(&mut state);
    data.arguments.hash(&mut state);
    data.builtin_variables.hash(&mut state);
    data.shared_variables.hash(&mut state);
    data.captured_buffers.hash(&mut state);
    data.captured_textures.hash(&mut state);
    data.captured_texture_heaps.hash(&mut state);
    data.captured_constants.hash(&mut state);
    data.variables.hash(&mut state);
    data.variable_usages.hash(&mut state);
    data.return_type.hash(&mut state);
    data.raytracing.hash(&mut state);

    let exprs = expression_hashes(data);
    hash_scope(data, data.body, &exprs, &mut state);
    state.finish()
}

/// Per-node content hashes, computed in allocation order. Operands are
/// always allocated before their users, so children are ready first.
fn expression_hashes(data: &FunctionData) -> Vec<u64> {
    let mut hashes: Vec<u64> = Vec::with_capacity(data.expressions.len());
    for (_, expr) in data.expressions.iter() {
        let mut state = FxHasher::default();
        expr.tag().hash(&mut state);
        expr.ty().hash(&mut state);
        match expr.kind() {
            ExpressionKind::Unary { op, operand } => {
                op.hash(&mut state);
                hashes[operand.index()].hash(&mut state);
            }
            ExpressionKind::Binary { op, lhs, rhs } => {
                op.hash(&mut state);
                hashes[lhs.index()].hash(&mut state);
                hashes[rhs.index()].hash(&mut state);
            }
            ExpressionKind::Member { base, access } => {
                access.hash(&mut state);
                hashes[base.index()].hash(&mut state);
            }
            ExpressionKind::Access { range, index } => {
                hashes[range.index()].hash(&mut state);
                hashes[index.index()].hash(&mut state);
            }
            ExpressionKind::Literal(lit) => lit.hash(&mut state),
            ExpressionKind::Ref(v) => v.hash(&mut state),
            ExpressionKind::Constant(c) => c.hash(&mut state),
            ExpressionKind::Call { callee, arguments } => {
                match callee {
                    Callee::Builtin(op) => {
                        0u8.hash(&mut state);
                        op.hash(&mut state);
                    }
                    Callee::Custom(f) => {
                        1u8.hash(&mut state);
                        f.hash().hash(&mut state);
                    }
                }
                arguments.len().hash(&mut state);
                for arg in arguments {
                    hashes[arg.index()].hash(&mut state);
                }
            }
            ExpressionKind::Cast { op, source } => {
                op.hash(&mut state);
                hashes[source.index()].hash(&mut state);
            }
        }
        hashes.push(state.finish());
    }
    hashes
}

fn hash_scope(data: &FunctionData, scope: Handle<Scope>, exprs: &[u64], state: &mut FxHasher) {
    let statements = data.scopes[scope].statements();
    statements.len().hash(state);
    for stmt in statements {
        mem::discriminant(stmt).hash(state);
        match stmt {
            Statement::Break | Statement::Continue => {}
            Statement::Return { value } => value.map(|v| exprs[v.index()]).hash(state),
            Statement::If {
                condition,
                accept,
                reject,
            } => {
                exprs[condition.index()].hash(state);
                hash_scope(data, *accept, exprs, state);
                reject.is_some().hash(state);
                if let Some(reject) = reject {
                    hash_scope(data, *reject, exprs, state);
                }
            }
            Statement::While { condition, body } => {
                exprs[condition.index()].hash(state);
                hash_scope(data, *body, exprs, state);
            }
            Statement::For {
                init,
                condition,
                update,
                body,
            } => {
                hash_scope(data, *init, exprs, state);
                exprs[condition.index()].hash(state);
                hash_scope(data, *update, exprs, state);
                hash_scope(data, *body, exprs, state);
            }
            Statement::Switch { selector, body } => {
                exprs[selector.index()].hash(state);
                hash_scope(data, *body, exprs, state);
            }
            Statement::Case { value, body } => {
                exprs[value.index()].hash(state);
                hash_scope(data, *body, exprs, state);
            }
            Statement::Default { body } => hash_scope(data, *body, exprs, state),
            Statement::Assign { op, lhs, rhs } => {
                op.hash(state);
                exprs[lhs.index()].hash(state);
                exprs[rhs.index()].hash(state);
            }
            Statement::Declare {
                variable,
                initializers,
            } => {
                variable.hash(state);
                initializers.len().hash(state);
                for init in initializers {
                    exprs[init.index()].hash(state);
                }
            }
            Statement::Expr(expr) => exprs[expr.index()].hash(state),
        }
    }
}

//! Statements and scopes.
//!
//! Statements are purely structural. They reference expressions and child
//! scopes by handle; all usage bookkeeping happens in the builder when a
//! statement is emitted.

use crate::arena::Handle;
use crate::expr::Expression;
use crate::variable::Variable;

/// An ordered block of statements.
///
/// Statement order is the sequencing contract consumed by code generation
/// and is never rearranged once recorded.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    statements: Vec<Statement>,
}

impl Scope {
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub(crate) fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }
}

/// Assignment operators, plain and compound.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
    ShlAssign,
    ShrAssign,
}

impl AssignOp {
    /// Compound operators read the destination before writing it.
    pub fn is_compound(self) -> bool {
        self != Self::Assign
    }
}

/// A statement in a scope.
#[derive(Clone, Debug)]
pub enum Statement {
    Break,
    Continue,
    Return {
        value: Option<Handle<Expression>>,
    },
    If {
        condition: Handle<Expression>,
        accept: Handle<Scope>,
        reject: Option<Handle<Scope>>,
    },
    While {
        condition: Handle<Expression>,
        body: Handle<Scope>,
    },
    /// `init` and `update` are scopes so they may hold declarations and
    /// assignments recorded like any other statement.
    For {
        init: Handle<Scope>,
        condition: Handle<Expression>,
        update: Handle<Scope>,
        body: Handle<Scope>,
    },
    /// Its body holds `Case` and `Default` statements.
    Switch {
        selector: Handle<Expression>,
        body: Handle<Scope>,
    },
    Case {
        value: Handle<Expression>,
        body: Handle<Scope>,
    },
    Default {
        body: Handle<Scope>,
    },
    Assign {
        op: AssignOp,
        lhs: Handle<Expression>,
        rhs: Handle<Expression>,
    },
    Declare {
        variable: Variable,
        initializers: Vec<Handle<Expression>>,
    },
    /// A call kept purely for its side effect.
    Expr(Handle<Expression>),
}

impl Statement {
    /// Child scopes in recording order.
    pub fn scopes(&self) -> Vec<Handle<Scope>> {
        match *self {
            Self::If { accept, reject, .. } => {
                let mut out = vec![accept];
                out.extend(reject);
                out
            }
            Self::While { body, .. }
            | Self::Switch { body, .. }
            | Self::Case { body, .. }
            | Self::Default { body } => vec![body],
            Self::For {
                init, update, body, ..
            } => vec![init, update, body],
            _ => Vec::new(),
        }
    }
}

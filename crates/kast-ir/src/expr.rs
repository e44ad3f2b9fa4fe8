//! Expressions: typed, immutable nodes forming a DAG.
//!
//! Nodes never carry their own usage accumulator. The owning builder keeps a
//! separate usage table indexed by [`Handle<Expression>`] and updates it
//! through [`FunctionBuilder::mark`](crate::FunctionBuilder::mark).

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::arena::Handle;
use crate::error::BuildError;
use crate::func::Function;
use crate::types::{Scalar, Type};
use crate::variable::Variable;

/// A literal scalar value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Literal {
    Bool(bool),
    I32(i32),
    U32(u32),
    F32(f32),
}

impl Literal {
    /// Returns the scalar type of this literal.
    pub fn scalar(&self) -> Scalar {
        match *self {
            Self::Bool(_) => Scalar::BOOL,
            Self::I32(_) => Scalar::I32,
            Self::U32(_) => Scalar::U32,
            Self::F32(_) => Scalar::F32,
        }
    }

    pub fn ty(&self) -> Type {
        Type::scalar(self.scalar())
    }
}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match *self {
            Self::Bool(v) => v.hash(state),
            Self::I32(v) => v.hash(state),
            Self::U32(v) => v.hash(state),
            Self::F32(v) => v.to_bits().hash(state),
        }
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<u32> for Literal {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<f32> for Literal {
    fn from(v: f32) -> Self {
        Self::F32(v)
    }
}

/// An immutable blob of constant array elements.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantData {
    Bool(Arc<[bool]>),
    I32(Arc<[i32]>),
    U32(Arc<[u32]>),
    F32(Arc<[f32]>),
}

impl ConstantData {
    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn scalar(&self) -> Scalar {
        match self {
            Self::Bool(_) => Scalar::BOOL,
            Self::I32(_) => Scalar::I32,
            Self::U32(_) => Scalar::U32,
            Self::F32(_) => Scalar::F32,
        }
    }
}

impl Hash for ConstantData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Bool(v) => v.hash(state),
            Self::I32(v) => v.hash(state),
            Self::U32(v) => v.hash(state),
            Self::F32(v) => {
                v.len().hash(state);
                for x in v.iter() {
                    x.to_bits().hash(state);
                }
            }
        }
    }
}

impl From<Vec<bool>> for ConstantData {
    fn from(v: Vec<bool>) -> Self {
        Self::Bool(v.into())
    }
}

impl From<Vec<i32>> for ConstantData {
    fn from(v: Vec<i32>) -> Self {
        Self::I32(v.into())
    }
}

impl From<Vec<u32>> for ConstantData {
    fn from(v: Vec<u32>) -> Self {
        Self::U32(v.into())
    }
}

impl From<Vec<f32>> for ConstantData {
    fn from(v: Vec<f32>) -> Self {
        Self::F32(v.into())
    }
}

/// A unary operator.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum UnaryOp {
    Plus,
    Negate,
    LogicalNot,
    BitwiseNot,
}

/// A binary operator.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LogicalAnd,
    LogicalOr,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
}

/// Conversion flavor of a cast.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum CastOp {
    /// Value conversion.
    Static,
    /// Reinterpretation of the bit pattern.
    Bitwise,
}

/// Runtime intrinsics callable from device code.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum CallOp {
    // Logic
    All,
    Any,
    Select,
    // Component-wise
    Abs,
    Min,
    Max,
    Clamp,
    Lerp,
    Step,
    SmoothStep,
    Saturate,
    // Bits
    Clz,
    Ctz,
    Popcount,
    Reverse,
    IsInf,
    IsNan,
    // Trigonometric
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    // Exponential
    Exp,
    Exp2,
    Log,
    Log2,
    Pow,
    Sqrt,
    Rsqrt,
    // Rounding
    Floor,
    Ceil,
    Fract,
    Trunc,
    Round,
    Fma,
    Copysign,
    // Linear algebra
    Cross,
    Dot,
    Length,
    LengthSquared,
    Normalize,
    Faceforward,
    Determinant,
    Transpose,
    Inverse,
    // Synchronization
    SynchronizeBlock,
    // Atomics
    AtomicStore,
    AtomicLoad,
    AtomicExchange,
    AtomicCompareExchange,
    AtomicFetchAdd,
    AtomicFetchSub,
    AtomicFetchAnd,
    AtomicFetchOr,
    AtomicFetchXor,
    AtomicFetchMin,
    AtomicFetchMax,
    // Textures
    ImageRead,
    /// Writes a texel; the only intrinsic that writes its first argument.
    ImageWrite,
    TextureHeapSample2d,
    TextureHeapSample2dLevel,
    TextureHeapSample2dGrad,
    TextureHeapSize2d,
    TextureHeapSize2dLevel,
    TextureHeapRead2d,
    TextureHeapRead2dLevel,
    TextureHeapSample3d,
    TextureHeapSample3dLevel,
    TextureHeapSample3dGrad,
    TextureHeapSize3d,
    TextureHeapSize3dLevel,
    TextureHeapRead3d,
    TextureHeapRead3dLevel,
    // Constructors
    MakeBool2,
    MakeBool3,
    MakeBool4,
    MakeInt2,
    MakeInt3,
    MakeInt4,
    MakeUint2,
    MakeUint3,
    MakeUint4,
    MakeFloat2,
    MakeFloat3,
    MakeFloat4,
    MakeFloat2x2,
    MakeFloat3x3,
    MakeFloat4x4,
}

/// The target of a call expression.
#[derive(Clone, Debug)]
pub enum Callee {
    Builtin(CallOp),
    Custom(Function),
}

impl Callee {
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin(_))
    }
}

impl From<CallOp> for Callee {
    fn from(op: CallOp) -> Self {
        Self::Builtin(op)
    }
}

impl From<Function> for Callee {
    fn from(f: Function) -> Self {
        Self::Custom(f)
    }
}

impl From<&Function> for Callee {
    fn from(f: &Function) -> Self {
        Self::Custom(f.clone())
    }
}

/// A packed vector component selection, 4 bits per component.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct Swizzle {
    size: u8,
    code: u16,
}

impl Swizzle {
    /// Builds a swizzle of `size` components from a packed `code`, where
    /// component `i` occupies bits `4i..4i+4`.
    pub fn new(size: usize, code: u64) -> Result<Self, BuildError> {
        if size == 0 || size > 4 {
            return Err(BuildError::InvalidSwizzleSize(size));
        }
        let mask = (1u64 << (size * 4)) - 1;
        if code & !mask != 0 {
            return Err(BuildError::SwizzleCodeOverflow { size, code });
        }
        for i in 0..size {
            let component = ((code >> (i * 4)) & 0x0f) as usize;
            if component >= 4 {
                return Err(BuildError::SwizzleComponentOutOfRange {
                    component,
                    dimension: 4,
                });
            }
        }
        Ok(Self {
            size: size as u8,
            code: code as u16,
        })
    }

    /// Builds a swizzle from component indices, e.g. `[2, 1, 0]` for `.zyx`.
    pub fn from_components(components: &[usize]) -> Result<Self, BuildError> {
        let mut code = 0u64;
        for (i, &c) in components.iter().enumerate().take(4) {
            code |= ((c as u64) & 0x0f) << (i * 4);
            if c >= 4 {
                return Err(BuildError::SwizzleComponentOutOfRange {
                    component: c,
                    dimension: 4,
                });
            }
        }
        Self::new(components.len(), code)
    }

    pub fn size(self) -> usize {
        self.size as usize
    }

    pub fn code(self) -> u16 {
        self.code
    }

    /// Returns the source component selected at position `index`.
    pub fn component(self, index: usize) -> Result<usize, BuildError> {
        if index >= self.size() {
            return Err(BuildError::SwizzleIndexOutOfRange {
                index,
                size: self.size(),
            });
        }
        Ok(((self.code >> (index * 4)) & 0x0f) as usize)
    }

    pub fn components(self) -> impl Iterator<Item = usize> {
        (0..self.size()).map(move |i| ((self.code >> (i * 4)) & 0x0f) as usize)
    }
}

/// What a member expression selects from its base.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum MemberAccess {
    /// Struct field or vector component by index.
    Field(u32),
    Swizzle(Swizzle),
}

impl MemberAccess {
    pub fn is_swizzle(self) -> bool {
        matches!(self, Self::Swizzle(_))
    }

    pub fn field_index(self) -> Result<u32, BuildError> {
        match self {
            Self::Field(index) => Ok(index),
            Self::Swizzle(_) => Err(BuildError::FieldIndexOnSwizzle),
        }
    }

    pub fn swizzle(self) -> Result<Swizzle, BuildError> {
        match self {
            Self::Swizzle(s) => Ok(s),
            Self::Field(_) => Err(BuildError::NotASwizzle),
        }
    }
}

/// Discriminant of an [`ExpressionKind`].
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum ExpressionTag {
    Unary,
    Binary,
    Member,
    Access,
    Literal,
    Ref,
    Constant,
    Call,
    Cast,
}

/// Payload of an expression node.
#[derive(Clone, Debug)]
pub enum ExpressionKind {
    Unary {
        op: UnaryOp,
        operand: Handle<Expression>,
    },
    Binary {
        op: BinaryOp,
        lhs: Handle<Expression>,
        rhs: Handle<Expression>,
    },
    Member {
        base: Handle<Expression>,
        access: MemberAccess,
    },
    /// Dynamic index into an array, vector, matrix, or buffer.
    Access {
        range: Handle<Expression>,
        index: Handle<Expression>,
    },
    Literal(Literal),
    Ref(Variable),
    Constant(ConstantData),
    Call {
        callee: Callee,
        arguments: Vec<Handle<Expression>>,
    },
    Cast {
        op: CastOp,
        source: Handle<Expression>,
    },
}

/// An expression node. `ty` is `None` only for void calls, which are
/// always wrapped in an expression statement by the builder.
#[derive(Clone, Debug)]
pub struct Expression {
    ty: Option<Type>,
    kind: ExpressionKind,
}

impl Expression {
    pub(crate) fn new(ty: Option<Type>, kind: ExpressionKind) -> Self {
        Self { ty, kind }
    }

    pub fn ty(&self) -> Option<&Type> {
        self.ty.as_ref()
    }

    pub fn kind(&self) -> &ExpressionKind {
        &self.kind
    }

    pub fn tag(&self) -> ExpressionTag {
        match self.kind {
            ExpressionKind::Unary { .. } => ExpressionTag::Unary,
            ExpressionKind::Binary { .. } => ExpressionTag::Binary,
            ExpressionKind::Member { .. } => ExpressionTag::Member,
            ExpressionKind::Access { .. } => ExpressionTag::Access,
            ExpressionKind::Literal(_) => ExpressionTag::Literal,
            ExpressionKind::Ref(_) => ExpressionTag::Ref,
            ExpressionKind::Constant(_) => ExpressionTag::Constant,
            ExpressionKind::Call { .. } => ExpressionTag::Call,
            ExpressionKind::Cast { .. } => ExpressionTag::Cast,
        }
    }

    /// Returns the referenced variable for `Ref` nodes.
    pub fn as_variable(&self) -> Option<&Variable> {
        match &self.kind {
            ExpressionKind::Ref(v) => Some(v),
            _ => None,
        }
    }

    /// Returns `true` if the node denotes a storage location.
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::Ref(_) | ExpressionKind::Member { .. } | ExpressionKind::Access { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VectorSize;

    #[test]
    fn literal_scalars() {
        assert_eq!(Literal::F32(1.0).scalar(), Scalar::F32);
        assert_eq!(Literal::I32(-1).scalar(), Scalar::I32);
        assert_eq!(Literal::from(42u32).scalar(), Scalar::U32);
        assert_eq!(Literal::from(true).ty(), Type::bool());
    }

    #[test]
    fn swizzle_packing() {
        // .zyx
        let s = Swizzle::new(3, 0x012).unwrap();
        assert_eq!(s.size(), 3);
        assert_eq!(s.component(0).unwrap(), 2);
        assert_eq!(s.component(1).unwrap(), 1);
        assert_eq!(s.component(2).unwrap(), 0);
        assert_eq!(s, Swizzle::from_components(&[2, 1, 0]).unwrap());
        assert_eq!(s.components().collect::<Vec<_>>(), vec![2, 1, 0]);
    }

    #[test]
    fn swizzle_size_bounds() {
        assert_eq!(Swizzle::new(0, 0), Err(BuildError::InvalidSwizzleSize(0)));
        assert_eq!(Swizzle::new(5, 0), Err(BuildError::InvalidSwizzleSize(5)));
        assert!(Swizzle::new(4, 0x3210).is_ok());
    }

    #[test]
    fn swizzle_rejects_unused_code_bits() {
        assert_eq!(
            Swizzle::new(1, 0x3210),
            Err(BuildError::SwizzleCodeOverflow {
                size: 1,
                code: 0x3210,
            })
        );
        assert!(Swizzle::new(4, 0x1_3210).is_err());
        assert_eq!(Swizzle::new(1, 0x2).unwrap().code(), 0x2);
    }

    #[test]
    fn swizzle_component_bounds() {
        assert!(matches!(
            Swizzle::new(2, 0x05),
            Err(BuildError::SwizzleComponentOutOfRange { component: 5, .. })
        ));
        let s = Swizzle::new(2, 0x10).unwrap();
        assert_eq!(
            s.component(2),
            Err(BuildError::SwizzleIndexOutOfRange { index: 2, size: 2 })
        );
    }

    #[test]
    fn member_access_kinds() {
        let field = MemberAccess::Field(1);
        assert_eq!(field.field_index(), Ok(1));
        assert_eq!(field.swizzle(), Err(BuildError::NotASwizzle));

        let swizzle = MemberAccess::Swizzle(Swizzle::new(1, 0).unwrap());
        assert!(swizzle.is_swizzle());
        assert_eq!(swizzle.field_index(), Err(BuildError::FieldIndexOnSwizzle));
    }

    #[test]
    fn constant_data_shape() {
        let data = ConstantData::from(vec![1.0f32, 2.0, 3.0]);
        assert_eq!(data.len(), 3);
        assert_eq!(data.scalar(), Scalar::F32);
        assert!(!ConstantData::from(vec![1u32]).is_empty());
    }

    #[test]
    fn expression_tags() {
        let lit = Expression::new(Some(Type::f32()), ExpressionKind::Literal(Literal::F32(0.5)));
        assert_eq!(lit.tag(), ExpressionTag::Literal);
        assert!(!lit.is_lvalue());
        assert!(lit.as_variable().is_none());

        let ty = Type::vector(VectorSize::Bi, Scalar::F32);
        let member = Expression::new(
            Some(ty),
            ExpressionKind::Member {
                base: Handle::new(0, 0),
                access: MemberAccess::Field(0),
            },
        );
        assert_eq!(member.tag(), ExpressionTag::Member);
        assert!(member.is_lvalue());
    }
}

//! Type descriptors used to shape-check nodes at construction.

use std::fmt;
use std::sync::Arc;

/// Width of a scalar type in bytes.
pub type Bytes = u8;

/// The kind of a scalar type.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum ScalarKind {
    Bool,
    Sint,
    Uint,
    Float,
}

/// A scalar type: kind + byte width.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Scalar {
    pub kind: ScalarKind,
    pub width: Bytes,
}

impl Scalar {
    pub const BOOL: Self = Self {
        kind: ScalarKind::Bool,
        width: 1,
    };
    pub const I32: Self = Self {
        kind: ScalarKind::Sint,
        width: 4,
    };
    pub const U32: Self = Self {
        kind: ScalarKind::Uint,
        width: 4,
    };
    pub const F32: Self = Self {
        kind: ScalarKind::Float,
        width: 4,
    };

    /// Returns `true` for signed and unsigned integers.
    pub fn is_integer(self) -> bool {
        matches!(self.kind, ScalarKind::Sint | ScalarKind::Uint)
    }
}

/// Number of components in a vector, or columns/rows of a matrix.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum VectorSize {
    Bi = 2,
    Tri = 3,
    Quad = 4,
}

impl VectorSize {
    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            2 => Some(Self::Bi),
            3 => Some(Self::Tri),
            4 => Some(Self::Quad),
            _ => None,
        }
    }

    pub fn count(self) -> usize {
        self as usize
    }
}

/// Dimensionality of a texture resource.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum TextureDim {
    D2,
    D3,
}

/// The concrete shape of a type.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum TypeInner {
    Scalar(Scalar),
    Vector {
        size: VectorSize,
        scalar: Scalar,
    },
    /// Column-major matrix of floats.
    Matrix {
        columns: VectorSize,
        rows: VectorSize,
        scalar: Scalar,
    },
    /// Fixed-length array.
    Array { base: Type, length: u32 },
    Struct { members: Vec<Type>, alignment: u32 },
    /// A device buffer of `element`.
    Buffer { element: Type },
    Texture { dim: TextureDim, scalar: Scalar },
    /// A bindless heap of sampled textures.
    TextureHeap,
}

/// A shared, immutable type descriptor compared by value.
///
/// Cloning is a reference-count bump, so nodes and variables carry their
/// `Type` directly instead of indexing into a per-function type table.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct Type(Arc<TypeInner>);

impl Type {
    pub fn from_inner(inner: TypeInner) -> Self {
        Self(Arc::new(inner))
    }

    pub fn scalar(scalar: Scalar) -> Self {
        Self::from_inner(TypeInner::Scalar(scalar))
    }

    pub fn bool() -> Self {
        Self::scalar(Scalar::BOOL)
    }

    pub fn i32() -> Self {
        Self::scalar(Scalar::I32)
    }

    pub fn u32() -> Self {
        Self::scalar(Scalar::U32)
    }

    pub fn f32() -> Self {
        Self::scalar(Scalar::F32)
    }

    pub fn vector(size: VectorSize, scalar: Scalar) -> Self {
        Self::from_inner(TypeInner::Vector { size, scalar })
    }

    /// `vec3<u32>`, the type of every dispatch builtin.
    pub fn uint3() -> Self {
        Self::vector(VectorSize::Tri, Scalar::U32)
    }

    pub fn matrix(columns: VectorSize, rows: VectorSize) -> Self {
        Self::from_inner(TypeInner::Matrix {
            columns,
            rows,
            scalar: Scalar::F32,
        })
    }

    pub fn array(base: Type, length: u32) -> Self {
        Self::from_inner(TypeInner::Array { base, length })
    }

    pub fn structure(members: Vec<Type>, alignment: u32) -> Self {
        Self::from_inner(TypeInner::Struct { members, alignment })
    }

    pub fn buffer(element: Type) -> Self {
        Self::from_inner(TypeInner::Buffer { element })
    }

    pub fn texture(dim: TextureDim, scalar: Scalar) -> Self {
        Self::from_inner(TypeInner::Texture { dim, scalar })
    }

    pub fn texture_heap() -> Self {
        Self::from_inner(TypeInner::TextureHeap)
    }

    pub fn inner(&self) -> &TypeInner {
        &self.0
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.inner(), TypeInner::Scalar(_))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self.inner(), TypeInner::Vector { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self.inner(), TypeInner::Array { .. })
    }

    pub fn is_buffer(&self) -> bool {
        matches!(self.inner(), TypeInner::Buffer { .. })
    }

    pub fn is_texture(&self) -> bool {
        matches!(self.inner(), TypeInner::Texture { .. })
    }

    /// Returns `true` for integer scalars, the only valid index type.
    pub fn is_index(&self) -> bool {
        matches!(self.inner(), TypeInner::Scalar(s) if s.is_integer())
    }

    /// Number of addressable members: vector components, matrix columns,
    /// array elements or struct fields. `None` for scalars and resources.
    pub fn dimension(&self) -> Option<usize> {
        match self.inner() {
            TypeInner::Vector { size, .. } => Some(size.count()),
            TypeInner::Matrix { columns, .. } => Some(columns.count()),
            TypeInner::Array { length, .. } => Some(*length as usize),
            TypeInner::Struct { members, .. } => Some(members.len()),
            _ => None,
        }
    }

    /// Element type produced by indexing into this type, if indexable.
    pub fn element(&self) -> Option<Type> {
        match self.inner() {
            TypeInner::Vector { scalar, .. } => Some(Type::scalar(*scalar)),
            TypeInner::Matrix { rows, scalar, .. } => Some(Type::vector(*rows, *scalar)),
            TypeInner::Array { base, .. } => Some(base.clone()),
            TypeInner::Buffer { element } => Some(element.clone()),
            _ => None,
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_constants() {
        assert_eq!(Scalar::F32.kind, ScalarKind::Float);
        assert_eq!(Scalar::F32.width, 4);
        assert_eq!(Scalar::U32.kind, ScalarKind::Uint);
        assert_eq!(Scalar::BOOL.width, 1);
        assert!(Scalar::I32.is_integer());
        assert!(!Scalar::F32.is_integer());
    }

    #[test]
    fn types_compare_by_value() {
        let a = Type::array(Type::f32(), 16);
        let b = Type::array(Type::f32(), 16);
        assert_eq!(a, b);
        assert_ne!(a, Type::array(Type::f32(), 8));
        assert_ne!(Type::f32(), Type::i32());
    }

    #[test]
    fn element_types() {
        assert_eq!(Type::uint3().element(), Some(Type::u32()));
        assert_eq!(
            Type::matrix(VectorSize::Quad, VectorSize::Tri).element(),
            Some(Type::vector(VectorSize::Tri, Scalar::F32))
        );
        assert_eq!(Type::buffer(Type::f32()).element(), Some(Type::f32()));
        assert_eq!(Type::f32().element(), None);
        assert_eq!(Type::texture_heap().element(), None);
    }

    #[test]
    fn dimensions() {
        assert_eq!(Type::uint3().dimension(), Some(3));
        assert_eq!(Type::array(Type::i32(), 5).dimension(), Some(5));
        assert_eq!(
            Type::structure(vec![Type::f32(), Type::u32()], 4).dimension(),
            Some(2)
        );
        assert_eq!(Type::buffer(Type::f32()).dimension(), None);
    }

    #[test]
    fn vector_size_values() {
        assert_eq!(VectorSize::Bi as u32, 2);
        assert_eq!(VectorSize::from_len(3), Some(VectorSize::Tri));
        assert_eq!(VectorSize::from_len(5), None);
        assert_eq!(VectorSize::Quad.count(), 4);
    }

    #[test]
    fn index_types() {
        assert!(Type::u32().is_index());
        assert!(Type::i32().is_index());
        assert!(!Type::f32().is_index());
        assert!(!Type::uint3().is_index());
    }
}

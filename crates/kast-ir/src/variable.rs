//! Variables, usage flags, and implicit resource captures.

use crate::expr::ConstantData;
use crate::types::Type;

/// Read/write flags accumulated for a variable or expression.
///
/// Usage only ever grows: every update is a bitwise OR.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
pub struct Usage(u8);

impl Usage {
    pub const NONE: Self = Self(0);
    pub const READ: Self = Self(1);
    pub const WRITE: Self = Self(2);
    pub const READ_WRITE: Self = Self(3);

    /// Returns `true` if `self` contains all flags in `other`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn is_read(self) -> bool {
        self.contains(Self::READ)
    }

    pub fn is_written(self) -> bool {
        self.contains(Self::WRITE)
    }
}

impl std::ops::BitOr for Usage {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Usage {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// The storage class of a variable.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum VariableTag {
    Local,
    /// Block-shared memory, kernel only.
    Shared,
    /// Kernel parameter passed by value.
    Uniform,
    Buffer,
    Texture,
    TextureHeap,
    ThreadId,
    BlockId,
    DispatchId,
    DispatchSize,
}

impl VariableTag {
    /// Returns `true` for the dispatch-indexing builtins.
    pub fn is_builtin(self) -> bool {
        matches!(
            self,
            Self::ThreadId | Self::BlockId | Self::DispatchId | Self::DispatchSize
        )
    }

    /// Returns `true` for tags whose usage is forwarded through custom calls.
    pub fn is_resource(self) -> bool {
        matches!(self, Self::Buffer | Self::Texture)
    }
}

/// A storage location owned by exactly one function.
///
/// `uid` indexes that function's variable usage table.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Variable {
    ty: Type,
    tag: VariableTag,
    uid: u32,
}

impl Variable {
    pub(crate) fn new(ty: Type, tag: VariableTag, uid: u32) -> Self {
        Self { ty, tag, uid }
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn tag(&self) -> VariableTag {
        self.tag
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }
}

/// Opaque runtime identifier of a buffer, texture, or heap.
pub type ResourceHandle = u64;

/// A buffer captured implicitly from host code.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct BufferBinding {
    pub variable: Variable,
    pub handle: ResourceHandle,
    pub offset_bytes: usize,
}

/// A texture captured implicitly from host code.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct TextureBinding {
    pub variable: Variable,
    pub handle: ResourceHandle,
}

/// A texture heap captured implicitly from host code.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct TextureHeapBinding {
    pub variable: Variable,
    pub handle: ResourceHandle,
}

/// Constant array data embedded in a function.
#[derive(Clone, Debug, Hash, PartialEq)]
pub struct ConstantBinding {
    pub ty: Type,
    pub data: ConstantData,
}

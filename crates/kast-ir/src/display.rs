//! Display implementations and text dump for debugging.

use std::fmt;

use crate::arena::Handle;
use crate::expr::{
    BinaryOp, CallOp, Callee, CastOp, ConstantData, Expression, ExpressionKind, Literal,
    MemberAccess, Swizzle, UnaryOp,
};
use crate::func::{Function, FunctionTag};
use crate::stmt::{AssignOp, Scope, Statement};
use crate::types::{Scalar, ScalarKind, TextureDim, Type, TypeInner, VectorSize};
use crate::variable::{Usage, Variable, VariableTag};

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ScalarKind::Bool => write!(f, "bool"),
            ScalarKind::Sint => write!(f, "i{}", self.width * 8),
            ScalarKind::Uint => write!(f, "u{}", self.width * 8),
            ScalarKind::Float => write!(f, "f{}", self.width * 8),
        }
    }
}

impl fmt::Display for VectorSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u32)
    }
}

impl fmt::Display for TextureDim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::D2 => write!(f, "2d"),
            Self::D3 => write!(f, "3d"),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner() {
            TypeInner::Scalar(s) => write!(f, "{s}"),
            TypeInner::Vector { size, scalar } => write!(f, "vec{size}<{scalar}>"),
            TypeInner::Matrix {
                columns,
                rows,
                scalar,
            } => write!(f, "mat{columns}x{rows}<{scalar}>"),
            TypeInner::Array { base, length } => write!(f, "array<{base}, {length}>"),
            TypeInner::Struct { members, alignment } => {
                write!(f, "struct@{alignment}<")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{m}")?;
                }
                write!(f, ">")
            }
            TypeInner::Buffer { element } => write!(f, "buffer<{element}>"),
            TypeInner::Texture { dim, scalar } => write!(f, "texture{dim}<{scalar}>"),
            TypeInner::TextureHeap => write!(f, "texture_heap"),
        }
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_read(), self.is_written()) {
            (true, true) => write!(f, "read_write"),
            (true, false) => write!(f, "read"),
            (false, true) => write!(f, "write"),
            (false, false) => write!(f, "none"),
        }
    }
}

impl fmt::Display for VariableTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Local => "local",
            Self::Shared => "shared",
            Self::Uniform => "uniform",
            Self::Buffer => "buffer",
            Self::Texture => "texture",
            Self::TextureHeap => "texture_heap",
            Self::ThreadId => "thread_id",
            Self::BlockId => "block_id",
            Self::DispatchId => "dispatch_id",
            Self::DispatchSize => "dispatch_size",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.uid())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}i"),
            Self::U32(v) => write!(f, "{v}u"),
            Self::F32(v) => write!(f, "{v}f"),
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plus => write!(f, "+"),
            Self::Negate => write!(f, "-"),
            Self::LogicalNot => write!(f, "!"),
            Self::BitwiseNot => write!(f, "~"),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "+"),
            Self::Subtract => write!(f, "-"),
            Self::Multiply => write!(f, "*"),
            Self::Divide => write!(f, "/"),
            Self::Modulo => write!(f, "%"),
            Self::Equal => write!(f, "=="),
            Self::NotEqual => write!(f, "!="),
            Self::Less => write!(f, "<"),
            Self::LessEqual => write!(f, "<="),
            Self::Greater => write!(f, ">"),
            Self::GreaterEqual => write!(f, ">="),
            Self::LogicalAnd => write!(f, "&&"),
            Self::LogicalOr => write!(f, "||"),
            Self::BitwiseAnd => write!(f, "&"),
            Self::BitwiseOr => write!(f, "|"),
            Self::BitwiseXor => write!(f, "^"),
            Self::ShiftLeft => write!(f, "<<"),
            Self::ShiftRight => write!(f, ">>"),
        }
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assign => write!(f, "="),
            Self::AddAssign => write!(f, "+="),
            Self::SubAssign => write!(f, "-="),
            Self::MulAssign => write!(f, "*="),
            Self::DivAssign => write!(f, "/="),
            Self::ModAssign => write!(f, "%="),
            Self::BitAndAssign => write!(f, "&="),
            Self::BitOrAssign => write!(f, "|="),
            Self::BitXorAssign => write!(f, "^="),
            Self::ShlAssign => write!(f, "<<="),
            Self::ShrAssign => write!(f, ">>="),
        }
    }
}

impl fmt::Display for CastOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "cast"),
            Self::Bitwise => write!(f, "bitcast"),
        }
    }
}

impl fmt::Display for CallOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::All => "all",
            Self::Any => "any",
            Self::Select => "select",
            Self::Abs => "abs",
            Self::Min => "min",
            Self::Max => "max",
            Self::Clamp => "clamp",
            Self::Lerp => "lerp",
            Self::Step => "step",
            Self::SmoothStep => "smooth_step",
            Self::Saturate => "saturate",
            Self::Clz => "clz",
            Self::Ctz => "ctz",
            Self::Popcount => "popcount",
            Self::Reverse => "reverse",
            Self::IsInf => "is_inf",
            Self::IsNan => "is_nan",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Atan2 => "atan2",
            Self::Exp => "exp",
            Self::Exp2 => "exp2",
            Self::Log => "log",
            Self::Log2 => "log2",
            Self::Pow => "pow",
            Self::Sqrt => "sqrt",
            Self::Rsqrt => "rsqrt",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Fract => "fract",
            Self::Trunc => "trunc",
            Self::Round => "round",
            Self::Fma => "fma",
            Self::Copysign => "copysign",
            Self::Cross => "cross",
            Self::Dot => "dot",
            Self::Length => "length",
            Self::LengthSquared => "length_squared",
            Self::Normalize => "normalize",
            Self::Faceforward => "faceforward",
            Self::Determinant => "determinant",
            Self::Transpose => "transpose",
            Self::Inverse => "inverse",
            Self::SynchronizeBlock => "synchronize_block",
            Self::AtomicStore => "atomic_store",
            Self::AtomicLoad => "atomic_load",
            Self::AtomicExchange => "atomic_exchange",
            Self::AtomicCompareExchange => "atomic_compare_exchange",
            Self::AtomicFetchAdd => "atomic_fetch_add",
            Self::AtomicFetchSub => "atomic_fetch_sub",
            Self::AtomicFetchAnd => "atomic_fetch_and",
            Self::AtomicFetchOr => "atomic_fetch_or",
            Self::AtomicFetchXor => "atomic_fetch_xor",
            Self::AtomicFetchMin => "atomic_fetch_min",
            Self::AtomicFetchMax => "atomic_fetch_max",
            Self::ImageRead => "image_read",
            Self::ImageWrite => "image_write",
            Self::TextureHeapSample2d => "texture_heap_sample2d",
            Self::TextureHeapSample2dLevel => "texture_heap_sample2d_level",
            Self::TextureHeapSample2dGrad => "texture_heap_sample2d_grad",
            Self::TextureHeapSize2d => "texture_heap_size2d",
            Self::TextureHeapSize2dLevel => "texture_heap_size2d_level",
            Self::TextureHeapRead2d => "texture_heap_read2d",
            Self::TextureHeapRead2dLevel => "texture_heap_read2d_level",
            Self::TextureHeapSample3d => "texture_heap_sample3d",
            Self::TextureHeapSample3dLevel => "texture_heap_sample3d_level",
            Self::TextureHeapSample3dGrad => "texture_heap_sample3d_grad",
            Self::TextureHeapSize3d => "texture_heap_size3d",
            Self::TextureHeapSize3dLevel => "texture_heap_size3d_level",
            Self::TextureHeapRead3d => "texture_heap_read3d",
            Self::TextureHeapRead3dLevel => "texture_heap_read3d_level",
            Self::MakeBool2 => "make_bool2",
            Self::MakeBool3 => "make_bool3",
            Self::MakeBool4 => "make_bool4",
            Self::MakeInt2 => "make_int2",
            Self::MakeInt3 => "make_int3",
            Self::MakeInt4 => "make_int4",
            Self::MakeUint2 => "make_uint2",
            Self::MakeUint3 => "make_uint3",
            Self::MakeUint4 => "make_uint4",
            Self::MakeFloat2 => "make_float2",
            Self::MakeFloat3 => "make_float3",
            Self::MakeFloat4 => "make_float4",
            Self::MakeFloat2x2 => "make_float2x2",
            Self::MakeFloat3x3 => "make_float3x3",
            Self::MakeFloat4x4 => "make_float4x4",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for Swizzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.components() {
            let name = match c {
                0 => 'x',
                1 => 'y',
                2 => 'z',
                _ => 'w',
            };
            write!(f, "{name}")?;
        }
        Ok(())
    }
}

impl fmt::Display for FunctionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kernel => write!(f, "kernel"),
            Self::Callable => write!(f, "callable"),
        }
    }
}

fn format_constant(data: &ConstantData) -> String {
    fn join<T: fmt::Display>(items: &[T]) -> String {
        let items: Vec<_> = items.iter().map(|x| x.to_string()).collect();
        items.join(", ")
    }
    match data {
        ConstantData::Bool(v) => format!("[{}]", join(v)),
        ConstantData::I32(v) => format!("[{}]", join(v)),
        ConstantData::U32(v) => format!("[{}]", join(v)),
        ConstantData::F32(v) => format!("[{}]", join(v)),
    }
}

fn format_expr(kind: &ExpressionKind) -> String {
    let args = |handles: &[Handle<Expression>]| {
        let items: Vec<_> = handles.iter().map(|h| format!("{h:?}")).collect();
        items.join(", ")
    };
    match kind {
        ExpressionKind::Unary { op, operand } => format!("{op}{operand:?}"),
        ExpressionKind::Binary { op, lhs, rhs } => format!("{lhs:?} {op} {rhs:?}"),
        ExpressionKind::Member {
            base,
            access: MemberAccess::Field(i),
        } => format!("{base:?}.{i}"),
        ExpressionKind::Member {
            base,
            access: MemberAccess::Swizzle(s),
        } => format!("{base:?}.{s}"),
        ExpressionKind::Access { range, index } => format!("{range:?}[{index:?}]"),
        ExpressionKind::Literal(lit) => format!("{lit}"),
        ExpressionKind::Ref(v) => format!("{v}"),
        ExpressionKind::Constant(data) => format!("Constant({})", format_constant(data)),
        ExpressionKind::Call {
            callee: Callee::Builtin(op),
            arguments,
        } => format!("{op}({})", args(arguments)),
        ExpressionKind::Call {
            callee: Callee::Custom(f),
            arguments,
        } => format!(
            "Call {}({})",
            f.name().unwrap_or("_"),
            args(arguments)
        ),
        ExpressionKind::Cast { op, source } => format!("{op}({source:?})"),
    }
}

fn write_scope(out: &mut String, func: &Function, scope: Handle<Scope>, indent: usize) {
    for stmt in func.scopes()[scope].statements() {
        write_stmt(out, func, stmt, indent);
    }
}

fn write_block(out: &mut String, func: &Function, header: &str, scope: Handle<Scope>, indent: usize) {
    let pad = " ".repeat(indent);
    out.push_str(&format!("{pad}{header} {{\n"));
    write_scope(out, func, scope, indent + 4);
    out.push_str(&format!("{pad}}}\n"));
}

fn write_stmt(out: &mut String, func: &Function, stmt: &Statement, indent: usize) {
    let pad = " ".repeat(indent);
    match stmt {
        Statement::Break => out.push_str(&format!("{pad}Break\n")),
        Statement::Continue => out.push_str(&format!("{pad}Continue\n")),
        Statement::Return { value } => match value {
            Some(v) => out.push_str(&format!("{pad}Return {v:?}\n")),
            None => out.push_str(&format!("{pad}Return\n")),
        },
        Statement::If {
            condition,
            accept,
            reject,
        } => {
            out.push_str(&format!("{pad}If ({condition:?}) {{\n"));
            write_scope(out, func, *accept, indent + 4);
            if let Some(reject) = reject {
                out.push_str(&format!("{pad}}} else {{\n"));
                write_scope(out, func, *reject, indent + 4);
            }
            out.push_str(&format!("{pad}}}\n"));
        }
        Statement::While { condition, body } => {
            write_block(out, func, &format!("While ({condition:?})"), *body, indent);
        }
        Statement::For {
            init,
            condition,
            update,
            body,
        } => {
            out.push_str(&format!("{pad}For {{\n"));
            write_block(out, func, "Init", *init, indent + 2);
            out.push_str(&format!("{pad}  Condition ({condition:?})\n"));
            write_block(out, func, "Update", *update, indent + 2);
            write_block(out, func, "Body", *body, indent + 2);
            out.push_str(&format!("{pad}}}\n"));
        }
        Statement::Switch { selector, body } => {
            write_block(out, func, &format!("Switch ({selector:?})"), *body, indent);
        }
        Statement::Case { value, body } => {
            write_block(out, func, &format!("Case ({value:?})"), *body, indent);
        }
        Statement::Default { body } => write_block(out, func, "Default", *body, indent),
        Statement::Assign { op, lhs, rhs } => {
            out.push_str(&format!("{pad}{lhs:?} {op} {rhs:?}\n"));
        }
        Statement::Declare {
            variable,
            initializers,
        } => {
            let init = if initializers.is_empty() {
                String::new()
            } else {
                let items: Vec<_> = initializers.iter().map(|h| format!("{h:?}")).collect();
                format!(" = {{{}}}", items.join(", "))
            };
            out.push_str(&format!("{pad}var {variable}: {}{init}\n", variable.ty()));
        }
        Statement::Expr(expr) => out.push_str(&format!("{pad}Expr {expr:?}\n")),
    }
}

/// Produces a human-readable text dump of a finished [`Function`].
///
/// The output is stable for a given recording sequence, so it can be used
/// for golden comparisons.
pub fn dump_function(func: &Function) -> String {
    let mut out = String::new();
    let name = func.name().unwrap_or("_");

    // Signature
    let args: Vec<_> = func
        .arguments()
        .iter()
        .map(|arg| {
            format!(
                "{arg}: {} [{}, {}]",
                arg.ty(),
                arg.tag(),
                func.variable_usage(arg.uid())
            )
        })
        .collect();
    let ret = match func.return_type() {
        Some(ty) => format!(" -> {ty}"),
        None => String::new(),
    };
    out.push_str(&format!(
        "{} {name}({}){ret} {{\n",
        func.tag(),
        args.join(", ")
    ));

    if func.raytracing() {
        out.push_str("    requires raytracing\n");
    }

    // Kernel state
    for v in func.builtin_variables() {
        out.push_str(&format!("    builtin {v}: {} [{}]\n", v.tag(), v.ty()));
    }
    for v in func.shared_variables() {
        out.push_str(&format!(
            "    shared {v}: {} [{}]\n",
            v.ty(),
            func.variable_usage(v.uid())
        ));
    }

    // Captures
    for b in func.captured_buffers() {
        out.push_str(&format!(
            "    capture buffer {:#x}+{} -> {}: {} [{}]\n",
            b.handle,
            b.offset_bytes,
            b.variable,
            b.variable.ty(),
            func.variable_usage(b.variable.uid())
        ));
    }
    for t in func.captured_textures() {
        out.push_str(&format!(
            "    capture texture {:#x} -> {}: {} [{}]\n",
            t.handle,
            t.variable,
            t.variable.ty(),
            func.variable_usage(t.variable.uid())
        ));
    }
    for h in func.captured_texture_heaps() {
        out.push_str(&format!(
            "    capture texture_heap {:#x} -> {}\n",
            h.handle, h.variable
        ));
    }
    for c in func.captured_constants() {
        out.push_str(&format!(
            "    constant {}: {}\n",
            c.ty,
            format_constant(&c.data)
        ));
    }

    // Expressions
    if !func.expressions().is_empty() {
        out.push_str("    Expressions:\n");
        for (handle, expr) in func.expressions().iter() {
            let ty = match expr.ty() {
                Some(ty) => ty.to_string(),
                None => "void".into(),
            };
            out.push_str(&format!(
                "      {handle:?} {}: {ty} [{}]\n",
                format_expr(expr.kind()),
                func.expression_usage(handle)
            ));
        }
    }

    // Body
    if !func.body_scope().is_empty() {
        out.push_str("    Body:\n");
        write_scope(&mut out, func, func.body(), 6);
    }

    out.push_str("}\n");
    out
}

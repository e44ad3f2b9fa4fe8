//! Demo kernels recorded through the public builder API.

use kast_ir::{
    AssignOp, BinaryOp, BuildError, BuilderStack, CallOp, Function, ResourceHandle, Scalar,
    TextureDim, Type, VectorSize,
};

const X_BUFFER: ResourceHandle = 0x1000;
const Y_BUFFER: ResourceHandle = 0x2000;
const INPUT_IMAGE: ResourceHandle = 0x3000;
const OUTPUT_IMAGE: ResourceHandle = 0x3001;
const REDUCE_INPUT: ResourceHandle = 0x4000;
const REDUCE_OUTPUT: ResourceHandle = 0x4001;

/// Work-group width of the reduction kernel.
const BLOCK_SIZE: u32 = 256;

/// `y[i] = a * x[i] + y[i]`
///
/// With `leak` set, a `sqrt` call whose result is never used is recorded as
/// well, so finalization fails.
pub fn saxpy(stack: &mut BuilderStack, leak: bool) -> Result<Function, BuildError> {
    stack.define_kernel("saxpy", |s| {
        let b = s.current()?;
        let a = b.argument(Type::f32());
        let x = b.buffer_binding(Type::f32(), X_BUFFER, 0)?;
        let y = b.buffer_binding(Type::f32(), Y_BUFFER, 0)?;
        let id = b.dispatch_id();
        let i = b.member(Type::u32(), id, 0)?;

        let xi = b.access(Type::f32(), x, i)?;
        let ax = b.binary(Type::f32(), BinaryOp::Multiply, a, xi)?;
        let yi = b.access(Type::f32(), y, i)?;
        let sum = b.binary(Type::f32(), BinaryOp::Add, ax, yi)?;
        let dst = b.access(Type::f32(), y, i)?;
        b.assign(AssignOp::Assign, dst, sum)?;

        if leak {
            b.call(Type::f32(), CallOp::Sqrt, &[sum])?;
        }
        Ok(())
    })
}

/// Two-tap horizontal box filter between two captured images, averaging
/// through a device callable.
pub fn image_blur(stack: &mut BuilderStack) -> Result<Function, BuildError> {
    let float4 = Type::vector(VectorSize::Quad, Scalar::F32);
    let uint2 = Type::vector(VectorSize::Bi, Scalar::U32);
    let rgba = Type::texture(TextureDim::D2, Scalar::F32);

    stack.define_kernel("image_blur", |s| {
        let average = s.define_callable("average", |s| {
            let b = s.current()?;
            let lhs = b.argument(float4.clone());
            let rhs = b.argument(float4.clone());
            let sum = b.binary(float4.clone(), BinaryOp::Add, lhs, rhs)?;
            let half = b.literal(0.5f32);
            let avg = b.binary(float4.clone(), BinaryOp::Multiply, sum, half)?;
            b.return_(Some(avg))
        })?;

        let b = s.current()?;
        let input = b.texture_binding(rgba.clone(), INPUT_IMAGE)?;
        let output = b.texture_binding(rgba.clone(), OUTPUT_IMAGE)?;
        let id = b.dispatch_id();
        // .xy
        let coord = b.swizzle(uint2.clone(), id, 2, 0x10)?;
        let cx = b.member(Type::u32(), coord, 0)?;
        let cy = b.member(Type::u32(), coord, 1)?;
        let one = b.literal(1u32);
        let next_x = b.binary(Type::u32(), BinaryOp::Add, cx, one)?;
        let next = b.call(uint2.clone(), CallOp::MakeUint2, &[next_x, cy])?;

        let p0 = b.call(float4.clone(), CallOp::ImageRead, &[input, coord])?;
        let p1 = b.call(float4.clone(), CallOp::ImageRead, &[input, next])?;
        let avg = b.call(float4.clone(), &average, &[p0, p1])?;
        b.call_void(CallOp::ImageWrite, &[output, coord, avg])
    })
}

/// Block-wise tree reduction through shared memory. Lane 0 of every block
/// writes the block's partial sum.
pub fn reduce(stack: &mut BuilderStack) -> Result<Function, BuildError> {
    stack.define_kernel("reduce", |s| {
        let b = s.current()?;
        let input = b.buffer_binding(Type::f32(), REDUCE_INPUT, 0)?;
        let output = b.buffer_binding(Type::f32(), REDUCE_OUTPUT, 0)?;
        let tile = b.shared(Type::array(Type::f32(), BLOCK_SIZE));

        let tid = b.thread_id();
        let lane = b.member(Type::u32(), tid, 0)?;
        let gid = b.dispatch_id();
        let global = b.member(Type::u32(), gid, 0)?;

        let value = b.access(Type::f32(), input, global)?;
        let slot = b.access(Type::f32(), tile, lane)?;
        b.assign(AssignOp::Assign, slot, value)?;
        b.call_void(CallOp::SynchronizeBlock, &[])?;

        // for (stride = BLOCK_SIZE / 2; stride > 0; stride >>= 1)
        let init = b.new_scope();
        b.push_scope(init)?;
        let half = b.literal(BLOCK_SIZE / 2);
        let stride = b.local(Type::u32(), &[half])?;
        b.pop_scope(init)?;

        let zero = b.literal(0u32);
        let more = b.binary(Type::bool(), BinaryOp::Greater, stride, zero)?;

        let update = b.new_scope();
        b.push_scope(update)?;
        let one = b.literal(1u32);
        b.assign(AssignOp::ShrAssign, stride, one)?;
        b.pop_scope(update)?;

        let body = b.new_scope();
        b.push_scope(body)?;
        let active = b.binary(Type::bool(), BinaryOp::Less, lane, stride)?;
        let accumulate = b.new_scope();
        b.if_(active, accumulate, None)?;
        b.push_scope(accumulate)?;
        let dst = b.access(Type::f32(), tile, lane)?;
        let partner = b.binary(Type::u32(), BinaryOp::Add, lane, stride)?;
        let src = b.access(Type::f32(), tile, partner)?;
        b.assign(AssignOp::AddAssign, dst, src)?;
        b.pop_scope(accumulate)?;
        b.call_void(CallOp::SynchronizeBlock, &[])?;
        b.pop_scope(body)?;

        b.for_(init, more, update, body)?;

        let first_lane = b.binary(Type::bool(), BinaryOp::Equal, lane, zero)?;
        let store = b.new_scope();
        b.if_(first_lane, store, None)?;
        b.push_scope(store)?;
        let block = b.block_id();
        let block_x = b.member(Type::u32(), block, 0)?;
        let out = b.access(Type::f32(), output, block_x)?;
        let total = b.access(Type::f32(), tile, zero)?;
        b.assign(AssignOp::Assign, out, total)?;
        b.pop_scope(store)?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kast_ir::Usage;

    #[test]
    fn saxpy_access_modes() {
        let mut stack = BuilderStack::new();
        let f = saxpy(&mut stack, false).unwrap();
        let [x, y] = f.captured_buffers() else {
            panic!("expected two captured buffers");
        };
        assert_eq!(f.variable_usage(x.variable.uid()), Usage::READ);
        assert_eq!(f.variable_usage(y.variable.uid()), Usage::READ_WRITE);
    }

    #[test]
    fn saxpy_leak_fails() {
        let mut stack = BuilderStack::new();
        assert!(matches!(
            saxpy(&mut stack, true),
            Err(BuildError::LeakedCall { .. })
        ));
        assert!(stack.is_empty());
    }

    #[test]
    fn image_blur_uses_callable() {
        let mut stack = BuilderStack::new();
        let f = image_blur(&mut stack).unwrap();
        assert_eq!(f.used_callables().len(), 1);
        let usages: Vec<_> = f.texture_usages().map(|(t, u)| (t.handle, u)).collect();
        assert_eq!(
            usages,
            vec![(INPUT_IMAGE, Usage::READ), (OUTPUT_IMAGE, Usage::WRITE)]
        );
    }

    #[test]
    fn reduce_builds() {
        let mut stack = BuilderStack::new();
        let f = reduce(&mut stack).unwrap();
        assert_eq!(f.shared_variables().len(), 1);
        assert_eq!(f.builtin_variables().len(), 3);
        assert_eq!(f.used_builtin_ops(), &[CallOp::SynchronizeBlock]);
    }
}

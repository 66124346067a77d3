//! Validated kernel entry points
//!
//! Every precondition the kernels rely on is checked here, once per launch:
//! rank and shape agreement between layouts, broadcast compatibility, buffer
//! lengths against the span a layout can actually reach, and pooling
//! descriptor consistency. After validation the kernels run unchecked — no
//! per-element bounds tests, exactly like a device launch.
//!
//! What is *not* checked: that an output layout maps distinct flat indices
//! to distinct storage offsets. An aliased output (e.g. a broadcast layout
//! passed as `out_layout`) makes the result depend on task ordering; that
//! remains the caller's contract, as it is for the device kernels these
//! mirror.

use crate::dtype::{AtomicAccum, Element};
use crate::error::{Error, Result};
use crate::kernels;
use crate::kernels::pool2d::{Pool2dKind, Pool2dOp};
use crate::layout::{broadcast_shapes, Layout};
use crate::ops::{BinaryScalarOp, UnaryScalarOp};

/// Check that a layout's shape and stride sequences agree in length.
fn check_rank(layout: &Layout) -> Result<()> {
    if layout.shape().len() != layout.strides().len() {
        return Err(Error::RankMismatch {
            shape: layout.shape().len(),
            strides: layout.strides().len(),
        });
    }
    Ok(())
}

/// Check that a buffer covers every storage offset its layout can reach.
fn check_buffer(name: &'static str, len: usize, layout: &Layout) -> Result<()> {
    let (min, needed) = layout.span();
    if min < 0 {
        return Err(Error::InvalidArgument {
            arg: name,
            reason: format!("layout reaches negative storage offset {min}"),
        });
    }
    if len < needed {
        return Err(Error::BufferTooSmall { name, needed, got: len });
    }
    Ok(())
}

/// Element-wise unary forward.
///
/// Computes `out[resolve(i, out_layout)] = op.f(inp[resolve(i, inp_layout)])`
/// for every flat index of the shared logical shape.
pub fn unary_forward<T, Op>(
    op: &Op,
    inp: &[T],
    inp_layout: &Layout,
    out: &mut [T],
    out_layout: &Layout,
) -> Result<()>
where
    T: Element,
    Op: UnaryScalarOp<T>,
{
    check_rank(inp_layout)?;
    check_rank(out_layout)?;
    if inp_layout.shape() != out_layout.shape() {
        return Err(Error::shape_mismatch(out_layout.shape(), inp_layout.shape()));
    }
    check_buffer("inp", inp.len(), inp_layout)?;
    check_buffer("out", out.len(), out_layout)?;

    unsafe {
        kernels::unary_forward_kernel(op, inp.as_ptr(), inp_layout, out.as_mut_ptr(), out_layout);
    }
    Ok(())
}

/// Element-wise unary backward.
///
/// Accumulates `op.df(inp) * grad_out` into `grad_inp`, which is co-indexed
/// with the input's storage and is never reset — callers zero it (or chain
/// onto prior gradients) themselves. `grad_out` is dense over the logical
/// iteration space.
pub fn unary_backward<T, Op>(
    op: &Op,
    inp: &[T],
    inp_layout: &Layout,
    grad_inp: &mut [T],
    grad_out: &[T],
) -> Result<()>
where
    T: AtomicAccum,
    Op: UnaryScalarOp<T>,
{
    check_rank(inp_layout)?;
    check_buffer("inp", inp.len(), inp_layout)?;
    check_buffer("grad_inp", grad_inp.len(), inp_layout)?;
    let numel = inp_layout.elem_count();
    if grad_out.len() < numel {
        return Err(Error::BufferTooSmall {
            name: "grad_out",
            needed: numel,
            got: grad_out.len(),
        });
    }

    unsafe {
        kernels::unary_backward_kernel(
            op,
            inp.as_ptr(),
            inp_layout,
            grad_inp.as_mut_ptr(),
            grad_out.as_ptr(),
        );
    }
    Ok(())
}

/// Element-wise binary forward with broadcasting.
///
/// The operand layouts are broadcast to the output shape (which must equal
/// the broadcast of the two operand shapes); stride-0 dimensions then read
/// the same storage element repeatedly.
pub fn binary_forward<T, Op>(
    op: &Op,
    lhs: &[T],
    lhs_layout: &Layout,
    rhs: &[T],
    rhs_layout: &Layout,
    out: &mut [T],
    out_layout: &Layout,
) -> Result<()>
where
    T: Element,
    Op: BinaryScalarOp<T>,
{
    check_rank(lhs_layout)?;
    check_rank(rhs_layout)?;
    check_rank(out_layout)?;

    let expected = broadcast_shapes(lhs_layout.shape(), rhs_layout.shape())
        .ok_or_else(|| Error::broadcast(lhs_layout.shape(), rhs_layout.shape()))?;
    if out_layout.shape() != expected.as_slice() {
        return Err(Error::shape_mismatch(&expected, out_layout.shape()));
    }

    let lhs_b = lhs_layout
        .broadcast_to(&expected)
        .ok_or_else(|| Error::broadcast(lhs_layout.shape(), &expected))?;
    let rhs_b = rhs_layout
        .broadcast_to(&expected)
        .ok_or_else(|| Error::broadcast(rhs_layout.shape(), &expected))?;

    check_buffer("lhs", lhs.len(), &lhs_b)?;
    check_buffer("rhs", rhs.len(), &rhs_b)?;
    check_buffer("out", out.len(), out_layout)?;

    unsafe {
        kernels::binary_forward_kernel(
            op,
            lhs.as_ptr(),
            &lhs_b,
            rhs.as_ptr(),
            &rhs_b,
            out.as_mut_ptr(),
            out_layout,
        );
    }
    Ok(())
}

/// Element-wise binary backward with broadcasting.
///
/// Accumulates `op.df_dx * grad_out` into `grad_lhs` and `op.df_dy * grad_out`
/// into `grad_rhs`, both co-indexed with their operand's storage. Where an
/// operand is broadcast, many logical positions funnel into one gradient
/// slot; the adds are atomic so the parallel fan-out cannot race. Gradient
/// buffers are never reset.
///
/// `out_shape` names the logical iteration space (the forward output shape);
/// `grad_out` is dense over it.
#[allow(clippy::too_many_arguments)]
pub fn binary_backward<T, Op>(
    op: &Op,
    lhs: &[T],
    lhs_layout: &Layout,
    grad_lhs: &mut [T],
    rhs: &[T],
    rhs_layout: &Layout,
    grad_rhs: &mut [T],
    grad_out: &[T],
    out_shape: &[usize],
) -> Result<()>
where
    T: AtomicAccum,
    Op: BinaryScalarOp<T>,
{
    check_rank(lhs_layout)?;
    check_rank(rhs_layout)?;

    let expected = broadcast_shapes(lhs_layout.shape(), rhs_layout.shape())
        .ok_or_else(|| Error::broadcast(lhs_layout.shape(), rhs_layout.shape()))?;
    if out_shape != expected.as_slice() {
        return Err(Error::shape_mismatch(&expected, out_shape));
    }

    let lhs_b = lhs_layout
        .broadcast_to(&expected)
        .ok_or_else(|| Error::broadcast(lhs_layout.shape(), &expected))?;
    let rhs_b = rhs_layout
        .broadcast_to(&expected)
        .ok_or_else(|| Error::broadcast(rhs_layout.shape(), &expected))?;

    check_buffer("lhs", lhs.len(), &lhs_b)?;
    check_buffer("grad_lhs", grad_lhs.len(), &lhs_b)?;
    check_buffer("rhs", rhs.len(), &rhs_b)?;
    check_buffer("grad_rhs", grad_rhs.len(), &rhs_b)?;

    let numel: usize = out_shape.iter().product();
    if grad_out.len() < numel {
        return Err(Error::BufferTooSmall {
            name: "grad_out",
            needed: numel,
            got: grad_out.len(),
        });
    }

    unsafe {
        kernels::binary_backward_kernel(
            op,
            lhs.as_ptr(),
            &lhs_b,
            grad_lhs.as_mut_ptr(),
            rhs.as_ptr(),
            &rhs_b,
            grad_rhs.as_mut_ptr(),
            grad_out.as_ptr(),
        );
    }
    Ok(())
}

/// Validate a pooling descriptor against the output-size formula.
fn validate_pool2d(op: &Pool2dOp) -> Result<()> {
    if op.kernel == 0 {
        return Err(Error::descriptor("kernel size must be non-zero"));
    }
    if op.stride == 0 {
        return Err(Error::descriptor("stride must be non-zero"));
    }

    let padded_h = op.h_in + 2 * op.padding;
    let padded_w = op.w_in + 2 * op.padding;
    if padded_h < op.kernel || padded_w < op.kernel {
        return Err(Error::descriptor(format!(
            "window {} exceeds padded input {}x{}",
            op.kernel, padded_h, padded_w
        )));
    }

    let expect_h = (padded_h - op.kernel) / op.stride + 1;
    let expect_w = (padded_w - op.kernel) / op.stride + 1;
    if expect_h != op.h_out || expect_w != op.w_out {
        return Err(Error::descriptor(format!(
            "declared output {}x{} does not match computed {}x{}",
            op.h_out, op.w_out, expect_h, expect_w
        )));
    }
    Ok(())
}

/// 2D pooling forward over dense NCHW buffers.
pub fn pool2d_forward<T: Element>(
    kind: Pool2dKind,
    op: Pool2dOp,
    inp: &[T],
    out: &mut [T],
) -> Result<()> {
    validate_pool2d(&op)?;
    if inp.len() < op.in_numel() {
        return Err(Error::BufferTooSmall {
            name: "inp",
            needed: op.in_numel(),
            got: inp.len(),
        });
    }
    if out.len() < op.out_numel() {
        return Err(Error::BufferTooSmall {
            name: "out",
            needed: op.out_numel(),
            got: out.len(),
        });
    }

    unsafe {
        kernels::pool2d_forward_kernel(kind, op, inp.as_ptr(), out.as_mut_ptr());
    }
    Ok(())
}

/// 2D pooling backward over dense NCHW buffers.
///
/// `inp` and `out` are the forward input and the stored forward output
/// (max/min route gradients by exact equality against it; avg ignores both).
/// `grad_inp` accumulates and is never reset.
pub fn pool2d_backward<T: Element>(
    kind: Pool2dKind,
    op: Pool2dOp,
    inp: &[T],
    out: &[T],
    grad_inp: &mut [T],
    grad_out: &[T],
) -> Result<()> {
    validate_pool2d(&op)?;
    for (name, len, needed) in [
        ("inp", inp.len(), op.in_numel()),
        ("grad_inp", grad_inp.len(), op.in_numel()),
        ("out", out.len(), op.out_numel()),
        ("grad_out", grad_out.len(), op.out_numel()),
    ] {
        if len < needed {
            return Err(Error::BufferTooSmall { name, needed, got: len });
        }
    }

    unsafe {
        kernels::pool2d_backward_kernel(
            kind,
            op,
            inp.as_ptr(),
            out.as_ptr(),
            grad_inp.as_mut_ptr(),
            grad_out.as_ptr(),
        );
    }
    Ok(())
}

//! Element-wise forward and backward kernels
//!
//! One logical task per flat index in the dense row-major iteration space;
//! each task resolves its own storage offsets through the strided index
//! resolver, so the same kernel body serves contiguous, transposed, and
//! broadcast views without materializing them.
//!
//! Backward kernels accumulate with [`AtomicAccum::atomic_add`]: under
//! broadcasting, distinct logical indices can resolve to the same gradient
//! slot, and concurrent writers must not race. Accumulation order across
//! tasks is unspecified, so results are exact only up to floating-point
//! rounding. Gradient buffers are added to, never reset.

use super::for_each_flat;
use super::index::resolve_in;
use crate::dtype::{AtomicAccum, Element};
use crate::layout::Layout;
use crate::ops::{BinaryScalarOp, UnaryScalarOp};

/// Unary forward: `out[resolve(i, out)] = op.f(inp[resolve(i, inp)])`.
///
/// # Safety
/// - `inp` and `out` must be valid for every offset their layouts reach
/// - the layouts must share one logical shape
/// - `out_layout` must map distinct flat indices to distinct offsets
pub unsafe fn unary_forward_kernel<T, Op>(
    op: &Op,
    inp: *const T,
    inp_layout: &Layout,
    out: *mut T,
    out_layout: &Layout,
) where
    T: Element,
    Op: UnaryScalarOp<T>,
{
    let numel = out_layout.elem_count();
    let inp_addr = inp as usize;
    let out_addr = out as usize;

    for_each_flat(numel, |i| {
        let inp_ptr = inp_addr as *const T;
        let out_ptr = out_addr as *mut T;
        unsafe {
            let x = *inp_ptr.offset(resolve_in(inp_layout, i));
            *out_ptr.offset(resolve_in(out_layout, i)) = op.f(x);
        }
    });
}

/// Unary backward: `grad_inp[resolve(i, inp)] += op.df(inp[...]) * grad_out[i]`.
///
/// `grad_out` is dense and co-indexed with the logical iteration space;
/// `grad_inp` is co-indexed with the input's storage.
///
/// # Safety
/// - `inp` and `grad_inp` must be valid for every offset `inp_layout` reaches
/// - `grad_out` must be valid for `inp_layout.elem_count()` elements
/// - `grad_inp` must not be written through any other path while the kernel
///   runs
pub unsafe fn unary_backward_kernel<T, Op>(
    op: &Op,
    inp: *const T,
    inp_layout: &Layout,
    grad_inp: *mut T,
    grad_out: *const T,
) where
    T: AtomicAccum,
    Op: UnaryScalarOp<T>,
{
    let numel = inp_layout.elem_count();
    let inp_addr = inp as usize;
    let gi_addr = grad_inp as usize;
    let go_addr = grad_out as usize;

    for_each_flat(numel, |i| {
        let inp_ptr = inp_addr as *const T;
        let gi_ptr = gi_addr as *mut T;
        let go_ptr = go_addr as *const T;
        unsafe {
            let src = resolve_in(inp_layout, i);
            let x = *inp_ptr.offset(src);
            let go = *go_ptr.add(i);
            T::atomic_add(gi_ptr.offset(src), op.df(x) * go);
        }
    });
}

/// Binary forward: `out[i] = op.f(lhs[resolve(i, lhs)], rhs[resolve(i, rhs)])`.
///
/// Operand layouts are pre-broadcast to the output shape (stride 0 on
/// broadcast dimensions), so all three share one logical space.
///
/// # Safety
/// - all pointers must be valid for every offset their layouts reach
/// - the three layouts must share one logical shape
/// - `out_layout` must map distinct flat indices to distinct offsets
pub unsafe fn binary_forward_kernel<T, Op>(
    op: &Op,
    lhs: *const T,
    lhs_layout: &Layout,
    rhs: *const T,
    rhs_layout: &Layout,
    out: *mut T,
    out_layout: &Layout,
) where
    T: Element,
    Op: BinaryScalarOp<T>,
{
    let numel = out_layout.elem_count();
    let lhs_addr = lhs as usize;
    let rhs_addr = rhs as usize;
    let out_addr = out as usize;

    for_each_flat(numel, |i| {
        let lhs_ptr = lhs_addr as *const T;
        let rhs_ptr = rhs_addr as *const T;
        let out_ptr = out_addr as *mut T;
        unsafe {
            let l = *lhs_ptr.offset(resolve_in(lhs_layout, i));
            let r = *rhs_ptr.offset(resolve_in(rhs_layout, i));
            *out_ptr.offset(resolve_in(out_layout, i)) = op.f(l, r);
        }
    });
}

/// Binary backward: accumulate both partials atomically.
///
/// For every flat `i` over the (broadcast) output space:
/// `grad_lhs[resolve(i, lhs)] += op.df_dx(l, r) * grad_out[i]` and
/// `grad_rhs[resolve(i, rhs)] += op.df_dy(l, r) * grad_out[i]`.
/// A broadcast operand funnels many logical indices into one gradient slot;
/// the atomic add makes that safe under the parallel fan-out.
///
/// # Safety
/// - `lhs`/`grad_lhs` and `rhs`/`grad_rhs` must be valid for every offset
///   their layouts reach
/// - `grad_out` must be valid for the shared logical element count
/// - the gradient buffers must not be written through any other path while
///   the kernel runs
#[allow(clippy::too_many_arguments)]
pub unsafe fn binary_backward_kernel<T, Op>(
    op: &Op,
    lhs: *const T,
    lhs_layout: &Layout,
    grad_lhs: *mut T,
    rhs: *const T,
    rhs_layout: &Layout,
    grad_rhs: *mut T,
    grad_out: *const T,
) where
    T: AtomicAccum,
    Op: BinaryScalarOp<T>,
{
    let numel = lhs_layout.elem_count();
    let lhs_addr = lhs as usize;
    let gl_addr = grad_lhs as usize;
    let rhs_addr = rhs as usize;
    let gr_addr = grad_rhs as usize;
    let go_addr = grad_out as usize;

    for_each_flat(numel, |i| {
        let lhs_ptr = lhs_addr as *const T;
        let gl_ptr = gl_addr as *mut T;
        let rhs_ptr = rhs_addr as *const T;
        let gr_ptr = gr_addr as *mut T;
        let go_ptr = go_addr as *const T;
        unsafe {
            let li = resolve_in(lhs_layout, i);
            let ri = resolve_in(rhs_layout, i);
            let l = *lhs_ptr.offset(li);
            let r = *rhs_ptr.offset(ri);
            let go = *go_ptr.add(i);
            T::atomic_add(gl_ptr.offset(li), op.df_dx(l, r) * go);
            T::atomic_add(gr_ptr.offset(ri), op.df_dy(l, r) * go);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::binary::Mul;
    use crate::ops::unary::Square;

    #[test]
    fn test_unary_forward_contiguous() {
        let inp = [1.0f64, 2.0, 3.0, 4.0];
        let mut out = [0.0f64; 4];
        let layout = Layout::contiguous(&[4]);
        unsafe {
            unary_forward_kernel(&Square, inp.as_ptr(), &layout, out.as_mut_ptr(), &layout);
        }
        assert_eq!(out, [1.0, 4.0, 9.0, 16.0]);
    }

    #[test]
    fn test_unary_forward_transposed_input() {
        // inp viewed as [2, 3] transposed to [3, 2]; out written contiguous
        let inp = [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut out = [0.0f64; 6];
        let inp_layout = Layout::contiguous(&[2, 3]).transpose(0, 1).unwrap();
        let out_layout = Layout::contiguous(&[3, 2]);
        unsafe {
            unary_forward_kernel(
                &Square,
                inp.as_ptr(),
                &inp_layout,
                out.as_mut_ptr(),
                &out_layout,
            );
        }
        assert_eq!(out, [1.0, 16.0, 4.0, 25.0, 9.0, 36.0]);
    }

    #[test]
    fn test_unary_backward_broadcast_accumulates_one_slot() {
        // A scalar broadcast to 4 logical positions: all gradient flows into
        // the single storage slot.
        let inp = [3.0f64];
        let layout = Layout::contiguous(&[1]).broadcast_to(&[4]).unwrap();
        let mut grad_inp = [0.0f64];
        let grad_out = [1.0f64, 2.0, 3.0, 4.0];
        unsafe {
            unary_backward_kernel(
                &Square,
                inp.as_ptr(),
                &layout,
                grad_inp.as_mut_ptr(),
                grad_out.as_ptr(),
            );
        }
        // d(x^2)/dx = 6 at x=3; sum(grad_out) = 10
        assert_eq!(grad_inp[0], 60.0);
    }

    #[test]
    fn test_binary_backward_mul() {
        let lhs = [2.0f64, 3.0];
        let rhs = [5.0f64, 7.0];
        let layout = Layout::contiguous(&[2]);
        let mut gl = [0.0f64; 2];
        let mut gr = [0.0f64; 2];
        let go = [1.0f64, 1.0];
        unsafe {
            binary_backward_kernel(
                &Mul,
                lhs.as_ptr(),
                &layout,
                gl.as_mut_ptr(),
                rhs.as_ptr(),
                &layout,
                gr.as_mut_ptr(),
                go.as_ptr(),
            );
        }
        assert_eq!(gl, [5.0, 7.0]);
        assert_eq!(gr, [2.0, 3.0]);
    }
}

use super::ConvArgs;
use crate::kernels::parallel::for_each_region;
use faer::linalg::matmul::matmul as faer_matmul;
use faer::mat::{MatMut, MatRef};
use faer::{Accum, Par};

/// 1x1 stride-1 convolution as one GEMM per batch item:
/// `out[b] (M x HW) += W (M x C) * in[b] (C x HW)`.
pub(crate) fn conv2d_k1x1s1(args: &ConvArgs<'_>, input: &[f32], output: &mut [f32]) {
    let ConvArgs {
        filter,
        in_channels,
        in_h,
        in_w,
        out_channels,
        out_h,
        out_w,
        par,
        ..
    } = *args;
    debug_assert_eq!((in_h, in_w), (out_h, out_w));
    let spatial = out_h * out_w;
    assert_eq!(filter.len(), out_channels * in_channels);

    for_each_region(par, output, out_channels * spatial, |b, out| {
        let inp = &input[b * in_channels * spatial..(b + 1) * in_channels * spatial];
        assert_eq!(out.len(), out_channels * spatial);
        // SAFETY: the three slices above are exactly rows * cols long and
        // the views use dense row-major strides over them.
        unsafe {
            let w_mat = MatRef::<f32>::from_raw_parts(
                filter.as_ptr(), out_channels, in_channels, in_channels as isize, 1,
            );
            let in_mat = MatRef::<f32>::from_raw_parts(
                inp.as_ptr(), in_channels, spatial, spatial as isize, 1,
            );
            let out_mat = MatMut::<f32>::from_raw_parts_mut(
                out.as_mut_ptr(), out_channels, spatial, spatial as isize, 1,
            );
            faer_matmul(out_mat, Accum::Add, w_mat, in_mat, 1.0, Par::Seq);
        }
    });
}

use super::ConvArgs;
use crate::kernels::parallel::for_each_region;

/// Direct convolution over a channel-major, already padded input.
///
/// Accumulates into `output`; one region per (batch, out-channel) plane.
pub(crate) fn conv2d_direct(args: &ConvArgs<'_>, input: &[f32], output: &mut [f32]) {
    let ConvArgs {
        filter,
        in_channels,
        in_h,
        in_w,
        out_channels,
        out_h,
        out_w,
        kernel: [kernel_h, kernel_w],
        strides: [stride_h, stride_w],
        dilations: [dilation_h, dilation_w],
        par,
        ..
    } = *args;
    let in_plane = in_h * in_w;
    let k_area = kernel_h * kernel_w;

    for_each_region(par, output, out_h * out_w, |i, out| {
        let b = i / out_channels;
        let m = i % out_channels;
        for c in 0..in_channels {
            let in_ch = &input[(b * in_channels + c) * in_plane..][..in_plane];
            let f = &filter[(m * in_channels + c) * k_area..][..k_area];
            for h in 0..out_h {
                for w in 0..out_w {
                    let mut sum = 0.0f32;
                    for kh in 0..kernel_h {
                        let row = &in_ch[(h * stride_h + kh * dilation_h) * in_w..][..in_w];
                        for kw in 0..kernel_w {
                            sum += row[w * stride_w + kw * dilation_w] * f[kh * kernel_w + kw];
                        }
                    }
                    out[h * out_w + w] += sum;
                }
            }
        }
    });
}

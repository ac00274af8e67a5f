use crate::kernels::algorithm::ConvPlan;
use crate::kernels::parallel::{for_each_region, Parallelism};
use crate::tensor::Layout;

/// Writes `input` into the zero-padded, channel-major buffer `dst` of shape
/// `[batch, channels, padded_in_h, padded_in_w]`.
pub(crate) fn pad_input(input: &[f32], plan: &ConvPlan, dst: &mut [f32], par: Parallelism) {
    let dims = plan.input;
    let (ph, pw) = (plan.padded_in_h, plan.padded_in_w);
    let (top, left) = (plan.pad_top, plan.pad_left);
    let (h, w, channels) = (dims.height, dims.width, dims.channels);
    debug_assert_eq!(dst.len(), dims.batch * channels * ph * pw);

    for_each_region(par, dst, ph * pw, |i, plane| {
        plane.fill(0.0);
        let b = i / channels;
        let c = i % channels;
        match plan.layout {
            Layout::Nchw => {
                let src = &input[i * h * w..(i + 1) * h * w];
                for y in 0..h {
                    let row = &mut plane[(y + top) * pw + left..][..w];
                    row.copy_from_slice(&src[y * w..(y + 1) * w]);
                }
            }
            Layout::Nhwc => {
                let src = &input[b * h * w * channels..(b + 1) * h * w * channels];
                for y in 0..h {
                    let row = &mut plane[(y + top) * pw + left..][..w];
                    for (x, v) in row.iter_mut().enumerate() {
                        *v = src[(y * w + x) * channels + c];
                    }
                }
            }
        }
    });
}

/// Copies the valid `[0, height) x [0, width)` window of the channel-major
/// `padded` output into `out`, in the caller's layout.
pub(crate) fn crop_output(padded: &[f32], plan: &ConvPlan, out: &mut [f32], par: Parallelism) {
    let dims = plan.output;
    let (ph, pw) = (plan.padded_out_h, plan.padded_out_w);
    let (h, w, channels) = (dims.height, dims.width, dims.channels);
    debug_assert_eq!(out.len(), dims.numel());

    match plan.layout {
        Layout::Nchw => {
            for_each_region(par, out, h * w, |i, plane| {
                let src = &padded[i * ph * pw..(i + 1) * ph * pw];
                for y in 0..h {
                    plane[y * w..(y + 1) * w].copy_from_slice(&src[y * pw..y * pw + w]);
                }
            });
        }
        Layout::Nhwc => {
            // one region per output row (batch, y)
            for_each_region(par, out, w * channels, |i, row| {
                let b = i / h;
                let y = i % h;
                for x in 0..w {
                    for c in 0..channels {
                        row[x * channels + c] = padded[((b * channels + c) * ph + y) * pw + x];
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::algorithm::ConvAlgorithm;
    use crate::kernels::padding::PaddingSpec;
    use crate::tensor::FeatureDims;

    fn plan(layout: Layout) -> ConvPlan {
        let input = FeatureDims::new(1, 2, 2, 2);
        let output = FeatureDims::new(1, 2, 2, 2);
        ConvPlan::new(
            ConvAlgorithm::Generic,
            layout,
            input,
            output,
            [3, 3],
            [1, 1],
            [1, 1],
            PaddingSpec { total_h: 2, total_w: 2 },
        )
    }

    #[test]
    fn test_pad_nchw_and_nhwc_agree() {
        let nchw: Vec<f32> = (1..=8).map(|v| v as f32).collect();
        // same tensor stored [n, h, w, c]
        let nhwc = vec![1.0, 5.0, 2.0, 6.0, 3.0, 7.0, 4.0, 8.0];

        let p = plan(Layout::Nchw);
        let mut a = vec![f32::NAN; 2 * 16];
        pad_input(&nchw, &p, &mut a, Parallelism::Sequential);
        let mut b = vec![f32::NAN; 2 * 16];
        pad_input(&nhwc, &plan(Layout::Nhwc), &mut b, Parallelism::Rayon);
        assert_eq!(a, b);

        #[rustfmt::skip]
        let first_plane = vec![
            0.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 2.0, 0.0,
            0.0, 3.0, 4.0, 0.0,
            0.0, 0.0, 0.0, 0.0,
        ];
        assert_eq!(&a[..16], &first_plane[..]);
    }

    #[test]
    fn test_crop_into_nhwc() {
        let mut p = plan(Layout::Nhwc);
        p.padded_out_h = 3;
        p.padded_out_w = 3;
        // channel c, row y, col x -> 100c + 10y + x
        let padded: Vec<f32> = (0..2)
            .flat_map(|c| (0..3).flat_map(move |y| (0..3).map(move |x| (100 * c + 10 * y + x) as f32)))
            .collect();
        let mut out = vec![0.0; 8];
        crop_output(&padded, &p, &mut out, Parallelism::Sequential);
        assert_eq!(out, vec![0.0, 100.0, 1.0, 101.0, 10.0, 110.0, 11.0, 111.0]);
    }
}

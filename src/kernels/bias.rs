use crate::kernels::activations::Activation;
use crate::kernels::parallel::{for_each_region, Parallelism};
use crate::kernels::simd;
use crate::tensor::{FeatureDims, Layout};

/// Adds the per-output-channel `bias` and applies `activation` in place.
///
/// NCHW work is split into (batch, channel) planes, NHWC work into output
/// rows. Nothing is touched when there is no bias and the activation is the
/// identity.
pub fn bias_activation(
    data: &mut [f32],
    dims: FeatureDims,
    layout: Layout,
    bias: Option<&[f32]>,
    activation: &Activation,
    par: Parallelism,
) {
    if bias.is_none() && activation.is_identity() {
        return;
    }
    debug_assert_eq!(data.len(), dims.numel());
    if let Some(b) = bias {
        debug_assert_eq!(b.len(), dims.channels);
    }
    match layout {
        Layout::Nchw => {
            let channels = dims.channels;
            for_each_region(par, data, dims.height * dims.width, |i, plane| {
                if let Some(b) = bias {
                    simd::add_scalar(plane, b[i % channels]);
                }
                activation.apply_slice(plane);
            });
        }
        Layout::Nhwc => {
            for_each_region(par, data, dims.width * dims.channels, |_, row| {
                if let Some(b) = bias {
                    simd::add_bias_channels(row, b);
                }
                activation.apply_slice(row);
            });
        }
    }
}

use crate::kernels::{simd, utils};

/// Element-wise post-processing applied after bias add.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Activation {
    #[default]
    Identity,
    Relu,
    /// Relu capped at `max`.
    ReluX { max: f32 },
    LeakyRelu { alpha: f32 },
    Tanh,
    Sigmoid,
}

impl Activation {
    pub fn is_identity(&self) -> bool {
        matches!(self, Activation::Identity)
    }

    #[inline]
    pub fn apply(&self, x: f32) -> f32 {
        match *self {
            Activation::Identity => x,
            Activation::Relu => x.max(0.0),
            Activation::ReluX { max } => x.max(0.0).min(max),
            Activation::LeakyRelu { alpha } => utils::leaky_relu_scalar(x, alpha),
            Activation::Tanh => utils::tanh(x),
            Activation::Sigmoid => utils::sigmoid(x),
        }
    }

    pub fn apply_slice(&self, data: &mut [f32]) {
        match *self {
            Activation::Identity => {}
            Activation::Relu => simd::clamp(data, 0.0, f32::INFINITY),
            Activation::ReluX { max } => simd::clamp(data, 0.0, max),
            _ => {
                for v in data.iter_mut() {
                    *v = self.apply(*v);
                }
            }
        }
    }
}

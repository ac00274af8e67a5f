pub mod activations;
pub mod algorithm;
pub mod bias;
pub mod conv2d;
pub mod padding;
pub mod parallel;
pub mod resize;
pub mod scratch;
pub mod simd;
pub mod utils;

pub use activations::Activation;
pub use algorithm::{ConvAlgorithm, ConvPlan, KernelGeometry, ScratchPlan};
pub use bias::bias_activation;
pub use conv2d::{conv2d, Conv2d, ConvConfig, WinogradFilterCache};
pub use padding::{plan_padding, Padding, PaddingPlan, PaddingSpec, PaddingType, RoundType};
pub use parallel::{for_each_region, Parallelism};
pub use resize::{resize_bilinear, CachedInterpolation, Interpolate, ResizeBilinear};
pub use scratch::{Carver, ScratchArena};

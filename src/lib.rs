//! CPU convolution and bilinear-resize kernels for NCHW and NHWC feature maps.
//!
//! [`kernels::conv2d::Conv2d`] picks between Winograd, specialized 1x1/3x3
//! and direct convolution per call, planning padding and scratch memory up
//! front. [`kernels::resize::resize_bilinear`] resamples `f32` and `u8`
//! images with precomputed per-axis interpolation weights.

pub mod error;
pub mod kernels;
pub mod tensor;

pub use error::{KernelError, Result};
pub use kernels::conv2d::{conv2d, Conv2d, ConvConfig};
pub use kernels::resize::{resize_bilinear, ResizeBilinear};
pub use tensor::{DataType, Element, FeatureDims, Layout, TensorView};

//! 2-D convolution over NCHW or NHWC feature maps with an OIHW filter.
//!
//! A call plans padding, picks an algorithm, sizes the scratch arena once,
//! relayouts/pads the input into it when needed, runs the algorithm
//! channel-major, crops the valid window into the caller's layout and
//! finally applies bias and activation.

mod direct;
mod k1x1;
mod k3x3;
mod pack;
mod winograd;

pub use winograd::WinogradFilterCache;

use crate::error::{KernelError, Result};
use crate::kernels::activations::Activation;
use crate::kernels::algorithm::{ConvAlgorithm, ConvPlan, KernelGeometry};
use crate::kernels::bias::bias_activation;
use crate::kernels::padding::{plan_padding, Padding, RoundType};
use crate::kernels::parallel::Parallelism;
use crate::kernels::scratch::ScratchArena;
use crate::kernels::utils::ensure_capacity;
use crate::tensor::{FeatureDims, TensorView};
use log::debug;
use winograd::{FilterKey, WinogradScratch};

/// Geometry handed to every algorithm. Extents are those of the buffers the
/// algorithm reads and writes, i.e. after padding and tile rounding.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConvArgs<'a> {
    pub filter: &'a [f32],
    pub batch: usize,
    pub in_channels: usize,
    pub in_h: usize,
    pub in_w: usize,
    pub out_channels: usize,
    pub out_h: usize,
    pub out_w: usize,
    pub kernel: [usize; 2],
    pub strides: [usize; 2],
    pub dilations: [usize; 2],
    pub par: Parallelism,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConvConfig {
    pub strides: [usize; 2],
    pub dilations: [usize; 2],
    pub padding: Padding,
    pub round_type: RoundType,
    pub activation: Activation,
    pub parallelism: Parallelism,
    /// Forces an algorithm instead of letting the selector choose.
    pub algorithm: Option<ConvAlgorithm>,
}

impl Default for ConvConfig {
    fn default() -> Self {
        Self {
            strides: [1, 1],
            dilations: [1, 1],
            padding: Padding::default(),
            round_type: RoundType::default(),
            activation: Activation::default(),
            parallelism: Parallelism::default(),
            algorithm: None,
        }
    }
}

impl ConvConfig {
    pub fn with_strides(mut self, strides: [usize; 2]) -> Self {
        self.strides = strides;
        self
    }

    pub fn with_dilations(mut self, dilations: [usize; 2]) -> Self {
        self.dilations = dilations;
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_round_type(mut self, round_type: RoundType) -> Self {
        self.round_type = round_type;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_algorithm(mut self, algorithm: ConvAlgorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }
}

type PlainKernel = fn(&ConvArgs<'_>, &[f32], &mut [f32]);

/// The algorithm of one call, resolved to something runnable.
enum ConvKernel {
    Winograd(FilterKey),
    Plain(PlainKernel),
}

impl ConvKernel {
    fn resolve(algorithm: ConvAlgorithm, filter: &[f32], out_channels: usize, in_channels: usize) -> Self {
        match algorithm {
            ConvAlgorithm::Winograd => ConvKernel::Winograd(FilterKey::of(filter, out_channels, in_channels)),
            ConvAlgorithm::K3x3S1 => ConvKernel::Plain(k3x3::conv2d_k3x3s1),
            ConvAlgorithm::K3x3S2 => ConvKernel::Plain(k3x3::conv2d_k3x3s2),
            ConvAlgorithm::K1x1S1 => ConvKernel::Plain(k1x1::conv2d_k1x1s1),
            ConvAlgorithm::Generic => ConvKernel::Plain(direct::conv2d_direct),
        }
    }

    fn filter_cached(&self, cache: &WinogradFilterCache) -> bool {
        match self {
            ConvKernel::Winograd(key) => cache.is_valid_for(key),
            ConvKernel::Plain(_) => false,
        }
    }

    fn run(
        self,
        args: &ConvArgs<'_>,
        scratch: WinogradScratch<'_>,
        cache: &mut WinogradFilterCache,
        input: &[f32],
        output: &mut [f32],
    ) -> Result<()> {
        match self {
            ConvKernel::Winograd(key) => winograd::conv2d_winograd(args, key, scratch, cache, input, output),
            ConvKernel::Plain(kernel) => {
                kernel(args, input, output);
                Ok(())
            }
        }
    }
}

/// Reusable convolution executor.
///
/// Owns the scratch arena and the Winograd filter cache, so repeated calls
/// with the same geometry allocate nothing and transform the filter once.
#[derive(Debug, Default)]
pub struct Conv2d {
    config: ConvConfig,
    scratch: ScratchArena,
    filter_cache: WinogradFilterCache,
    last_algorithm: Option<ConvAlgorithm>,
}

impl Conv2d {
    pub fn new(config: ConvConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &ConvConfig {
        &self.config
    }

    pub fn scratch(&self) -> &ScratchArena {
        &self.scratch
    }

    /// Algorithm used by the most recent successful call.
    pub fn last_algorithm(&self) -> Option<ConvAlgorithm> {
        self.last_algorithm
    }

    pub fn filter_transform_count(&self) -> usize {
        self.filter_cache.transform_count()
    }

    /// Drops the cached Winograd filter; the next call transforms again.
    pub fn invalidate_filter_cache(&mut self) {
        self.filter_cache.invalidate();
    }

    /// Convolves `input` with the OIHW `filter`, writing into `out`.
    ///
    /// `out` is resized to the output shape (in the input's layout) and the
    /// returned view borrows it. All shape and parameter checks run before
    /// `out` is touched.
    pub fn forward<'o>(
        &mut self,
        input: &TensorView<'_, f32>,
        filter: &TensorView<'_, f32>,
        bias: Option<&TensorView<'_, f32>>,
        out: &'o mut Vec<f32>,
    ) -> Result<TensorView<'o, f32>> {
        let config = self.config;
        let layout = input.layout;
        let in_dims = input.dims4()?;
        check_len("input elements", in_dims.numel(), input.data.len())?;

        if filter.dim() != 4 {
            return Err(KernelError::config(format!(
                "filter must be rank 4 [out_ch, in_ch, kh, kw], got rank {}",
                filter.dim()
            )));
        }
        let (out_channels, kernel) = (filter.size(0), [filter.size(2), filter.size(3)]);
        check_len("filter input channels", in_dims.channels, filter.size(1))?;
        check_len(
            "filter elements",
            out_channels * in_dims.channels * kernel[0] * kernel[1],
            filter.data.len(),
        )?;
        if let Some(b) = bias {
            check_len("bias length", out_channels, b.numel())?;
        }

        let pad = plan_padding(
            [in_dims.height, in_dims.width],
            kernel,
            config.strides,
            config.dilations,
            config.padding,
            config.round_type,
        )?;
        let out_dims = FeatureDims::new(in_dims.batch, out_channels, pad.out_h, pad.out_w);

        let geom = KernelGeometry {
            kernel,
            strides: config.strides,
            dilations: config.dilations,
            in_channels: in_dims.channels,
            out_channels,
        };
        let algorithm = match config.algorithm {
            Some(forced) if !forced.supports(&geom) => {
                return Err(KernelError::config(format!(
                    "{:?} cannot run kernel {:?} stride {:?} dilation {:?} with {} -> {} channels",
                    forced, kernel, config.strides, config.dilations, in_dims.channels, out_channels
                )));
            }
            Some(forced) => forced,
            None => ConvAlgorithm::select(&geom),
        };

        let plan = ConvPlan::new(
            algorithm,
            layout,
            in_dims,
            out_dims,
            kernel,
            config.strides,
            config.dilations,
            pad.padding,
        );
        let conv_kernel = ConvKernel::resolve(algorithm, &filter.data, out_channels, in_dims.channels);
        let scratch_plan = plan.scratch(conv_kernel.filter_cached(&self.filter_cache));
        debug!(
            "conv2d: {:?} {:?} {}x{} -> {}x{}, padded in {}x{} out {}x{}, scratch {} bytes",
            algorithm,
            layout,
            in_dims.height,
            in_dims.width,
            out_dims.height,
            out_dims.width,
            plan.padded_in_h,
            plan.padded_in_w,
            plan.padded_out_h,
            plan.padded_out_w,
            scratch_plan.total_bytes()
        );

        self.scratch.rewind();
        self.scratch.grow(scratch_plan.total_bytes())?;
        ensure_capacity(out, out_dims.numel());

        let mut carver = self.scratch.carver();
        let winograd_scratch = WinogradScratch {
            input: carver.carve(scratch_plan.transformed_input)?,
            filter: carver.carve(scratch_plan.transformed_filter)?,
            output: carver.carve(scratch_plan.transformed_output)?,
        };
        let padded_input = carver.carve(scratch_plan.padded_input)?;
        let padded_output = carver.carve(scratch_plan.padded_output)?;

        let par = config.parallelism;
        let src: &[f32] = if plan.needs_padded_input() {
            pack::pad_input(&input.data, &plan, padded_input, par);
            padded_input
        } else {
            &input.data[..]
        };

        let args = ConvArgs {
            filter: &filter.data,
            batch: in_dims.batch,
            in_channels: in_dims.channels,
            in_h: plan.padded_in_h,
            in_w: plan.padded_in_w,
            out_channels,
            out_h: plan.padded_out_h,
            out_w: plan.padded_out_w,
            kernel,
            strides: config.strides,
            dilations: config.dilations,
            par,
        };
        let cropped = plan.needs_padded_output();
        let dst: &mut [f32] = if cropped { &mut *padded_output } else { &mut out[..] };
        dst.fill(0.0);
        conv_kernel.run(&args, winograd_scratch, &mut self.filter_cache, src, dst)?;
        if cropped {
            pack::crop_output(padded_output, &plan, out, par);
        }

        let bias_data = bias.map(|b| &b.data[..]);
        bias_activation(out, out_dims, layout, bias_data, &config.activation, par);
        self.last_algorithm = Some(algorithm);

        Ok(TensorView::from_slice(out, out_dims.shape(layout)).with_layout(layout))
    }
}

/// One-shot convolution with a fresh executor.
pub fn conv2d<'o>(
    input: &TensorView<'_, f32>,
    filter: &TensorView<'_, f32>,
    bias: Option<&TensorView<'_, f32>>,
    config: &ConvConfig,
    out: &'o mut Vec<f32>,
) -> Result<TensorView<'o, f32>> {
    Conv2d::new(*config).forward(input, filter, bias, out)
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(KernelError::ShapeMismatch { what, expected, actual });
    }
    Ok(())
}

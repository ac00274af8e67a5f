//! Convolution algorithm selection and per-algorithm memory planning.

use crate::kernels::padding::PaddingSpec;
use crate::kernels::utils::round_up;
use crate::tensor::{FeatureDims, Layout};

/// Output tile edge of Winograd F(6x6, 3x3).
pub const WINOGRAD_OUT_TILE: usize = 6;
/// Input tile edge of Winograd F(6x6, 3x3).
pub const WINOGRAD_IN_TILE: usize = WINOGRAD_OUT_TILE + 2;
/// Below this many input or output channels the transforms cost more than
/// they save.
pub const WINOGRAD_MIN_CHANNELS: usize = 8;

const ELEM_BYTES: usize = std::mem::size_of::<f32>();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConvAlgorithm {
    /// F(6x6, 3x3) transform-domain convolution.
    Winograd,
    K3x3S1,
    K3x3S2,
    K1x1S1,
    /// Direct nested loop; handles every geometry.
    Generic,
}

/// The filter-side facts algorithm selection depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelGeometry {
    pub kernel: [usize; 2],
    pub strides: [usize; 2],
    pub dilations: [usize; 2],
    pub in_channels: usize,
    pub out_channels: usize,
}

impl KernelGeometry {
    fn is(&self, k: usize, s: usize) -> bool {
        self.kernel == [k, k] && self.strides == [s, s] && self.dilations == [1, 1]
    }
}

impl ConvAlgorithm {
    /// Picks the fastest algorithm whose preconditions hold.
    pub fn select(geom: &KernelGeometry) -> Self {
        [
            ConvAlgorithm::Winograd,
            ConvAlgorithm::K3x3S1,
            ConvAlgorithm::K3x3S2,
            ConvAlgorithm::K1x1S1,
        ]
        .into_iter()
        .find(|a| a.supports(geom))
        .unwrap_or(ConvAlgorithm::Generic)
    }

    pub fn supports(self, geom: &KernelGeometry) -> bool {
        match self {
            ConvAlgorithm::Winograd => {
                geom.is(3, 1)
                    && geom.in_channels >= WINOGRAD_MIN_CHANNELS
                    && geom.out_channels >= WINOGRAD_MIN_CHANNELS
            }
            ConvAlgorithm::K3x3S1 => geom.is(3, 1),
            ConvAlgorithm::K3x3S2 => geom.is(3, 2),
            ConvAlgorithm::K1x1S1 => geom.is(1, 1),
            ConvAlgorithm::Generic => true,
        }
    }

    /// Output extents rounded up to this algorithm's tile multiple.
    pub fn round_output(self, out_h: usize, out_w: usize) -> (usize, usize) {
        match self {
            ConvAlgorithm::Winograd => (round_up(out_h, WINOGRAD_OUT_TILE), round_up(out_w, WINOGRAD_OUT_TILE)),
            ConvAlgorithm::K3x3S1 => (round_up(out_h, 2), round_up(out_w, 4)),
            ConvAlgorithm::K3x3S2 => (out_h, round_up(out_w, 4)),
            ConvAlgorithm::K1x1S1 | ConvAlgorithm::Generic => (out_h, out_w),
        }
    }
}

/// Byte sizes of every scratch region one call needs; zero when unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScratchPlan {
    pub transformed_input: usize,
    pub transformed_filter: usize,
    pub transformed_output: usize,
    pub padded_input: usize,
    pub padded_output: usize,
}

impl ScratchPlan {
    pub fn total_bytes(&self) -> usize {
        self.transformed_input
            + self.transformed_filter
            + self.transformed_output
            + self.padded_input
            + self.padded_output
    }
}

/// Full geometry of one convolution call once the algorithm is fixed.
///
/// The padded input is always channel-major; NHWC callers get relayouted into
/// it. Tile rounding only ever adds rows/columns on the bottom/right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvPlan {
    pub algorithm: ConvAlgorithm,
    pub layout: Layout,
    pub input: FeatureDims,
    pub output: FeatureDims,
    pub kernel: [usize; 2],
    pub strides: [usize; 2],
    pub dilations: [usize; 2],
    pub pad_top: usize,
    pub pad_bottom: usize,
    pub pad_left: usize,
    pub pad_right: usize,
    pub padded_in_h: usize,
    pub padded_in_w: usize,
    pub padded_out_h: usize,
    pub padded_out_w: usize,
}

impl ConvPlan {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        algorithm: ConvAlgorithm,
        layout: Layout,
        input: FeatureDims,
        output: FeatureDims,
        kernel: [usize; 2],
        strides: [usize; 2],
        dilations: [usize; 2],
        padding: PaddingSpec,
    ) -> Self {
        let (padded_out_h, padded_out_w) = algorithm.round_output(output.height, output.width);
        // Rows/columns the rounded output actually reads.
        let needed = |out: usize, axis: usize| (out - 1) * strides[axis] + (kernel[axis] - 1) * dilations[axis] + 1;
        let padded_in_h = (input.height + padding.total_h).max(needed(padded_out_h, 0));
        let padded_in_w = (input.width + padding.total_w).max(needed(padded_out_w, 1));
        let pad_top = padding.top();
        let pad_left = padding.left();
        Self {
            algorithm,
            layout,
            input,
            output,
            kernel,
            strides,
            dilations,
            pad_top,
            pad_bottom: padded_in_h - input.height - pad_top,
            pad_left,
            pad_right: padded_in_w - input.width - pad_left,
            padded_in_h,
            padded_in_w,
            padded_out_h,
            padded_out_w,
        }
    }

    pub fn needs_padded_input(&self) -> bool {
        self.layout == Layout::Nhwc
            || self.padded_in_h != self.input.height
            || self.padded_in_w != self.input.width
    }

    pub fn needs_padded_output(&self) -> bool {
        self.layout == Layout::Nhwc
            || self.padded_out_h != self.output.height
            || self.padded_out_w != self.output.width
    }

    /// Winograd tile counts along height and width.
    pub fn winograd_tiles(&self) -> (usize, usize) {
        (self.padded_out_h / WINOGRAD_OUT_TILE, self.padded_out_w / WINOGRAD_OUT_TILE)
    }

    /// Scratch requirement of this call. `filter_cached` drops the
    /// transformed-filter staging area once a Winograd filter is cached.
    pub fn scratch(&self, filter_cached: bool) -> ScratchPlan {
        let mut plan = ScratchPlan::default();
        let batch = self.input.batch;
        let in_c = self.input.channels;
        let out_c = self.output.channels;
        if self.algorithm == ConvAlgorithm::Winograd {
            let (th, tw) = self.winograd_tiles();
            let area = WINOGRAD_IN_TILE * WINOGRAD_IN_TILE;
            plan.transformed_input = area * batch * in_c * th * tw * ELEM_BYTES;
            plan.transformed_output = area * batch * out_c * th * tw * ELEM_BYTES;
            if !filter_cached {
                plan.transformed_filter = area * out_c * in_c * ELEM_BYTES;
            }
        }
        if self.needs_padded_input() {
            plan.padded_input = batch * in_c * self.padded_in_h * self.padded_in_w * ELEM_BYTES;
        }
        if self.needs_padded_output() {
            plan.padded_output = batch * out_c * self.padded_out_h * self.padded_out_w * ELEM_BYTES;
        }
        plan
    }
}

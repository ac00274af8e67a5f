//! Spatial padding and output-size planning for convolution.

use crate::error::{KernelError, Result};

/// Automatic padding policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaddingType {
    /// No padding; the kernel only visits fully covered windows.
    #[default]
    Valid,
    /// Output extent is `ceil(in / stride)`.
    Same,
    /// Every input position contributes to every output it can reach.
    Full,
}

/// Rounding applied to the output-size division when padding is explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RoundType {
    #[default]
    Floor,
    Ceil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Padding {
    /// Total padding along height and width, split by [`PaddingSpec`].
    Explicit { h: usize, w: usize },
    Auto(PaddingType),
}

impl Default for Padding {
    fn default() -> Self {
        Padding::Auto(PaddingType::Valid)
    }
}

/// Total padding per spatial axis. Odd totals put the smaller half first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaddingSpec {
    pub total_h: usize,
    pub total_w: usize,
}

impl PaddingSpec {
    pub fn top(&self) -> usize {
        self.total_h / 2
    }
    pub fn bottom(&self) -> usize {
        self.total_h - self.top()
    }
    pub fn left(&self) -> usize {
        self.total_w / 2
    }
    pub fn right(&self) -> usize {
        self.total_w - self.left()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaddingPlan {
    pub padding: PaddingSpec,
    pub out_h: usize,
    pub out_w: usize,
}

/// Computes total padding and output extents for one convolution.
///
/// `out = floor((in + pad - dilation * (kernel - 1) - 1) / stride) + 1`, with
/// `pad` either given explicitly or derived from the auto policy. Fails when
/// a stride or dilation is zero or an output extent would be non-positive.
pub fn plan_padding(
    in_hw: [usize; 2],
    kernel_hw: [usize; 2],
    strides: [usize; 2],
    dilations: [usize; 2],
    padding: Padding,
    round_type: RoundType,
) -> Result<PaddingPlan> {
    if strides.contains(&0) {
        return Err(KernelError::config(format!("strides must be positive, got {:?}", strides)));
    }
    if dilations.contains(&0) {
        return Err(KernelError::config(format!("dilations must be positive, got {:?}", dilations)));
    }
    if kernel_hw.contains(&0) {
        return Err(KernelError::config(format!("kernel extents must be positive, got {:?}", kernel_hw)));
    }

    let mut out = [0i64; 2];
    let mut total = [0usize; 2];
    for axis in 0..2 {
        let input = in_hw[axis] as i64;
        let stride = strides[axis] as i64;
        let k_extent = ((kernel_hw[axis] - 1) * dilations[axis] + 1) as i64;
        match padding {
            Padding::Explicit { h, w } => {
                let pad = (if axis == 0 { h } else { w }) as i64;
                let span = input + pad - k_extent;
                let q = match round_type {
                    RoundType::Floor => span.div_euclid(stride),
                    RoundType::Ceil => (span + stride - 1).div_euclid(stride),
                };
                out[axis] = q + 1;
                total[axis] = pad as usize;
            }
            Padding::Auto(policy) => {
                let span = match policy {
                    PaddingType::Valid => input - k_extent,
                    PaddingType::Same => input - 1,
                    PaddingType::Full => input + k_extent - 2,
                };
                out[axis] = span.div_euclid(stride) + 1;
                total[axis] = ((out[axis] - 1) * stride + k_extent - input).max(0) as usize;
            }
        }
    }

    if out[0] <= 0 || out[1] <= 0 {
        return Err(KernelError::config(format!(
            "output extent {}x{} is not positive (input {}x{}, kernel {}x{}, padding {:?})",
            out[0], out[1], in_hw[0], in_hw[1], kernel_hw[0], kernel_hw[1], padding
        )));
    }

    Ok(PaddingPlan {
        padding: PaddingSpec {
            total_h: total[0],
            total_w: total[1],
        },
        out_h: out[0] as usize,
        out_w: out[1] as usize,
    })
}

use rayon::prelude::*;

/// How a kernel spreads its output regions over threads.
///
/// Both modes visit the same regions with the same per-region code, so their
/// results are identical; `Sequential` exists for deterministic debugging and
/// for callers that already parallelize at a coarser level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Parallelism {
    Sequential,
    /// rayon's global worker pool.
    #[default]
    Rayon,
}

/// Calls `f(index, region)` for every consecutive `region_len`-sized chunk of
/// `data`.
///
/// Regions partition `data`: each one is a distinct `&mut` chunk written by
/// exactly one worker, and region `i` covers `data[i * region_len..]`. A
/// trailing short chunk is passed through as-is.
pub fn for_each_region<T, F>(par: Parallelism, data: &mut [T], region_len: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if region_len == 0 || data.is_empty() {
        return;
    }
    match par {
        Parallelism::Sequential => data
            .chunks_mut(region_len)
            .enumerate()
            .for_each(|(i, region)| f(i, region)),
        Parallelism::Rayon => data
            .par_chunks_mut(region_len)
            .enumerate()
            .for_each(|(i, region)| f(i, region)),
    }
}

//! Distribution statistics over chunk lengths.

use serde::Serialize;

/// Summary of a chunk-length distribution (lengths in characters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct ChunkStats {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub stdev: f64,
    /// 75th percentile, linearly interpolated between closest ranks.
    pub p75: f64,
}

impl ChunkStats {
    pub fn from_lengths(lengths: &[usize]) -> Self {
        if lengths.is_empty() {
            return Self::default();
        }
        let n = lengths.len() as f64;
        let mean = lengths.iter().map(|&l| l as f64).sum::<f64>() / n;
        let variance = lengths
            .iter()
            .map(|&l| {
                let d = l as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;

        Self {
            count: lengths.len(),
            mean,
            stdev: variance.sqrt(),
            p75: percentile(lengths, 0.75),
        }
    }
}

fn percentile(values: &[usize], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] as f64 + (sorted[hi] as f64 - sorted[lo] as f64) * frac
}

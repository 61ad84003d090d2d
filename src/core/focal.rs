//! Focal (neighborhood) statistics shared by the despeckle filter and the
//! gap filler.

use crate::types::{KernelShape, Sample};
use ndarray::Array2;

/// Offsets of a focal neighborhood, center included.
#[derive(Debug, Clone)]
pub struct Kernel {
    offsets: Vec<(i32, i32)>,
}

impl Kernel {
    /// Square kernel with the given half-width in pixels; half-width 0 is
    /// the degenerate center-only kernel.
    pub fn square(radius: usize) -> Self {
        Self::build(radius, KernelShape::Square)
    }

    /// Circular kernel with the given radius in pixels.
    pub fn circle(radius: usize) -> Self {
        Self::build(radius, KernelShape::Circle)
    }

    pub fn build(radius: usize, shape: KernelShape) -> Self {
        let r = radius as i32;
        let mut offsets = Vec::new();
        for di in -r..=r {
            for dj in -r..=r {
                let keep = match shape {
                    KernelShape::Square => true,
                    KernelShape::Circle => di * di + dj * dj <= r * r,
                };
                if keep {
                    offsets.push((di, dj));
                }
            }
        }
        Self { offsets }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }
}

/// Unweighted neighborhood mean, skipping missing (non-finite) samples.
///
/// Windows are clipped at the grid edge. A window with no valid sample
/// reduces to NaN so that absence keeps propagating; callers that want a
/// fallback compose one explicitly (see the gap filler).
pub fn focal_mean(grid: &Array2<Sample>, kernel: &Kernel) -> Array2<Sample> {
    let (rows, cols) = grid.dim();
    let mut out = Array2::from_elem((rows, cols), Sample::NAN);

    for i in 0..rows {
        for j in 0..cols {
            let mut sum = 0.0;
            let mut count = 0usize;
            for &(di, dj) in kernel.offsets() {
                let ii = i as i32 + di;
                let jj = j as i32 + dj;
                if ii >= 0 && ii < rows as i32 && jj >= 0 && jj < cols as i32 {
                    let v = grid[[ii as usize, jj as usize]];
                    if v.is_finite() {
                        sum += v;
                        count += 1;
                    }
                }
            }
            if count > 0 {
                out[[i, j]] = sum / count as Sample;
            }
        }
    }
    out
}

//! Gap filling of composites by an iterated focal mean.

use crate::core::focal::{focal_mean, Kernel};
use crate::raster::RasterImage;
use crate::types::{KernelShape, StackError, StackResult};
use ndarray::Zip;
use serde::{Deserialize, Serialize};

/// Gap filling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapFillParams {
    /// Focal mean kernel radius in pixels
    pub radius: usize,
    pub shape: KernelShape,
    /// Number of focal mean passes; each pass re-averages the previous
    /// one's output, reaching roughly one kernel radius further into a gap
    pub iterations: usize,
}

impl Default for GapFillParams {
    /// The mosaic gap-filling setup: radius 3 circle, 7 passes.
    fn default() -> Self {
        Self {
            radius: 3,
            shape: KernelShape::Circle,
            iterations: 7,
        }
    }
}

/// Fills missing composite pixels from an iterated focal mean field.
pub struct GapFiller {
    params: GapFillParams,
    kernel: Kernel,
}

impl GapFiller {
    pub fn new(params: GapFillParams) -> StackResult<Self> {
        if params.radius == 0 {
            return Err(StackError::InvalidRadius(
                "gap fill radius must be at least 1 pixel".to_string(),
            ));
        }
        if params.iterations == 0 {
            return Err(StackError::Processing(
                "gap filling requires at least one iteration".to_string(),
            ));
        }
        let kernel = Kernel::build(params.radius, params.shape);
        Ok(Self { params, kernel })
    }

    /// Fill the missing pixels of `image` from the focal mean field.
    ///
    /// This is an unmask-with-fallback, not a reconstruction: valid pixels
    /// pass through untouched, and pixels the focal field never reaches
    /// stay missing.
    pub fn fill(&self, image: &RasterImage) -> StackResult<RasterImage> {
        log::info!(
            "Gap filling '{}' ({} passes, radius {} px {:?})",
            image.metadata().index,
            self.params.iterations,
            self.params.radius,
            self.params.shape
        );

        let mut out = RasterImage::new(image.metadata().clone(), image.domain());
        for (name, data) in image.bands() {
            let mut field = data.clone();
            for _ in 0..self.params.iterations {
                field = focal_mean(&field, &self.kernel);
            }

            let mut filled = data.clone();
            Zip::from(&mut filled).and(&field).for_each(|v, &f| {
                if !v.is_finite() {
                    *v = f;
                }
            });
            out = out.with_band(name, filled)?;
        }
        Ok(out)
    }
}

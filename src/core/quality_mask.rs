//! Per-pixel validity masking from the mosaic `qa` band.

use crate::raster::RasterImage;
use crate::types::{Sample, StackResult};
use ndarray::Zip;

/// Auxiliary quality band carried by the mosaic tiles.
pub const QA_BAND: &str = "qa";

/// QA code: no observation at this pixel.
pub const QA_NO_DATA: Sample = 0.0;
/// QA code: radar layover.
pub const QA_LAYOVER: Sample = 100.0;
/// QA code: radar shadowing.
pub const QA_SHADOW: Sample = 150.0;

fn is_invalid(code: Sample) -> bool {
    code == QA_NO_DATA || code == QA_LAYOVER || code == QA_SHADOW
}

/// Mask every data band where the `qa` band flags no-data, layover or shadow.
///
/// Masked pixels become missing (NaN), never zero, so they are absent from
/// every downstream spatial and temporal reduction. The `qa` band itself is
/// carried through unchanged; a later band selection drops it.
pub fn mask_qa(image: &RasterImage) -> StackResult<RasterImage> {
    let qa = image.band(QA_BAND)?.clone();

    let mut out = RasterImage::new(image.metadata().clone(), image.domain());
    for (name, data) in image.bands() {
        if name == QA_BAND {
            out = out.with_band(name, data.clone())?;
            continue;
        }
        let mut masked = data.clone();
        Zip::from(&mut masked).and(&qa).for_each(|v, &code| {
            if is_invalid(code) {
                *v = Sample::NAN;
            }
        });
        out = out.with_band(name, masked)?;
    }
    Ok(out)
}

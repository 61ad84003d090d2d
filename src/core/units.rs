//! Pixel-wise conversions between the digital-number, decibel and linear
//! power domains, plus the incidence-angle Gamma0 normalization.
//!
//! Every converter checks the image's domain tag before touching pixels, so
//! applying a conversion to data in the wrong domain fails at the boundary
//! instead of producing quietly wrong numbers. Metadata is carried through
//! unchanged; NaN and infinity propagate per IEEE-754.

use crate::raster::RasterImage;
use crate::types::{Domain, Sample, StackResult};

/// Sensor calibration offset applied when converting digital numbers to dB.
pub const CALIBRATION_OFFSET_DB: Sample = 83.0;

/// Name of the local incidence angle band on angle-annotated products.
pub const ANGLE_BAND: &str = "angle";

/// Convert raw mosaic digital numbers to calibrated backscatter:
/// `dB = 10*log10(DN^2) - 83`.
pub fn to_decibel(image: &RasterImage) -> StackResult<RasterImage> {
    image.expect_domain(Domain::DigitalNumber)?;
    Ok(image.map_pixels(Domain::Decibel, |v| {
        10.0 * (v * v).log10() - CALIBRATION_OFFSET_DB
    }))
}

/// Convert decibel backscatter to linear power: `power = 10^(0.1*dB)`.
pub fn decibel_to_power(image: &RasterImage) -> StackResult<RasterImage> {
    image.expect_domain(Domain::Decibel)?;
    Ok(image.map_pixels(Domain::Power, |v| Sample::powf(10.0, 0.1 * v)))
}

/// Convert linear power back to decibel: `dB = 10*log10(|power|)`.
///
/// The absolute value guards against small negative powers produced by
/// reducer arithmetic; negative power is not physically meaningful.
pub fn power_to_decibel(image: &RasterImage) -> StackResult<RasterImage> {
    image.expect_domain(Domain::Power)?;
    Ok(image.map_pixels(Domain::Decibel, |v| 10.0 * v.abs().log10()))
}

/// Normalize decibel backscatter to Gamma0 using the `angle` band (degrees):
/// `gamma0 = dB - 10*log10(cos(angle * pi/180))`.
///
/// The angle band is consumed and dropped from the output.
pub fn to_gamma0(image: &RasterImage) -> StackResult<RasterImage> {
    image.expect_domain(Domain::Decibel)?;
    let angle = image.band(ANGLE_BAND)?;
    let correction = angle.mapv(|a| 10.0 * a.to_radians().cos().log10());

    let mut out = RasterImage::new(image.metadata().clone(), Domain::Decibel);
    for (name, data) in image.bands() {
        if name == ANGLE_BAND {
            continue;
        }
        out = out.with_band(name, data - &correction)?;
    }
    Ok(out)
}

//! sarstack: multi-temporal speckle filtering and compositing for SAR
//! backscatter stacks
//!
//! This library takes a time-ordered stack of co-registered, multi-band SAR
//! backscatter images and produces denoised, gap-filled temporal composites:
//! quality masking, digital-number/decibel/power unit conversion, a
//! multi-temporal despeckle filter, a date-windowed compositor with
//! pluggable pixel reducers, an iterated focal-mean gap filler, and a
//! moving-average self-join for time-series smoothing.

pub mod core;
pub mod raster;
pub mod types;

// Re-export main types and functions for easier access
pub use raster::{ImageCollection, RasterImage};
pub use types::{
    BandRole, BoundingBox, Domain, ImageMetadata, KernelShape, RadiusUnits, Reducer, Sample,
    StackError, StackResult, TimeUnit, TimeWindow,
};

//! Core stack processing modules

pub mod composite;
pub mod despeckle;
pub mod focal;
pub mod gapfill;
pub mod moving_average;
pub mod pipeline;
pub mod quality_mask;
pub mod units;

// Re-export main types
pub use composite::TemporalCompositor;
pub use despeckle::{DespeckleParams, MultitemporalDespeckle};
pub use focal::{focal_mean, Kernel};
pub use gapfill::{GapFillParams, GapFiller};
pub use moving_average::MovingAverageJoiner;
pub use pipeline::{CompositeConfig, CompositePipeline, DenoisedComposite};
pub use quality_mask::{mask_qa, QA_BAND, QA_LAYOVER, QA_NO_DATA, QA_SHADOW};
pub use units::{
    decibel_to_power, power_to_decibel, to_decibel, to_gamma0, ANGLE_BAND, CALIBRATION_OFFSET_DB,
};

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Pixel sample type used throughout the stack.
///
/// A missing or masked pixel is `NAN`; every reduction in the crate skips
/// non-finite samples so absence propagates instead of biasing averages.
pub type Sample = f64;

/// Error types for stack processing
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    #[error("band schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("invalid radius: {0}")]
    InvalidRadius(String),

    #[error("invalid time window: {0}")]
    InvalidWindow(String),

    #[error("domain violation: expected {expected} data, got {actual}")]
    DomainViolation { expected: Domain, actual: Domain },

    #[error("empty image collection: {0}")]
    EmptyCollection(String),

    #[error("processing error: {0}")]
    Processing(String),
}

/// Result type for stack operations
pub type StackResult<T> = Result<T, StackError>;

/// Numeric domain of the pixel values an image carries.
///
/// The despeckle filter is only meaningful on linear power values, and the
/// log/exponential converters are only invertible when applied in the right
/// order, so every image carries its domain and the boundaries check it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Domain {
    /// Raw digital numbers as delivered in the mosaic tiles
    DigitalNumber,
    /// Logarithmic backscatter (dB)
    Decibel,
    /// Linear power
    Power,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::DigitalNumber => write!(f, "digital-number"),
            Domain::Decibel => write!(f, "decibel"),
            Domain::Power => write!(f, "power"),
        }
    }
}

/// Calendar unit for temporal window offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Day,
    Month,
    Year,
}

/// Temporal neighborhood around an image's acquisition time.
///
/// Offsets are relative to the image timestamp: `before` reaches into the
/// past (non-positive), `after` into the future (non-negative). The window
/// an image sees is the half-open interval `[t + before, t + after)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    before: i32,
    after: i32,
    unit: TimeUnit,
}

impl TimeWindow {
    pub fn new(before: i32, after: i32, unit: TimeUnit) -> StackResult<Self> {
        if before > 0 || after < 0 {
            return Err(StackError::InvalidWindow(format!(
                "offsets must satisfy before <= 0 <= after, got before={}, after={}",
                before, after
            )));
        }
        Ok(Self {
            before,
            after,
            unit,
        })
    }

    pub fn before(&self) -> i32 {
        self.before
    }

    pub fn after(&self) -> i32 {
        self.after
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Absolute bounds of the window centered on `t`.
    pub fn bounds(&self, t: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            advance(t, self.before, self.unit),
            advance(t, self.after, self.unit),
        )
    }
}

impl Default for TimeWindow {
    /// The archive-wide default window used for mosaic despeckling:
    /// eleven years either side of the acquisition.
    fn default() -> Self {
        Self {
            before: -11,
            after: 11,
            unit: TimeUnit::Year,
        }
    }
}

fn advance(t: DateTime<Utc>, amount: i32, unit: TimeUnit) -> DateTime<Utc> {
    match unit {
        TimeUnit::Day => t + Duration::days(amount as i64),
        TimeUnit::Month => advance_months(t, amount),
        TimeUnit::Year => advance_months(t, amount.saturating_mul(12)),
    }
}

fn advance_months(t: DateTime<Utc>, months: i32) -> DateTime<Utc> {
    let shifted = if months >= 0 {
        t.checked_add_months(Months::new(months as u32))
    } else {
        t.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    // Saturates at the edge of the representable calendar range
    shifted.unwrap_or(t)
}

/// Units in which a moving-window size is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RadiusUnits {
    Pixels,
    Meters,
}

/// Shape of a focal neighborhood kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelShape {
    Square,
    Circle,
}

/// Role of a derived band relative to its source band.
///
/// Derived band names are produced here and only here, so band-set
/// membership after a transform is predictable from the input band set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandRole {
    /// Spatial or windowed mean companion band
    Mean,
    /// Per-pixel ratio of a band to its spatial mean
    Ratio,
}

impl BandRole {
    pub fn suffix(&self) -> &'static str {
        match self {
            BandRole::Mean => "mean",
            BandRole::Ratio => "ratio",
        }
    }

    pub fn band_name(&self, base: &str) -> String {
        format!("{}_{}", base, self.suffix())
    }
}

/// Pixel-wise aggregation applied across a set of images.
///
/// All variants are order-insensitive; order-sensitive reducers (first/last)
/// are deliberately not offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reducer {
    Mean,
    Median,
    Min,
    Sum,
    Count,
}

impl Reducer {
    /// Aggregate the values observed at one pixel position.
    ///
    /// Non-finite samples are dropped first; an empty set reduces to NaN (a
    /// missing pixel), matching masked-pixel semantics everywhere else.
    pub fn apply(&self, values: &mut Vec<Sample>) -> Sample {
        values.retain(|v| v.is_finite());
        if values.is_empty() {
            return Sample::NAN;
        }
        match self {
            Reducer::Mean => values.iter().sum::<Sample>() / values.len() as Sample,
            Reducer::Median => {
                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    (values[mid - 1] + values[mid]) / 2.0
                } else {
                    values[mid]
                }
            }
            Reducer::Min => values.iter().cloned().fold(Sample::INFINITY, Sample::min),
            Reducer::Sum => values.iter().sum(),
            Reducer::Count => values.len() as Sample,
        }
    }
}

/// Geospatial footprint of an image
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

/// Scalar metadata carried by every image.
///
/// Transforms clone the whole struct, so the fields the temporal stages
/// depend on (asset index, start time, footprint, asset size) survive every
/// unit conversion and filtering step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Asset identifier within the source catalog
    pub index: String,
    /// Acquisition start time
    pub time_start: DateTime<Utc>,
    pub footprint: BoundingBox,
    /// Stored asset size in bytes
    pub asset_size: u64,
    /// Ground pixel spacing in meters, used to resolve meter-sized kernels
    pub pixel_spacing: f64,
    /// Free-form scalar properties, queried by `filter_metadata`
    pub properties: HashMap<String, String>,
}

impl ImageMetadata {
    pub fn new(index: impl Into<String>, time_start: DateTime<Utc>) -> Self {
        Self {
            index: index.into(),
            time_start,
            footprint: BoundingBox::default(),
            asset_size: 0,
            // 25 m annual mosaic grid
            pixel_spacing: 25.0,
            properties: HashMap::new(),
        }
    }

    pub fn with_pixel_spacing(mut self, meters: f64) -> Self {
        self.pixel_spacing = meters;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

//! Temporal compositing of an image stack over a date range.

use crate::raster::{ImageCollection, RasterImage};
use crate::types::{Reducer, Sample, StackError, StackResult};
use chrono::{DateTime, Utc};
use ndarray::Array2;

/// Reduces a stack to a single composite image over a half-open date range.
///
/// The output band names are declared up front, one per input band in input
/// order, so the rename after reduction can never partially apply.
pub struct TemporalCompositor {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    reducer: Reducer,
    output_bands: Vec<String>,
}

impl TemporalCompositor {
    pub fn new(
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        reducer: Reducer,
        output_bands: Vec<String>,
    ) -> StackResult<Self> {
        if from >= to {
            return Err(StackError::InvalidWindow(format!(
                "composite range is empty: {} >= {}",
                from, to
            )));
        }
        if output_bands.is_empty() {
            return Err(StackError::SchemaMismatch(
                "at least one output band name is required".to_string(),
            ));
        }
        Ok(Self {
            from,
            to,
            reducer,
            output_bands,
        })
    }

    /// Composite the images acquired in `[from, to)`.
    ///
    /// An empty input collection is a configuration error; a date range that
    /// matches no images produces a composite whose bands hold no valid
    /// pixels, surfaced to the caller for inspection rather than raised.
    pub fn composite(&self, images: &ImageCollection) -> StackResult<RasterImage> {
        let schema = images.band_schema()?;
        if schema.len() != self.output_bands.len() {
            return Err(StackError::SchemaMismatch(format!(
                "{} output band names declared for {} input bands",
                self.output_bands.len(),
                schema.len()
            )));
        }
        let dims = images.grid_dims()?;

        let window = images.filter_date(self.from, self.to);
        log::info!(
            "Compositing {} of {} images in [{}, {}) with {:?}",
            window.len(),
            images.len(),
            self.from,
            self.to,
            self.reducer
        );

        if window.is_empty() {
            log::warn!("no images in the composite range, producing a missing-data composite");
            let first = &images.images()[0];
            let mut out = RasterImage::new(first.metadata().clone(), first.domain());
            for name in &self.output_bands {
                out = out.with_band(name.clone(), Array2::from_elem(dims, Sample::NAN))?;
            }
            return Ok(out);
        }

        window.reduce(self.reducer)?.renamed(&self.output_bands)
    }
}

//! In-memory raster images and time-ordered image collections.
//!
//! This is the seam to the raster data source: callers build `RasterImage`
//! values from whatever catalog they have and hand the crate an
//! `ImageCollection`. Evaluation is eager; a collection holds
//! N images x bands x grid cells of `f64` in memory.

use crate::types::{Domain, ImageMetadata, Reducer, Sample, StackError, StackResult};
use chrono::{DateTime, Utc};
use ndarray::Array2;

/// A single multi-band raster image.
///
/// Bands are named, ordered, and share one grid shape. Images are value
/// types: every transform produces a new image, never mutates in place.
#[derive(Debug, Clone)]
pub struct RasterImage {
    bands: Vec<(String, Array2<Sample>)>,
    metadata: ImageMetadata,
    domain: Domain,
}

impl RasterImage {
    /// Create an empty image; add bands with [`with_band`](Self::with_band).
    pub fn new(metadata: ImageMetadata, domain: Domain) -> Self {
        Self {
            bands: Vec::new(),
            metadata,
            domain,
        }
    }

    /// Append a band. Rejects duplicate names and grids whose shape differs
    /// from the bands already present.
    pub fn with_band(mut self, name: impl Into<String>, data: Array2<Sample>) -> StackResult<Self> {
        let name = name.into();
        if self.bands.iter().any(|(n, _)| n.as_str() == name) {
            return Err(StackError::SchemaMismatch(format!(
                "image '{}' already has a band '{}'",
                self.metadata.index, name
            )));
        }
        if let Some(dims) = self.dims() {
            if data.dim() != dims {
                return Err(StackError::Processing(format!(
                    "band '{}' has grid {:?}, expected {:?}",
                    name,
                    data.dim(),
                    dims
                )));
            }
        }
        self.bands.push((name, data));
        Ok(self)
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn has_band(&self, name: &str) -> bool {
        self.bands.iter().any(|(n, _)| n.as_str() == name)
    }

    pub fn band(&self, name: &str) -> StackResult<&Array2<Sample>> {
        self.bands
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, d)| d)
            .ok_or_else(|| {
                StackError::SchemaMismatch(format!(
                    "image '{}' has no band '{}'",
                    self.metadata.index, name
                ))
            })
    }

    /// Bands in declaration order.
    pub fn bands(&self) -> impl Iterator<Item = (&str, &Array2<Sample>)> {
        self.bands.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn num_bands(&self) -> usize {
        self.bands.len()
    }

    /// Grid shape shared by all bands, `None` for a band-less image.
    pub fn dims(&self) -> Option<(usize, usize)> {
        self.bands.first().map(|(_, d)| d.dim())
    }

    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.metadata.time_start
    }

    /// Fail with a `DomainViolation` unless the image carries `expected` data.
    pub fn expect_domain(&self, expected: Domain) -> StackResult<()> {
        if self.domain != expected {
            return Err(StackError::DomainViolation {
                expected,
                actual: self.domain,
            });
        }
        Ok(())
    }

    /// Keep only the named bands, in the order given.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> StackResult<RasterImage> {
        let mut out = RasterImage::new(self.metadata.clone(), self.domain);
        for name in names {
            let data = self.band(name.as_ref())?.clone();
            out = out.with_band(name.as_ref(), data)?;
        }
        Ok(out)
    }

    /// Rename all bands positionally; the name count must match the band count.
    pub fn renamed<S: AsRef<str>>(&self, names: &[S]) -> StackResult<RasterImage> {
        if names.len() != self.bands.len() {
            return Err(StackError::SchemaMismatch(format!(
                "image '{}': {} names supplied for {} bands",
                self.metadata.index,
                names.len(),
                self.bands.len()
            )));
        }
        let bands = self
            .bands
            .iter()
            .zip(names)
            .map(|((_, d), n)| (n.as_ref().to_string(), d.clone()))
            .collect();
        Ok(RasterImage {
            bands,
            metadata: self.metadata.clone(),
            domain: self.domain,
        })
    }

    /// Apply a pure per-pixel function to every band, tagging the result
    /// with the domain it lands in. Metadata is carried over unchanged.
    pub fn map_pixels<F>(&self, domain: Domain, f: F) -> RasterImage
    where
        F: Fn(Sample) -> Sample,
    {
        let bands = self
            .bands
            .iter()
            .map(|(n, d)| (n.clone(), d.mapv(|v| f(v))))
            .collect();
        RasterImage {
            bands,
            metadata: self.metadata.clone(),
            domain,
        }
    }
}

/// A set of raster images ordered by acquisition time.
#[derive(Debug, Clone, Default)]
pub struct ImageCollection {
    images: Vec<RasterImage>,
}

impl ImageCollection {
    /// Build a collection, sorting by acquisition time (stable for ties).
    pub fn from_images(mut images: Vec<RasterImage>) -> Self {
        images.sort_by_key(|i| i.timestamp());
        Self { images }
    }

    pub fn images(&self) -> &[RasterImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn first(&self) -> Option<&RasterImage> {
        self.images.first()
    }

    /// The band schema shared by every image in the collection.
    ///
    /// The schema is taken from the first image and verified against the
    /// rest, so a mismatch is caught before any reduction starts.
    pub fn band_schema(&self) -> StackResult<Vec<String>> {
        let first = self.first().ok_or_else(|| {
            StackError::EmptyCollection("cannot derive a band schema".to_string())
        })?;
        let schema: Vec<String> = first.band_names().iter().map(|s| s.to_string()).collect();
        for image in &self.images[1..] {
            let names = image.band_names();
            if names.len() != schema.len()
                || names.iter().zip(&schema).any(|(a, b)| *a != b.as_str())
            {
                return Err(StackError::SchemaMismatch(format!(
                    "image '{}' has bands {:?}, expected {:?}",
                    image.metadata().index,
                    names,
                    schema
                )));
            }
        }
        Ok(schema)
    }

    /// The grid shape shared by every image in the collection.
    pub fn grid_dims(&self) -> StackResult<(usize, usize)> {
        let first = self.first().ok_or_else(|| {
            StackError::EmptyCollection("cannot derive grid dimensions".to_string())
        })?;
        let dims = first.dims().ok_or_else(|| {
            StackError::Processing(format!(
                "image '{}' carries no bands",
                first.metadata().index
            ))
        })?;
        for image in &self.images {
            if image.dims() != Some(dims) {
                return Err(StackError::Processing(format!(
                    "image '{}' has grid {:?}, expected {:?}",
                    image.metadata().index,
                    image.dims(),
                    dims
                )));
            }
        }
        Ok(dims)
    }

    /// Images acquired in the half-open range `[from, to)`.
    pub fn filter_date(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> ImageCollection {
        let images = self
            .images
            .iter()
            .filter(|i| {
                let t = i.timestamp();
                t >= from && t < to
            })
            .cloned()
            .collect();
        ImageCollection { images }
    }

    /// Images whose metadata property `key` exists and satisfies `predicate`.
    pub fn filter_metadata<F>(&self, key: &str, predicate: F) -> ImageCollection
    where
        F: Fn(&str) -> bool,
    {
        let images = self
            .images
            .iter()
            .filter(|i| {
                i.metadata()
                    .properties
                    .get(key)
                    .map(|v| predicate(v))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        ImageCollection { images }
    }

    /// Keep only the named bands in every image.
    pub fn select<S: AsRef<str> + Sync>(&self, names: &[S]) -> StackResult<ImageCollection> {
        self.map(|image| image.select(names))
    }

    /// Apply a pure Image -> Image transform to every image.
    #[cfg(feature = "parallel")]
    pub fn map<F>(&self, f: F) -> StackResult<ImageCollection>
    where
        F: Fn(&RasterImage) -> StackResult<RasterImage> + Sync,
    {
        use rayon::prelude::*;
        let mapped: StackResult<Vec<RasterImage>> =
            self.images.par_iter().map(|i| f(i)).collect();
        Ok(ImageCollection::from_images(mapped?))
    }

    /// Apply a pure Image -> Image transform to every image.
    #[cfg(not(feature = "parallel"))]
    pub fn map<F>(&self, f: F) -> StackResult<ImageCollection>
    where
        F: Fn(&RasterImage) -> StackResult<RasterImage> + Sync,
    {
        let mapped: StackResult<Vec<RasterImage>> = self.images.iter().map(|i| f(i)).collect();
        Ok(ImageCollection::from_images(mapped?))
    }

    /// Reduce the collection band-wise to a single image.
    ///
    /// Every image must share the band schema, grid shape and domain. The
    /// reducer sees the finite values at each pixel position; positions with
    /// no valid observation come out missing.
    pub fn reduce(&self, reducer: Reducer) -> StackResult<RasterImage> {
        let schema = self.band_schema()?;
        let (rows, cols) = self.grid_dims()?;
        let first = &self.images[0];
        for image in &self.images {
            image.expect_domain(first.domain())?;
        }
        log::debug!(
            "Reducing {} images over {} bands with {:?}",
            self.images.len(),
            schema.len(),
            reducer
        );

        let mut out = RasterImage::new(first.metadata().clone(), first.domain());
        let mut values = Vec::with_capacity(self.images.len());
        for band in &schema {
            let grids: Vec<&Array2<Sample>> = self
                .images
                .iter()
                .map(|i| i.band(band))
                .collect::<StackResult<_>>()?;
            let mut result = Array2::from_elem((rows, cols), Sample::NAN);
            for r in 0..rows {
                for c in 0..cols {
                    values.clear();
                    for grid in &grids {
                        values.push(grid[[r, c]]);
                    }
                    result[[r, c]] = reducer.apply(&mut values);
                }
            }
            out = out.with_band(band.clone(), result)?;
        }
        Ok(out)
    }
}

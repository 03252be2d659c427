//! Size normalization for fixed-size variants.
//!
//! Eigen and Fisher projections need every input to have the same number of
//! pixels. The canonical size of a batch is the per-axis minimum over all of
//! its samples, so every sample is only ever shrunk along each axis.

use crate::dataset::LabeledSample;
use crate::types::CanonicalSize;
use image::imageops::{self, FilterType};
use image::GrayImage;

/// Interpolation used for every resize. Triangle is bilinear.
const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Minimum width and minimum height across `samples`, taken independently.
///
/// Returns `None` for an empty batch.
pub fn canonical_size<'a, I>(samples: I) -> Option<CanonicalSize>
where
    I: IntoIterator<Item = &'a GrayImage>,
{
    let mut size = CanonicalSize::new(u32::MAX, u32::MAX);
    let mut seen = false;
    for sample in samples {
        size.width = size.width.min(sample.width());
        size.height = size.height.min(sample.height());
        seen = true;
    }
    seen.then_some(size)
}

/// Resize `sample` to exactly `size`.
pub fn resize_to(sample: &GrayImage, size: CanonicalSize) -> GrayImage {
    if sample.dimensions() == (size.width, size.height) {
        return sample.clone();
    }
    imageops::resize(sample, size.width, size.height, RESIZE_FILTER)
}

/// Compute the canonical size of a batch and resize every sample to it in place.
pub fn normalize_batch(samples: &mut [LabeledSample]) -> Option<CanonicalSize> {
    let size = canonical_size(samples.iter().map(|s| &s.image))?;
    tracing::info!(size = %size, samples = samples.len(), "resizing batch to canonical size");
    for sample in samples.iter_mut() {
        if sample.image.dimensions() != (size.width, size.height) {
            sample.image = imageops::resize(&sample.image, size.width, size.height, RESIZE_FILTER);
        }
    }
    Some(size)
}

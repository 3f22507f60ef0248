//! Read-time projections over a spot's associations.
//!
//! Nothing here is stored: every listing recomputes the average from the
//! current review rows, so results are never stale.

use crate::entities::spot_image;

/// Mean of the star values, `0.0` when there are no reviews. Not rounded.
pub fn average_rating(stars: &[i32]) -> f64 {
    if stars.is_empty() {
        return 0.0;
    }
    let total: i64 = stars.iter().map(|&s| i64::from(s)).sum();
    total as f64 / stars.len() as f64
}

/// URLs of the images flagged as previews, keeping association order.
pub fn preview_urls<'a, I>(images: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a spot_image::Model>,
{
    images
        .into_iter()
        .filter(|image| image.preview)
        .map(|image| image.url.clone())
        .collect()
}

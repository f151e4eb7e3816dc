//! Region-of-interest geometry.
//!
//! A region is clamped independently on each side, so it shrinks near the
//! image border instead of shifting to keep its size.

use serde::Serialize;

use crate::error::Error;

/// ROI center, 0-indexed pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    #[must_use]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Half-open rectangle `[y1, y2) × [x1, x2)` into a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub y1: usize,
    pub y2: usize,
    pub x1: usize,
    pub x2: usize,
}

impl Region {
    #[must_use]
    pub const fn height(&self) -> usize {
        self.y2.saturating_sub(self.y1)
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.x2.saturating_sub(self.x1)
    }

    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.height() * self.width()
    }

    /// Check the region is ordered and fits an image of `height × width`.
    ///
    /// Empty (zero-area) regions pass; callers that divide by the pixel count
    /// must reject them separately.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRegion`] if bounds are inverted or out of range.
    pub fn within(&self, height: usize, width: usize) -> Result<(), Error> {
        if self.y1 > self.y2 || self.x1 > self.x2 {
            return Err(Error::InvalidRegion(format!(
                "inverted bounds y=[{}, {}) x=[{}, {})",
                self.y1, self.y2, self.x1, self.x2
            )));
        }
        if self.y2 > height || self.x2 > width {
            return Err(Error::InvalidRegion(format!(
                "bounds y=[{}, {}) x=[{}, {}) exceed {height}x{width} image",
                self.y1, self.y2, self.x1, self.x2
            )));
        }
        Ok(())
    }
}

/// Which part of the image to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoiSelection {
    #[default]
    WholeImage,
    Centered { center: Point, radius: usize },
}

impl RoiSelection {
    /// Resolve to concrete bounds for an image of `height × width`.
    ///
    /// # Errors
    /// See [`compute_region`].
    pub fn resolve(&self, height: usize, width: usize) -> Result<Region, Error> {
        match *self {
            Self::WholeImage => whole_image(height, width),
            Self::Centered { center, radius } => {
                compute_region(height, width, center.x, center.y, radius)
            }
        }
    }
}

/// The region covering an entire `height × width` image.
///
/// # Errors
/// Returns [`Error::InvalidRegion`] if either dimension is zero.
pub fn whole_image(height: usize, width: usize) -> Result<Region, Error> {
    if height == 0 || width == 0 {
        return Err(Error::InvalidRegion(format!(
            "image dimensions must be non-zero, got {height}x{width}"
        )));
    }
    Ok(Region {
        y1: 0,
        y2: height,
        x1: 0,
        x2: width,
    })
}

/// Square region of half-size `radius` around `(center_x, center_y)`,
/// clamped to the image on each side independently.
///
/// # Errors
/// Returns [`Error::InvalidRegion`] for zero dimensions or radius, a center
/// outside the image, or a clamped result with no area.
pub fn compute_region(
    height: usize,
    width: usize,
    center_x: usize,
    center_y: usize,
    radius: usize,
) -> Result<Region, Error> {
    if height == 0 || width == 0 {
        return Err(Error::InvalidRegion(format!(
            "image dimensions must be non-zero, got {height}x{width}"
        )));
    }
    if radius == 0 {
        return Err(Error::InvalidRegion("radius must be positive".into()));
    }
    if center_x >= width || center_y >= height {
        return Err(Error::InvalidRegion(format!(
            "center ({center_x}, {center_y}) outside {height}x{width} image"
        )));
    }

    let (y1, y2) = clamp_span(center_y, radius, height);
    let (x1, x2) = clamp_span(center_x, radius, width);
    if y2 <= y1 || x2 <= x1 {
        return Err(Error::InvalidRegion(format!(
            "degenerate bounds y=[{y1}, {y2}) x=[{x1}, {x2})"
        )));
    }
    Ok(Region { y1, y2, x1, x2 })
}

// [center - radius, center + radius) clamped to [0, limit]
fn clamp_span(center: usize, radius: usize, limit: usize) -> (usize, usize) {
    let lo = center.saturating_sub(radius);
    let hi = center.saturating_add(radius).min(limit);
    (lo, hi)
}

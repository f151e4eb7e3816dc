use serde::Serialize;

use crate::buffer::PixelBuffer;
use crate::error::Error;
use crate::processing::region::Region;

/// Mean value of each color channel over a region, on a 0-255 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelMeans {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl ChannelMeans {
    /// Overall intensity: the plain mean of the three channel means.
    #[must_use]
    pub fn intensity(&self) -> f64 {
        intensity(self)
    }

    #[must_use]
    pub const fn as_array(&self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }
}

/// Average each RGB channel over `region` of `buffer`.
///
/// Sums are accumulated as integers and divided once as `f64`.
///
/// # Errors
/// - [`Error::ChannelMismatch`] unless the buffer has exactly 3 channels.
/// - [`Error::InvalidRegion`] if the region does not fit the buffer.
/// - [`Error::EmptyRegion`] if the region selects no pixels.
pub fn compute_channel_means(buffer: &PixelBuffer, region: &Region) -> Result<ChannelMeans, Error> {
    if buffer.channels() != 3 {
        return Err(Error::ChannelMismatch {
            found: buffer.channels(),
        });
    }
    region.within(buffer.height(), buffer.width())?;
    let count = region.pixel_count();
    if count == 0 {
        return Err(Error::EmptyRegion);
    }

    let mut accum = [0u64; 3];
    for y in region.y1..region.y2 {
        let row = &buffer.row(y)[region.x1 * 3..region.x2 * 3];
        for pixel in row.chunks_exact(3) {
            for c in 0..3 {
                accum[c] += u64::from(pixel[c]);
            }
        }
    }

    let n = count as f64;
    Ok(ChannelMeans {
        r: accum[0] as f64 / n,
        g: accum[1] as f64 / n,
        b: accum[2] as f64 / n,
    })
}

pub fn intensity(means: &ChannelMeans) -> f64 {
    (means.r + means.g + means.b) / 3.0
}

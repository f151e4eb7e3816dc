//! Decoded, read-only pixel data handed to the measurement core.

use image::RgbImage;

use crate::error::Error;

/// Interleaved, row-major 8-bit pixel data of shape `height × width × channels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    height: usize,
    width: usize,
    channels: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw interleaved bytes.
    ///
    /// # Errors
    /// Returns [`Error::EmptyImage`] if any dimension is zero and
    /// [`Error::BufferSize`] if `data` does not hold exactly
    /// `height * width * channels` bytes.
    pub fn from_raw(
        height: usize,
        width: usize,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self, Error> {
        if height == 0 || width == 0 {
            return Err(Error::EmptyImage { height, width });
        }
        if channels == 0 {
            return Err(Error::ChannelMismatch { found: 0 });
        }
        let expected = height.saturating_mul(width).saturating_mul(channels);
        if data.len() != expected {
            return Err(Error::BufferSize {
                expected,
                found: data.len(),
            });
        }
        Ok(Self {
            height,
            width,
            channels,
            data,
        })
    }

    /// Every pixel set to the same RGB value.
    ///
    /// # Errors
    /// Returns [`Error::EmptyImage`] if either dimension is zero.
    pub fn filled(height: usize, width: usize, rgb: [u8; 3]) -> Result<Self, Error> {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(height.saturating_mul(width).saturating_mul(3))
            .collect();
        Self::from_raw(height, width, 3, data)
    }

    /// Take ownership of a decoded RGB image.
    ///
    /// # Errors
    /// Returns [`Error::EmptyImage`] if the image has no pixels.
    pub fn from_rgb_image(img: RgbImage) -> Result<Self, Error> {
        let (w, h) = img.dimensions();
        Self::from_raw(h as usize, w as usize, 3, img.into_raw())
    }

    /// Copy back into an [`RgbImage`], e.g. for re-encoding.
    ///
    /// Returns `None` unless the buffer has exactly three channels.
    #[must_use]
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        if self.channels != 3 {
            return None;
        }
        let w = u32::try_from(self.width).ok()?;
        let h = u32::try_from(self.height).ok()?;
        RgbImage::from_raw(w, h, self.data.clone())
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Borrow one row of interleaved values.
    ///
    /// # Panics
    /// Panics if `y >= height`.
    #[must_use]
    pub fn row(&self, y: usize) -> &[u8] {
        let stride = self.width * self.channels;
        &self.data[y * stride..(y + 1) * stride]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_length_mismatch() {
        let err = PixelBuffer::from_raw(2, 2, 3, vec![0; 11]).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferSize {
                expected: 12,
                found: 11
            }
        ));
    }

    #[test]
    fn rejects_empty_dimensions() {
        assert!(matches!(
            PixelBuffer::from_raw(0, 4, 3, Vec::new()),
            Err(Error::EmptyImage { .. })
        ));
        assert!(PixelBuffer::filled(4, 0, [1, 2, 3]).is_err());
    }

    #[test]
    fn rows_are_strided_by_width_and_channels() {
        let buf = PixelBuffer::from_raw(2, 2, 3, (0..12).collect()).unwrap();
        assert_eq!(buf.row(0), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(buf.row(1), &[6, 7, 8, 9, 10, 11]);
    }

    #[test]
    fn rgb_image_round_trip_keeps_layout() {
        let img = RgbImage::from_pixel(3, 2, image::Rgb([9, 8, 7]));
        let buf = PixelBuffer::from_rgb_image(img.clone()).unwrap();
        assert_eq!((buf.height(), buf.width(), buf.channels()), (2, 3, 3));
        assert_eq!(buf.to_rgb_image().unwrap(), img);
    }

    #[test]
    fn four_channel_buffer_has_no_rgb_view() {
        let buf = PixelBuffer::from_raw(1, 1, 4, vec![1, 2, 3, 255]).unwrap();
        assert!(buf.to_rgb_image().is_none());
    }
}

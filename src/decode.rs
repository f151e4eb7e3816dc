//! Image decoding for uploaded photographs.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::error::{ImageFormatHint, UnsupportedError, UnsupportedErrorKind};
use image::{ImageError, ImageFormat, RgbImage};
use tracing::debug;

use crate::buffer::PixelBuffer;
use crate::error::Error;

// Decodes to RGB8 and applies EXIF orientation if available. Missing or
// unreadable metadata keeps the stored orientation.
fn decode_rgb8_apply_exif(bytes: &[u8]) -> Result<RgbImage, Error> {
    let reader = image::ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    match reader.format() {
        Some(ImageFormat::Jpeg | ImageFormat::Png) => {}
        other => {
            let hint = other.map_or(ImageFormatHint::Unknown, ImageFormatHint::from);
            return Err(Error::Decode(ImageError::Unsupported(
                UnsupportedError::from_format_and_kind(
                    hint.clone(),
                    UnsupportedErrorKind::Format(hint),
                ),
            )));
        }
    }
    let mut img = reader.decode()?.to_rgb8();

    let orientation = read_orientation(bytes).unwrap_or(1);
    match orientation {
        1 => {}
        2 => img = image::imageops::flip_horizontal(&img),
        3 => img = image::imageops::rotate180(&img),
        4 => img = image::imageops::flip_vertical(&img),
        5 => {
            img = image::imageops::rotate90(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        6 => img = image::imageops::rotate90(&img),
        7 => {
            img = image::imageops::rotate270(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        8 => img = image::imageops::rotate270(&img),
        _ => {}
    }
    Ok(img)
}

fn read_orientation(bytes: &[u8]) -> Option<u16> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let o = field.value.get_uint(0)? as u16;
    debug!(orientation = o, "exif orientation");
    Some(o)
}

/// Decode JPEG or PNG bytes into an RGB pixel buffer.
///
/// # Errors
/// [`Error::Decode`] for corrupt or unsupported input, [`Error::EmptyImage`]
/// if the decoded image has no pixels.
pub fn decode_rgb8(bytes: &[u8]) -> Result<PixelBuffer, Error> {
    let img = decode_rgb8_apply_exif(bytes)?;
    PixelBuffer::from_rgb_image(img)
}

/// Read `path` and decode it with [`decode_rgb8`].
pub fn load_rgb8(path: &Path) -> Result<PixelBuffer, Error> {
    let bytes = std::fs::read(path)?;
    let buffer = decode_rgb8(&bytes)?;
    debug!(
        path = %path.display(),
        width = buffer.width(),
        height = buffer.height(),
        "decoded image"
    );
    Ok(buffer)
}

/// [`load_rgb8`] on the blocking pool.
pub async fn load(path: PathBuf) -> anyhow::Result<PixelBuffer> {
    let buffer = tokio::task::spawn_blocking(move || load_rgb8(&path)).await??;
    Ok(buffer)
}

use serde::Serialize;
use tracing::debug;

use crate::buffer::PixelBuffer;
use crate::error::Error;
use crate::processing::color::{ChannelMeans, compute_channel_means};
use crate::processing::region::{Region, RoiSelection};

/// Deterministic result of measuring one region of one image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    pub region: Region,
    pub means: ChannelMeans,
    pub intensity: f64,
    pub pixel_count: usize,
}

/// Resolve `selection` against `buffer` and average the selected pixels.
///
/// # Errors
/// Propagates any region or averaging error unchanged.
pub fn measure(buffer: &PixelBuffer, selection: &RoiSelection) -> Result<Measurement, Error> {
    let region = selection.resolve(buffer.height(), buffer.width())?;
    let means = compute_channel_means(buffer, &region)?;
    let intensity = means.intensity();
    debug!(
        ?region,
        r = means.r,
        g = means.g,
        b = means.b,
        intensity,
        "measured region"
    );
    Ok(Measurement {
        region,
        means,
        intensity,
        pixel_count: region.pixel_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::region::Point;

    #[test]
    fn centered_selection_measures_only_the_roi() {
        // 4x4, bright 2x2 block in the bottom-right quadrant
        let mut data = vec![0u8; 4 * 4 * 3];
        for y in 2..4 {
            for x in 2..4 {
                let i = (y * 4 + x) * 3;
                data[i..i + 3].copy_from_slice(&[200, 100, 50]);
            }
        }
        let buf = PixelBuffer::from_raw(4, 4, 3, data).unwrap();
        let sel = RoiSelection::Centered {
            center: Point::new(3, 3),
            radius: 1,
        };
        let m = measure(&buf, &sel).unwrap();
        assert_eq!(
            m.region,
            Region {
                y1: 2,
                y2: 4,
                x1: 2,
                x2: 4
            }
        );
        assert_eq!(m.pixel_count, 4);
        assert_eq!(m.means.as_array(), [200.0, 100.0, 50.0]);
        assert!((m.intensity - 350.0 / 3.0).abs() < 1e-12);

        let whole = measure(&buf, &RoiSelection::WholeImage).unwrap();
        assert_eq!(whole.means.as_array(), [50.0, 25.0, 12.5]);
    }

    #[test]
    fn invalid_center_surfaces_error() {
        let buf = PixelBuffer::filled(4, 4, [1, 2, 3]).unwrap();
        let sel = RoiSelection::Centered {
            center: Point::new(4, 0),
            radius: 2,
        };
        assert!(matches!(measure(&buf, &sel), Err(Error::InvalidRegion(_))));
    }
}

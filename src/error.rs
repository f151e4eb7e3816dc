use thiserror::Error;

/// Library error type for measurement operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Region bounds are degenerate or fall outside the pixel buffer.
    #[error("invalid region: {0}")]
    InvalidRegion(String),

    /// The region selects zero pixels.
    #[error("region contains no pixels")]
    EmptyRegion,

    /// The pixel buffer is not three-channel RGB.
    #[error("expected 3 color channels, found {found}")]
    ChannelMismatch { found: usize },

    /// The pixel buffer has a zero dimension.
    #[error("image is empty ({height}x{width})")]
    EmptyImage { height: usize, width: usize },

    /// Raw pixel data does not match the declared dimensions.
    #[error("pixel buffer holds {found} bytes, expected {expected}")]
    BufferSize { expected: usize, found: usize },

    /// The uploaded bytes could not be decoded as an image.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub mod ai;
pub mod buffer;
pub mod config;
pub mod credentials;
pub mod decode;
pub mod error;
pub mod processing {
    pub mod color;
    pub mod measure;
    pub mod region;
}
pub mod report;

pub use buffer::PixelBuffer;
pub use error::Error;
pub use processing::color::{ChannelMeans, compute_channel_means, intensity};
pub use processing::measure::{Measurement, measure};
pub use processing::region::{Point, Region, RoiSelection, compute_region, whole_image};

pub mod formats;
pub mod media_info;
pub mod stream_info;

pub use formats::{MediaFormat, StreamFormat};
pub use media_info::MediaInfo;
pub use stream_info::StreamInfo;

mod builder;
mod models;

pub use builder::Kinescope;
pub use builder::{EMBED_REGEX, URL_REGEX};
pub use models::{Poster, PosterSource, SourceDescriptor, Sources, VideoInfo, VideoMeta};

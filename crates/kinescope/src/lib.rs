//! Extraction of video metadata and playable HLS formats from kinescope.io
//! pages and embed pages.
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), kinescope_parser::extractor::error::ExtractorError> {
//! use kinescope_parser::extractor::default_factory;
//!
//! let factory = default_factory()?;
//! let extractor = factory.create_extractor("https://kinescope.io/mJMGKQBudWgcHucMYoQd3g", None, None)?;
//! let media_info = extractor.extract().await?;
//! println!("{} has {} formats", media_info.id, media_info.formats.len());
//! # Ok(())
//! # }
//! ```

pub mod extractor;
pub mod media;
pub mod webpage;

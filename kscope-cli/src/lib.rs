//! Library target for the `kscope` package.
//!
//! The primary deliverable of this package is the `kscope` CLI binary
//! (`src/main.rs`). This library exists so CI can run `cargo test -p kscope --doc`
//! for feature/doctype validation.

#[doc(hidden)]
pub use kinescope_parser;

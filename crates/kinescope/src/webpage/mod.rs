//! Scraping helpers for HTML pages: embedded script objects and Open Graph
//! tags.

mod js;
mod open_graph;

pub use js::{extract_balanced_object, js_to_json, search_json};
pub use open_graph::OpenGraph;

use rustc_hash::FxHashMap;
use scraper::{Html, Selector};

const OG_META_SELECTOR: &str = r#"meta[property^="og:"], meta[name^="og:"]"#;

/// Open Graph properties of a page, keyed without the `og:` prefix.
///
/// The first occurrence of a property wins. Tags with empty content are
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct OpenGraph {
    properties: FxHashMap<String, String>,
}

impl OpenGraph {
    pub fn parse(html: &str) -> Self {
        let mut properties = FxHashMap::default();

        let Ok(selector) = Selector::parse(OG_META_SELECTOR) else {
            return Self { properties };
        };
        let document = Html::parse_document(html);

        for element in document.select(&selector) {
            let meta = element.value();
            let Some(key) = ["property", "name"]
                .into_iter()
                .filter_map(|attr| meta.attr(attr))
                .find_map(|value| value.trim().strip_prefix("og:"))
            else {
                continue;
            };

            let content = meta.attr("content").map(str::trim).unwrap_or_default();
            if !content.is_empty() {
                properties
                    .entry(key.to_ascii_lowercase())
                    .or_insert_with(|| content.to_string());
            }
        }

        Self { properties }
    }

    /// Look up a property by name, with or without the `og:` prefix.
    pub fn property(&self, name: &str) -> Option<&str> {
        let name = name.strip_prefix("og:").unwrap_or(name);
        self.properties
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.property("title")
    }

    pub fn description(&self) -> Option<&str> {
        self.property("description")
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

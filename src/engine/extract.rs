//! Resource reference extraction: pure and swappable.

use scraper::{Html, Selector};
use url::Url;

/// Collect `src` attribute values from `html` in document order, keeping only
/// well-formed absolute URLs. Relative references don't survive `Url::parse`
/// and are dropped here; scheme policy is the downstream link's predicate,
/// not this function's business.
pub fn extract_references(html: &str) -> Vec<Url> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("[src]").unwrap();
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("src"))
        .filter_map(|src| Url::parse(src).ok())
        .collect()
}

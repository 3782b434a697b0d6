//! Title/abstract extraction from source pages.
//!
//! Each field has its own ordered selector cascade; the first selector that
//! yields non-empty text wins. The two fields are independent: one missing
//! field is a partial success, both missing is a parse error.

use scraper::{Html, Selector};

use patentinsight_shared::{PatentInsightError, Result};

/// Selector cascade for the title field, most specific first.
const TITLE_SELECTORS: &[&str] = &[r#"span[itemprop="title"]"#, "h1"];

/// Selector cascade for the abstract field, most specific first.
const ABSTRACT_SELECTORS: &[&str] = &[
    r#"div[itemprop="abstract"]"#,
    r#"section[itemprop="abstract"]"#,
    "div.abstract",
];

/// Fields extracted from one fetched page.
#[derive(Debug, Clone)]
pub(crate) struct ExtractedPage {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
}

/// Extract title and abstract from a page body.
///
/// Returns a parse error only when neither field matched any selector.
pub(crate) fn extract_page(html: &str) -> Result<ExtractedPage> {
    let doc = Html::parse_document(html);

    let title = select_first_text(&doc, TITLE_SELECTORS);
    let abstract_text = select_first_text(&doc, ABSTRACT_SELECTORS);

    if title.is_none() && abstract_text.is_none() {
        return Err(PatentInsightError::parse(
            "no title or abstract selector matched",
        ));
    }

    Ok(ExtractedPage {
        title,
        abstract_text,
    })
}

/// Return the first selector's non-empty, whitespace-normalized text.
fn select_first_text(doc: &Html, selectors: &[&str]) -> Option<String> {
    for raw in selectors {
        let selector = Selector::parse(raw).expect("static selector");
        if let Some(el) = doc.select(&selector).next() {
            let text = el
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

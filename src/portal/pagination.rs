//! Reading pagination signals from the rendered result grid.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use super::format::arabic_digit_to_ascii;
use super::markers::ACTIVE_PAGE_SELECTOR;
use crate::models::PaginationState;

/// Localized "Results: <N>" label (English or Arabic), with grouping separators.
static TOTAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:results|النتائج)\s*[:：]?\s*([0-9٠-٩][0-9٠-٩,٬]*)").unwrap()
});

/// Elements whose text never renders.
const HIDDEN_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

static ACTIVE_PAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(ACTIVE_PAGE_SELECTOR).unwrap());

/// Reads total count and current page from the visible page.
#[derive(Debug, Clone)]
pub struct PaginationInspector {
    page_param: String,
}

impl Default for PaginationInspector {
    fn default() -> Self {
        Self::new("page")
    }
}

impl PaginationInspector {
    pub fn new(page_param: impl Into<String>) -> Self {
        Self {
            page_param: page_param.into(),
        }
    }

    /// Inspect rendered markup. A missing count yields `total_count == 0`.
    pub fn inspect(&self, html: &str) -> PaginationState {
        let document = Html::parse_document(html);
        let text = visible_text(document.root_element());

        let total_count = parse_total_count(&text);
        let current_page = document
            .select(&ACTIVE_PAGE)
            .filter_map(|el| parse_page_number(&el.text().collect::<String>()))
            .next()
            .unwrap_or(1);

        PaginationState::new(total_count, current_page)
    }

    /// Inspect markup, falling back to the page URL for the current page.
    pub fn inspect_with_url(&self, html: &str, page_url: &str) -> PaginationState {
        let mut state = self.inspect(html);
        if state.current_page == 1 {
            if let Some(page) = current_page_from_url(page_url, &self.page_param) {
                state = PaginationState::new(state.total_count, page);
            }
        }
        state
    }
}

/// Find the "Results: N" count in visible text; 0 when absent.
pub fn parse_total_count(text: &str) -> u64 {
    TOTAL_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| {
            let digits: String = m
                .as_str()
                .chars()
                .map(arabic_digit_to_ascii)
                .filter(char::is_ascii_digit)
                .collect();
            digits.parse().ok()
        })
        .unwrap_or(0)
}

/// Text nodes under `root`, skipping script, style and template content.
fn visible_text(root: ElementRef<'_>) -> String {
    root.descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => Some((node, &**text)),
            _ => None,
        })
        .filter(|(node, _)| {
            !node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| HIDDEN_TEXT_ELEMENTS.contains(&el.name()))
            })
        })
        .map(|(_, text)| text)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read the page number from a URL's query string.
pub fn current_page_from_url(page_url: &str, page_param: &str) -> Option<u32> {
    let url = Url::parse(page_url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == page_param)
        .and_then(|(_, value)| value.parse::<u32>().ok())
        .filter(|page| *page >= 1)
}

fn parse_page_number(text: &str) -> Option<u32> {
    let digits: String = text
        .trim()
        .chars()
        .map(arabic_digit_to_ascii)
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse::<u32>().ok().filter(|page| *page >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_total_count() {
        assert_eq!(parse_total_count("Results: 120"), 120);
        assert_eq!(parse_total_count("Showing results:1,250 documents"), 1250);
        assert_eq!(parse_total_count("النتائج: ٣٤٥"), 345);
        assert_eq!(parse_total_count("No documents"), 0);
    }

    #[test]
    fn test_inspect_reads_count_and_active_page() {
        let html = r#"<html><body>
            <div class="header"><span>Results: 120</span></div>
            <div class="eta-pagination">
                <button class="ms-Button">1</button>
                <button class="ms-Button is-checked">2</button>
                <button class="ms-Button">3</button>
            </div>
        </body></html>"#;
        let state = PaginationInspector::default().inspect(html);
        assert_eq!(state.total_count, 120);
        assert_eq!(state.current_page, 2);
        assert_eq!(state.total_pages, 3);
        assert_eq!(state.results_per_page, 50);
    }

    #[test]
    fn test_inspect_ignores_script_and_style_text() {
        let html = r#"<html><head>
            <script>window.cfg = { results: 25 };</script>
            <style>.results::before { content: "Results: 5"; }</style>
        </head><body>
            <noscript>Results: 7</noscript>
            <span>Results: 120</span>
        </body></html>"#;
        let state = PaginationInspector::default().inspect(html);
        assert_eq!(state.total_count, 120);
        assert_eq!(state.total_pages, 3);
    }

    #[test]
    fn test_inspect_defaults_when_signals_missing() {
        let state = PaginationInspector::default().inspect("<html><body>empty</body></html>");
        assert_eq!(state.total_count, 0);
        assert_eq!(state.current_page, 1);
        assert_eq!(state.total_pages, 0);
    }

    #[test]
    fn test_current_page_from_url() {
        assert_eq!(
            current_page_from_url("https://invoicing.eta.gov.eg/documents?page=4&x=1", "page"),
            Some(4)
        );
        assert_eq!(current_page_from_url("https://invoicing.eta.gov.eg/documents", "page"), None);
        assert_eq!(current_page_from_url("not a url", "page"), None);

        let state = PaginationInspector::default().inspect_with_url(
            "<p>Results: 75</p>",
            "https://invoicing.eta.gov.eg/documents?page=2",
        );
        assert_eq!(state.current_page, 2);
        assert_eq!(state.total_pages, 2);
    }
}

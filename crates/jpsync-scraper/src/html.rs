//! Small helpers over the `scraper` crate shared by the HTML vendors.
//!
//! `scraper::Html` is not `Send`, so every parse happens inside a plain
//! function that returns owned data before the caller awaits again.

use scraper::{ElementRef, Html, Selector};

/// Compiles a static CSS selector.
///
/// # Panics
///
/// Panics on an invalid selector literal; only used with constants.
pub(crate) fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector `{css}`: {e}"))
}

/// Element text with whitespace runs collapsed to single spaces.
#[must_use]
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first element matching `selector`, if any and non-empty.
#[must_use]
pub fn first_text(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .map(text_of)
        .find(|t| !t.is_empty())
}

/// The `<dd>` that follows the `<dt>` whose text equals `label`.
#[must_use]
pub fn dd_for_dt<'a>(doc: &'a Html, label: &str) -> Option<ElementRef<'a>> {
    static DT: std::sync::LazyLock<Selector> = std::sync::LazyLock::new(|| sel("dt"));
    let dt = doc.select(&DT).find(|dt| text_of(*dt) == label)?;
    dt.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "dd")
}

/// Resolves `href` against `base`, dropping the fragment.
#[must_use]
pub fn absolutize(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("javascript:") || href.starts_with("data:") {
        return None;
    }
    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    let base = reqwest::Url::parse(base).ok()?;
    let mut url = base.join(href).ok()?;
    url.set_fragment(None);
    Some(url.to_string())
}

/// Visible text of the whole document, whitespace-collapsed. Script and
/// style contents are skipped.
#[must_use]
pub fn visible_text(doc: &Html) -> String {
    let mut out = Vec::new();
    for node in doc.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let inside_code = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|el| matches!(el.value().name(), "script" | "style" | "noscript"));
        if !inside_code {
            out.extend(text.split_whitespace().map(str::to_owned));
        }
    }
    out.join(" ")
}

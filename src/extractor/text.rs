//! Small DOM helpers shared by the facet extractors.

use scraper::{ElementRef, Selector};

use crate::sanitizer::clean_text;

/// Parses a CSS selector, logging and skipping invalid ones.
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::warn!(css, error = %e, "invalid selector skipped");
            None
        }
    }
}

/// All descendants of `scope` matching `css`, in document order.
pub fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(sel) => scope.select(&sel).collect(),
        None => Vec::new(),
    }
}

/// First descendant of `scope` matching `css`.
pub fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let sel = selector(css)?;
    scope.select(&sel).next()
}

/// Collapsed text content of an element.
pub fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<String>())
}

/// Collapsed text of the first match of `css` inside `scope`, or `""`.
pub fn first_text(scope: ElementRef<'_>, css: &str) -> String {
    select_first(scope, css)
        .map(element_text)
        .unwrap_or_default()
}

pub fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

/// Element children of `el`, skipping text and comment nodes.
pub fn child_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap)
}

/// The next element sibling of `el`, skipping text nodes.
pub fn next_element<'a>(el: ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.next_siblings().find_map(ElementRef::wrap)
}

/// Returns the text inside the first `[...]` pair, brackets included.
///
/// Phonetic labels look like `美 [həˈloʊ]`; the bracketed part is the only
/// stable piece.
pub fn bracketed(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text[start..].find(']')? + start;
    Some(&text[start..=end])
}

/// Parses leading digits of a sense number such as `"2."` or `"3)"`.
pub fn parse_number(text: &str) -> Option<u32> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Strips a trailing full-width or ascii colon from a label.
pub fn strip_label_colon(label: &str) -> String {
    clean_text(label.trim_end().trim_end_matches(['：', ':']))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn bracketed_extracts_phonetic() {
        assert_eq!(bracketed("美 [həˈloʊ]"), Some("[həˈloʊ]"));
        assert_eq!(bracketed("no brackets"), None);
        assert_eq!(bracketed("open [only"), None);
    }

    #[test]
    fn parse_number_reads_leading_digits() {
        assert_eq!(parse_number(" 12. "), Some(12));
        assert_eq!(parse_number("3)"), Some(3));
        assert_eq!(parse_number("a."), None);
    }

    #[test]
    fn strip_label_colon_handles_both_widths() {
        assert_eq!(strip_label_colon("复数："), "复数");
        assert_eq!(strip_label_colon("plural: "), "plural");
    }

    #[test]
    fn invalid_selector_yields_nothing() {
        let doc = Html::parse_document("<div class='a'>x</div>");
        assert!(select_all(doc.root_element(), "div[").is_empty());
        assert_eq!(first_text(doc.root_element(), "div.a"), "x");
    }

    #[test]
    fn element_text_collapses_nested_whitespace() {
        let doc = Html::parse_document("<p id='p'>  one <b>two</b>\n three </p>");
        let p = select_first(doc.root_element(), "#p").unwrap();
        assert_eq!(element_text(p), "one two three");
    }
}

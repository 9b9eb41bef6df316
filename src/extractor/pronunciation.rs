use scraper::ElementRef;

use super::strategy::StrategyChain;
use super::text::{bracketed, element_text, next_element, select_all, select_first};
use crate::models::{Accent, Pronunciation, Pronunciations};

pub fn chain() -> StrategyChain<Pronunciations> {
    StrategyChain::new("pronunciation")
        .then("header labels", from_header_labels)
        .then("accent attributes", from_accent_attributes)
}

/// Reads `美 [..]` / `英 [..]` header labels, each followed by an audio link.
fn from_header_labels(root: ElementRef<'_>) -> Pronunciations {
    let mut out = Pronunciations::default();
    for (accent, css) in [(Accent::American, ".hd_prUS"), (Accent::British, ".hd_pr")] {
        let Some(label) = select_first(root, css) else {
            continue;
        };
        let text = element_text(label);
        let phonetic = bracketed(&text)
            .map(str::to_string)
            .unwrap_or_else(|| strip_accent_prefix(&text));
        let audio_url = next_element(label)
            .filter(|el| el.value().name() == "a")
            .and_then(|el| el.value().attr("data-mp3link"))
            .map(str::to_string);
        out.set(accent, Some(Pronunciation { phonetic, audio_url }));
    }
    out
}

/// Reads `<span class="phonetic" data-accent="us|uk">` markup.
fn from_accent_attributes(root: ElementRef<'_>) -> Pronunciations {
    let mut out = Pronunciations::default();
    for el in select_all(root, ".phonetic[data-accent]") {
        let accent = match el.value().attr("data-accent").map(str::to_ascii_lowercase) {
            Some(a) if a == "us" || a == "american" => Accent::American,
            Some(a) if a == "uk" || a == "british" => Accent::British,
            _ => continue,
        };
        if out.get(accent).is_some() {
            continue;
        }
        let text = element_text(el);
        let phonetic = bracketed(&text).map(str::to_string).unwrap_or(text);
        let audio_url = el.value().attr("data-audio").map(str::to_string);
        out.set(accent, Some(Pronunciation { phonetic, audio_url }));
    }
    out
}

fn strip_accent_prefix(text: &str) -> String {
    text.trim_start_matches(['美', '英'])
        .trim_start_matches("US")
        .trim_start_matches("UK")
        .trim()
        .to_string()
}

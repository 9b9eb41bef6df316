use scraper::ElementRef;

use super::text::{child_elements, element_text, first_text, has_class};
use crate::models::{ExamplePair, Idiom};

/// Reads idioms from an idiom block.
///
/// The block is a flat run of siblings: a title marker, then its meaning and
/// example elements, up to the next title marker. Anything before the first
/// title has no idiom to belong to and is skipped.
pub fn extract_idioms(block: ElementRef<'_>) -> Vec<Idiom> {
    let mut idioms: Vec<Idiom> = Vec::new();

    for el in child_elements(block) {
        if has_class(el, "idm_title") {
            idioms.push(Idiom {
                title: element_text(el),
                ..Idiom::default()
            });
            continue;
        }

        let Some(current) = idioms.last_mut() else {
            continue;
        };

        if has_class(el, "idm_def") {
            let text = element_text(el);
            if current.meaning.is_empty() {
                current.meaning = text;
            } else if !text.is_empty() {
                current.meaning.push_str("；");
                current.meaning.push_str(&text);
            }
        } else if has_class(el, "li_ex") {
            current
                .examples
                .push(ExamplePair::new(first_text(el, ".ex_en"), first_text(el, ".ex_cn")));
        }
    }

    idioms
}

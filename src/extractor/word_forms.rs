use scraper::ElementRef;

use super::strategy::StrategyChain;
use super::text::{child_elements, element_text, first_text, has_class, select_all, strip_label_colon};
use crate::models::WordForm;

pub fn chain() -> StrategyChain<Vec<WordForm>> {
    StrategyChain::new("word forms")
        .then("inflection header", from_inflection_header)
        .then("form list", from_form_list)
}

/// Label/link pairs: each `b_primtxt` label applies to the link after it.
fn from_inflection_header(root: ElementRef<'_>) -> Vec<WordForm> {
    let mut forms = Vec::new();
    for header in select_all(root, "div.hd_if") {
        let mut label: Option<String> = None;
        for el in child_elements(header) {
            if has_class(el, "b_primtxt") {
                label = Some(strip_label_colon(&element_text(el)));
            } else if el.value().name() == "a"
                && let Some(form_type) = label.take()
            {
                forms.push(WordForm {
                    form_type,
                    word: element_text(el),
                });
            }
        }
    }
    forms
}

fn from_form_list(root: ElementRef<'_>) -> Vec<WordForm> {
    select_all(root, ".word-forms li")
        .into_iter()
        .map(|li| WordForm {
            form_type: strip_label_colon(&first_text(li, ".form-type")),
            word: first_text(li, ".form-word"),
        })
        .filter(|f| !f.word.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn pairs_labels_with_following_links() {
        let doc = Html::parse_document(
            r#"<div class="hd_if">
                 <span class="b_primtxt">比较级：</span><a class="p1-5">quicker</a>
                 <a class="p1-5">unlabelled</a>
                 <span class="b_primtxt">最高级：</span><a class="p1-5">quickest</a>
               </div>"#,
        );

        let forms = chain().run(doc.root_element()).value;

        assert_eq!(
            forms,
            vec![
                WordForm {
                    form_type: "比较级".into(),
                    word: "quicker".into()
                },
                WordForm {
                    form_type: "最高级".into(),
                    word: "quickest".into()
                },
            ]
        );
    }

    #[test]
    fn falls_back_to_form_list() {
        let doc = Html::parse_document(
            r#"<ul class="word-forms"><li><span class="form-type">plural:</span><span class="form-word">hellos</span></li></ul>"#,
        );

        let outcome = chain().run(doc.root_element());

        assert_eq!(outcome.matched, Some("form list"));
        assert_eq!(outcome.value[0].form_type, "plural");
        assert_eq!(outcome.value[0].word, "hellos");
    }
}

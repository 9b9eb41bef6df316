use scraper::ElementRef;

use super::strategy::StrategyChain;
use super::text::{first_text, select_all, select_first};
use crate::models::Sentence;

pub fn chain() -> StrategyChain<Vec<Sentence>> {
    StrategyChain::new("sentences")
        .then("sentence segment", from_sentence_segment)
        .then("sentence list", from_sentence_list)
}

fn from_sentence_segment(root: ElementRef<'_>) -> Vec<Sentence> {
    select_all(root, "#sentenceSeg .se_li")
        .into_iter()
        .map(|li| Sentence {
            english: first_text(li, ".sen_en"),
            chinese: first_text(li, ".sen_cn"),
            audio_url: select_first(li, "[data-mp3link]")
                .and_then(|a| a.value().attr("data-mp3link"))
                .map(str::to_string),
            source: Some(first_text(li, ".sen_src")).filter(|s| !s.is_empty()),
        })
        .filter(|s| !s.english.is_empty() || !s.chinese.is_empty())
        .collect()
}

fn from_sentence_list(root: ElementRef<'_>) -> Vec<Sentence> {
    select_all(root, ".sentences li")
        .into_iter()
        .map(|li| Sentence {
            english: first_text(li, ".en"),
            chinese: first_text(li, ".cn"),
            audio_url: select_first(li, "audio[src]")
                .and_then(|a| a.value().attr("src"))
                .map(str::to_string),
            source: None,
        })
        .filter(|s| !s.english.is_empty() || !s.chinese.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn reads_segment_sentences_with_audio_and_source() {
        let doc = Html::parse_document(
            r#"<div id="sentenceSeg">
                 <div class="se_li"><div class="sen_en">Be quick.</div><div class="sen_cn">快点。</div>
                   <a class="sen_audio" data-mp3link="https://x.test/s1.mp3"></a>
                   <div class="sen_src">example.com</div></div>
                 <div class="se_li"><div class="sen_en"> </div></div>
               </div>"#,
        );

        let outcome = chain().run(doc.root_element());

        assert_eq!(outcome.value.len(), 1);
        let s = &outcome.value[0];
        assert_eq!(s.english, "Be quick.");
        assert_eq!(s.audio_url.as_deref(), Some("https://x.test/s1.mp3"));
        assert_eq!(s.source.as_deref(), Some("example.com"));
    }

    #[test]
    fn falls_back_to_plain_list() {
        let doc = Html::parse_document(
            r#"<ul class="sentences"><li><span class="en">Hi.</span><span class="cn">嗨。</span>
               <audio src="https://x.test/hi.mp3"></audio></li></ul>"#,
        );

        let outcome = chain().run(doc.root_element());

        assert_eq!(outcome.matched, Some("sentence list"));
        assert_eq!(outcome.value[0].chinese, "嗨。");
        assert_eq!(outcome.value[0].audio_url.as_deref(), Some("https://x.test/hi.mp3"));
    }
}

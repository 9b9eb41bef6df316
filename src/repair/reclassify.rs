//! Text heuristics for recovering definitions that were stored as examples.
//!
//! Older scrapes wrote the gloss of an authoritative or bilingual sense as
//! an "example" row and left the definition itself empty. The functions here
//! decide, from text alone, which children are really definitions and how
//! the rows should be regrouped. Nothing here touches the store.

use serde::Serialize;

/// Tunable limits for [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClassifierThresholds {
    /// Chinese text shorter than this, with an english side that does not
    /// start with a capital letter, reads as a gloss.
    pub short_chinese_chars: usize,
    /// Chinese text shorter than this, with a short english clause, reads as
    /// a gloss.
    pub very_short_chinese_chars: usize,
    /// Longest english clause, in words, that counts as short.
    pub max_clause_words: usize,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            short_chinese_chars: 30,
            very_short_chinese_chars: 20,
            max_clause_words: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildClass {
    Definition,
    Example,
}

/// Classifies one misfiled child from its english and chinese text.
///
/// A child is a definition when its chinese side lists glosses (contains
/// `；` or `、`), or is short and paired with an english side that is not a
/// sentence. Children without chinese text are always examples.
pub fn classify(english: &str, chinese: &str, thresholds: &ClassifierThresholds) -> ChildClass {
    let chinese = chinese.trim();
    let english = english.trim();
    if chinese.is_empty() {
        return ChildClass::Example;
    }

    if chinese.contains('；') || chinese.contains('、') {
        return ChildClass::Definition;
    }

    let chinese_len = chinese.chars().count();
    let starts_capital = english.chars().next().is_some_and(char::is_uppercase);
    if chinese_len < thresholds.short_chinese_chars && !starts_capital {
        return ChildClass::Definition;
    }

    let english_words = english.split_whitespace().count();
    if chinese_len < thresholds.very_short_chinese_chars
        && english_words <= thresholds.max_clause_words
    {
        return ChildClass::Definition;
    }

    ChildClass::Example
}

/// One existing child row, in its current order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildText {
    pub id: i64,
    pub english: String,
    pub chinese: String,
}

/// A definition recovered from a child row, with the real examples that
/// followed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveredDefinition {
    pub source_id: i64,
    pub english: String,
    pub chinese: String,
    /// Ids of the example rows that move under this definition, in order.
    pub example_ids: Vec<i64>,
}

/// How to regroup the children of one empty definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReclassifyPlan {
    /// Becomes the parent's own meaning; its row is deleted.
    pub promoted: Option<RecoveredDefinition>,
    /// Become new sibling definitions after the parent; their rows are
    /// deleted and their examples move with them.
    pub siblings: Vec<RecoveredDefinition>,
}

impl ReclassifyPlan {
    pub fn is_empty(&self) -> bool {
        self.promoted.is_none()
    }

    /// Ids of examples that stay on the parent, in order.
    pub fn parent_example_ids(&self) -> &[i64] {
        self.promoted
            .as_ref()
            .map(|p| p.example_ids.as_slice())
            .unwrap_or_default()
    }
}

/// Walks `children` in order and groups them.
///
/// The first definition-class child is promoted into the parent; every
/// later one starts a new sibling. Real examples attach to the most recent
/// definition, or to the parent when none has been seen yet. A plan with no
/// definition-class child is empty.
pub fn plan(children: &[ChildText], thresholds: &ClassifierThresholds) -> ReclassifyPlan {
    let mut leading_examples = Vec::new();
    let mut plan = ReclassifyPlan::default();

    for child in children {
        match classify(&child.english, &child.chinese, thresholds) {
            ChildClass::Definition => {
                let recovered = RecoveredDefinition {
                    source_id: child.id,
                    english: child.english.trim().to_string(),
                    chinese: child.chinese.trim().to_string(),
                    example_ids: Vec::new(),
                };
                if plan.promoted.is_none() {
                    plan.promoted = Some(RecoveredDefinition {
                        example_ids: std::mem::take(&mut leading_examples),
                        ..recovered
                    });
                } else {
                    plan.siblings.push(recovered);
                }
            }
            ChildClass::Example => {
                if let Some(sibling) = plan.siblings.last_mut() {
                    sibling.example_ids.push(child.id);
                } else if let Some(promoted) = plan.promoted.as_mut() {
                    promoted.example_ids.push(child.id);
                } else {
                    leading_examples.push(child.id);
                }
            }
        }
    }

    plan
}

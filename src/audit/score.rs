//! Aggregate integrity score.

use serde::Serialize;

/// Weight of each component; they sum to 100.
pub const DEFINITIONS_WEIGHT: f64 = 40.0;
pub const PRONUNCIATION_WEIGHT: f64 = 20.0;
pub const SENTENCES_WEIGHT: f64 = 15.0;
pub const CONSISTENCY_WEIGHT: f64 = 15.0;
pub const COMPLETENESS_WEIGHT: f64 = 10.0;

/// Corpus counts the score is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreInputs {
    pub total_words: u64,
    pub with_definitions: u64,
    pub with_pronunciation: u64,
    pub with_sentences: u64,
    /// Orphan and divergence findings.
    pub inconsistencies: u64,
    /// Critical findings.
    pub critical: u64,
}

/// Computes the 0–100 integrity score.
///
/// Coverage ratios earn their weight proportionally; the consistency and
/// completeness components start full and lose points in proportion to
/// findings per word. An empty corpus scores 0.
pub fn integrity_score(inputs: &ScoreInputs) -> u8 {
    if inputs.total_words == 0 {
        return 0;
    }
    let total = inputs.total_words as f64;
    let ratio = |n: u64| (n as f64 / total).clamp(0.0, 1.0);

    let score = DEFINITIONS_WEIGHT * ratio(inputs.with_definitions)
        + PRONUNCIATION_WEIGHT * ratio(inputs.with_pronunciation)
        + SENTENCES_WEIGHT * ratio(inputs.with_sentences)
        + CONSISTENCY_WEIGHT * (1.0 - ratio(inputs.inconsistencies))
        + COMPLETENESS_WEIGHT * (1.0 - ratio(inputs.critical));

    score.clamp(0.0, 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perfect(total: u64) -> ScoreInputs {
        ScoreInputs {
            total_words: total,
            with_definitions: total,
            with_pronunciation: total,
            with_sentences: total,
            inconsistencies: 0,
            critical: 0,
        }
    }

    #[test]
    fn weights_sum_to_one_hundred() {
        let sum = DEFINITIONS_WEIGHT
            + PRONUNCIATION_WEIGHT
            + SENTENCES_WEIGHT
            + CONSISTENCY_WEIGHT
            + COMPLETENESS_WEIGHT;
        assert_eq!(sum, 100.0);
    }

    #[test]
    fn perfect_corpus_scores_100() {
        assert_eq!(integrity_score(&perfect(1)), 100);
        assert_eq!(integrity_score(&perfect(5000)), 100);
    }

    #[test]
    fn empty_corpus_scores_zero() {
        assert_eq!(integrity_score(&ScoreInputs::default()), 0);
    }

    #[test]
    fn penalties_are_proportional_to_findings_per_word() {
        let inputs = ScoreInputs {
            inconsistencies: 2,
            critical: 1,
            ..perfect(4)
        };
        // 40 + 20 + 15 + 15 * (1 - 0.5) + 10 * (1 - 0.25) = 90
        assert_eq!(integrity_score(&inputs), 90);
    }

    #[test]
    fn penalties_saturate_instead_of_going_negative() {
        let inputs = ScoreInputs {
            total_words: 2,
            inconsistencies: 50,
            critical: 50,
            ..ScoreInputs::default()
        };
        assert_eq!(integrity_score(&inputs), 0);
    }

    #[test]
    fn coverage_ratios_round_to_nearest() {
        let inputs = ScoreInputs {
            total_words: 3,
            with_definitions: 2,
            with_pronunciation: 1,
            with_sentences: 0,
            inconsistencies: 0,
            critical: 0,
        };
        // 26.67 + 6.67 + 0 + 15 + 10 = 58.33
        assert_eq!(integrity_score(&inputs), 58);
    }
}

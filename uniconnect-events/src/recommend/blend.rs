//! Ranking of candidate events
//!
//! Cost is O(N·M·d) for N candidates, M interest strings and embedding
//! dimension d. Interest texts are embedded once per call, not per candidate.

use std::cmp::Ordering;

use tracing::debug;

use super::semantic::{tag_only_score, SemanticScorer};
use super::{CandidateEvent, RecommendOptions, RecommendationMethod, Recommendations, ScoredEvent, TieBreak};

/// Rank `candidates` for a student and keep the best `options.top_k`
///
/// Interest strings are the student's interest tag names followed by the
/// texts of previously joined events. With no interest strings, or no model,
/// candidates are ranked by `0.1 * tag_overlap` and `options.tie_break`
/// orders equal scores. On the semantic path equal scores keep candidate order.
pub fn recommend<A, B>(
    scorer: &SemanticScorer<'_>,
    interest_tags: &[A],
    past_event_texts: &[B],
    candidates: &[CandidateEvent],
    options: &RecommendOptions,
) -> Recommendations
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let interest_texts: Vec<&str> = interest_tags
        .iter()
        .map(AsRef::as_ref)
        .chain(past_event_texts.iter().map(AsRef::as_ref))
        .collect();

    let prepared = scorer.prepare(&interest_texts);

    let (scored, method) = match prepared {
        Some(prepared) => {
            debug!(
                interests = interest_texts.len(),
                embedded = prepared.embedded_count(),
                "Prepared interest embeddings"
            );
            let scored = candidates
                .iter()
                .map(|candidate| {
                    let score = scorer.score_prepared(&candidate.text(), &prepared, candidate.tag_overlap);
                    (candidate, score)
                })
                .collect::<Vec<_>>();
            (scored, RecommendationMethod::Semantic)
        }
        None => {
            let scored = candidates
                .iter()
                .map(|candidate| (candidate, tag_only_score(candidate.tag_overlap)))
                .collect::<Vec<_>>();
            (scored, RecommendationMethod::TagOnly)
        }
    };

    let tie_break = match method {
        RecommendationMethod::Semantic => TieBreak::CandidateOrder,
        RecommendationMethod::TagOnly => options.tie_break,
    };
    let items = rank(scored, tie_break, options.top_k);

    debug!(
        candidates = candidates.len(),
        interests = interest_texts.len(),
        returned = items.len(),
        method = ?method,
        "Ranked recommendations"
    );

    Recommendations { items, method }
}

/// Stable sort by score descending, then `tie_break`, then truncate
fn rank(mut scored: Vec<(&CandidateEvent, f64)>, tie_break: TieBreak, top_k: usize) -> Vec<ScoredEvent> {
    scored.sort_by(|(a, score_a), (b, score_b)| {
        score_b
            .total_cmp(score_a)
            .then_with(|| secondary_order(a, b, tie_break))
    });

    scored
        .into_iter()
        .take(top_k)
        .map(|(candidate, score)| ScoredEvent {
            id: candidate.id,
            score,
        })
        .collect()
}

fn secondary_order(a: &CandidateEvent, b: &CandidateEvent, tie_break: TieBreak) -> Ordering {
    match tie_break {
        TieBreak::CandidateOrder => Ordering::Equal,
        TieBreak::Popularity => b.participants_count.cmp(&a.participants_count),
        TieBreak::Soonest => match (a.event_date, b.event_date) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::embedding::{EmbeddingService, WordVectors};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn candidate(title: &str, description: &str, tag_overlap: u32) -> CandidateEvent {
        CandidateEvent::new(Uuid::new_v4(), title, description, tag_overlap)
    }

    fn options(top_k: usize) -> RecommendOptions {
        RecommendOptions {
            top_k,
            tie_break: TieBreak::CandidateOrder,
        }
    }

    fn vectors() -> WordVectors {
        WordVectors::from_entries([
            ("müzik", vec![1.0, 0.0]),
            ("konser", vec![0.95, 0.05]),
            ("robot", vec![0.0, 1.0]),
            ("yarışma", vec![0.1, 0.9]),
        ])
        .unwrap()
    }

    const NO_TEXT: [&str; 0] = [];

    #[test]
    fn test_tag_only_scenario_without_model() {
        let service = EmbeddingService::disabled();
        let scorer = SemanticScorer::new(&service);
        let a = candidate("A", "", 3);
        let b = candidate("B", "", 1);
        let candidates = vec![b.clone(), a.clone()];

        let result = recommend(&scorer, &["yapay zeka"], &NO_TEXT, &candidates, &options(10));

        assert_eq!(result.method, RecommendationMethod::TagOnly);
        assert_eq!(result.ids(), vec![a.id, b.id]);
        assert!((result.items[0].score - 0.3).abs() < 1e-12);
        assert!((result.items[1].score - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_empty_profile_orders_by_overlap_and_keeps_ties_stable() {
        let service = EmbeddingService::with_vectors(vectors());
        let scorer = SemanticScorer::new(&service);
        let c1 = candidate("one", "", 1);
        let c2 = candidate("two", "", 2);
        let c3 = candidate("three", "", 1);
        let c4 = candidate("four", "", 2);
        let candidates = vec![c1.clone(), c2.clone(), c3.clone(), c4.clone()];

        let result = recommend(&scorer, &NO_TEXT, &NO_TEXT, &candidates, &options(10));

        assert_eq!(result.method, RecommendationMethod::TagOnly);
        assert_eq!(result.ids(), vec![c2.id, c4.id, c1.id, c3.id]);
        for (item, c) in result.items.iter().zip([&c2, &c4, &c1, &c3]) {
            assert_eq!(item.score, f64::from(c.tag_overlap) * 0.1);
        }
    }

    #[test]
    fn test_semantic_ranking_prefers_topical_match() {
        let service = EmbeddingService::with_vectors(vectors());
        let scorer = SemanticScorer::new(&service);
        let robot = candidate("Robot", "yarışma", 1);
        let concert = candidate("Konser", "müzik", 0);
        let candidates = vec![robot.clone(), concert.clone()];

        let result = recommend(&scorer, &["müzik"], &NO_TEXT, &candidates, &options(10));

        assert_eq!(result.method, RecommendationMethod::Semantic);
        assert_eq!(result.ids(), vec![concert.id, robot.id]);
        assert!(result.items[0].score > 0.65 && result.items[0].score <= 1.0);
    }

    #[test]
    fn test_past_event_texts_count_as_interests() {
        let service = EmbeddingService::with_vectors(vectors());
        let scorer = SemanticScorer::new(&service);
        let robot = candidate("Robot", "", 0);
        let concert = candidate("Konser", "", 0);
        let candidates = vec![concert.clone(), robot.clone()];

        let result = recommend(&scorer, &NO_TEXT, &["Robot Yarışma finali"], &candidates, &options(10));

        assert_eq!(result.method, RecommendationMethod::Semantic);
        assert_eq!(result.ids()[0], robot.id);
    }

    #[test]
    fn test_top_k_truncates() {
        let service = EmbeddingService::disabled();
        let scorer = SemanticScorer::new(&service);
        let candidates: Vec<_> = (0..10).map(|i| candidate("e", "", i)).collect();

        let result = recommend(&scorer, &["x"], &NO_TEXT, &candidates, &options(3));
        let overlaps: Vec<f64> = result.items.iter().map(|item| item.score).collect();
        assert_eq!(overlaps.len(), 3);
        assert_eq!(overlaps, vec![9.0 * 0.1, 8.0 * 0.1, 7.0 * 0.1]);

        let none = recommend(&scorer, &["x"], &NO_TEXT, &candidates, &options(0));
        assert!(none.items.is_empty());
    }

    #[test]
    fn test_no_candidates_yields_empty_list() {
        let service = EmbeddingService::with_vectors(vectors());
        let scorer = SemanticScorer::new(&service);
        let result = recommend(&scorer, &["müzik"], &NO_TEXT, &[], &options(5));
        assert!(result.items.is_empty());
        assert_eq!(result.method, RecommendationMethod::Semantic);
    }

    #[test]
    fn test_popularity_tie_break_on_tag_only_path() {
        let service = EmbeddingService::disabled();
        let scorer = SemanticScorer::new(&service);
        let mut quiet = candidate("quiet", "", 2);
        quiet.participants_count = 3;
        let mut busy = candidate("busy", "", 2);
        busy.participants_count = 40;
        let top = candidate("top", "", 5);
        let candidates = vec![quiet.clone(), busy.clone(), top.clone()];

        let opts = RecommendOptions {
            top_k: 10,
            tie_break: TieBreak::Popularity,
        };
        let result = recommend(&scorer, &NO_TEXT, &NO_TEXT, &candidates, &opts);

        assert_eq!(result.ids(), vec![top.id, busy.id, quiet.id]);
    }

    #[test]
    fn test_soonest_tie_break_puts_undated_last() {
        let service = EmbeddingService::disabled();
        let scorer = SemanticScorer::new(&service);
        let undated = candidate("undated", "", 1);
        let mut later = candidate("later", "", 1);
        later.event_date = NaiveDate::from_ymd_opt(2031, 5, 1);
        let mut sooner = candidate("sooner", "", 1);
        sooner.event_date = NaiveDate::from_ymd_opt(2031, 4, 1);
        let candidates = vec![undated.clone(), later.clone(), sooner.clone()];

        let opts = RecommendOptions {
            top_k: 10,
            tie_break: TieBreak::Soonest,
        };
        let result = recommend(&scorer, &["x"], &NO_TEXT, &candidates, &opts);

        assert_eq!(result.ids(), vec![sooner.id, later.id, undated.id]);
    }

    #[test]
    fn test_tie_break_ignored_on_semantic_path() {
        let service = EmbeddingService::with_vectors(vectors());
        let scorer = SemanticScorer::new(&service);
        let mut first = candidate("Konser", "", 0);
        first.participants_count = 1;
        let mut second = candidate("Konser", "", 0);
        second.participants_count = 99;
        let candidates = vec![first.clone(), second.clone()];

        let opts = RecommendOptions {
            top_k: 10,
            tie_break: TieBreak::Popularity,
        };
        let result = recommend(&scorer, &["müzik"], &NO_TEXT, &candidates, &opts);

        assert_eq!(result.method, RecommendationMethod::Semantic);
        assert_eq!(result.ids(), vec![first.id, second.id]);
    }

    #[test]
    fn test_tie_break_parses_from_cli_names() {
        use clap::ValueEnum;

        assert_eq!(TieBreak::from_str("candidate-order", false), Ok(TieBreak::CandidateOrder));
        assert_eq!(TieBreak::from_str("popularity", false), Ok(TieBreak::Popularity));
        assert_eq!(TieBreak::from_str("Soonest", true), Ok(TieBreak::Soonest));
        assert!(TieBreak::from_str("random", false).is_err());
    }
}

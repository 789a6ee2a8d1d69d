//! Aggregation Integration Tests
//!
//! Score bounds, monotonicity and order independence.

use std::collections::BTreeSet;

use clausewise::core::{RiskAggregator, ScoringPolicy};
use clausewise::domain::{AnalysisMode, Classification, Clause, ClauseCategory, DocumentType, RiskLevel, Severity};
use proptest::prelude::*;

fn clause(ordinal: usize, category: ClauseCategory, severity: Severity) -> Clause {
    Clause::new(ordinal, (ordinal * 10, ordinal * 10 + 10), format!("Clause {}", ordinal))
        .classified(Classification::new(category, severity, "test"))
}

fn severity() -> impl Strategy<Value = Severity> {
    prop::sample::select(Severity::ALL.to_vec())
}

fn category() -> impl Strategy<Value = ClauseCategory> {
    prop::sample::select(ClauseCategory::ALL.to_vec())
}

fn clauses() -> impl Strategy<Value = Vec<Clause>> {
    prop::collection::vec((category(), severity()), 0..25).prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(i, (c, s))| clause(i, c, s))
            .collect()
    })
}

fn expected() -> impl Strategy<Value = BTreeSet<ClauseCategory>> {
    prop::collection::btree_set(category(), 0..6)
}

#[test]
fn test_nda_without_confidentiality_is_flagged() {
    let clauses = vec![
        clause(0, ClauseCategory::Term, Severity::None),
        clause(1, ClauseCategory::GoverningLaw, Severity::None),
    ];
    let report = RiskAggregator::default().aggregate(
        clauses,
        &DocumentType::Nda.expected_categories(),
        AnalysisMode::Demo,
    );

    assert!(report.missing.contains(&ClauseCategory::Confidentiality));
    assert!(report.missing.contains(&ClauseCategory::DisputeResolution));
    assert!(!report.missing.contains(&ClauseCategory::Term));
    assert_eq!(report.score, 80);
    assert_eq!(report.risk_level, RiskLevel::Low);
}

#[test]
fn test_score_floor() {
    let clauses = (0..5).map(|i| clause(i, ClauseCategory::Liability, Severity::Critical)).collect();
    let report = RiskAggregator::default().aggregate(clauses, &BTreeSet::new(), AnalysisMode::Live);
    assert_eq!(report.score, 0);
    assert_eq!(report.risk_level, RiskLevel::High);
}

proptest! {
    #[test]
    fn prop_score_is_bounded(clauses in clauses(), expected in expected()) {
        let report = RiskAggregator::default().aggregate(clauses, &expected, AnalysisMode::Demo);
        prop_assert!(report.score <= 100);
        prop_assert_eq!(report.risk_level, RiskLevel::from_score(report.score));
    }

    #[test]
    fn prop_raising_a_severity_never_raises_the_score(
        clauses in clauses(),
        expected in expected(),
        pick in any::<prop::sample::Index>(),
        raise in severity(),
    ) {
        prop_assume!(!clauses.is_empty());
        let aggregator = RiskAggregator::default();
        let before = aggregator.aggregate(clauses.clone(), &expected, AnalysisMode::Demo).score;

        let mut raised = clauses;
        let i = pick.index(raised.len());
        raised[i].severity = raised[i].severity.max(raise);
        let after = aggregator.aggregate(raised, &expected, AnalysisMode::Demo).score;

        prop_assert!(after <= before);
    }

    #[test]
    fn prop_order_independent(clauses in clauses(), expected in expected(), seed in any::<u64>()) {
        let aggregator = RiskAggregator::new(ScoringPolicy::default());
        let forward = aggregator.aggregate(clauses.clone(), &expected, AnalysisMode::Live);

        // Deterministic shuffle driven by the seed
        let mut shuffled = clauses;
        let mut state = seed | 1;
        for i in (1..shuffled.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            shuffled.swap(i, (state % (i as u64 + 1)) as usize);
        }
        let reordered = aggregator.aggregate(shuffled, &expected, AnalysisMode::Live);

        prop_assert_eq!(forward, reordered);
    }
}

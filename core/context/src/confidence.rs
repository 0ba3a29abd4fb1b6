use shared_types::SimilarIncident;

/// `internal_confidence = max(similarity)`, boosted by `0.1 * mean(similarity)`
/// when two or more matches corroborate each other, clamped to `[0, 1]`.
/// Zero when there are no matches at all (spec §4.2).
pub fn internal_confidence(matches: &[SimilarIncident]) -> f32 {
    if matches.is_empty() {
        return 0.0;
    }
    let max = matches
        .iter()
        .map(|m| m.similarity_score)
        .fold(f32::MIN, f32::max);

    if matches.len() >= 2 {
        let mean: f32 = matches.iter().map(|m| m.similarity_score).sum::<f32>() / matches.len() as f32;
        (max + 0.1 * mean).min(1.0)
    } else {
        max.min(1.0)
    }
}

/// Trigger web search if there were no similar incidents at all, or the
/// internal confidence falls below the configured threshold.
pub fn should_trigger_web_search(confidence: f32, threshold: f32, matches: &[SimilarIncident]) -> bool {
    matches.is_empty() || confidence < threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim(score: f32) -> SimilarIncident {
        SimilarIncident {
            incident_id: "x".into(),
            similarity_score: score,
            summary: String::new(),
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn no_matches_gives_zero_confidence() {
        assert_eq!(internal_confidence(&[]), 0.0);
    }

    #[test]
    fn single_match_is_just_the_similarity() {
        assert_eq!(internal_confidence(&[sim(0.75)]), 0.75);
    }

    #[test]
    fn two_matches_boost_by_scaled_mean_clamped_to_one() {
        let confidence = internal_confidence(&[sim(0.95), sim(0.9)]);
        let mean = (0.95 + 0.9) / 2.0;
        assert!((confidence - (0.95f32 + 0.1 * mean).min(1.0)).abs() < 1e-6);
    }

    #[test]
    fn web_search_triggers_when_no_matches() {
        assert!(should_trigger_web_search(0.0, 0.8, &[]));
    }

    #[test]
    fn web_search_triggers_below_threshold() {
        assert!(should_trigger_web_search(0.5, 0.8, &[sim(0.5)]));
        assert!(!should_trigger_web_search(0.9, 0.8, &[sim(0.9)]));
    }
}

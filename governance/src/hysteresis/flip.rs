//! The three flip gates.

use chrono::{DateTime, Utc};

use super::{FlipDecision, FlipGate};
use crate::config::GovernanceConfig;
use crate::model::Adr;
use crate::similarity::SimilaritySearch;

const MS_PER_HOUR: i64 = 3_600_000;

/// Absorbs float noise such as `0.95 - 0.8 < 0.15`.
const MARGIN_EPSILON: f64 = 1e-9;

/// Count prior decisions confirming `decision`, contiguously from the top.
///
/// The decision itself is excluded from its own confirmations.
pub fn count_confirmations(
    decision: &Adr,
    search: &dyn SimilaritySearch,
    config: &GovernanceConfig,
) -> u32 {
    let mut matches = search.query(&decision.search_text(), config.confirmation_window + 1);
    matches.retain(|m| m.entry.id != decision.id);
    matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    matches.truncate(config.confirmation_window);

    matches
        .iter()
        .take_while(|m| m.similarity > config.confirmation_threshold)
        .count() as u32
}

/// Decide whether `decision` may be reversed at `now` by a proposal with
/// `new_confidence`. Gates run in order and stop at the first failure.
pub fn should_flip(
    decision: &Adr,
    new_confidence: f64,
    now: DateTime<Utc>,
    search: &dyn SimilaritySearch,
    config: &GovernanceConfig,
) -> FlipDecision {
    let required = decision.min_consecutive_cycles;

    // 1. Cooldown
    if now < decision.cooldown_until {
        let remaining_ms = (decision.cooldown_until - now).num_milliseconds();
        let hours = (remaining_ms + MS_PER_HOUR - 1) / MS_PER_HOUR;
        return FlipDecision {
            should_flip: false,
            reason: format!("cooldown active: {}h remaining", hours),
            blocked_by: Some(FlipGate::Cooldown),
            cooldown_remaining_ms: remaining_ms,
            confidence_gap: None,
            confirmations: None,
            required_confirmations: required,
        };
    }

    // 2. Confidence margin
    let gap = new_confidence - decision.confidence;
    if gap + MARGIN_EPSILON < decision.min_confidence_margin {
        return FlipDecision {
            should_flip: false,
            reason: format!(
                "confidence gap {:.3} below required margin {:.3}",
                gap, decision.min_confidence_margin
            ),
            blocked_by: Some(FlipGate::ConfidenceMargin),
            cooldown_remaining_ms: 0,
            confidence_gap: Some(gap),
            confirmations: None,
            required_confirmations: required,
        };
    }

    // 3. Consecutive confirmations
    let confirmations = count_confirmations(decision, search, config);
    if confirmations < required {
        return FlipDecision {
            should_flip: false,
            reason: format!(
                "only {} consecutive confirmations, {} required",
                confirmations, required
            ),
            blocked_by: Some(FlipGate::Confirmations),
            cooldown_remaining_ms: 0,
            confidence_gap: Some(gap),
            confirmations: Some(confirmations),
            required_confirmations: required,
        };
    }

    FlipDecision {
        should_flip: true,
        reason: format!(
            "all gates passed (gap {:.3}, {} confirmations)",
            gap, confirmations
        ),
        blocked_by: None,
        cooldown_remaining_ms: 0,
        confidence_gap: Some(gap),
        confirmations: Some(confirmations),
        required_confirmations: required,
    }
}

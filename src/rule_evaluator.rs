//! Rule evaluation and confidence aggregation for Pattern F detection.
//!
//! Pure and deterministic: the same signals, log and clock always produce the
//! same [`DetectionResult`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::detection_rules::{RuleExplanation, RuleId, RuleInput, RuleRegistry, RuleResult};
use crate::interaction::Interaction;
use crate::signal_aggregator::SignalVector;

pub const HARD_TIER_CONFIDENCE: f64 = 0.50;
pub const MEDIUM_TIER_CONFIDENCE: f64 = 0.35;
pub const SOFT_TIER_CONFIDENCE: f64 = 0.15;

/// Reminder carried on every result: the rules see behavior proxies, not cognition.
pub const PROXY_CAVEAT: &str = "Derived from behavioral proxy signals (timing, scrolling, copy events, explicit actions); \
     it estimates a risk pattern and does not observe whether the user actually evaluated the response.";

/// How intrusive an intervention should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InterventionTier {
    #[default]
    None,
    Soft,
    Medium,
    Hard,
}

impl fmt::Display for InterventionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InterventionTier::None => "none",
            InterventionTier::Soft => "soft",
            InterventionTier::Medium => "medium",
            InterventionTier::Hard => "hard",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= HARD_TIER_CONFIDENCE {
            ConfidenceLevel::High
        } else if confidence >= MEDIUM_TIER_CONFIDENCE {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// What the detection was actually based on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceBasis {
    /// Always true: no rule has access to ground truth.
    pub proxy_only: bool,
    pub signal_coverage: f64,
    pub interactions_observed: u32,
    pub caveat: String,
}

/// Outcome of one evaluation. Created fresh per turn and handed to the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    /// Triggered rules in registry order.
    pub triggered_rules: Vec<RuleId>,
    pub rule_results: Vec<RuleResult>,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub recommended_tier: InterventionTier,
    pub summary: String,
    pub evidence: EvidenceBasis,
    pub evaluated_at: DateTime<Utc>,
}

impl DetectionResult {
    pub fn is_triggered(&self, rule: RuleId) -> bool {
        self.triggered_rules.contains(&rule)
    }
}

/// Map a weighted confidence to a tier.
///
/// `hard` additionally requires complete passivity among the triggered rules;
/// confidence alone never authorizes the most intrusive tier.
pub fn recommend_tier(confidence: f64, triggered: &[RuleId]) -> InterventionTier {
    if confidence >= HARD_TIER_CONFIDENCE && triggered.contains(&RuleId::CompletePassivity) {
        InterventionTier::Hard
    } else if confidence >= MEDIUM_TIER_CONFIDENCE {
        InterventionTier::Medium
    } else if confidence >= SOFT_TIER_CONFIDENCE {
        InterventionTier::Soft
    } else {
        InterventionTier::None
    }
}

/// Sum of triggered weights, clamped to `[0, 1]`.
pub fn weighted_confidence(results: &[RuleResult]) -> f64 {
    let sum: f64 = results
        .iter()
        .filter(|r| r.triggered)
        .map(|r| r.weight)
        .sum();
    if sum.is_finite() {
        sum.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Evaluates a rule registry against a session.
#[derive(Debug, Clone, Default)]
pub struct RuleEvaluator {
    registry: RuleRegistry,
}

impl RuleEvaluator {
    pub fn new(registry: RuleRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Evaluate against the current wall clock.
    pub fn evaluate(&self, signals: &SignalVector, interactions: &[Interaction]) -> DetectionResult {
        self.evaluate_at(signals, interactions, Utc::now())
    }

    /// Evaluate with an explicit clock.
    pub fn evaluate_at(
        &self,
        signals: &SignalVector,
        interactions: &[Interaction],
        now: DateTime<Utc>,
    ) -> DetectionResult {
        let rule_results: Vec<RuleResult> = if interactions.is_empty() {
            self.registry.iter().map(|rule| silent_result(rule.id, rule.weight)).collect()
        } else {
            let input = RuleInput {
                signals,
                interactions,
                now,
            };
            self.registry.iter().map(|rule| rule.evaluate(&input)).collect()
        };

        for result in &rule_results {
            debug!(
                rule = %result.rule_id,
                triggered = result.triggered,
                detected = result.explanation.detected_value,
                "pattern f rule evaluated"
            );
        }

        let triggered_rules: Vec<RuleId> = rule_results
            .iter()
            .filter(|r| r.triggered)
            .map(|r| r.rule_id)
            .collect();
        let confidence = weighted_confidence(&rule_results);
        let recommended_tier = recommend_tier(confidence, &triggered_rules);
        let interactions_observed = signals.total_interactions;

        DetectionResult {
            summary: summarize(&triggered_rules, self.registry.len(), confidence, recommended_tier, interactions_observed),
            triggered_rules,
            rule_results,
            confidence,
            confidence_level: ConfidenceLevel::from_confidence(confidence),
            recommended_tier,
            evidence: EvidenceBasis {
                proxy_only: true,
                signal_coverage: signals.signal_coverage.clamp(0.0, 1.0),
                interactions_observed,
                caveat: PROXY_CAVEAT.to_string(),
            },
            evaluated_at: now,
        }
    }
}

fn silent_result(rule_id: RuleId, weight: f64) -> RuleResult {
    RuleResult {
        rule_id,
        triggered: false,
        weight,
        explanation: RuleExplanation {
            message: "No interactions observed yet".to_string(),
            detected_value: 0.0,
            threshold: 0.0,
        },
    }
}

fn summarize(
    triggered: &[RuleId],
    rule_count: usize,
    confidence: f64,
    tier: InterventionTier,
    interactions: u32,
) -> String {
    if triggered.is_empty() {
        return format!("No Pattern F indicators across {interactions} interactions");
    }
    let codes: Vec<&str> = triggered.iter().map(|r| r.code()).collect();
    format!(
        "{} of {} Pattern F indicators triggered ({}); weighted confidence {:.2}, recommended tier: {}",
        triggered.len(),
        rule_count,
        codes.join(", "),
        confidence,
        tier
    )
}

//! Pattern F rule registry
//!
//! Each rule is an independent predicate over the signal vector and the raw
//! log, carrying a fixed importance weight and an explanation template. The
//! evaluator only ever walks the registry; adding, removing or re-weighting a
//! rule never touches the aggregation logic.
//!
//! Thresholds and weights are literal constants. They were chosen empirically
//! and must not be re-derived: changing any of them changes who gets
//! interrupted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{GuardError, GuardResult};
use crate::interaction::Interaction;
use crate::signal_aggregator::SignalVector;

pub const LONG_RESPONSE_CHARS: u32 = 500;
pub const FAST_ACCEPTANCE_MS: f64 = 10_000.0;
pub const VERIFICATION_GAP_MIN_INTERACTIONS: u32 = 5;
pub const NON_CRITICAL_RATIO: f64 = 0.2;
pub const BURST_SPAN_HOURS: i64 = 2;
pub const ABANDON_AFTER_DAYS: i64 = 7;
pub const READING_TIME_MIN_INTERACTIONS: u32 = 3;
pub const MIN_DWELL_MS: f64 = 5_000.0;
pub const CROSS_CHECK_MIN_INTERACTIONS: u32 = 5;
pub const ENGAGEMENT_MIN_INTERACTIONS: u32 = 3;
pub const DEEP_SCROLL_MIN_RATE: f64 = 20.0;

/// Identifier of a Pattern F rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleId {
    /// Long response accepted too quickly to have been read.
    #[serde(rename = "F-R1")]
    SkimAcceptance,
    /// Several interactions without a single verification.
    #[serde(rename = "F-R2")]
    VerificationGap,
    /// Terse prompts, long answers, nothing modified.
    #[serde(rename = "F-R3")]
    NonCriticalAcceptance,
    /// One short burst of use, then nothing for a week.
    #[serde(rename = "F-R4")]
    BurstThenAbandon,
    /// No verification, modification or rejection at all.
    #[serde(rename = "F-R5")]
    CompletePassivity,
    #[serde(rename = "F-R6")]
    InsufficientReadingTime,
    #[serde(rename = "F-R7")]
    NoExternalCrossCheck,
    #[serde(rename = "F-R8")]
    NoClarifyingEngagement,
    #[serde(rename = "F-R9")]
    SkimmedOnly,
}

impl RuleId {
    pub fn code(&self) -> &'static str {
        match self {
            RuleId::SkimAcceptance => "F-R1",
            RuleId::VerificationGap => "F-R2",
            RuleId::NonCriticalAcceptance => "F-R3",
            RuleId::BurstThenAbandon => "F-R4",
            RuleId::CompletePassivity => "F-R5",
            RuleId::InsufficientReadingTime => "F-R6",
            RuleId::NoExternalCrossCheck => "F-R7",
            RuleId::NoClarifyingEngagement => "F-R8",
            RuleId::SkimmedOnly => "F-R9",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Everything a rule predicate may look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub signals: &'a SignalVector,
    pub interactions: &'a [Interaction],
    pub now: DateTime<Utc>,
}

/// Raw outcome of a single predicate: whether it fired plus the measured value
/// and the threshold it was compared against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleOutcome {
    pub triggered: bool,
    pub detected: f64,
    pub threshold: f64,
}

impl RuleOutcome {
    fn new(triggered: bool, detected: f64, threshold: f64) -> Self {
        Self {
            triggered,
            detected,
            threshold,
        }
    }
}

/// Human-readable payload attached to every rule result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleExplanation {
    pub message: String,
    pub detected_value: f64,
    pub threshold: f64,
}

/// One evaluated rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResult {
    pub rule_id: RuleId,
    pub triggered: bool,
    pub weight: f64,
    pub explanation: RuleExplanation,
}

/// A registered rule: identifier, predicate, weight and explanation template.
///
/// Templates may reference `{detected}` and `{threshold}`.
#[derive(Clone)]
pub struct DetectionRule {
    pub id: RuleId,
    pub weight: f64,
    pub check: fn(&RuleInput<'_>) -> RuleOutcome,
    pub template: &'static str,
}

impl fmt::Debug for DetectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionRule")
            .field("id", &self.id)
            .field("weight", &self.weight)
            .finish()
    }
}

impl DetectionRule {
    /// Run the predicate and render its explanation.
    pub fn evaluate(&self, input: &RuleInput<'_>) -> RuleResult {
        let outcome = (self.check)(input);
        let message = self
            .template
            .replace("{detected}", &format_value(outcome.detected))
            .replace("{threshold}", &format_value(outcome.threshold));

        RuleResult {
            rule_id: self.id,
            triggered: outcome.triggered,
            weight: self.weight,
            explanation: RuleExplanation {
                message,
                detected_value: outcome.detected,
                threshold: outcome.threshold,
            },
        }
    }
}

/// Ordered collection of detection rules.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    rules: Vec<DetectionRule>,
}

impl RuleRegistry {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The nine Pattern F rules, in explanation order.
    pub fn pattern_f() -> Self {
        let rules = vec![
            DetectionRule {
                id: RuleId::SkimAcceptance,
                weight: 0.15,
                check: skim_acceptance,
                template: "Long response accepted after {detected} ms on average (fast below {threshold} ms)",
            },
            DetectionRule {
                id: RuleId::VerificationGap,
                weight: 0.20,
                check: verification_gap,
                template: "Verification rate is {detected}% across the session (expected above {threshold}%)",
            },
            DetectionRule {
                id: RuleId::NonCriticalAcceptance,
                weight: 0.10,
                check: non_critical_acceptance,
                template: "Prompt/response length ratio {detected} with no modifications (below {threshold})",
            },
            DetectionRule {
                id: RuleId::BurstThenAbandon,
                weight: 0.05,
                check: burst_then_abandon,
                template: "All activity in one burst, last seen {detected} days ago (after {threshold} days)",
            },
            DetectionRule {
                id: RuleId::CompletePassivity,
                weight: 0.25,
                check: complete_passivity,
                template: "Combined verify/modify/reject rate is {detected}% (passive at {threshold}%)",
            },
            DetectionRule {
                id: RuleId::InsufficientReadingTime,
                weight: 0.12,
                check: insufficient_reading_time,
                template: "Average dwell time {detected} ms per response (below {threshold} ms)",
            },
            DetectionRule {
                id: RuleId::NoExternalCrossCheck,
                weight: 0.10,
                check: no_external_cross_check,
                template: "Copy plus selection rate is {detected}% (cross-checking needs more than {threshold}%)",
            },
            DetectionRule {
                id: RuleId::NoClarifyingEngagement,
                weight: 0.08,
                check: no_clarifying_engagement,
                template: "Follow-up question rate is {detected}% (expected above {threshold}%)",
            },
            DetectionRule {
                id: RuleId::SkimmedOnly,
                weight: 0.10,
                check: skimmed_only,
                template: "Only {detected}% of responses scrolled past 80% depth (below {threshold}%)",
            },
        ];
        Self { rules }
    }

    /// Add a rule, replacing any existing rule with the same id.
    pub fn register(&mut self, rule: DetectionRule) -> GuardResult<()> {
        if !(rule.weight > 0.0 && rule.weight <= 1.0) {
            return Err(GuardError::validation(
                rule.id.code(),
                format!("rule weight must be in (0, 1], got {}", rule.weight),
            ));
        }
        match self.rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
        Ok(())
    }

    pub fn remove(&mut self, id: RuleId) -> Option<DetectionRule> {
        let idx = self.rules.iter().position(|r| r.id == id)?;
        Some(self.rules.remove(idx))
    }

    pub fn get(&self, id: RuleId) -> Option<&DetectionRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DetectionRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::pattern_f()
    }
}

// Collector-backed rules (reading time, cross-check, scroll depth) stay silent
// when no behavioral signals arrived at all: absence of a collector is not
// evidence of passivity.
fn has_collector_data(signals: &SignalVector) -> bool {
    signals.signal_coverage > 0.0
}

fn skim_acceptance(input: &RuleInput<'_>) -> RuleOutcome {
    let s = input.signals;
    let triggered = s.latest_response_chars > LONG_RESPONSE_CHARS
        && s.avg_acceptance_ms > 0.0
        && s.avg_acceptance_ms < FAST_ACCEPTANCE_MS;
    RuleOutcome::new(triggered, s.avg_acceptance_ms, FAST_ACCEPTANCE_MS)
}

fn verification_gap(input: &RuleInput<'_>) -> RuleOutcome {
    let s = input.signals;
    let triggered =
        s.total_interactions >= VERIFICATION_GAP_MIN_INTERACTIONS && s.verification_rate == 0.0;
    RuleOutcome::new(triggered, s.verification_rate, 0.0)
}

fn non_critical_acceptance(input: &RuleInput<'_>) -> RuleOutcome {
    let s = input.signals;
    let triggered = s.total_interactions > 0
        && s.input_output_ratio > 0.0
        && s.input_output_ratio < NON_CRITICAL_RATIO
        && s.modification_rate == 0.0;
    RuleOutcome::new(triggered, s.input_output_ratio, NON_CRITICAL_RATIO)
}

fn burst_then_abandon(input: &RuleInput<'_>) -> RuleOutcome {
    let first = input.interactions.iter().map(|m| m.timestamp).min();
    let last = input.interactions.iter().map(|m| m.timestamp).max();
    let (Some(first), Some(last)) = (first, last) else {
        return RuleOutcome::new(false, 0.0, ABANDON_AFTER_DAYS as f64);
    };

    let idle = input.now.signed_duration_since(last);
    let idle_days = idle.num_seconds().max(0) as f64 / 86_400.0;
    let triggered = last.signed_duration_since(first) <= Duration::hours(BURST_SPAN_HOURS)
        && idle > Duration::days(ABANDON_AFTER_DAYS);
    RuleOutcome::new(triggered, idle_days, ABANDON_AFTER_DAYS as f64)
}

fn complete_passivity(input: &RuleInput<'_>) -> RuleOutcome {
    let s = input.signals;
    let combined = s.verification_rate + s.modification_rate + s.rejection_rate;
    let triggered = s.total_interactions > 0
        && s.verification_rate == 0.0
        && s.modification_rate == 0.0
        && s.rejection_rate == 0.0;
    RuleOutcome::new(triggered, combined, 0.0)
}

fn insufficient_reading_time(input: &RuleInput<'_>) -> RuleOutcome {
    let s = input.signals;
    let triggered = s.total_interactions >= READING_TIME_MIN_INTERACTIONS
        && has_collector_data(s)
        && s.avg_dwell_ms < MIN_DWELL_MS;
    RuleOutcome::new(triggered, s.avg_dwell_ms, MIN_DWELL_MS)
}

fn no_external_cross_check(input: &RuleInput<'_>) -> RuleOutcome {
    let s = input.signals;
    let triggered = s.total_interactions >= CROSS_CHECK_MIN_INTERACTIONS
        && has_collector_data(s)
        && s.copy_rate == 0.0
        && s.selection_rate == 0.0;
    RuleOutcome::new(triggered, s.copy_rate + s.selection_rate, 0.0)
}

fn no_clarifying_engagement(input: &RuleInput<'_>) -> RuleOutcome {
    let s = input.signals;
    let triggered =
        s.total_interactions >= ENGAGEMENT_MIN_INTERACTIONS && s.follow_up_rate == 0.0;
    RuleOutcome::new(triggered, s.follow_up_rate, 0.0)
}

fn skimmed_only(input: &RuleInput<'_>) -> RuleOutcome {
    let s = input.signals;
    let triggered = s.total_interactions >= ENGAGEMENT_MIN_INTERACTIONS
        && has_collector_data(s)
        && s.deep_scroll_rate < DEEP_SCROLL_MIN_RATE;
    RuleOutcome::new(triggered, s.deep_scroll_rate, DEEP_SCROLL_MIN_RATE)
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

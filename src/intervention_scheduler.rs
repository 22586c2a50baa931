//! Fatigue-aware intervention scheduling.
//!
//! The scheduler never owns state. Callers pass the current
//! [`InterventionHistory`] and [`SuppressionState`] for one
//! (user, intervention type) key and receive updated copies back; persisting
//! them is the caller's job. Concurrent calls for the same key must be
//! serialized by the caller.
//!
//! Per key the scheduler moves between three states:
//!
//! * `Quiet` - nothing is recommended.
//! * `Eligible` - a tier is recommended and no suppression is active.
//! * `Suppressed` - a suppression window is open; nothing is shown regardless
//!   of confidence. Left only when the expiry timestamp passes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::rule_evaluator::InterventionTier;

pub const FATIGUE_SUPPRESSION_THRESHOLD: f64 = 70.0;
pub const FATIGUE_SUPPRESSION_MINUTES: i64 = 15;
pub const FATIGUE_ALERT_DISMISSALS: u32 = 3;
const MAX_DISENGAGEMENT_PENALTY: u32 = 30;
const MAX_EXPOSURE_PENALTY: u64 = 30;

/// Kind of intervention being scheduled, e.g. `verification-prompt`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterventionType(pub String);

impl InterventionType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterventionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fatigue is tracked per user and intervention type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionKey {
    pub user_id: String,
    pub intervention_type: InterventionType,
}

impl InterventionKey {
    pub fn new(user_id: impl Into<String>, intervention_type: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            intervention_type: InterventionType::new(intervention_type),
        }
    }

    /// Stable storage key, `user/type`.
    pub fn storage_key(&self) -> String {
        format!("{}/{}", self.user_id, self.intervention_type)
    }
}

impl fmt::Display for InterventionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.intervention_type)
    }
}

/// Exposure history for one key. Only [`record_action`] and a displaying
/// [`schedule`] call produce new versions of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InterventionHistory {
    pub dismissal_count: u32,
    pub override_count: u32,
    pub last_dismissal_at: Option<DateTime<Utc>>,
    pub last_exposure_at: Option<DateTime<Utc>>,
    pub cumulative_exposure_ms: u64,
    pub last_engaged: bool,
    pub display_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SuppressionReason {
    Dismissals { count: u32 },
    Fatigue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuppressionState {
    pub suppressed_until: Option<DateTime<Utc>>,
    pub reason: Option<SuppressionReason>,
}

impl SuppressionState {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.suppressed_until.is_some_and(|until| until > now)
    }

    /// Extend the window to `until`; an open window is never shortened.
    fn extend(&mut self, until: DateTime<Utc>, reason: SuppressionReason) {
        match self.suppressed_until {
            Some(current) if current >= until => {}
            _ => {
                self.suppressed_until = Some(until);
                self.reason = Some(reason);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterventionState {
    Quiet,
    Eligible,
    Suppressed,
}

/// What the user did with a displayed intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterventionAction {
    Dismiss,
    Skip,
    Acted,
    Override,
}

impl FromStr for InterventionAction {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_lowercase().as_str() {
            "dismiss" => Ok(InterventionAction::Dismiss),
            "skip" => Ok(InterventionAction::Skip),
            "acted" => Ok(InterventionAction::Acted),
            "override" => Ok(InterventionAction::Override),
            other => Err(format!("unknown intervention action '{other}'")),
        }
    }
}

impl fmt::Display for InterventionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InterventionAction::Dismiss => "dismiss",
            InterventionAction::Skip => "skip",
            InterventionAction::Acted => "acted",
            InterventionAction::Override => "override",
        };
        f.write_str(label)
    }
}

/// Result of one scheduling decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDecision {
    pub display: bool,
    pub tier: InterventionTier,
    pub state: InterventionState,
    pub confidence: f64,
    pub fatigue_score: f64,
    pub reason: String,
    pub updated_history: InterventionHistory,
    pub updated_suppression: SuppressionState,
}

/// Signal for the caller to surface a "we'll back off" notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FatigueAlert {
    pub key: InterventionKey,
    pub dismissal_count: u32,
    pub suppressed_until: Option<DateTime<Utc>>,
    pub message: String,
}

/// History and suppression after an action, always produced together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub updated_history: InterventionHistory,
    pub updated_suppression: SuppressionState,
    pub fatigue_score: f64,
    pub fatigue_alert: Option<FatigueAlert>,
}

/// A user action as reported by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionReport {
    pub action: InterventionAction,
    pub at: DateTime<Utc>,
    /// How long the intervention was on screen before the action.
    #[serde(default)]
    pub exposure_ms: u64,
}

/// Fatigue score in `[0, 100]` at `now`.
///
/// Grows with dismissals (banded), with dismissals that came without any
/// engagement, and with cumulative exposure; relaxes multiplicatively with
/// time since the intervention was last seen.
pub fn fatigue_score(history: &InterventionHistory, now: DateTime<Utc>) -> f64 {
    let dismissals = history.dismissal_count;
    let dismissal_band = match dismissals {
        0 => 0.0,
        1 => 10.0,
        2 => 20.0,
        _ => 40.0,
    };
    let disengagement = if !history.last_engaged && dismissals > 0 {
        dismissals.saturating_mul(10).min(MAX_DISENGAGEMENT_PENALTY) as f64
    } else {
        0.0
    };
    let exposure = (history.cumulative_exposure_ms / 60_000).min(MAX_EXPOSURE_PENALTY) as f64;

    let raw = dismissal_band + disengagement + exposure;

    let last_seen = history.last_exposure_at.or(history.last_dismissal_at);
    let decay = match last_seen {
        Some(seen) => {
            let elapsed = now.signed_duration_since(seen);
            if elapsed >= Duration::minutes(30) {
                0.5
            } else if elapsed >= Duration::minutes(15) {
                0.75
            } else {
                1.0
            }
        }
        None => 1.0,
    };

    (raw * decay).clamp(0.0, 100.0)
}

/// Suppression window earned by the given dismissal count and fatigue.
///
/// Dismissal bands give 5, 10 and 30 minutes; fatigue above 70 gives 15. The
/// longer window wins.
pub fn suppression_window(dismissals: u32, fatigue: f64) -> Option<(Duration, SuppressionReason)> {
    let by_dismissals = match dismissals {
        0 => None,
        1 => Some(5),
        2 => Some(10),
        _ => Some(30),
    }
    .map(|minutes| (Duration::minutes(minutes), SuppressionReason::Dismissals { count: dismissals }));

    let by_fatigue = (fatigue > FATIGUE_SUPPRESSION_THRESHOLD).then(|| {
        (
            Duration::minutes(FATIGUE_SUPPRESSION_MINUTES),
            SuppressionReason::Fatigue,
        )
    });

    match (by_dismissals, by_fatigue) {
        (Some(d), Some(f)) => Some(if d.0 >= f.0 { d } else { f }),
        (d, f) => d.or(f),
    }
}

pub fn intervention_state(
    tier: InterventionTier,
    suppression: &SuppressionState,
    now: DateTime<Utc>,
) -> InterventionState {
    if suppression.is_active(now) {
        InterventionState::Suppressed
    } else if tier == InterventionTier::None {
        InterventionState::Quiet
    } else {
        InterventionState::Eligible
    }
}

/// Decide whether to show an intervention of `tier` for `key` at `now`.
///
/// An unexpired suppression always wins over the recommendation.
pub fn schedule(
    key: &InterventionKey,
    tier: InterventionTier,
    confidence: f64,
    history: &InterventionHistory,
    suppression: &SuppressionState,
    now: DateTime<Utc>,
) -> ScheduleDecision {
    let confidence = if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut history = history.clone();
    let mut suppression = suppression.clone();
    let fatigue = fatigue_score(&history, now);

    let withhold = |state, reason: String, history, suppression| ScheduleDecision {
        display: false,
        tier,
        state,
        confidence,
        fatigue_score: fatigue,
        reason,
        updated_history: history,
        updated_suppression: suppression,
    };

    if suppression.is_active(now) {
        let until = suppression
            .suppressed_until
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        return withhold(
            InterventionState::Suppressed,
            format!("suppressed until {until}"),
            history,
            suppression,
        );
    }

    // Suppressed -> Eligible once the expiry has passed.
    if suppression.suppressed_until.is_some() {
        suppression = SuppressionState::default();
    }

    if fatigue > FATIGUE_SUPPRESSION_THRESHOLD {
        suppression.extend(
            expiry(now, Duration::minutes(FATIGUE_SUPPRESSION_MINUTES)),
            SuppressionReason::Fatigue,
        );
        info!(key = %key, fatigue, "fatigue threshold crossed, suppressing");
        return withhold(
            InterventionState::Suppressed,
            format!("fatigue {fatigue:.1} above {FATIGUE_SUPPRESSION_THRESHOLD}"),
            history,
            suppression,
        );
    }

    if tier == InterventionTier::None {
        return withhold(
            InterventionState::Quiet,
            "no intervention recommended".to_string(),
            history,
            suppression,
        );
    }

    history.last_exposure_at = Some(now);
    history.display_count = history.display_count.saturating_add(1);

    ScheduleDecision {
        display: true,
        tier,
        state: InterventionState::Eligible,
        confidence,
        fatigue_score: fatigue,
        reason: format!("{tier} intervention authorized at confidence {confidence:.2}"),
        updated_history: history,
        updated_suppression: suppression,
    }
}

/// End of a window starting at `start`, saturating at the latest representable instant.
fn expiry(start: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    start.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Apply a user action to the history and suppression pair.
///
/// Inputs are never mutated; both updated values come back in one
/// [`ActionOutcome`], so a caller that persists the outcome as one record
/// updates both or neither.
pub fn record_action(
    key: &InterventionKey,
    report: ActionReport,
    history: &InterventionHistory,
    suppression: &SuppressionState,
) -> ActionOutcome {
    let at = report.at;
    let mut history = history.clone();
    let mut suppression = suppression.clone();
    if suppression.suppressed_until.is_some() && !suppression.is_active(at) {
        suppression = SuppressionState::default();
    }

    let previous_dismissals = history.dismissal_count;
    history.last_exposure_at = Some(at);
    history.cumulative_exposure_ms = history.cumulative_exposure_ms.saturating_add(report.exposure_ms);

    match report.action {
        InterventionAction::Dismiss | InterventionAction::Override => {
            history.dismissal_count = history.dismissal_count.saturating_add(1);
            history.last_dismissal_at = Some(at);
            history.last_engaged = false;
            if report.action == InterventionAction::Override {
                history.override_count = history.override_count.saturating_add(1);
            }
        }
        InterventionAction::Skip => {
            history.last_engaged = false;
        }
        InterventionAction::Acted => {
            history.last_engaged = true;
        }
    }

    let fatigue = fatigue_score(&history, at);
    let dismissals_for_window = match report.action {
        InterventionAction::Dismiss | InterventionAction::Override => history.dismissal_count,
        InterventionAction::Skip | InterventionAction::Acted => 0,
    };
    if let Some((window, reason)) = suppression_window(dismissals_for_window, fatigue) {
        suppression.extend(expiry(at, window), reason);
    }

    let fatigue_alert = (previous_dismissals < FATIGUE_ALERT_DISMISSALS
        && history.dismissal_count >= FATIGUE_ALERT_DISMISSALS)
        .then(|| FatigueAlert {
            key: key.clone(),
            dismissal_count: history.dismissal_count,
            suppressed_until: suppression.suppressed_until,
            message: "You've dismissed this a few times, so we'll back off for a while.".to_string(),
        });

    if let Some(alert) = &fatigue_alert {
        info!(key = %key, dismissals = alert.dismissal_count, "fatigue alert raised");
    }

    ActionOutcome {
        updated_history: history,
        updated_suppression: suppression,
        fatigue_score: fatigue,
        fatigue_alert,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 1, 10, 0, 0).unwrap()
    }

    fn key() -> InterventionKey {
        InterventionKey::new("user-7", "verification-prompt")
    }

    fn dismiss(at: DateTime<Utc>) -> ActionReport {
        ActionReport {
            action: InterventionAction::Dismiss,
            at,
            exposure_ms: 0,
        }
    }

    #[test]
    fn fresh_history_has_no_fatigue() {
        assert_eq!(fatigue_score(&InterventionHistory::default(), t0()), 0.0);
    }

    #[test]
    fn fatigue_bands_by_dismissal_count() {
        let mut history = InterventionHistory {
            last_engaged: true,
            last_exposure_at: Some(t0()),
            ..Default::default()
        };
        let expected = [(1, 10.0), (2, 20.0), (3, 40.0), (7, 40.0)];
        for (count, score) in expected {
            history.dismissal_count = count;
            assert_eq!(fatigue_score(&history, t0()), score);
        }
    }

    #[test]
    fn disengagement_penalty_caps_at_thirty() {
        let history = InterventionHistory {
            dismissal_count: 5,
            last_engaged: false,
            last_exposure_at: Some(t0()),
            ..Default::default()
        };
        assert_eq!(fatigue_score(&history, t0()), 70.0);
    }

    #[test]
    fn fatigue_decays_multiplicatively() {
        let history = InterventionHistory {
            dismissal_count: 2,
            last_exposure_at: Some(t0()),
            ..Default::default()
        };
        // 20 band + 20 disengagement
        assert_eq!(fatigue_score(&history, t0() + Duration::minutes(10)), 40.0);
        assert_eq!(fatigue_score(&history, t0() + Duration::minutes(15)), 30.0);
        assert_eq!(fatigue_score(&history, t0() + Duration::minutes(45)), 20.0);
    }

    #[test]
    fn exposure_pushes_fatigue_past_threshold() {
        let history = InterventionHistory {
            dismissal_count: 3,
            cumulative_exposure_ms: 45 * 60_000,
            last_exposure_at: Some(t0()),
            ..Default::default()
        };
        assert_eq!(fatigue_score(&history, t0()), 100.0);
    }

    #[test]
    fn suppression_windows_by_dismissals_and_fatigue() {
        assert!(suppression_window(0, 10.0).is_none());
        assert_eq!(suppression_window(1, 0.0).unwrap().0, Duration::minutes(5));
        assert_eq!(suppression_window(2, 0.0).unwrap().0, Duration::minutes(10));
        assert_eq!(suppression_window(3, 0.0).unwrap().0, Duration::minutes(30));
        assert_eq!(suppression_window(0, 71.0).unwrap().0, Duration::minutes(15));
        assert_eq!(suppression_window(2, 71.0).unwrap().1, SuppressionReason::Fatigue);
        assert_eq!(suppression_window(4, 95.0).unwrap().0, Duration::minutes(30));
        assert!(suppression_window(0, 70.0).is_none());
    }

    #[test]
    fn eligible_recommendation_is_displayed() {
        let decision = schedule(
            &key(),
            InterventionTier::Soft,
            0.2,
            &InterventionHistory::default(),
            &SuppressionState::default(),
            t0(),
        );
        assert!(decision.display);
        assert_eq!(decision.state, InterventionState::Eligible);
        assert_eq!(decision.updated_history.display_count, 1);
        assert_eq!(decision.updated_history.last_exposure_at, Some(t0()));
    }

    #[test]
    fn no_recommendation_is_quiet() {
        let decision = schedule(
            &key(),
            InterventionTier::None,
            0.0,
            &InterventionHistory::default(),
            &SuppressionState::default(),
            t0(),
        );
        assert!(!decision.display);
        assert_eq!(decision.state, InterventionState::Quiet);
        assert_eq!(decision.updated_history, InterventionHistory::default());
    }

    #[test]
    fn active_suppression_always_wins() {
        let suppression = SuppressionState {
            suppressed_until: Some(t0() + Duration::minutes(1)),
            reason: Some(SuppressionReason::Dismissals { count: 1 }),
        };
        for tier in [InterventionTier::Soft, InterventionTier::Medium, InterventionTier::Hard] {
            for confidence in [0.0, 0.5, 1.0] {
                let decision = schedule(
                    &key(),
                    tier,
                    confidence,
                    &InterventionHistory::default(),
                    &suppression,
                    t0(),
                );
                assert!(!decision.display);
                assert_eq!(decision.state, InterventionState::Suppressed);
                assert_eq!(decision.updated_suppression, suppression);
            }
        }
    }

    #[test]
    fn expired_suppression_returns_to_eligible() {
        let suppression = SuppressionState {
            suppressed_until: Some(t0() - Duration::seconds(1)),
            reason: Some(SuppressionReason::Dismissals { count: 1 }),
        };
        let history = InterventionHistory {
            dismissal_count: 1,
            last_dismissal_at: Some(t0() - Duration::minutes(6)),
            last_exposure_at: Some(t0() - Duration::minutes(6)),
            ..Default::default()
        };
        let decision = schedule(&key(), InterventionTier::Medium, 0.4, &history, &suppression, t0());
        assert!(decision.display);
        assert_eq!(decision.updated_suppression, SuppressionState::default());
    }

    #[test]
    fn high_fatigue_suppresses_at_schedule_time() {
        let history = InterventionHistory {
            dismissal_count: 3,
            cumulative_exposure_ms: 10 * 60_000,
            last_exposure_at: Some(t0() - Duration::minutes(1)),
            ..Default::default()
        };
        let decision = schedule(&key(), InterventionTier::Hard, 0.9, &history, &SuppressionState::default(), t0());
        assert!(!decision.display);
        assert_eq!(decision.state, InterventionState::Suppressed);
        assert_eq!(
            decision.updated_suppression.suppressed_until,
            Some(t0() + Duration::minutes(15))
        );
        assert_eq!(decision.updated_suppression.reason, Some(SuppressionReason::Fatigue));
    }

    #[test]
    fn three_quick_dismissals_suppress_for_thirty_minutes() {
        let mut history = InterventionHistory::default();
        let mut suppression = SuppressionState::default();
        let mut alerts = Vec::new();
        for minute in [0, 4, 9] {
            let outcome = record_action(&key(), dismiss(t0() + Duration::minutes(minute)), &history, &suppression);
            history = outcome.updated_history;
            suppression = outcome.updated_suppression;
            alerts.extend(outcome.fatigue_alert);
        }

        let third = t0() + Duration::minutes(9);
        assert_eq!(suppression.suppressed_until, Some(third + Duration::minutes(30)));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].dismissal_count, 3);

        let decision = schedule(&key(), InterventionTier::Hard, 1.0, &history, &suppression, t0() + Duration::minutes(10));
        assert!(!decision.display);
    }

    #[test]
    fn fatigue_alert_fires_only_when_crossing_three() {
        let history = InterventionHistory {
            dismissal_count: 3,
            ..Default::default()
        };
        let outcome = record_action(&key(), dismiss(t0()), &history, &SuppressionState::default());
        assert!(outcome.fatigue_alert.is_none());
        assert_eq!(outcome.updated_history.dismissal_count, 4);
    }

    #[test]
    fn record_action_leaves_inputs_untouched_and_updates_both() {
        let history = InterventionHistory::default();
        let suppression = SuppressionState::default();
        let outcome = record_action(&key(), dismiss(t0()), &history, &suppression);

        assert_eq!(history, InterventionHistory::default());
        assert_eq!(suppression, SuppressionState::default());
        assert_eq!(outcome.updated_history.dismissal_count, 1);
        assert_eq!(
            outcome.updated_suppression.suppressed_until,
            Some(t0() + Duration::minutes(5))
        );
    }

    #[test]
    fn repeated_action_never_lowers_fatigue() {
        let start = InterventionHistory {
            dismissal_count: 1,
            cumulative_exposure_ms: 90_000,
            last_exposure_at: Some(t0() - Duration::minutes(2)),
            ..Default::default()
        };
        for action in [
            InterventionAction::Dismiss,
            InterventionAction::Skip,
            InterventionAction::Acted,
            InterventionAction::Override,
        ] {
            let report = ActionReport {
                action,
                at: t0(),
                exposure_ms: 20_000,
            };
            let first = record_action(&key(), report, &start, &SuppressionState::default());
            let second = record_action(&key(), report, &first.updated_history, &first.updated_suppression);
            assert!(
                second.fatigue_score >= first.fatigue_score,
                "{action} lowered fatigue"
            );
        }
    }

    #[test]
    fn acting_clears_disengagement_penalty_but_keeps_window() {
        let suppression = SuppressionState {
            suppressed_until: Some(t0() + Duration::minutes(3)),
            reason: Some(SuppressionReason::Dismissals { count: 2 }),
        };
        let history = InterventionHistory {
            dismissal_count: 2,
            ..Default::default()
        };
        let report = ActionReport {
            action: InterventionAction::Acted,
            at: t0(),
            exposure_ms: 0,
        };
        let outcome = record_action(&key(), report, &history, &suppression);
        assert!(outcome.updated_history.last_engaged);
        assert_eq!(outcome.fatigue_score, 20.0);
        assert_eq!(outcome.updated_suppression, suppression);
    }

    #[test]
    fn dismissal_never_shortens_an_open_window() {
        let suppression = SuppressionState {
            suppressed_until: Some(t0() + Duration::minutes(25)),
            reason: Some(SuppressionReason::Dismissals { count: 3 }),
        };
        let history = InterventionHistory {
            dismissal_count: 3,
            ..Default::default()
        };
        // a fourth dismissal at t0 earns 30 minutes, which is longer
        let outcome = record_action(&key(), dismiss(t0()), &history, &suppression);
        assert_eq!(
            outcome.updated_suppression.suppressed_until,
            Some(t0() + Duration::minutes(30))
        );

        // skip at t0 earns nothing and keeps the open window
        let skip = ActionReport {
            action: InterventionAction::Skip,
            at: t0(),
            exposure_ms: 0,
        };
        let outcome = record_action(&key(), skip, &history, &suppression);
        assert_eq!(outcome.updated_suppression, suppression);
    }

    #[test]
    fn fatigue_score_stays_bounded() {
        let history = InterventionHistory {
            dismissal_count: u32::MAX,
            cumulative_exposure_ms: u64::MAX,
            ..Default::default()
        };
        let score = fatigue_score(&history, t0());
        assert!((0.0..=100.0).contains(&score));
    }

    #[test]
    fn windows_near_the_end_of_time_saturate() {
        let late = DateTime::<Utc>::MAX_UTC - Duration::minutes(1);
        let outcome = record_action(&key(), dismiss(late), &InterventionHistory::default(), &SuppressionState::default());
        assert_eq!(outcome.updated_suppression.suppressed_until, Some(DateTime::<Utc>::MAX_UTC));
        assert!(outcome.updated_suppression.is_active(late));

        let tired = InterventionHistory {
            dismissal_count: 5,
            cumulative_exposure_ms: 40 * 60_000,
            last_exposure_at: Some(late),
            ..Default::default()
        };
        let decision = schedule(&key(), InterventionTier::Hard, 1.0, &tired, &SuppressionState::default(), late);
        assert!(!decision.display);
        assert_eq!(decision.updated_suppression.suppressed_until, Some(DateTime::<Utc>::MAX_UTC));
    }

    #[test]
    fn action_names_parse() {
        assert_eq!("Dismiss".parse::<InterventionAction>().unwrap(), InterventionAction::Dismiss);
        assert_eq!("override".parse::<InterventionAction>().unwrap(), InterventionAction::Override);
        assert!("ignore".parse::<InterventionAction>().is_err());
    }
}

//! Signal aggregation: reduces the raw interaction log and per-response
//! behavioral events into the fixed-shape [`SignalVector`] the rule evaluator
//! consumes.
//!
//! Everything here is a proxy. Dwell time, scroll depth and copy events stand
//! in for "did the user actually read and check this"; they are never treated
//! as ground truth, and [`SignalVector::signal_coverage`] reports how much of
//! the vector is backed by collector data at all.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::interaction::{Interaction, MessageSignals, Role, SignalMap};

/// Scroll depth above which a response counts as read to the end.
pub const DEEP_SCROLL_DEPTH: f64 = 0.8;

const CLARIFYING_PHRASES: &[&str] = &[
    "why",
    "how",
    "what if",
    "explain",
    "can you clarify",
    "could you elaborate",
    "what does",
    "i don't understand",
];

const VERIFICATION_PHRASES: &[&str] = &[
    "is this correct",
    "is that right",
    "are you sure",
    "double check",
    "can you check",
    "verify",
    "confirm",
];

/// Per-session aggregate of behavioral proxies, recomputed from the full log on
/// every evaluation.
///
/// Rates are percentages in `0.0..=100.0`; timings are mean milliseconds;
/// ratios are non-negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalVector {
    pub total_interactions: u32,
    pub verification_count: u32,
    pub modification_count: u32,
    pub rejection_count: u32,
    pub verification_rate: f64,
    pub modification_rate: f64,
    pub rejection_rate: f64,
    pub avg_acceptance_ms: f64,
    pub avg_dwell_ms: f64,
    pub avg_hover_ms: f64,
    pub avg_tab_away_ms: f64,
    pub avg_scroll_depth: f64,
    pub deep_scroll_rate: f64,
    pub input_output_ratio: f64,
    pub copy_rate: f64,
    pub selection_rate: f64,
    pub tab_switch_rate: f64,
    pub follow_up_rate: f64,
    /// Character length of the most recent assistant response.
    pub latest_response_chars: u32,
    /// Fraction of responses that carry any collector signal, `0.0..=1.0`.
    pub signal_coverage: f64,
}

impl SignalVector {
    /// Aggregate the ordered log and optional collector signals into a vector.
    ///
    /// An empty log yields the all-zero vector.
    pub fn aggregate(interactions: &[Interaction], signals: Option<&SignalMap>) -> Self {
        let responses: Vec<(usize, &Interaction)> = interactions
            .iter()
            .enumerate()
            .filter(|(_, msg)| msg.is_assistant())
            .collect();

        let total = responses.len();
        if total == 0 {
            return Self::default();
        }

        let verification_count = responses.iter().filter(|(_, m)| m.was_verified).count();
        let modification_count = responses.iter().filter(|(_, m)| m.was_modified).count();
        let rejection_count = responses.iter().filter(|(_, m)| m.was_rejected).count();

        let acceptance_times = responses.iter().filter_map(|(idx, response)| {
            next_user_message(interactions, *idx).and_then(|reply| {
                let gap = reply
                    .timestamp
                    .signed_duration_since(response.timestamp)
                    .num_milliseconds();
                (gap >= 0).then_some(gap as f64)
            })
        });
        let avg_acceptance_ms = mean(acceptance_times);

        let empty = SignalMap::new();
        let signal_map = signals.unwrap_or(&empty);
        let per_response: Vec<Option<&MessageSignals>> = responses
            .iter()
            .map(|(_, m)| signal_map.get(&m.id))
            .collect();
        let observed: Vec<&MessageSignals> = per_response.iter().flatten().copied().collect();

        let avg_dwell_ms = mean(observed.iter().filter_map(|s| sanitize(s.dwell_time_ms)));
        let avg_hover_ms = mean(observed.iter().filter_map(|s| sanitize(s.hover_duration_ms)));
        let avg_tab_away_ms = mean(observed.iter().filter_map(|s| sanitize(s.tab_away_ms)));

        let depths: Vec<f64> = observed
            .iter()
            .filter_map(|s| sanitize(s.scroll_depth).map(|d| d.min(1.0)))
            .collect();
        let avg_scroll_depth = mean(depths.iter().copied());
        let deep_scrolls = depths.iter().filter(|d| **d > DEEP_SCROLL_DEPTH).count();

        let copies = observed.iter().filter(|s| s.copied).count();
        let selections = observed.iter().filter(|s| s.selected).count();
        let tab_switches = observed.iter().filter(|s| s.tab_switched).count();

        let follow_ups = responses
            .iter()
            .zip(per_response.iter())
            .filter(|((idx, _), signal)| {
                match signal.and_then(|s| s.follow_up) {
                    Some(flag) => flag,
                    None => next_user_message(interactions, *idx)
                        .map(|reply| is_follow_up_question(&reply.content))
                        .unwrap_or(false),
                }
            })
            .count();

        let user_lengths = interactions
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content_len() as f64);
        let response_lengths = responses.iter().map(|(_, m)| m.content_len() as f64);
        let mean_user = mean(user_lengths);
        let mean_response = mean(response_lengths);
        let input_output_ratio = if mean_user > 0.0 && mean_response > 0.0 {
            mean_user / mean_response
        } else {
            0.0
        };

        let latest_response_chars = responses
            .last()
            .map(|(_, m)| m.content_len().min(u32::MAX as usize) as u32)
            .unwrap_or(0);

        Self {
            total_interactions: total as u32,
            verification_count: verification_count as u32,
            modification_count: modification_count as u32,
            rejection_count: rejection_count as u32,
            verification_rate: rate(verification_count, total),
            modification_rate: rate(modification_count, total),
            rejection_rate: rate(rejection_count, total),
            avg_acceptance_ms,
            avg_dwell_ms,
            avg_hover_ms,
            avg_tab_away_ms,
            avg_scroll_depth,
            deep_scroll_rate: rate(deep_scrolls, total),
            input_output_ratio,
            copy_rate: rate(copies, total),
            selection_rate: rate(selections, total),
            tab_switch_rate: rate(tab_switches, total),
            follow_up_rate: rate(follow_ups, total),
            latest_response_chars,
            signal_coverage: observed.len() as f64 / total as f64,
        }
    }
}

/// Whether a user message reads as a clarifying or checking question.
///
/// Keyword matching only; it misses paraphrases and will flag rhetorical
/// questions. Collector-supplied follow-up flags always take precedence.
pub fn is_follow_up_question(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() {
        return false;
    }
    if lowered.ends_with('?') {
        return true;
    }

    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();
    let joined = words.join(" ");

    CLARIFYING_PHRASES
        .iter()
        .chain(VERIFICATION_PHRASES.iter())
        .any(|phrase| {
            if phrase.contains(' ') {
                joined.contains(phrase)
            } else {
                words.contains(phrase)
            }
        })
}

fn next_user_message(interactions: &[Interaction], after: usize) -> Option<&Interaction> {
    interactions
        .get(after + 1)
        .filter(|m| m.role == Role::User)
}

fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn sanitize(value: Option<f64>) -> Option<f64> {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => Some(v),
        Some(v) => {
            warn!(value = v, "discarding out-of-range behavioral signal");
            None
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn t0() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn exchange(n: usize) -> Vec<Interaction> {
        let mut log = Vec::new();
        for i in 0..n {
            let base = t0() + Duration::minutes(i as i64 * 2);
            log.push(Interaction::user(&format!("u{i}"), "write the summary", base));
            log.push(Interaction::assistant(
                &format!("a{i}"),
                &"x".repeat(200),
                base + Duration::seconds(5),
            ));
        }
        log
    }

    #[test]
    fn empty_log_yields_zero_vector() {
        let signals = SignalVector::aggregate(&[], None);
        assert_eq!(signals, SignalVector::default());
        assert_eq!(signals.total_interactions, 0);
    }

    #[test]
    fn counts_and_rates_over_assistant_responses() {
        let mut log = exchange(4);
        log[1].was_verified = true;
        log[3].was_modified = true;
        log[5].was_modified = true;
        // flags on user messages are ignored
        log[0].was_rejected = true;

        let signals = SignalVector::aggregate(&log, None);
        assert_eq!(signals.total_interactions, 4);
        assert_eq!(signals.verification_count, 1);
        assert_eq!(signals.modification_count, 2);
        assert_eq!(signals.rejection_count, 0);
        assert!((signals.verification_rate - 25.0).abs() < 1e-9);
        assert!((signals.modification_rate - 50.0).abs() < 1e-9);
        assert_eq!(signals.rejection_rate, 0.0);
    }

    #[test]
    fn acceptance_time_measures_gap_to_next_user_message() {
        let log = exchange(3);
        let signals = SignalVector::aggregate(&log, None);
        // responses at +5s, next user message at +120s: 115s gap, last response has no reply
        assert!((signals.avg_acceptance_ms - 115_000.0).abs() < 1e-6);
    }

    #[test]
    fn input_output_ratio_uses_mean_lengths() {
        let log = exchange(2);
        let signals = SignalVector::aggregate(&log, None);
        let expected = "write the summary".len() as f64 / 200.0;
        assert!((signals.input_output_ratio - expected).abs() < 1e-9);
        assert_eq!(signals.latest_response_chars, 200);
    }

    #[test]
    fn collector_signals_feed_timings_and_event_rates() {
        let log = exchange(2);
        let mut map = SignalMap::new();
        map.insert(
            "a0".into(),
            MessageSignals {
                dwell_time_ms: Some(4000.0),
                scroll_depth: Some(0.95),
                copied: true,
                ..Default::default()
            },
        );
        map.insert(
            "a1".into(),
            MessageSignals {
                dwell_time_ms: Some(2000.0),
                scroll_depth: Some(0.3),
                selected: true,
                ..Default::default()
            },
        );

        let signals = SignalVector::aggregate(&log, Some(&map));
        assert!((signals.avg_dwell_ms - 3000.0).abs() < 1e-9);
        assert!((signals.deep_scroll_rate - 50.0).abs() < 1e-9);
        assert!((signals.copy_rate - 50.0).abs() < 1e-9);
        assert!((signals.selection_rate - 50.0).abs() < 1e-9);
        assert!((signals.signal_coverage - 1.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_signal_values_are_treated_as_missing() {
        let log = exchange(1);
        let mut map = SignalMap::new();
        map.insert(
            "a0".into(),
            MessageSignals {
                dwell_time_ms: Some(f64::NAN),
                hover_duration_ms: Some(-20.0),
                scroll_depth: Some(7.0),
                ..Default::default()
            },
        );
        let signals = SignalVector::aggregate(&log, Some(&map));
        assert_eq!(signals.avg_dwell_ms, 0.0);
        assert_eq!(signals.avg_hover_ms, 0.0);
        assert!((signals.avg_scroll_depth - 1.0).abs() < 1e-9);
    }

    #[test]
    fn follow_up_falls_back_to_text_when_collector_is_silent() {
        let start = t0();
        let log = vec![
            Interaction::user("u0", "draft a cover letter", start),
            Interaction::assistant("a0", "Here is a draft.", start + Duration::seconds(3)),
            Interaction::user("u1", "Why did you open with my degree", start + Duration::seconds(40)),
            Interaction::assistant("a1", "Because...", start + Duration::seconds(45)),
            Interaction::user("u2", "ok thanks", start + Duration::seconds(60)),
        ];
        let signals = SignalVector::aggregate(&log, None);
        assert!((signals.follow_up_rate - 50.0).abs() < 1e-9);

        let mut map = SignalMap::new();
        map.insert(
            "a0".into(),
            MessageSignals {
                follow_up: Some(false),
                ..Default::default()
            },
        );
        let overridden = SignalVector::aggregate(&log, Some(&map));
        assert_eq!(overridden.follow_up_rate, 0.0);
    }

    #[test]
    fn follow_up_detection_matches_phrases_not_substrings() {
        assert!(is_follow_up_question("are you sure about the dates"));
        assert!(is_follow_up_question("Can you clarify step 3"));
        assert!(is_follow_up_question("does this compile?"));
        assert!(!is_follow_up_question("showcase the results"));
        assert!(!is_follow_up_question("great, thanks"));
        assert!(!is_follow_up_question("   "));
    }

    #[test]
    fn rates_stay_within_bounds() {
        let mut log = exchange(3);
        for msg in log.iter_mut() {
            msg.was_verified = true;
            msg.was_modified = true;
            msg.was_rejected = true;
        }
        let signals = SignalVector::aggregate(&log, None);
        for r in [
            signals.verification_rate,
            signals.modification_rate,
            signals.rejection_rate,
            signals.copy_rate,
            signals.follow_up_rate,
        ] {
            assert!((0.0..=100.0).contains(&r));
        }
        assert!((signals.verification_rate - 100.0).abs() < 1e-9);
    }
}

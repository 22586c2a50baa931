// calibration_history.rs
// Purpose: Bounded ring of (predicted trust, observed outcome) pairs and the calibration quality derived from it

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const MAX_CALIBRATION_ENTRIES: usize = 100;
pub const CALIBRATION_WINDOW: usize = 50;
pub const MIN_CALIBRATION_SAMPLES: usize = 5;
pub const NEUTRAL_QUALITY: f64 = 0.5;
const BUCKET_WIDTH: f64 = 20.0;
const BUCKETS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationRecord {
    pub predicted_score: f64,
    pub was_correct: bool,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredHistory")]
pub struct CalibrationHistory {
    records: VecDeque<CalibrationRecord>,
    max_entries: usize,
}

/// Wire shape of a stored ring, re-bounded on the way in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredHistory {
    records: VecDeque<CalibrationRecord>,
    max_entries: usize,
}

impl From<StoredHistory> for CalibrationHistory {
    fn from(stored: StoredHistory) -> Self {
        let mut history = Self::new(stored.max_entries);
        history.records = stored.records;
        history.trim();
        history
    }
}

impl Default for CalibrationHistory {
    fn default() -> Self {
        Self::new(MAX_CALIBRATION_ENTRIES)
    }
}

impl CalibrationHistory {
    /// Capacity is clamped to `1..=100`.
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.clamp(1, MAX_CALIBRATION_ENTRIES);
        Self {
            records: VecDeque::with_capacity(max_entries),
            max_entries,
        }
    }

    pub fn record(&mut self, predicted_score: f64, was_correct: bool, recorded_at: DateTime<Utc>) {
        let predicted_score = if predicted_score.is_finite() {
            predicted_score.clamp(0.0, 100.0)
        } else {
            return;
        };
        self.records.push_back(CalibrationRecord {
            predicted_score,
            was_correct,
            recorded_at,
        });
        self.trim();
    }

    /// Change the capacity (clamped to `1..=100`), dropping the oldest outcomes if it shrinks.
    pub fn set_capacity(&mut self, max_entries: usize) {
        self.max_entries = max_entries.clamp(1, MAX_CALIBRATION_ENTRIES);
        self.trim();
    }

    fn trim(&mut self) {
        while self.records.len() > self.max_entries {
            self.records.pop_front(); // discard oldest
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    pub fn records(&self) -> impl Iterator<Item = &CalibrationRecord> {
        self.records.iter()
    }

    /// Quality in `[0, 1]` of the most recent predictions.
    ///
    /// The last 50 outcomes are binned into 20-point buckets; each bucket's hit
    /// rate is compared to its midpoint and the absolute errors are averaged,
    /// weighted by bucket size. Fewer than five outcomes gives 0.5.
    pub fn quality(&self) -> f64 {
        let window = self.records.len().min(CALIBRATION_WINDOW);
        if window < MIN_CALIBRATION_SAMPLES {
            return NEUTRAL_QUALITY;
        }

        let mut totals = [0usize; BUCKETS];
        let mut hits = [0usize; BUCKETS];
        for record in self.records.iter().rev().take(window) {
            let bucket = ((record.predicted_score / BUCKET_WIDTH) as usize).min(BUCKETS - 1);
            totals[bucket] += 1;
            if record.was_correct {
                hits[bucket] += 1;
            }
        }

        let weighted_error: f64 = (0..BUCKETS)
            .filter(|&b| totals[b] > 0)
            .map(|b| {
                let expected = (b as f64 * BUCKET_WIDTH + BUCKET_WIDTH / 2.0) / 100.0;
                let actual = hits[b] as f64 / totals[b] as f64;
                (actual - expected).abs() * totals[b] as f64
            })
            .sum();
        let mean_error = weighted_error / window as f64;

        (1.0 - 2.0 * mean_error).clamp(0.0, 1.0)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(history: &mut CalibrationHistory, predicted: f64, correct: usize, total: usize) {
        for i in 0..total {
            history.record(predicted, i < correct, Utc::now());
        }
    }

    #[test]
    fn quality_is_neutral_below_five_outcomes() {
        let mut history = CalibrationHistory::default();
        feed(&mut history, 90.0, 0, 4);
        assert_eq!(history.quality(), 0.5);
    }

    #[test]
    fn matched_hit_rates_give_perfect_quality() {
        let mut history = CalibrationHistory::default();
        feed(&mut history, 90.0, 9, 10);
        feed(&mut history, 70.0, 7, 10);
        feed(&mut history, 50.0, 5, 10);
        feed(&mut history, 30.0, 3, 10);
        feed(&mut history, 10.0, 1, 10);
        assert_eq!(history.len(), 50);
        assert!((history.quality() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn confident_misses_drive_quality_to_zero() {
        let mut history = CalibrationHistory::default();
        feed(&mut history, 95.0, 0, 20);
        // error 0.9 per outcome
        assert_eq!(history.quality(), 0.0);
    }

    #[test]
    fn partial_miscalibration() {
        let mut history = CalibrationHistory::default();
        // expected 0.7, observed 0.5
        feed(&mut history, 65.0, 5, 10);
        assert!((history.quality() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn ring_is_bounded_and_drops_oldest() {
        let mut history = CalibrationHistory::new(500);
        assert_eq!(history.capacity(), MAX_CALIBRATION_ENTRIES);

        let mut small = CalibrationHistory::new(3);
        small.record(10.0, true, Utc::now());
        small.record(20.0, true, Utc::now());
        small.record(30.0, true, Utc::now());
        small.record(40.0, false, Utc::now());
        assert_eq!(small.len(), 3);
        let scores: Vec<f64> = small.records().map(|r| r.predicted_score).collect();
        assert_eq!(scores, vec![20.0, 30.0, 40.0]);

        feed(&mut history, 50.0, 0, 150);
        assert_eq!(history.len(), 100);
    }

    #[test]
    fn only_the_latest_fifty_count() {
        let mut history = CalibrationHistory::default();
        // 50 badly calibrated outcomes, then 50 perfect ones
        feed(&mut history, 95.0, 0, 50);
        feed(&mut history, 50.0, 25, 50);
        assert!((history.quality() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn stored_capacity_is_rebounded_on_decode() {
        let mut oversized: CalibrationHistory = serde_json::from_str(r#"{"records":[],"maxEntries":1000}"#).unwrap();
        assert_eq!(oversized.capacity(), MAX_CALIBRATION_ENTRIES);
        feed(&mut oversized, 60.0, 0, 300);
        assert_eq!(oversized.len(), MAX_CALIBRATION_ENTRIES);

        let mut zero: CalibrationHistory = serde_json::from_str(r#"{"records":[],"maxEntries":0}"#).unwrap();
        assert_eq!(zero.capacity(), 1);
        feed(&mut zero, 60.0, 1, 3);
        assert_eq!(zero.len(), 1);
    }

    #[test]
    fn decoded_records_beyond_capacity_keep_the_newest() {
        let mut source = CalibrationHistory::new(5);
        for score in [10.0, 20.0, 30.0, 40.0, 50.0] {
            source.record(score, true, Utc::now());
        }
        let mut json = serde_json::to_value(&source).unwrap();
        json["maxEntries"] = serde_json::json!(2);

        let decoded: CalibrationHistory = serde_json::from_value(json).unwrap();
        let scores: Vec<f64> = decoded.records().map(|r| r.predicted_score).collect();
        assert_eq!(scores, vec![40.0, 50.0]);
    }

    #[test]
    fn shrinking_capacity_drops_oldest() {
        let mut history = CalibrationHistory::default();
        feed(&mut history, 70.0, 7, 10);
        history.set_capacity(4);
        assert_eq!(history.capacity(), 4);
        assert_eq!(history.len(), 4);
        history.set_capacity(0);
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn out_of_range_predictions_are_clamped_or_dropped() {
        let mut history = CalibrationHistory::default();
        history.record(140.0, true, Utc::now());
        history.record(f64::NAN, true, Utc::now());
        assert_eq!(history.len(), 1);
        assert_eq!(history.records().next().unwrap().predicted_score, 100.0);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::calibration_history::CalibrationHistory;
use crate::modification::{ModificationContext, ModificationType};

const NEUTRAL_ACCURACY: f64 = 0.7;
const HISTORY_SCALE: f64 = 20.0;
const FULL_CONFIDENCE_SAMPLES: u32 = 15;
const AI_CONFIDENCE_SCALE: f64 = 40.0;
const AI_CONFIDENCE_CAP: f64 = 10.0;
const AI_CONFIDENCE_FLOOR: f64 = -15.0;
const CALIBRATION_SCALE: f64 = 10.0;

const THEORETICAL_BASIS: &str = "Trust should track the automation's demonstrated reliability for the task at hand \
(Lee & See, 2004). Automation bias grows under time pressure and low domain familiarity \
(Parasuraman & Manzey, 2010), and stated model confidence is only weakly predictive of correctness, \
so overconfidence is penalized more than confidence is rewarded.";

/// Kind of work the AI output is being used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Coding,
    Writing,
    Research,
    Analysis,
    Math,
    Creative,
    Factual,
    General,
}

impl TaskType {
    pub const ALL: [TaskType; 8] = [
        TaskType::Coding,
        TaskType::Writing,
        TaskType::Research,
        TaskType::Analysis,
        TaskType::Math,
        TaskType::Creative,
        TaskType::Factual,
        TaskType::General,
    ];

    /// Baseline trust for the task type, from published AI error rates per domain.
    pub fn baseline(&self) -> f64 {
        match self {
            TaskType::Coding => 58.0,
            TaskType::Writing => 62.0,
            TaskType::Research => 52.0,
            TaskType::Analysis => 55.0,
            TaskType::Math => 48.0,
            TaskType::Creative => 68.0,
            TaskType::Factual => 45.0,
            TaskType::General => 55.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Coding => "coding",
            TaskType::Writing => "writing",
            TaskType::Research => "research",
            TaskType::Analysis => "analysis",
            TaskType::Math => "math",
            TaskType::Creative => "creative",
            TaskType::Factual => "factual",
            TaskType::General => "general",
        }
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let lowered = input.to_lowercase();
        TaskType::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| format!("unknown task type '{input}'"))
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Low,
    #[default]
    Medium,
    High,
}

impl Criticality {
    pub fn adjustment(&self) -> f64 {
        match self {
            Criticality::Low => 3.0,
            Criticality::Medium => -5.0,
            Criticality::High => -15.0,
        }
    }

    /// Score limits below which risk is high and medium, respectively.
    fn risk_thresholds(&self) -> (f64, f64) {
        match self {
            Criticality::High => (50.0, 70.0),
            Criticality::Medium => (35.0, 55.0),
            Criticality::Low => (25.0, 40.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Familiarity {
    Familiar,
    #[default]
    Somewhat,
    Unfamiliar,
}

impl Familiarity {
    pub fn adjustment(&self) -> f64 {
        match self {
            Familiarity::Familiar => 8.0,
            Familiarity::Somewhat => 0.0,
            Familiarity::Unfamiliar => -8.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePressure {
    #[default]
    None,
    Moderate,
    High,
}

impl TimePressure {
    pub fn adjustment(&self) -> f64 {
        match self {
            TimePressure::None => 0.0,
            TimePressure::Moderate => -6.0,
            TimePressure::High => -12.0,
        }
    }
}

macro_rules! impl_label_parse {
    ($ty:ident { $($label:literal => $variant:ident),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(input: &str) -> Result<Self, Self::Err> {
                match input.to_lowercase().as_str() {
                    $($label => Ok($ty::$variant),)+
                    other => Err(format!("unknown {} '{}'", stringify!($ty).to_lowercase(), other)),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let label = match self {
                    $($ty::$variant => $label,)+
                };
                f.write_str(label)
            }
        }
    };
}

impl_label_parse!(Criticality { "low" => Low, "medium" => Medium, "high" => High });
impl_label_parse!(Familiarity { "familiar" => Familiar, "somewhat" => Somewhat, "unfamiliar" => Unfamiliar });
impl_label_parse!(TimePressure { "none" => None, "moderate" => Moderate, "high" => High });

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl_label_parse!(RiskLevel { "low" => Low, "medium" => Medium, "high" => High });

impl RiskLevel {
    pub fn assess(score: f64, criticality: Criticality) -> Self {
        let (high_below, medium_below) = criticality.risk_thresholds();
        if score < high_below {
            RiskLevel::High
        } else if score < medium_below {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    Low,
    Moderate,
    High,
}

impl TrustLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            TrustLevel::High
        } else if score >= 40.0 {
            TrustLevel::Moderate
        } else {
            TrustLevel::Low
        }
    }
}

/// Input describing the task the AI output will be used for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskContext {
    pub task_type: TaskType,
    #[serde(default)]
    pub criticality: Criticality,
    #[serde(default)]
    pub familiarity: Familiarity,
    #[serde(default)]
    pub time_pressure: TimePressure,
    /// Model's self-reported confidence, 0.0..=1.0.
    #[serde(default)]
    pub ai_confidence: Option<f64>,
    #[serde(default)]
    pub modification: Option<ModificationContext>,
}

impl TaskContext {
    pub fn new(task_type: TaskType) -> Self {
        Self {
            task_type,
            criticality: Criticality::default(),
            familiarity: Familiarity::default(),
            time_pressure: TimePressure::default(),
            ai_confidence: None,
            modification: None,
        }
    }

    pub fn with_criticality(mut self, criticality: Criticality) -> Self {
        self.criticality = criticality;
        self
    }

    pub fn with_familiarity(mut self, familiarity: Familiarity) -> Self {
        self.familiarity = familiarity;
        self
    }

    pub fn with_time_pressure(mut self, time_pressure: TimePressure) -> Self {
        self.time_pressure = time_pressure;
        self
    }

    pub fn with_ai_confidence(mut self, confidence: f64) -> Self {
        self.ai_confidence = Some(confidence);
        self
    }

    pub fn with_modification(mut self, modification: ModificationContext) -> Self {
        self.modification = Some(modification);
        self
    }
}

/// The user's observed accuracy on one task type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyHistory {
    pub correct: u32,
    pub total: u32,
}

impl AccuracyHistory {
    pub fn new(correct: u32, total: u32) -> Self {
        Self {
            correct: correct.min(total),
            total,
        }
    }

    pub fn accuracy(&self) -> Option<f64> {
        (self.total > 0).then(|| self.correct.min(self.total) as f64 / self.total as f64)
    }

    /// Confidence in the observed accuracy, saturating at 15 samples.
    pub fn sample_weight(&self) -> f64 {
        self.total.min(FULL_CONFIDENCE_SAMPLES) as f64 / FULL_CONFIDENCE_SAMPLES as f64
    }
}

/// Every term that went into a trust score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustAdjustments {
    pub baseline: f64,
    pub criticality: f64,
    pub familiarity: f64,
    pub time_pressure: f64,
    /// Absent when the model reported no confidence.
    pub ai_confidence: Option<f64>,
    pub history: f64,
    pub calibration: f64,
    pub modification: f64,
}

impl TrustAdjustments {
    pub fn total(&self) -> f64 {
        self.baseline
            + self.criticality
            + self.familiarity
            + self.time_pressure
            + self.ai_confidence.unwrap_or(0.0)
            + self.history
            + self.calibration
            + self.modification
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustProfile {
    pub task_type: TaskType,
    pub score: f64,
    pub trust_level: TrustLevel,
    pub risk_level: RiskLevel,
    pub adjustments: TrustAdjustments,
    /// Confidence in the score itself, 0.0..=1.0.
    pub confidence: f64,
    pub calibration_quality: f64,
    pub reasoning: String,
    pub theoretical_basis: String,
}

/// Computes trust scores and keeps track of how well its past scores predicted outcomes.
///
/// The calibrator only adjusts how much confidence it reports and a small
/// calibration term; the formula's coefficients never change.
#[derive(Debug, Clone, Default)]
pub struct TrustCalibrator {
    history: CalibrationHistory,
}

impl TrustCalibrator {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: CalibrationHistory::new(capacity),
        }
    }

    pub fn from_history(history: CalibrationHistory) -> Self {
        Self { history }
    }

    pub fn history(&self) -> &CalibrationHistory {
        &self.history
    }

    pub fn into_history(self) -> CalibrationHistory {
        self.history
    }

    pub fn calibration_quality(&self) -> f64 {
        self.history.quality()
    }

    /// Score the task. An explicit `modification` takes precedence over the one in `context`.
    pub fn calculate_trust_score(
        &self,
        context: &TaskContext,
        accuracy: Option<&AccuracyHistory>,
        modification: Option<&ModificationContext>,
    ) -> TrustProfile {
        let quality = self.history.quality();
        let modification = modification.or(context.modification.as_ref());

        let ai_confidence = context
            .ai_confidence
            .filter(|c| c.is_finite())
            .map(|c| ((c.clamp(0.0, 1.0) - 0.5) * AI_CONFIDENCE_SCALE).clamp(AI_CONFIDENCE_FLOOR, AI_CONFIDENCE_CAP));

        let (history_adjustment, sample_weight) = match accuracy.and_then(|a| a.accuracy().map(|acc| (acc, a))) {
            Some((acc, a)) => ((acc - NEUTRAL_ACCURACY) * HISTORY_SCALE * a.sample_weight(), a.sample_weight()),
            None => (0.0, 0.0),
        };

        let adjustments = TrustAdjustments {
            baseline: context.task_type.baseline(),
            criticality: context.criticality.adjustment(),
            familiarity: context.familiarity.adjustment(),
            time_pressure: context.time_pressure.adjustment(),
            ai_confidence,
            history: history_adjustment,
            calibration: (quality - 0.5) * CALIBRATION_SCALE,
            modification: modification.map(|m| m.adjustment()).unwrap_or(0.0),
        };

        let score = round_tenth(adjustments.total().clamp(0.0, 100.0));
        let missing_confidence_penalty = if ai_confidence.is_none() { 0.1 } else { 0.0 };
        let confidence = (0.3 + 0.4 * sample_weight + 0.3 * quality - missing_confidence_penalty).clamp(0.0, 1.0);

        let trust_level = TrustLevel::from_score(score);
        let risk_level = RiskLevel::assess(score, context.criticality);
        debug!(
            task = %context.task_type,
            score,
            ?trust_level,
            ?risk_level,
            "trust score computed"
        );

        TrustProfile {
            task_type: context.task_type,
            score,
            trust_level,
            risk_level,
            reasoning: reasoning(context, &adjustments, modification, score),
            adjustments,
            confidence,
            calibration_quality: quality,
            theoretical_basis: THEORETICAL_BASIS.to_string(),
        }
    }

    pub fn record_calibration_outcome(&mut self, predicted_score: f64, was_correct: bool) {
        self.record_calibration_outcome_at(predicted_score, was_correct, Utc::now());
    }

    pub fn record_calibration_outcome_at(&mut self, predicted_score: f64, was_correct: bool, at: DateTime<Utc>) {
        self.history.record(predicted_score, was_correct, at);
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn reasoning(
    context: &TaskContext,
    adjustments: &TrustAdjustments,
    modification: Option<&ModificationContext>,
    score: f64,
) -> String {
    let mut parts = vec![format!(
        "baseline {:.0} for {} tasks",
        adjustments.baseline, context.task_type
    )];
    parts.push(format!(
        "{} criticality ({:+.0})",
        context.criticality, adjustments.criticality
    ));
    if adjustments.familiarity != 0.0 {
        parts.push(format!("{} domain ({:+.0})", context.familiarity, adjustments.familiarity));
    }
    if adjustments.time_pressure != 0.0 {
        parts.push(format!(
            "{} time pressure ({:+.0})",
            context.time_pressure, adjustments.time_pressure
        ));
    }
    match (context.ai_confidence, adjustments.ai_confidence) {
        (Some(raw), Some(adj)) => parts.push(format!("AI confidence {raw:.2} ({adj:+.1})")),
        _ => parts.push("no AI confidence reported".to_string()),
    }
    if adjustments.history != 0.0 {
        parts.push(format!("past accuracy ({:+.1})", adjustments.history));
    }
    if adjustments.calibration != 0.0 {
        parts.push(format!("calibration ({:+.1})", adjustments.calibration));
    }
    if let Some(m) = modification.filter(|m| m.modification_type != ModificationType::None) {
        parts.push(format!(
            "{} edit of {:.0}% ({:+.1})",
            m.modification_type,
            m.fraction_changed * 100.0,
            adjustments.modification
        ));
    }
    format!("Trust {score:.1}: {}", parts.join("; "))
}

//! guard_runtime.rs
//! Collaborator layer around the decision core: loads and persists per-key
//! state, applies the enforcement mode and emits decision events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::audit::{DecisionEvent, DecisionKind};
use crate::calibration_history::CalibrationHistory;
use crate::config_loader::GuardConfig;
use crate::errors::{GuardError, GuardResult, SafeLock};
use crate::interaction::{Interaction, SignalMap};
use crate::intervention_scheduler::{
    fatigue_score, intervention_state, record_action, schedule, ActionOutcome, ActionReport, InterventionKey,
    ScheduleDecision,
};
use crate::log_sink::DecisionSink;
use crate::rule_evaluator::{DetectionResult, InterventionTier, RuleEvaluator};
use crate::runtime_config::EnforcementMode;
use crate::signal_aggregator::SignalVector;
use crate::state_store::{InterventionRecord, SledStateStore, StateStore};
use crate::trust_calibrator::{AccuracyHistory, TaskContext, TaskType, TrustCalibrator, TrustProfile};
use crate::verification_strategy::VerificationStrategy;

/// Everything decided for one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnDecision {
    pub event_id: String,
    pub display: bool,
    pub mode: EnforcementMode,
    pub signals: SignalVector,
    pub detection: DetectionResult,
    pub schedule: ScheduleDecision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustAssessment {
    pub profile: TrustProfile,
    pub strategy: VerificationStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationSummary {
    pub user_id: String,
    pub samples: usize,
    pub quality: f64,
    pub accuracy: AccuracyHistory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionStatus {
    pub key: InterventionKey,
    pub suppressed: bool,
    pub fatigue_score: f64,
    pub record: InterventionRecord,
}

pub struct GuardRuntime {
    pub config: GuardConfig,
    pub evaluator: RuleEvaluator,
    store: Arc<Mutex<dyn StateStore>>,
    sink: DecisionSink,
}

impl GuardRuntime {
    pub fn new(config: GuardConfig, store: Arc<Mutex<dyn StateStore>>) -> Self {
        let sink = decision_sink(&config);
        info!(
            mode = %config.runtime.enforcement_mode,
            telemetry = config.runtime.telemetry_enabled,
            "guard runtime initialized"
        );
        Self {
            config,
            evaluator: RuleEvaluator::default(),
            store,
            sink,
        }
    }

    /// Runtime backed by a sled store under `config.data_dir`.
    pub fn open(config: GuardConfig) -> GuardResult<Self> {
        std::fs::create_dir_all(&config.data_dir)
            .map_err(|e| GuardError::io(format!("create data dir {}", config.data_dir.display()), e))?;
        let store = SledStateStore::open(state_path(&config.data_dir))?;
        Ok(Self::new(config, Arc::new(Mutex::new(store))))
    }

    pub fn with_evaluator(mut self, evaluator: RuleEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn mode(&self) -> EnforcementMode {
        self.config.runtime.enforcement_mode
    }

    /// Aggregate, evaluate and schedule one turn, persisting the updated state for `key`.
    pub fn process_turn(
        &self,
        key: &InterventionKey,
        interactions: &[Interaction],
        signals: Option<&SignalMap>,
        now: DateTime<Utc>,
    ) -> GuardResult<TurnDecision> {
        let vector = SignalVector::aggregate(interactions, signals);
        let detection = self.evaluator.evaluate_at(&vector, interactions, now);

        let decision = {
            let mut store = self.store.safe_lock()?;
            let record = store.load_intervention(key)?.unwrap_or_default();
            let mut decision = schedule(
                key,
                detection.recommended_tier,
                detection.confidence,
                &record.history,
                &record.suppression,
                now,
            );
            // Shadow mode shows nothing, so exposure is not recorded.
            if !self.mode().is_displaying() {
                decision.display = false;
                decision.updated_history = record.history;
                decision.reason = format!("shadow mode: {}", decision.reason);
            }
            store.save_intervention(
                key,
                &InterventionRecord::new(decision.updated_history.clone(), decision.updated_suppression.clone()),
            )?;
            decision
        };
        let display = decision.display;

        let mut event = DecisionEvent::new(key, DecisionKind::Schedule, self.mode(), now)
            .with_detection(detection.confidence, detection.confidence_level, detection.triggered_rules.clone())
            .with_outcome(decision.tier, decision.state, display, decision.fatigue_score)
            .with_reason(decision.reason.clone());
        if self.config.runtime.explanation_enabled {
            event = event.with_explanation(explain(&detection));
        }
        self.publish(&event);

        Ok(TurnDecision {
            event_id: event.id,
            display,
            mode: self.mode(),
            signals: vector,
            detection,
            schedule: decision,
        })
    }

    /// Apply a user action to the stored state for `key`.
    pub fn record_action(&self, key: &InterventionKey, report: ActionReport) -> GuardResult<ActionOutcome> {
        let outcome = {
            let mut store = self.store.safe_lock()?;
            let record = store.load_intervention(key)?.unwrap_or_default();
            let outcome = record_action(key, report, &record.history, &record.suppression);
            store.save_intervention(
                key,
                &InterventionRecord::new(outcome.updated_history.clone(), outcome.updated_suppression.clone()),
            )?;
            outcome
        };

        if let Some(alert) = &outcome.fatigue_alert {
            warn!(key = %key, dismissals = alert.dismissal_count, "{}", alert.message);
        }

        let state = intervention_state(InterventionTier::None, &outcome.updated_suppression, report.at);
        let event = DecisionEvent::new(key, DecisionKind::Action, self.mode(), report.at)
            .with_outcome(InterventionTier::None, state, false, outcome.fatigue_score)
            .with_reason(format!("user action: {}", report.action));
        self.publish(&event);

        Ok(outcome)
    }

    pub fn intervention_status(&self, key: &InterventionKey, now: DateTime<Utc>) -> GuardResult<InterventionStatus> {
        let record = self.store.safe_lock()?.load_intervention(key)?.unwrap_or_default();
        Ok(InterventionStatus {
            key: key.clone(),
            suppressed: record.suppression.is_active(now),
            fatigue_score: fatigue_score(&record.history, now),
            record,
        })
    }

    /// Trust profile for `user_id`, using their stored accuracy and calibration ring.
    pub fn trust_profile(&self, user_id: &str, context: &TaskContext) -> GuardResult<TrustAssessment> {
        let (calibration, accuracy) = {
            let store = self.store.safe_lock()?;
            (
                store.load_calibration(user_id)?,
                store.load_accuracy(user_id, context.task_type)?,
            )
        };
        let calibrator = self.calibrator(calibration);
        let profile = calibrator.calculate_trust_score(context, accuracy.as_ref(), None);
        debug!(user = user_id, score = profile.score, "trust profile computed");
        Ok(TrustAssessment {
            strategy: VerificationStrategy::for_profile(&profile),
            profile,
        })
    }

    /// Record whether a prediction held up, feeding both the calibration ring and task accuracy.
    pub fn record_outcome(
        &self,
        user_id: &str,
        task_type: TaskType,
        predicted_score: f64,
        was_correct: bool,
        at: DateTime<Utc>,
    ) -> GuardResult<CalibrationSummary> {
        let mut store = self.store.safe_lock()?;

        let mut calibrator = self.calibrator(store.load_calibration(user_id)?);
        calibrator.record_calibration_outcome_at(predicted_score, was_correct, at);
        let quality = calibrator.calibration_quality();
        let history = calibrator.into_history();

        let previous = store.load_accuracy(user_id, task_type)?.unwrap_or_default();
        let accuracy = AccuracyHistory::new(
            previous.correct.saturating_add(u32::from(was_correct)),
            previous.total.saturating_add(1),
        );
        store.save_outcome(user_id, task_type, &history, &accuracy)?;

        info!(user = user_id, task = %task_type, quality, samples = history.len(), "calibration outcome recorded");
        Ok(CalibrationSummary {
            user_id: user_id.to_string(),
            samples: history.len(),
            quality,
            accuracy,
        })
    }

    fn calibrator(&self, history: Option<CalibrationHistory>) -> TrustCalibrator {
        match history {
            Some(mut history) => {
                // the configured capacity wins over the one stored with the ring
                history.set_capacity(self.config.calibration_capacity());
                TrustCalibrator::from_history(history)
            }
            None => TrustCalibrator::new(self.config.calibration_capacity()),
        }
    }

    fn publish(&self, event: &DecisionEvent) {
        if !self.config.runtime.telemetry_enabled {
            return;
        }
        event.emit();
        if let Err(e) = self.sink.write(event) {
            warn!("failed to write decision event {}: {e}", event.id);
        }
    }
}

fn state_path(data_dir: &Path) -> PathBuf {
    data_dir.join("state")
}

fn decision_sink(config: &GuardConfig) -> DecisionSink {
    match &config.runtime.decision_log {
        _ if !config.runtime.telemetry_enabled => DecisionSink::Discard,
        Some(path) if path.as_os_str() == "-" => DecisionSink::Stdout,
        Some(path) => DecisionSink::File(path.clone()),
        None => DecisionSink::Discard,
    }
}

fn explain(detection: &DetectionResult) -> String {
    let details: Vec<String> = detection
        .rule_results
        .iter()
        .filter(|r| r.triggered)
        .map(|r| format!("{}: {}", r.rule_id, r.explanation.message))
        .collect();
    if details.is_empty() {
        detection.summary.clone()
    } else {
        format!("{} | {}", detection.summary, details.join(" | "))
    }
}

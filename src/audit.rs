// audit.rs
// Purpose: Structured record of every scheduling decision, for analytics and threshold tuning

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::detection_rules::RuleId;
use crate::intervention_scheduler::{InterventionKey, InterventionState};
use crate::rule_evaluator::{ConfidenceLevel, InterventionTier};
use crate::runtime_config::EnforcementMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Schedule,
    Action,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub intervention_type: String,
    pub kind: DecisionKind,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub tier: InterventionTier,
    pub state: InterventionState,
    pub displayed: bool,
    pub fatigue_score: f64,
    pub triggered_rules: Vec<RuleId>,
    pub mode: EnforcementMode,
    pub reason: String,
    pub explanation: Option<String>,
}

impl DecisionEvent {
    pub fn new(key: &InterventionKey, kind: DecisionKind, mode: EnforcementMode, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp,
            user_id: key.user_id.clone(),
            intervention_type: key.intervention_type.to_string(),
            kind,
            confidence: 0.0,
            confidence_level: ConfidenceLevel::Low,
            tier: InterventionTier::None,
            state: InterventionState::Quiet,
            displayed: false,
            fatigue_score: 0.0,
            triggered_rules: Vec::new(),
            mode,
            reason: String::new(),
            explanation: None,
        }
    }

    pub fn with_detection(mut self, confidence: f64, level: ConfidenceLevel, rules: Vec<RuleId>) -> Self {
        self.confidence = confidence;
        self.confidence_level = level;
        self.triggered_rules = rules;
        self
    }

    pub fn with_outcome(mut self, tier: InterventionTier, state: InterventionState, displayed: bool, fatigue: f64) -> Self {
        self.tier = tier;
        self.state = state;
        self.displayed = displayed;
        self.fatigue_score = fatigue;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_explanation(mut self, explanation: String) -> Self {
        self.explanation = Some(explanation);
        self
    }

    /// Emit the event as a structured tracing record.
    pub fn emit(&self) {
        let rules: Vec<&str> = self.triggered_rules.iter().map(|r| r.code()).collect();
        info!(
            event_id = %self.id,
            user = %self.user_id,
            intervention = %self.intervention_type,
            kind = ?self.kind,
            confidence = self.confidence,
            tier = %self.tier,
            displayed = self.displayed,
            fatigue = self.fatigue_score,
            rules = ?rules,
            mode = %self.mode,
            "{}",
            self.reason
        );
    }
}

//! Library root for the `reliance_guard` crate
//! Detects passive AI over-reliance, schedules interventions without nagging
//! and calibrates how much a user should trust an AI answer.

// Core error handling
pub mod errors;

// Conversation input
pub mod interaction;
pub mod signal_aggregator;

// Detection
pub mod detection_rules;
pub mod rule_evaluator;

// Intervention scheduling
pub mod intervention_scheduler;

// Trust calibration
pub mod calibration_history;
pub mod modification;
pub mod trust_calibrator;
pub mod verification_strategy;

// Configuration & CLI
pub mod cli;
pub mod config_loader;
pub mod runtime_config;

// Persistence & runtime
pub mod guard_runtime;
pub mod state_store;

// Audit & logging
pub mod audit;
pub mod log_sink;


pub use guard_runtime::{GuardRuntime, TurnDecision};
pub use intervention_scheduler::{ActionReport, InterventionAction, InterventionKey};
pub use rule_evaluator::{DetectionResult, InterventionTier, RuleEvaluator};
pub use signal_aggregator::SignalVector;
pub use trust_calibrator::{TaskContext, TrustCalibrator, TrustProfile};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config_loader::{load_config, GuardConfig};
use crate::guard_runtime::GuardRuntime;
use crate::interaction::{Interaction, SignalMap};
use crate::intervention_scheduler::{ActionReport, InterventionAction, InterventionKey};
use crate::log_sink::init_tracing;
use crate::modification::ModificationContext;
use crate::trust_calibrator::{Criticality, Familiarity, RiskLevel, TaskContext, TaskType, TimePressure};
use crate::verification_strategy::VerificationStrategy;

/// Top-level CLI interface for the reliance guard
#[derive(Parser)]
#[command(
    name = "reliance-guard",
    version,
    about = "Detect passive AI over-reliance, schedule interventions and calibrate trust"
)]
pub struct Cli {
    /// Path to a TOML config file (defaults to ./reliance_guard.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a conversation and decide whether to show an intervention
    Evaluate {
        /// JSON array of interactions
        #[arg(long)]
        log: PathBuf,
        /// JSON object of per-message behavioral signals
        #[arg(long)]
        signals: Option<PathBuf>,
        #[arg(long)]
        user: String,
        #[arg(long)]
        intervention: Option<String>,
        /// Evaluation time (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Record what the user did with an intervention
    Action {
        #[arg(long)]
        user: String,
        #[arg(long)]
        intervention: Option<String>,
        /// dismiss, skip, acted or override
        #[arg(long)]
        action: InterventionAction,
        #[arg(long, default_value_t = 0)]
        exposure_ms: u64,
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Compute a trust profile and verification strategy for a task
    Trust {
        #[arg(long)]
        task_type: TaskType,
        #[arg(long, default_value = "medium")]
        criticality: Criticality,
        #[arg(long, default_value = "somewhat")]
        familiarity: Familiarity,
        #[arg(long, default_value = "none")]
        time_pressure: TimePressure,
        /// Model's self-reported confidence, 0.0 to 1.0
        #[arg(long)]
        ai_confidence: Option<f64>,
        #[arg(long, default_value = "anonymous")]
        user: String,
        /// Original AI text, classified against --modified
        #[arg(long, requires = "modified")]
        original: Option<String>,
        #[arg(long, requires = "original")]
        modified: Option<String>,
    },

    /// Record whether a trust prediction turned out right
    Outcome {
        #[arg(long)]
        user: String,
        #[arg(long)]
        task_type: TaskType,
        #[arg(long)]
        predicted: f64,
        #[arg(long, action = ArgAction::Set)]
        correct: bool,
    },

    /// Show the verification strategy for a task type and risk level
    Strategy {
        #[arg(long)]
        task_type: TaskType,
        #[arg(long)]
        risk: RiskLevel,
    },

    /// Show stored fatigue and suppression state
    State {
        #[arg(long)]
        user: String,
        #[arg(long)]
        intervention: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn key_for(config: &GuardConfig, user: String, intervention: Option<String>) -> InterventionKey {
    let intervention = intervention.unwrap_or_else(|| config.runtime.default_intervention.clone());
    InterventionKey::new(user, intervention)
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config.log_level);

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
        Commands::Strategy { task_type, risk } => {
            print_json(&VerificationStrategy::for_task(task_type, risk))?;
        }
        Commands::Evaluate {
            log,
            signals,
            user,
            intervention,
            at,
        } => {
            let interactions: Vec<Interaction> = read_json(&log)?;
            let signals: Option<SignalMap> = signals.as_deref().map(read_json).transpose()?;
            let key = key_for(&config, user, intervention);
            let runtime = GuardRuntime::open(config)?;
            let decision = runtime.process_turn(&key, &interactions, signals.as_ref(), at.unwrap_or_else(Utc::now))?;
            print_json(&decision)?;
        }
        Commands::Action {
            user,
            intervention,
            action,
            exposure_ms,
            at,
        } => {
            let key = key_for(&config, user, intervention);
            let runtime = GuardRuntime::open(config)?;
            let report = ActionReport {
                action,
                at: at.unwrap_or_else(Utc::now),
                exposure_ms,
            };
            print_json(&runtime.record_action(&key, report)?)?;
        }
        Commands::Trust {
            task_type,
            criticality,
            familiarity,
            time_pressure,
            ai_confidence,
            user,
            original,
            modified,
        } => {
            let mut context = TaskContext::new(task_type)
                .with_criticality(criticality)
                .with_familiarity(familiarity)
                .with_time_pressure(time_pressure);
            context.ai_confidence = ai_confidence;
            if let (Some(original), Some(modified)) = (original, modified) {
                context = context.with_modification(ModificationContext::classify(&original, &modified));
            }
            let runtime = GuardRuntime::open(config)?;
            print_json(&runtime.trust_profile(&user, &context)?)?;
        }
        Commands::Outcome {
            user,
            task_type,
            predicted,
            correct,
        } => {
            let runtime = GuardRuntime::open(config)?;
            print_json(&runtime.record_outcome(&user, task_type, predicted, correct, Utc::now())?)?;
        }
        Commands::State { user, intervention } => {
            let key = key_for(&config, user, intervention);
            let runtime = GuardRuntime::open(config)?;
            print_json(&runtime.intervention_status(&key, Utc::now())?)?;
        }
    }

    Ok(())
}

// src/tests/test_utils.rs
// Shared fixtures for conversation and runtime tests

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::config_loader::GuardConfig;
use crate::guard_runtime::GuardRuntime;
use crate::interaction::{Interaction, MessageSignals, SignalMap};
use crate::runtime_config::{EnforcementMode, RuntimeConfig};
use crate::state_store::{MemoryStateStore, StateStore};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

/// A response of a little over 600 characters.
pub fn long_response() -> String {
    "The iterator borrows the slice, so no elements are cloned here. ".repeat(10)
}

/// `turns` prompt/response pairs. Each prompt after the first arrives
/// `reply_after` after the previous response, so that gap is the acceptance time.
pub fn conversation(turns: usize, start: DateTime<Utc>, reply_after: Duration, prompt: &str) -> Vec<Interaction> {
    let response = long_response();
    let mut log = Vec::with_capacity(turns * 2);
    let mut at = start;
    for i in 0..turns {
        log.push(Interaction::user(&format!("u{i}"), prompt, at));
        at += Duration::seconds(1);
        log.push(Interaction::assistant(&format!("a{i}"), &response, at));
        at += reply_after;
    }
    log
}

pub fn last_timestamp(log: &[Interaction]) -> DateTime<Utc> {
    log.iter().map(|m| m.timestamp).max().unwrap_or_else(t0)
}

/// A collector reading from someone who read, copied and checked elsewhere.
pub fn engaged_reading() -> MessageSignals {
    MessageSignals {
        dwell_time_ms: Some(20_000.0),
        hover_duration_ms: Some(4_000.0),
        tab_away_ms: Some(15_000.0),
        scroll_depth: Some(0.95),
        copied: true,
        selected: true,
        tab_switched: true,
        follow_up: None,
    }
}

/// The same collector reading for every assistant response.
pub fn uniform_signals(log: &[Interaction], reading: MessageSignals) -> SignalMap {
    log.iter()
        .filter(|m| m.is_assistant())
        .map(|m| (m.id.clone(), reading.clone()))
        .collect()
}

pub fn test_config(mode: EnforcementMode) -> GuardConfig {
    GuardConfig {
        data_dir: PathBuf::from("unused"),
        runtime: RuntimeConfig {
            enforcement_mode: mode,
            telemetry_enabled: false,
            ..RuntimeConfig::default()
        },
        ..GuardConfig::default()
    }
}

pub fn memory_runtime(mode: EnforcementMode) -> (GuardRuntime, Arc<Mutex<MemoryStateStore>>) {
    let store = Arc::new(Mutex::new(MemoryStateStore::new()));
    let shared: Arc<Mutex<dyn StateStore>> = store.clone();
    (GuardRuntime::new(test_config(mode), shared), store)
}

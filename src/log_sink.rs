// log_sink.rs
// Purpose: Tracing setup and the sinks that persist decision events

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Once;

use tracing_subscriber::EnvFilter;

use crate::audit::DecisionEvent;
use crate::errors::{GuardError, GuardResult};

static TRACING_INIT: Once = Once::new();

/// Install the global fmt subscriber. `RUST_LOG` wins over `level`; repeated calls are no-ops.
pub fn init_tracing(level: &str) {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

/// Where decision events go.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionSink {
    Stdout,
    File(PathBuf),
    Discard,
}

impl DecisionSink {
    pub fn write(&self, event: &DecisionEvent) -> GuardResult<()> {
        match self {
            DecisionSink::Stdout => {
                println!("{}", serde_json::to_string(event)?);
            }
            DecisionSink::File(path) => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| GuardError::io(format!("open decision log {}", path.display()), e))?;
                let line = serde_json::to_string(event)?;
                writeln!(file, "{line}")
                    .map_err(|e| GuardError::io(format!("write decision log {}", path.display()), e))?;
            }
            DecisionSink::Discard => {}
        }
        Ok(())
    }
}

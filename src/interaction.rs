// interaction.rs
// Purpose: Input value types handed to the guard by the chat transport and the signal collector

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Who authored a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the ordered interaction log.
///
/// The verify/modify/reject flags are explicit user actions taken on an
/// assistant response; they are ignored on user messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub was_verified: bool,
    #[serde(default)]
    pub was_modified: bool,
    #[serde(default)]
    pub was_rejected: bool,
}

impl Interaction {
    pub fn user(id: &str, content: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            role: Role::User,
            content: content.to_string(),
            timestamp,
            was_verified: false,
            was_modified: false,
            was_rejected: false,
        }
    }

    pub fn assistant(id: &str, content: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::Assistant,
            ..Self::user(id, content, timestamp)
        }
    }

    pub fn verified(mut self) -> Self {
        self.was_verified = true;
        self
    }

    pub fn modified(mut self) -> Self {
        self.was_modified = true;
        self
    }

    pub fn rejected(mut self) -> Self {
        self.was_rejected = true;
        self
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Length in characters, not bytes.
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Behavioral proxies captured by the UI collector for a single assistant response.
///
/// Every field is optional: a missing measurement is treated as "not observed"
/// rather than as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageSignals {
    pub dwell_time_ms: Option<f64>,
    pub hover_duration_ms: Option<f64>,
    pub tab_away_ms: Option<f64>,
    /// Fraction of the response scrolled into view, 0.0..=1.0.
    pub scroll_depth: Option<f64>,
    pub copied: bool,
    pub selected: bool,
    pub tab_switched: bool,
    pub follow_up: Option<bool>,
}

/// Per-turn behavioral signals keyed by assistant message id.
pub type SignalMap = HashMap<String, MessageSignals>;

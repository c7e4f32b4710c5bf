//! Alert data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Alert severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// Informational, e.g. scheduled status reports
    #[default]
    Info,
    /// Threshold crossed
    Warning,
    /// Error
    Error,
    /// Critical
    Critical,
}

impl AlertLevel {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warning",
            AlertLevel::Error => "error",
            AlertLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured data attached to an alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertData {
    /// Tag used by providers to pick a presentation, e.g. a station kind
    #[serde(rename = "type")]
    pub kind: String,
}

/// A single alert, built fresh per triggering evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMessage {
    /// Unique identifier, for log correlation
    #[serde(skip)]
    pub id: Uuid,

    /// Short title
    pub title: String,

    /// Rendered markdown text
    pub message: String,

    /// Severity
    pub level: AlertLevel,

    /// Structured tag
    pub data: AlertData,

    /// When the alert was built
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

impl AlertMessage {
    /// Create a new alert
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        level: AlertLevel,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            message: message.into(),
            level,
            data: AlertData { kind: tag.into() },
            created_at: Utc::now(),
        }
    }

    /// The structured tag
    pub fn tag(&self) -> &str {
        &self.data.kind
    }
}

//! Domain entities: processes, their checklist sub-steps, and the
//! completion-aggregation rule.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Urgency label attached to a process.
///
/// The wire labels (`BAIXA`/`MEDIA`/`ALTA`) are a contract with the client
/// and with existing stored rows; do not rename them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Baixa,
    Media,
    Alta,
}

impl Priority {
    /// The stored/wire label for this priority
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Baixa => "BAIXA",
            Priority::Media => "MEDIA",
            Priority::Alta => "ALTA",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    /// Parse a priority label case-insensitively. Unknown labels are a
    /// validation error, not a panic or a silent default.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BAIXA" => Ok(Priority::Baixa),
            "MEDIA" => Ok(Priority::Media),
            "ALTA" => Ok(Priority::Alta),
            other => Err(Error::validation(format!("Prioridade inválida: {other}"))),
        }
    }
}

/// A checklist item owned by exactly one process.
#[derive(Debug, Clone, PartialEq)]
pub struct SubStep {
    /// Assigned by the store on insert; `None` until persisted
    pub id: Option<i64>,
    pub description: String,
    pub completed: bool,
    /// Display-order hint; no uniqueness constraint, never renumbered
    pub display_order: i32,
    /// Back-reference to the owning process, set by the store. Used for
    /// lookup-by-parent only, never for independent lifecycle management.
    pub process_id: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SubStep {
    /// Build a not-yet-persisted sub-step
    pub fn new(description: String, completed: bool, display_order: i32) -> Self {
        Self {
            id: None,
            description,
            completed,
            display_order,
            process_id: None,
            created_at: None,
            updated_at: None,
        }
    }
}

/// The top-level task record.
///
/// `completed` is derived state: it is only ever written through
/// [`Process::refresh_completion`], never taken from client input.
#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    /// Assigned by the store on insert; `None` until persisted
    pub id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    /// Zoneless, matching the wire contract. Invariant: `end_date >= start_date`.
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub completed: bool,
    /// Owned collection; replaced wholesale on update, deleted on cascade
    pub sub_steps: Vec<SubStep>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Process {
    /// A process is fully complete iff it has at least one sub-step and
    /// every sub-step is complete. Zero sub-steps is never complete.
    pub fn is_fully_complete(&self) -> bool {
        !self.sub_steps.is_empty() && self.sub_steps.iter().all(|s| s.completed)
    }

    /// Recompute the derived completion flag from the sub-step collection.
    pub fn refresh_completion(&mut self) {
        self.completed = self.is_fully_complete();
    }

    /// Attach a sub-step to the owned collection
    pub fn add_sub_step(&mut self, mut sub_step: SubStep) {
        sub_step.process_id = self.id;
        self.sub_steps.push(sub_step);
    }
}

//! States of the apply-theme state machine.
//!
//! ```text
//! Idle -> TemplatesSynced -> [DataReplayed] -> [MediaImported] -> Applied
//!   \______________\________________\________________\-----> Failed
//! ```
//!
//! The bracketed states are optional: they are entered only when the caller
//! asked for data and the theme actually ships it.

use serde::Serialize;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyState {
    Idle,
    TemplatesSynced,
    DataReplayed,
    MediaImported,
    Applied,
    Failed,
}

impl ApplyState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::TemplatesSynced => "templates_synced",
            Self::DataReplayed => "data_replayed",
            Self::MediaImported => "media_imported",
            Self::Applied => "applied",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Applied | Self::Failed)
    }

    /// Whether the machine may move from `self` to `next`.
    pub fn can_transition_to(self, next: ApplyState) -> bool {
        use ApplyState::*;
        match (self, next) {
            (Applied | Failed, _) => false,
            (_, Failed) => true,
            (Idle, TemplatesSynced) => true,
            (TemplatesSynced, DataReplayed | MediaImported | Applied) => true,
            (DataReplayed, MediaImported | Applied) => true,
            (MediaImported, Applied) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ApplyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records the path an apply run took through the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyProgress {
    state: ApplyState,
    history: Vec<ApplyState>,
}

impl ApplyProgress {
    pub fn new() -> Self {
        Self {
            state: ApplyState::Idle,
            history: vec![ApplyState::Idle],
        }
    }

    pub fn state(&self) -> ApplyState {
        self.state
    }

    pub fn history(&self) -> &[ApplyState] {
        &self.history
    }

    pub fn advance(&mut self, next: ApplyState) -> Result<(), CoreError> {
        if !self.state.can_transition_to(next) {
            return Err(CoreError::Internal(format!(
                "Invalid apply transition {} -> {}",
                self.state, next
            )));
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Move to `Failed` unless already terminal.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = ApplyState::Failed;
            self.history.push(ApplyState::Failed);
        }
    }
}

impl Default for ApplyProgress {
    fn default() -> Self {
        Self::new()
    }
}

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("battle not found: {0}")]
    BattleNotFound(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("target not found: {0}")]
    TargetNotFound(String),

    #[error("unknown status effect kind: {0}")]
    UnknownEffect(String),

    #[error("invalid stats for {id}: {reason}")]
    InvalidStats { id: String, reason: String },

    #[error("invalid behavior profile: {field}={value} is outside [0, 1]")]
    InvalidProfile { field: &'static str, value: f64 },

    #[error("battle {0} is already completed")]
    BattleCompleted(String),

    #[error("session {0} is no longer in an encounter")]
    EncounterClosed(String),

    #[error("session {0} failed mid-turn and must be re-validated")]
    SessionPoisoned(String),

    #[error("encounter {0} has no enemies")]
    EmptyRoster(String),

    #[error("id already registered: {0}")]
    DuplicateId(String),

    #[error("unknown content id: {0}")]
    UnknownContent(String),
}

impl EngineError {
    /// Input the engine refused before mutating anything.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidAction(_)
                | EngineError::TargetNotFound(_)
                | EngineError::BattleNotFound(_)
                | EngineError::SessionNotFound(_)
                | EngineError::BattleCompleted(_)
                | EngineError::EncounterClosed(_)
                | EngineError::SessionPoisoned(_)
                | EngineError::DuplicateId(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

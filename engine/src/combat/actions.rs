use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// A declared action. Targets are only meaningful in 1-vs-N encounters;
/// `None` means "first living enemy" there and is ignored in PvP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Attack {
        #[serde(default)]
        target: Option<String>,
    },
    Defend,
    Ability {
        #[serde(default)]
        target: Option<String>,
    },
}

impl Action {
    pub fn attack() -> Self {
        Action::Attack { target: None }
    }

    pub fn attack_target(target: impl Into<String>) -> Self {
        Action::Attack {
            target: Some(target.into()),
        }
    }

    pub fn ability() -> Self {
        Action::Ability { target: None }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            Action::Attack { target } | Action::Ability { target } => target.as_deref(),
            Action::Defend => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Attack { .. } => "attack",
            Action::Defend => "defend",
            Action::Ability { .. } => "ability",
        }
    }

    /// Parse a loosely typed `{kind, target}` payload as received from a client.
    pub fn parse(kind: &str, target: Option<String>) -> Result<Self> {
        match kind.trim().to_lowercase().as_str() {
            "attack" => Ok(Action::Attack { target }),
            "defend" => Ok(Action::Defend),
            "ability" => Ok(Action::Ability { target }),
            other => Err(EngineError::InvalidAction(other.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target() {
            Some(t) => write!(f, "{}→{}", self.name(), t),
            None => f.write_str(self.name()),
        }
    }
}

/// Wire form of an action before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub target: Option<String>,
}

impl ActionRequest {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            target: None,
        }
    }

    pub fn into_action(self) -> Result<Action> {
        Action::parse(&self.kind, self.target)
    }
}

impl TryFrom<ActionRequest> for Action {
    type Error = EngineError;

    fn try_from(req: ActionRequest) -> Result<Self> {
        req.into_action()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_kinds() {
        let err = ActionRequest::new("cast_fireball").into_action().unwrap_err();
        assert_eq!(err, EngineError::InvalidAction("cast_fireball".into()));
    }

    #[test]
    fn defend_drops_any_target() {
        let req = ActionRequest {
            kind: "Defend".into(),
            target: Some("goblin-1".into()),
        };
        assert_eq!(Action::try_from(req).unwrap(), Action::Defend);
    }

    #[test]
    fn serde_uses_a_type_tag() {
        let json = serde_json::to_string(&Action::attack_target("orc")).unwrap();
        assert_eq!(json, r#"{"type":"attack","target":"orc"}"#);
        let back: Action = serde_json::from_str(r#"{"type":"defend"}"#).unwrap();
        assert_eq!(back, Action::Defend);
    }
}

//! Outbound payloads. Transport-agnostic: callers serialize them however they ship them.

use serde::{Deserialize, Serialize};

use crate::ai::Decision;
use crate::battle::{Battle, Turn};
use crate::effects::{EffectKind, StatusEffect};
use crate::encounter::{EncounterTurn, Enemy};
use crate::service::LootReward;
use crate::stats::Combatant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectSummary {
    pub kind: EffectKind,
    pub stacks: u32,
    pub duration: u32,
}

pub fn serialize_effects(effects: &[StatusEffect]) -> Vec<EffectSummary> {
    effects
        .iter()
        .map(|e| EffectSummary {
            kind: e.kind,
            stacks: e.stacks,
            duration: e.duration,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantSnapshot {
    pub id: String,
    pub hp: i32,
    pub max_hp: i32,
    pub effects: Vec<EffectSummary>,
}

impl From<&Combatant> for CombatantSnapshot {
    fn from(c: &Combatant) -> Self {
        Self {
            id: c.id.clone(),
            hp: c.stats.current_hp,
            max_hp: c.stats.max_hp,
            effects: serialize_effects(&c.effects),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub id: String,
    pub enemy_type: String,
    pub hp: i32,
    pub max_hp: i32,
    pub effects: Vec<EffectSummary>,
    pub last_decision: Option<Decision>,
}

impl From<&Enemy> for EnemySnapshot {
    fn from(e: &Enemy) -> Self {
        Self {
            id: e.combatant.id.clone(),
            enemy_type: e.enemy_type.clone(),
            hp: e.combatant.stats.current_hp,
            max_hp: e.combatant.stats.max_hp,
            effects: serialize_effects(&e.combatant.effects),
            last_decision: e.last_decision,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    EncounterStarted {
        session_id: String,
        player: CombatantSnapshot,
        enemies: Vec<EnemySnapshot>,
    },
    TurnResult {
        session_id: String,
        turn: EncounterTurn,
    },
    EncounterWon {
        session_id: String,
        turn: u32,
        loot: LootReward,
    },
    EncounterLost {
        session_id: String,
        turn: u32,
    },
    BattleStart {
        battle_id: String,
        combatants: [CombatantSnapshot; 2],
    },
    ActionResult {
        battle_id: String,
        turn: Turn,
    },
    BattleEnd {
        battle_id: String,
        winner: Option<String>,
        turns: u32,
        duration_ms: i64,
    },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::EncounterStarted { .. } => "encounter_started",
            ServerEvent::TurnResult { .. } => "turn_result",
            ServerEvent::EncounterWon { .. } => "encounter_won",
            ServerEvent::EncounterLost { .. } => "encounter_lost",
            ServerEvent::BattleStart { .. } => "battle_start",
            ServerEvent::ActionResult { .. } => "action_result",
            ServerEvent::BattleEnd { .. } => "battle_end",
        }
    }

    pub fn battle_start(battle: &Battle) -> Self {
        ServerEvent::BattleStart {
            battle_id: battle.id.clone(),
            combatants: [
                CombatantSnapshot::from(&battle.combatants[0]),
                CombatantSnapshot::from(&battle.combatants[1]),
            ],
        }
    }

    pub fn battle_end(battle: &Battle) -> Self {
        ServerEvent::BattleEnd {
            battle_id: battle.id.clone(),
            winner: battle.winner.clone(),
            turns: battle.turns.len() as u32,
            duration_ms: battle.duration_ms.unwrap_or_default(),
        }
    }
}

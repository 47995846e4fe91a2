//! 1v1 PvP battles.
//!
//! A [`Battle`] owns deep copies of both combatants. Each call to
//! [`Battle::process_turn`] resolves both declared actions in speed order, runs
//! the flat end-of-turn DoT, and appends one [`Turn`]. Once completed the battle
//! rejects further turns, so the winner can never change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Dice;
use crate::combat::{Action, AttackRoll, resolve_pvp_attack};
use crate::effects::{ApplyBonus, EffectKind, merge_effect};
use crate::error::{EngineError, Result};
use crate::events::CombatantSnapshot;
use crate::modifiers::{healing_modifier, is_stunned, speed_modifier};
use crate::stats::{Combatant, apply_damage, heal};
use crate::ticks::{TickReport, process_legacy_dot};

/// Share of max HP restored by the PvP ability ("second wind").
pub const SECOND_WIND: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ActionOutcome {
    Stunned,
    Missed { hit_chance: f64 },
    Hit {
        damage: i32,
        critical: bool,
        bleed_applied: bool,
    },
    Defended,
    Healed { amount: i32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub actor_id: String,
    pub target_id: String,
    pub action: Action,
    pub outcome: ActionOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DotResult {
    pub combatant_id: String,
    pub report: TickReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub number: u32,
    /// Combatant ids in the order they acted.
    pub order: Vec<String>,
    pub actions: Vec<ActionResult>,
    pub dot: Vec<DotResult>,
    pub snapshots: Vec<CombatantSnapshot>,
    pub ended_battle: bool,
    pub log: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battle {
    pub id: String,
    pub combatants: [Combatant; 2],
    pub turns: Vec<Turn>,
    pub winner: Option<String>,
    pub status: BattleStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
}

/// Indices of the two sides in acting order: `speed × slow modifier + U(0, 5)`, ties to side 0.
pub fn action_order(first: &Combatant, second: &Combatant, dice: &mut Dice) -> [usize; 2] {
    let a = first.stats.speed as f64 * speed_modifier(&first.effects) + dice.between(0.0, 5.0);
    let b = second.stats.speed as f64 * speed_modifier(&second.effects) + dice.between(0.0, 5.0);
    if b > a { [1, 0] } else { [0, 1] }
}

fn pair_mut(combatants: &mut [Combatant; 2], actor: usize) -> (&mut Combatant, &mut Combatant) {
    let (left, right) = combatants.split_at_mut(1);
    if actor == 0 { (&mut left[0], &mut right[0]) } else { (&mut right[0], &mut left[0]) }
}

impl Battle {
    /// Start a battle from copies of the two source records.
    pub fn new(id: impl Into<String>, first: &Combatant, second: &Combatant) -> Result<Self> {
        let id = id.into();
        first.stats.validate(&first.id)?;
        second.stats.validate(&second.id)?;
        if first.id == second.id {
            return Err(EngineError::DuplicateId(first.id.clone()));
        }
        info!(battle = %id, first = %first.id, second = %second.id, "battle started");
        Ok(Self {
            id,
            combatants: [first.clone(), second.clone()],
            turns: Vec::new(),
            winner: None,
            status: BattleStatus::InProgress,
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
        })
    }

    pub fn is_completed(&self) -> bool {
        self.status == BattleStatus::Completed
    }

    /// Resolve one turn. `actions[i]` is the action declared by `combatants[i]`.
    pub fn process_turn(&mut self, actions: [&Action; 2], dice: &mut Dice) -> Result<&Turn> {
        if self.is_completed() {
            return Err(EngineError::BattleCompleted(self.id.clone()));
        }

        let number = self.turns.len() as u32 + 1;
        let order = action_order(&self.combatants[0], &self.combatants[1], dice);
        let mut log = vec![format!(
            "[ORDER] turn {}: {} then {}",
            number, self.combatants[order[0]].id, self.combatants[order[1]].id
        )];
        let mut results = Vec::with_capacity(2);
        let mut ended = false;
        let mut winner = None;

        for &actor_idx in &order {
            let action = actions[actor_idx];
            let (actor, target) = pair_mut(&mut self.combatants, actor_idx);
            let outcome = resolve_action(actor, target, action, number, dice, &mut log);
            results.push(ActionResult {
                actor_id: actor.id.clone(),
                target_id: target.id.clone(),
                action: action.clone(),
                outcome,
            });
            if !target.is_alive() {
                ended = true;
                winner = Some(actor.id.clone());
                log.push(format!("[KO] {} is defeated by {}", target.id, actor.id));
                break;
            }
        }

        let mut dot = Vec::new();
        if !ended {
            for c in self.combatants.iter_mut() {
                let report = process_legacy_dot(&mut c.effects, c.stats.max_hp, c.stats.current_hp);
                for entry in &report.results {
                    log.push(format!("[TICK][{}] {} deals {}", c.id, entry.kind, entry.damage));
                }
                c.stats.current_hp = report.new_hp;
                c.defended = false;
                dot.push(DotResult {
                    combatant_id: c.id.clone(),
                    report,
                });
            }
            let alive = [self.combatants[0].is_alive(), self.combatants[1].is_alive()];
            match alive {
                [false, false] => {
                    ended = true;
                    log.push("[KO] both combatants fall to damage over time".to_string());
                }
                [true, false] => {
                    ended = true;
                    winner = Some(self.combatants[0].id.clone());
                }
                [false, true] => {
                    ended = true;
                    winner = Some(self.combatants[1].id.clone());
                }
                [true, true] => {}
            }
        }

        let order_ids = order.iter().map(|&i| self.combatants[i].id.clone()).collect();
        let snapshots = self.combatants.iter().map(CombatantSnapshot::from).collect();
        if ended {
            self.finish(winner, &mut log);
        }

        let idx = self.turns.len();
        self.turns.push(Turn {
            number,
            order: order_ids,
            actions: results,
            dot,
            snapshots,
            ended_battle: ended,
            log,
        });
        Ok(&self.turns[idx])
    }

    fn finish(&mut self, winner: Option<String>, log: &mut Vec<String>) {
        let ended_at = Utc::now();
        self.duration_ms = Some((ended_at - self.started_at).num_milliseconds());
        self.ended_at = Some(ended_at);
        self.status = BattleStatus::Completed;
        log.push(format!(
            "[END] winner={}",
            winner.as_deref().unwrap_or("none")
        ));
        info!(
            battle = %self.id,
            winner = ?winner,
            turns = self.turns.len() + 1,
            "battle completed"
        );
        self.winner = winner;
    }
}

fn resolve_action(
    actor: &mut Combatant,
    target: &mut Combatant,
    action: &Action,
    turn: u32,
    dice: &mut Dice,
    log: &mut Vec<String>,
) -> ActionOutcome {
    if is_stunned(&actor.effects) {
        log.push(format!("[STUN][{}] cannot act", actor.id));
        return ActionOutcome::Stunned;
    }

    match action {
        Action::Attack { .. } => {
            let roll: AttackRoll = resolve_pvp_attack(
                &actor.stats,
                &actor.effects,
                &target.stats,
                &target.effects,
                target.defended,
                dice,
            );
            if !roll.hit {
                log.push(format!(
                    "[ATTACK][{}] misses {} (hit chance {:.2})",
                    actor.id, target.id, roll.hit_chance
                ));
                return ActionOutcome::Missed {
                    hit_chance: roll.hit_chance,
                };
            }
            log.push(format!(
                "[ATTACK][{}] {} {} for {}",
                actor.id,
                if roll.critical { "CRITS" } else { "hits" },
                target.id,
                roll.damage
            ));
            apply_damage(&target.id, &mut target.stats, roll.damage, |msg| log.push(msg));
            if roll.bleed_on_crit {
                let bleed = merge_effect(
                    &mut target.effects,
                    EffectKind::Bleed,
                    &actor.id,
                    turn,
                    ApplyBonus::default(),
                );
                log.push(format!(
                    "[EFFECT][{}] bleeds ({} stacks, {} turns)",
                    target.id, bleed.stacks, bleed.duration
                ));
            }
            ActionOutcome::Hit {
                damage: roll.damage,
                critical: roll.critical,
                bleed_applied: roll.bleed_on_crit,
            }
        }
        Action::Defend => {
            actor.defended = true;
            log.push(format!("[DEFEND][{}] braces", actor.id));
            ActionOutcome::Defended
        }
        Action::Ability { .. } => {
            let raw = actor.stats.max_hp as f64 * SECOND_WIND * healing_modifier(&actor.effects);
            let restore = (raw.floor() as i32).max(1);
            let amount = heal(&actor.id, &mut actor.stats, restore, |msg| log.push(msg));
            debug!(actor = %actor.id, amount, "second wind");
            ActionOutcome::Healed { amount }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::CombatantStats;

    fn fighter(id: &str, hp: i32, speed: i32) -> Combatant {
        Combatant::new(id, CombatantStats::new(hp, 30, 10, speed, 80, 50)).unwrap()
    }

    #[test]
    fn rejects_identical_ids() {
        let a = fighter("a", 50, 10);
        assert!(matches!(Battle::new("b1", &a, &a), Err(EngineError::DuplicateId(_))));
    }

    #[test]
    fn faster_side_acts_first() {
        let slow = fighter("slow", 50, 1);
        let fast = fighter("fast", 50, 40);
        let mut dice = Dice::from_seed(3);
        assert_eq!(action_order(&slow, &fast, &mut dice), [1, 0]);
    }

    #[test]
    fn source_records_are_not_shared() {
        let mut a = fighter("a", 50, 10);
        let b = fighter("b", 50, 10);
        let battle = Battle::new("b1", &a, &b).unwrap();
        a.stats.current_hp = 1;
        assert_eq!(battle.combatants[0].stats.current_hp, 50);
    }
}

//! Live 1-vs-N dungeon encounters.
//!
//! One call to [`EncounterSession::act`] is one full turn: the player's action,
//! then every living enemy in roster order, then the stack-scaled effect tick
//! for everyone, then pruning and terminal evaluation.
//!
//! The player side draws from the session dice. Each enemy draws from its own
//! dice seeded by [`enemy_seed`], so one enemy's rolls never shift another's.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Dice;
use crate::ai::{BehaviorProfile, Decision, Situation, decide, enemy_seed, predict_incoming_damage};
use crate::combat::{Action, Strike, resolve_live_attack};
use crate::effects::{
    ApplyBonus, ApplyOutcome, EffectAbility, EffectKind, merge_effect, roll_attack_effects,
};
use crate::error::{EngineError, Result};
use crate::events::{CombatantSnapshot, EnemySnapshot};
use crate::modifiers::{attack_modifier, is_defending, is_stunned};
use crate::stats::{Combatant, CombatantStats, apply_damage};
use crate::ticks::{TickReport, process_status_effects};

/// Damage multiplier of a skill strike (the `ability` action).
pub const SKILL_POWER: f64 = 1.3;
/// Extra effect apply chance of a skill strike.
pub const SKILL_APPLY_BONUS: f64 = 0.10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub combatant: Combatant,
    pub class: String,
    pub abilities: Vec<EffectAbility>,
    pub crit_chance: f64,
}

impl Player {
    pub fn new(
        id: impl Into<String>,
        class: impl Into<String>,
        stats: CombatantStats,
        abilities: Vec<EffectAbility>,
        crit_chance: f64,
    ) -> Result<Self> {
        Ok(Self {
            combatant: Combatant::new(id, stats)?,
            class: class.into(),
            abilities,
            crit_chance,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub combatant: Combatant,
    pub enemy_type: String,
    pub profile: BehaviorProfile,
    pub abilities: Vec<EffectAbility>,
    pub crit_chance: f64,
    #[serde(default)]
    pub fled: bool,
    #[serde(default)]
    pub last_decision: Option<Decision>,
}

impl Enemy {
    pub fn new(
        id: impl Into<String>,
        enemy_type: impl Into<String>,
        stats: CombatantStats,
        profile: BehaviorProfile,
        abilities: Vec<EffectAbility>,
        crit_chance: f64,
    ) -> Result<Self> {
        profile.validate()?;
        Ok(Self {
            combatant: Combatant::new(id, stats)?,
            enemy_type: enemy_type.into(),
            profile,
            abilities,
            crit_chance,
            fled: false,
            last_decision: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.combatant.id
    }

    /// Still on the field: alive and not fled.
    pub fn is_active(&self) -> bool {
        self.combatant.is_alive() && !self.fled
    }
}

/// Room context forwarded to the loot engine on a win.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncounterContext {
    pub depth: u32,
    pub difficulty: f64,
    pub magic_find: f64,
}

impl Default for EncounterContext {
    fn default() -> Self {
        Self {
            depth: 1,
            difficulty: 1.0,
            magic_find: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterOutcome {
    Won,
    Lost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectEvent {
    pub kind: EffectKind,
    pub applied: bool,
    pub resisted: bool,
    pub stacks: Option<u32>,
    pub duration: Option<u32>,
}

impl From<&ApplyOutcome> for EffectEvent {
    fn from(o: &ApplyOutcome) -> Self {
        Self {
            kind: o.kind,
            applied: o.applied,
            resisted: o.resisted,
            stacks: o.effect.as_ref().map(|e| e.stacks),
            duration: o.effect.as_ref().map(|e| e.duration),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TurnEvent {
    Stunned {
        actor_id: String,
    },
    Strike {
        actor_id: String,
        target_id: String,
        skill: bool,
        hit: bool,
        critical: bool,
        damage: i32,
        effects: Vec<EffectEvent>,
    },
    Defend {
        actor_id: String,
    },
    Flee {
        actor_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTick {
    pub entity_id: String,
    pub report: TickReport,
}

/// Everything that happened in one encounter turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterTurn {
    pub turn: u32,
    pub events: Vec<TurnEvent>,
    pub ticks: Vec<EntityTick>,
    /// Enemies that left the field this turn (defeated or fled).
    pub removed: Vec<String>,
    pub player: CombatantSnapshot,
    pub enemies: Vec<EnemySnapshot>,
    pub outcome: Option<EncounterOutcome>,
    pub log: Vec<String>,
}

#[derive(Debug)]
pub struct EncounterSession {
    pub id: String,
    pub seed: u64,
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub turn: u32,
    pub in_encounter: bool,
    pub context: EncounterContext,
    pub outcome: Option<EncounterOutcome>,
    /// Type of the most recently defeated enemy; reported to the loot engine.
    pub last_defeated_type: Option<String>,
    dice: Dice,
}

impl EncounterSession {
    pub fn new(
        id: impl Into<String>,
        seed: u64,
        player: Player,
        enemies: Vec<Enemy>,
        context: EncounterContext,
    ) -> Result<Self> {
        let id = id.into();
        if enemies.is_empty() {
            return Err(EngineError::EmptyRoster(id));
        }
        for (i, enemy) in enemies.iter().enumerate() {
            let clashes = enemies[..i].iter().any(|e| e.id() == enemy.id());
            if enemy.id() == player.combatant.id || clashes {
                return Err(EngineError::DuplicateId(enemy.id().to_string()));
            }
        }
        info!(session = %id, enemies = enemies.len(), "encounter started");
        Ok(Self {
            id,
            seed,
            player,
            enemies,
            turn: 0,
            in_encounter: true,
            context,
            outcome: None,
            last_defeated_type: None,
            dice: Dice::from_seed(seed),
        })
    }

    /// Replace the player-side dice, e.g. with a scripted sequence.
    pub fn with_dice(mut self, dice: Dice) -> Self {
        self.dice = dice;
        self
    }

    pub fn player_snapshot(&self) -> CombatantSnapshot {
        CombatantSnapshot::from(&self.player.combatant)
    }

    pub fn enemy_snapshots(&self) -> Vec<EnemySnapshot> {
        self.enemies.iter().map(EnemySnapshot::from).collect()
    }

    fn resolve_target(&self, action: &Action) -> Result<Option<usize>> {
        match action {
            Action::Defend => Ok(None),
            Action::Attack { target } | Action::Ability { target } => {
                let idx = match target {
                    Some(id) => self.enemies.iter().position(|e| e.id() == id && e.is_active()),
                    None => self.enemies.iter().position(Enemy::is_active),
                };
                match idx {
                    Some(i) => Ok(Some(i)),
                    None => Err(EngineError::TargetNotFound(
                        target.clone().unwrap_or_else(|| "<any>".to_string()),
                    )),
                }
            }
        }
    }

    /// Resolve one full turn. Input is validated before anything is mutated.
    pub fn act(&mut self, action: &Action) -> Result<EncounterTurn> {
        if !self.in_encounter {
            return Err(EngineError::EncounterClosed(self.id.clone()));
        }
        let target_idx = self.resolve_target(action)?;

        self.turn += 1;
        let turn = self.turn;
        let mut events = Vec::new();
        let mut log = Vec::new();

        player_phase(
            &mut self.player,
            &mut self.enemies,
            action,
            target_idx,
            turn,
            &mut self.dice,
            &mut events,
            &mut log,
        );

        for (ordinal, enemy) in self.enemies.iter_mut().enumerate() {
            if !enemy.is_active() {
                continue;
            }
            if !self.player.combatant.is_alive() {
                break;
            }
            let seed = enemy_seed(self.seed, &self.id, enemy.id(), turn, ordinal as u32);
            let mut enemy_dice = Dice::from_seed(seed);
            enemy_phase(enemy, &mut self.player, turn, &mut enemy_dice, &mut events, &mut log);
        }

        let mut ticks = Vec::new();
        ticks.push(tick_combatant(&mut self.player.combatant, &mut log));
        for enemy in self.enemies.iter_mut().filter(|e| e.is_active()) {
            ticks.push(tick_combatant(&mut enemy.combatant, &mut log));
        }

        let mut removed = Vec::new();
        for enemy in &self.enemies {
            if !enemy.combatant.is_alive() {
                log.push(format!("[KO] {} is defeated", enemy.id()));
                self.last_defeated_type = Some(enemy.enemy_type.clone());
                removed.push(enemy.id().to_string());
            } else if enemy.fled {
                log.push(format!("[FLEE] {} escapes", enemy.id()));
                removed.push(enemy.id().to_string());
            }
        }
        self.enemies.retain(Enemy::is_active);

        let outcome = if !self.player.combatant.is_alive() {
            Some(EncounterOutcome::Lost)
        } else if self.enemies.is_empty() {
            Some(EncounterOutcome::Won)
        } else {
            None
        };
        if let Some(o) = outcome {
            self.in_encounter = false;
            self.outcome = Some(o);
            log.push(format!("[END] {:?} on turn {}", o, turn));
            info!(session = %self.id, outcome = ?o, turn, "encounter finished");
        }

        Ok(EncounterTurn {
            turn,
            events,
            ticks,
            removed,
            player: self.player_snapshot(),
            enemies: self.enemy_snapshots(),
            outcome,
            log,
        })
    }
}

fn add_defend(combatant: &mut Combatant, turn: u32) {
    merge_effect(
        &mut combatant.effects,
        EffectKind::Defend,
        &combatant.id,
        turn,
        ApplyBonus::default(),
    );
    combatant.defended = true;
}

fn guarded(combatant: &Combatant) -> bool {
    combatant.defended || is_defending(&combatant.effects)
}

#[allow(clippy::too_many_arguments)]
fn player_phase(
    player: &mut Player,
    enemies: &mut [Enemy],
    action: &Action,
    target_idx: Option<usize>,
    turn: u32,
    dice: &mut Dice,
    events: &mut Vec<TurnEvent>,
    log: &mut Vec<String>,
) {
    let me = &mut player.combatant;
    if is_stunned(&me.effects) {
        log.push(format!("[STUN][{}] cannot act", me.id));
        events.push(TurnEvent::Stunned {
            actor_id: me.id.clone(),
        });
        return;
    }

    match (action, target_idx) {
        (Action::Defend, _) => {
            add_defend(me, turn);
            log.push(format!("[DEFEND][{}] braces", me.id));
            events.push(TurnEvent::Defend {
                actor_id: me.id.clone(),
            });
        }
        (Action::Attack { .. }, Some(idx)) | (Action::Ability { .. }, Some(idx)) => {
            let skill = matches!(action, Action::Ability { .. });
            let target = &mut enemies[idx].combatant;
            let event =
                strike(me, &player.abilities, target, player.crit_chance, skill, turn, dice, log);
            events.push(event);
        }
        // resolve_target always yields an index for attack/ability
        (_, None) => {}
    }
}

fn enemy_phase(
    enemy: &mut Enemy,
    player: &mut Player,
    turn: u32,
    dice: &mut Dice,
    events: &mut Vec<TurnEvent>,
    log: &mut Vec<String>,
) {
    let me = &mut enemy.combatant;
    if is_stunned(&me.effects) {
        log.push(format!("[STUN][{}] cannot act", me.id));
        events.push(TurnEvent::Stunned {
            actor_id: me.id.clone(),
        });
        return;
    }

    let foe = &mut player.combatant;
    let situation = Situation {
        hp_ratio: me.stats.hp_ratio(),
        current_hp: me.stats.current_hp,
        predicted_damage: predict_incoming_damage(
            foe.stats.attack,
            attack_modifier(&foe.effects),
            me.stats.defense,
        ),
        already_defended: guarded(me),
    };
    let decision = decide(&enemy.profile, &situation, dice);
    enemy.last_decision = Some(decision);
    debug!(enemy = %me.id, ?decision, turn, "enemy acts");

    match decision {
        Decision::Attack | Decision::Ability => {
            let skill = decision == Decision::Ability;
            let event =
                strike(me, &enemy.abilities, foe, enemy.crit_chance, skill, turn, dice, log);
            events.push(event);
        }
        Decision::Defend => {
            add_defend(me, turn);
            log.push(format!("[DEFEND][{}] braces", me.id));
            events.push(TurnEvent::Defend {
                actor_id: me.id.clone(),
            });
        }
        Decision::Flee => {
            enemy.fled = true;
            log.push(format!("[FLEE][{}] turns to run", me.id));
            events.push(TurnEvent::Flee {
                actor_id: me.id.clone(),
            });
        }
    }
}

/// Live-mode attack or skill strike followed by the attacker's effect table.
#[allow(clippy::too_many_arguments)]
fn strike(
    attacker: &Combatant,
    abilities: &[EffectAbility],
    target: &mut Combatant,
    crit_chance: f64,
    skill: bool,
    turn: u32,
    dice: &mut Dice,
    log: &mut Vec<String>,
) -> TurnEvent {
    let power = if skill { SKILL_POWER } else { 1.0 };
    let roll = resolve_live_attack(
        &attacker.stats,
        &attacker.effects,
        &target.stats,
        guarded(target),
        Strike { crit_chance, power },
        dice,
    );

    let mut effects = Vec::new();
    if roll.hit {
        log.push(format!(
            "[ATTACK][{}] {} {} for {}",
            attacker.id,
            if roll.critical { "CRITS" } else { "hits" },
            target.id,
            roll.damage
        ));
        apply_damage(&target.id, &mut target.stats, roll.damage, |msg| log.push(msg));
        if target.is_alive() {
            let extra = if skill { SKILL_APPLY_BONUS } else { 0.0 };
            let outcomes = roll_attack_effects(
                abilities,
                &mut target.effects,
                &attacker.id,
                turn,
                target.stats.defense,
                roll.critical,
                extra,
                dice,
            );
            for o in &outcomes {
                log.push(format!("{} on {}", o.message, target.id));
            }
            effects = outcomes.iter().map(EffectEvent::from).collect();
        }
    } else {
        log.push(format!("[ATTACK][{}] misses {}", attacker.id, target.id));
    }

    TurnEvent::Strike {
        actor_id: attacker.id.clone(),
        target_id: target.id.clone(),
        skill,
        hit: roll.hit,
        critical: roll.critical,
        damage: roll.damage,
        effects,
    }
}

fn tick_combatant(combatant: &mut Combatant, log: &mut Vec<String>) -> EntityTick {
    let report = process_status_effects(
        &mut combatant.effects,
        combatant.stats.max_hp,
        combatant.stats.current_hp,
    );
    for entry in &report.results {
        log.push(format!(
            "[TICK][{}] {} x{} deals {}",
            combatant.id, entry.kind, entry.stacks, entry.damage
        ));
    }
    for kind in &report.expired {
        log.push(format!("[TICK][{}] {} wears off", combatant.id, kind));
    }
    combatant.stats.current_hp = report.new_hp;
    combatant.defended = false;
    EntityTick {
        entity_id: combatant.id.clone(),
        report,
    }
}

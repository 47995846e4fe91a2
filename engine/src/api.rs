//! JSON-friendly simulation harness shared by the CLI and the FFI bridge.
//!
//! Configs name built-in content or point at files on disk; results are plain
//! serializable reports carrying the human-readable turn log.

use std::fs;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::ai::{Decision, boss_decision};
use crate::battle::Battle;
use crate::content::{ContentPack, RoomDef, StatBlock};
use crate::effects::has_effect;
use crate::encounter::{EncounterContext, EncounterOutcome, EncounterSession, Enemy, TurnEvent};
use crate::{Action, Combatant, Dice, EffectKind, EngineConfig};

const DEFAULT_MAX_ENCOUNTER_TURNS: u32 = 60;
const CAUTIOUS_HEAL_BELOW: f64 = 0.35;
const PLAYER_GUARD_BELOW: f64 = 0.25;

/// How a simulated PvP side picks its action each turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PvpPolicy {
    #[default]
    Aggressive,
    /// Second wind when low, attack otherwise.
    Cautious,
}

impl PvpPolicy {
    pub fn choose(self, me: &Combatant) -> Action {
        match self {
            PvpPolicy::Aggressive => Action::attack(),
            PvpPolicy::Cautious if me.stats.hp_ratio() < CAUTIOUS_HEAL_BELOW => Action::ability(),
            PvpPolicy::Cautious => Action::attack(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FighterConfig {
    pub id: String,
    #[serde(default)]
    pub class_id: Option<String>,
    /// Explicit stats win over `class_id`.
    #[serde(default)]
    pub stats: Option<StatBlock>,
    #[serde(default)]
    pub policy: PvpPolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BattleConfig {
    pub first: FighterConfig,
    pub second: FighterConfig,
    #[serde(default)]
    pub seed: u64,
    /// Overrides `EngineConfig::max_pvp_turns`.
    #[serde(default)]
    pub max_turns: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BattleReport {
    pub battle_id: String,
    pub winner: Option<String>,
    pub turns: u32,
    /// The turn cap was reached before either side fell.
    pub capped: bool,
    pub first_hp_end: i32,
    pub second_hp_end: i32,
    pub log: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BattleStats {
    pub samples: u32,
    pub first_wins: u32,
    pub second_wins: u32,
    /// No winner: double KO or turn cap.
    pub draws: u32,
    pub capped: u32,
    pub first_win_rate: f64,
    pub avg_turns: f64,
    pub median_turns: u32,
}

fn build_fighter(pack: &ContentPack, f: &FighterConfig) -> Result<Combatant> {
    let stats = match (&f.stats, &f.class_id) {
        (Some(block), _) => block.scaled(1.0),
        (None, Some(class_id)) => pack.class(class_id)?.stats.scaled(1.0),
        (None, None) => bail!("fighter '{}' needs either class_id or stats", f.id),
    };
    Ok(Combatant::new(f.id.clone(), stats)?)
}

pub fn simulate_battle(cfg: BattleConfig, engine: &EngineConfig) -> Result<BattleReport> {
    let pack = ContentPack::builtin()?;
    let first = build_fighter(&pack, &cfg.first)?;
    let second = build_fighter(&pack, &cfg.second)?;
    let battle_id = format!("sim-{}", cfg.seed);
    let mut battle = Battle::new(battle_id.clone(), &first, &second)?;
    let mut dice = Dice::from_seed(cfg.seed);
    let max_turns = cfg.max_turns.unwrap_or(engine.max_pvp_turns);

    let mut log = Vec::new();
    while !battle.is_completed() && (battle.turns.len() as u32) < max_turns {
        let a = cfg.first.policy.choose(&battle.combatants[0]);
        let b = cfg.second.policy.choose(&battle.combatants[1]);
        let turn = battle.process_turn([&a, &b], &mut dice)?;
        log.extend(turn.log.iter().cloned());
    }

    let capped = !battle.is_completed();
    if capped {
        log.push(format!("[END] turn cap {} reached", max_turns));
    }
    Ok(BattleReport {
        battle_id,
        winner: battle.winner.clone(),
        turns: battle.turns.len() as u32,
        capped,
        first_hp_end: battle.combatants[0].stats.current_hp,
        second_hp_end: battle.combatants[1].stats.current_hp,
        log,
    })
}

/// Run `samples` battles; sample `i` uses `seed + i`.
pub fn simulate_battle_many(
    cfg: BattleConfig,
    engine: &EngineConfig,
    samples: u32,
) -> Result<BattleStats> {
    let mut first_wins = 0u32;
    let mut second_wins = 0u32;
    let mut draws = 0u32;
    let mut capped = 0u32;
    let mut turns: Vec<u32> = Vec::with_capacity(samples as usize);

    for i in 0..samples {
        let mut run = cfg.clone();
        run.seed = cfg.seed.wrapping_add(i as u64);
        let report = simulate_battle(run, engine)?;
        match report.winner.as_deref() {
            Some(w) if w == cfg.first.id => first_wins += 1,
            Some(_) => second_wins += 1,
            None => draws += 1,
        }
        if report.capped {
            capped += 1;
        }
        turns.push(report.turns);
    }

    turns.sort_unstable();
    Ok(BattleStats {
        samples,
        first_wins,
        second_wins,
        draws,
        capped,
        first_win_rate: if samples == 0 { 0.0 } else { first_wins as f64 / samples as f64 },
        avg_turns: mean(&turns),
        median_turns: median(&turns),
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EncounterConfig {
    /// Built-in room id; ignored when `room_path` is set.
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub room_path: Option<String>,
    #[serde(default = "default_class")]
    pub class_id: String,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub player_hp: Option<i32>,
    #[serde(default)]
    pub magic_find: f64,
    #[serde(default)]
    pub max_turns: Option<u32>,
}

fn default_class() -> String {
    "warrior".to_string()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EncounterReport {
    pub room: String,
    /// `None` when the turn cap was reached first.
    pub outcome: Option<EncounterOutcome>,
    pub turns: u32,
    pub player_hp_end: i32,
    pub enemies_defeated: u32,
    pub enemies_fled: u32,
    pub log: Vec<String>,
}

fn load_room(path: &str) -> Result<RoomDef> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read room JSON: {}", path))?;
    let room = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse room JSON: {}", path))?;
    Ok(room)
}

/// Scripted player: guard once when low, open with a skill strike on a clean
/// target, then keep hitting the weakest enemy.
fn player_choice(session: &EncounterSession, guarded_last: bool) -> Action {
    if session.player.combatant.stats.hp_ratio() <= PLAYER_GUARD_BELOW && !guarded_last {
        return Action::Defend;
    }
    let Some(target) = session
        .enemies
        .iter()
        .filter(|e| e.is_active())
        .min_by_key(|e| e.combatant.stats.current_hp)
    else {
        return Action::attack();
    };
    let debuffed = [EffectKind::Bleed, EffectKind::Poison, EffectKind::Burn, EffectKind::Weakness]
        .into_iter()
        .any(|k| has_effect(&target.combatant.effects, k));
    let id = Some(target.id().to_string());
    if debuffed { Action::Attack { target: id } } else { Action::Ability { target: id } }
}

pub fn simulate_encounter(cfg: EncounterConfig, engine: &EngineConfig) -> Result<EncounterReport> {
    let pack = ContentPack::builtin()?;
    let (room_name, room) = match (&cfg.room_path, &cfg.room_id) {
        (Some(path), _) => (path.clone(), load_room(path)?),
        (None, Some(id)) => (id.clone(), pack.room(id)?.clone()),
        (None, None) => bail!("encounter needs either room_id or room_path"),
    };
    let enemies: Vec<Enemy> = pack.spawn_roster(&room, engine)?;

    let mut player = pack.player("player", &cfg.class_id, engine)?;
    if let Some(hp) = cfg.player_hp {
        if hp <= 0 {
            bail!("player_hp must be positive, got {}", hp);
        }
        player.combatant.stats.max_hp = hp;
        player.combatant.stats.current_hp = hp;
    }

    let context = EncounterContext {
        depth: room.depth,
        difficulty: room.difficulty,
        magic_find: cfg.magic_find,
    };
    let session_id = format!("sim-{}", cfg.seed);
    let mut session = EncounterSession::new(session_id, cfg.seed, player, enemies, context)?;
    let max_turns = cfg.max_turns.unwrap_or(DEFAULT_MAX_ENCOUNTER_TURNS);

    let mut log = Vec::new();
    let mut defeated = 0u32;
    let mut fled = 0u32;
    let mut guarded_last = false;
    while session.in_encounter && session.turn < max_turns {
        let action = player_choice(&session, guarded_last);
        guarded_last = action == Action::Defend;
        let turn = session.act(&action)?;
        let fled_now =
            turn.events.iter().filter(|e| matches!(e, TurnEvent::Flee { .. })).count() as u32;
        fled += fled_now;
        defeated += turn.removed.len() as u32 - fled_now;
        log.extend(turn.log);
    }
    if session.in_encounter {
        log.push(format!("[END] turn cap {} reached", max_turns));
    }

    Ok(EncounterReport {
        room: room_name,
        outcome: session.outcome,
        turns: session.turn,
        player_hp_end: session.player.combatant.stats.current_hp,
        enemies_defeated: defeated,
        enemies_fled: fled,
        log,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DecisionTally {
    pub samples: u32,
    pub attack: u32,
    pub ability: u32,
    pub defend: u32,
    pub flee: u32,
}

impl DecisionTally {
    pub fn share(&self, decision: Decision) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        let n = match decision {
            Decision::Attack => self.attack,
            Decision::Ability => self.ability,
            Decision::Defend => self.defend,
            Decision::Flee => self.flee,
        };
        n as f64 / self.samples as f64
    }
}

/// Draw `samples` boss decisions at a fixed HP ratio from one seeded stream.
pub fn sample_boss_decisions(hp_ratio: f64, samples: u32, seed: u64) -> DecisionTally {
    let mut dice = Dice::from_seed(seed);
    let mut tally = DecisionTally {
        samples,
        ..DecisionTally::default()
    };
    for _ in 0..samples {
        match boss_decision(hp_ratio, &mut dice) {
            Decision::Attack => tally.attack += 1,
            Decision::Ability => tally.ability += 1,
            Decision::Defend => tally.defend += 1,
            Decision::Flee => tally.flee += 1,
        }
    }
    tally
}

fn mean(values: &[u32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v as u64).sum::<u64>() as f64 / values.len() as f64
}

/// Median of an already sorted slice.
fn median(sorted: &[u32]) -> u32 {
    if sorted.is_empty() {
        return 0;
    }
    let m = sorted.len() / 2;
    if sorted.len() % 2 == 1 { sorted[m] } else { (sorted[m - 1] + sorted[m]) / 2 }
}

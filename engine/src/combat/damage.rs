//! Hit, critical and damage resolution.
//!
//! The PvP and live-encounter formulas differ on purpose (miss model, defense
//! weight, crit model) and are exposed as two separate resolvers. Both are pure
//! apart from the draws taken from the supplied [`Dice`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Dice;
use crate::effects::{EffectKind, StatusEffect, has_effect};
use crate::modifiers::attack_modifier;
use crate::stats::CombatantStats;

pub const CRIT_MULTIPLIER: f64 = 1.5;
pub const DEFENDED_MULTIPLIER: f64 = 0.6;
pub const PVP_BLEEDING_MULTIPLIER: f64 = 0.85;
pub const PVP_DEFENDED_EVASION: f64 = 0.15;
pub const PVP_CRIT_BLEED_CHANCE: f64 = 0.30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageMode {
    Pvp,
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackRoll {
    pub mode: DamageMode,
    pub hit: bool,
    pub critical: bool,
    /// Zero on a miss, otherwise at least 1.
    pub damage: i32,
    pub hit_chance: f64,
    /// PvP only: the critical also inflicts bleed.
    pub bleed_on_crit: bool,
}

impl AttackRoll {
    fn miss(mode: DamageMode, hit_chance: f64) -> Self {
        Self {
            mode,
            hit: false,
            critical: false,
            damage: 0,
            hit_chance,
            bleed_on_crit: false,
        }
    }
}

pub fn pvp_hit_chance(attacker: &CombatantStats, defender: &CombatantStats, defended: bool) -> f64 {
    let accuracy = (attacker.accuracy - 50) as f64 / 100.0 * 0.15;
    let evasion = (defender.evasion - 50) as f64 / 100.0 * 0.15;
    let guard = if defended { PVP_DEFENDED_EVASION } else { 0.0 };
    (0.85 + accuracy - evasion - guard).clamp(0.2, 0.95)
}

pub fn pvp_crit_chance(accuracy: i32) -> f64 {
    (0.10 + (accuracy - 80) as f64 / 200.0).min(0.25)
}

/// PvP formula: composite hit chance, accuracy-scaled crit, flat variance.
///
/// Draw order: hit, then (on hit) crit, variance, and (on crit) bleed.
pub fn resolve_pvp_attack(
    attacker: &CombatantStats,
    attacker_effects: &[StatusEffect],
    defender: &CombatantStats,
    defender_effects: &[StatusEffect],
    defended: bool,
    dice: &mut Dice,
) -> AttackRoll {
    let hit_chance = pvp_hit_chance(attacker, defender, defended);
    if dice.unit() > hit_chance {
        return AttackRoll::miss(DamageMode::Pvp, hit_chance);
    }

    let critical = dice.unit() < pvp_crit_chance(attacker.accuracy);
    let effective_attack = attacker.attack as f64 * attack_modifier(attacker_effects);
    let offense = (effective_attack * 1.1).floor() as i32;
    let defense = (defender.defense as f64 * 0.9).floor() as i32;
    let base = offense - defense + dice.int_between(-15, 15);

    let mut damage = base as f64;
    if critical {
        damage *= CRIT_MULTIPLIER;
    }
    if defended {
        damage *= DEFENDED_MULTIPLIER;
    }
    if has_effect(defender_effects, EffectKind::Bleed) {
        damage *= PVP_BLEEDING_MULTIPLIER;
    }
    let damage = (damage.floor() as i32).max(1);
    let bleed_on_crit = critical && dice.unit() < PVP_CRIT_BLEED_CHANCE;

    debug!(hit_chance, critical, damage, bleed_on_crit, "pvp attack resolved");
    AttackRoll {
        mode: DamageMode::Pvp,
        hit: true,
        critical,
        damage,
        hit_chance,
        bleed_on_crit,
    }
}

/// Parameters of a live-encounter strike.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strike {
    pub crit_chance: f64,
    /// Damage multiplier: 1.0 for a basic attack, higher for skills.
    pub power: f64,
}

impl Strike {
    pub fn basic(crit_chance: f64) -> Self {
        Self {
            crit_chance,
            power: 1.0,
        }
    }
}

/// Live-encounter formula: flat miss from accuracy, ±20% roll, half-weight defense.
///
/// Draw order: miss, damage roll, crit.
pub fn resolve_live_attack(
    attacker: &CombatantStats,
    attacker_effects: &[StatusEffect],
    defender: &CombatantStats,
    defended: bool,
    strike: Strike,
    dice: &mut Dice,
) -> AttackRoll {
    let miss_chance = 1.0 - attacker.accuracy as f64 / 100.0;
    let hit_chance = (1.0 - miss_chance).clamp(0.0, 1.0);
    if dice.unit() < miss_chance {
        return AttackRoll::miss(DamageMode::Live, hit_chance);
    }

    let effective_attack = attacker.attack as f64 * attack_modifier(attacker_effects);
    let rolled = effective_attack * dice.between(0.8, 1.2) * strike.power;
    let critical = dice.unit() < strike.crit_chance;

    let mut damage = if critical { rolled * CRIT_MULTIPLIER } else { rolled };
    damage -= defender.defense as f64 / 2.0;
    if defended {
        damage *= DEFENDED_MULTIPLIER;
    }
    let damage = (damage.floor() as i32).max(1);

    debug!(critical, damage, "live attack resolved");
    AttackRoll {
        mode: DamageMode::Live,
        hit: true,
        critical,
        damage,
        hit_chance,
        bleed_on_crit: false,
    }
}

//! Enemy decision policy.
//!
//! A decision is a pure function of the behavior profile, a small snapshot of
//! the fight, and draws from the enemy's own [`Dice`].

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::Dice;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    Aggressive,
    Ranged,
    Boss,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BehaviorProfile {
    pub behavior: Behavior,
    pub aggressiveness: f64,
    pub defensiveness: f64,
    pub ranged_preference: f64,
    pub flee_threshold: f64,
}

impl BehaviorProfile {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("aggressiveness", self.aggressiveness),
            ("defensiveness", self.defensiveness),
            ("ranged_preference", self.ranged_preference),
            ("flee_threshold", self.flee_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::InvalidProfile { field, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Attack,
    Ability,
    Defend,
    Flee,
}

/// What an enemy knows when it decides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Situation {
    pub hp_ratio: f64,
    pub current_hp: i32,
    /// Rough estimate of the damage the player would deal next hit.
    pub predicted_damage: i32,
    pub already_defended: bool,
}

/// Estimate a basic hit against `defense`: the live formula at its mean roll.
pub fn predict_incoming_damage(attacker_attack: i32, attack_modifier: f64, defense: i32) -> i32 {
    ((attacker_attack as f64 * attack_modifier - defense as f64 / 2.0).floor() as i32).max(1)
}

const LOW_HP: f64 = 0.5;
const DANGEROUS_HIT: f64 = 0.2;
const BOSS_LAST_STAND: f64 = 0.25;

pub fn decide(profile: &BehaviorProfile, situation: &Situation, dice: &mut Dice) -> Decision {
    let last_stand = profile.behavior == Behavior::Boss && situation.hp_ratio <= BOSS_LAST_STAND;

    let fleeing = profile.flee_threshold > 0.0 && situation.hp_ratio < profile.flee_threshold;

    let decision = if !last_stand && fleeing {
        Decision::Flee
    } else if !last_stand && wants_to_brace(profile, situation, dice) {
        Decision::Defend
    } else if profile.behavior == Behavior::Boss {
        boss_decision(situation.hp_ratio, dice)
    } else if profile.ranged_preference > dice.unit() {
        Decision::Ability
    } else if profile.defensiveness > dice.unit() {
        Decision::Defend
    } else {
        Decision::Attack
    };

    debug!(?decision, hp_ratio = situation.hp_ratio, behavior = ?profile.behavior, "enemy decided");
    decision
}

// The defensiveness draw is only taken once the cheap conditions hold.
fn wants_to_brace(profile: &BehaviorProfile, situation: &Situation, dice: &mut Dice) -> bool {
    situation.hp_ratio < LOW_HP
        && situation.predicted_damage as f64 > situation.current_hp as f64 * DANGEROUS_HIT
        && !situation.already_defended
        && profile.defensiveness > dice.unit()
}

/// Four HP bands, one draw each.
pub fn boss_decision(hp_ratio: f64, dice: &mut Dice) -> Decision {
    let roll = dice.unit();
    if hp_ratio > 0.75 {
        if roll < 0.7 { Decision::Attack } else { Decision::Ability }
    } else if hp_ratio > 0.5 {
        if roll < 0.3 {
            Decision::Defend
        } else if roll < 0.6 {
            Decision::Ability
        } else {
            Decision::Attack
        }
    } else if hp_ratio > BOSS_LAST_STAND {
        if roll < 0.4 {
            Decision::Defend
        } else if roll < 0.7 {
            Decision::Ability
        } else {
            Decision::Attack
        }
    } else if roll < 0.6 {
        Decision::Ability
    } else {
        Decision::Attack
    }
}

/// Seed for one enemy's decision dice, stable across platforms and runs.
pub fn enemy_seed(
    session_seed: u64,
    session_id: &str,
    enemy_id: &str,
    turn: u32,
    ordinal: u32,
) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(session_seed.to_le_bytes());
    hasher.update(session_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(enemy_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(turn.to_le_bytes());
    hasher.update(ordinal.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

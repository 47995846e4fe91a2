//! Status effect registry and the application engine.
//!
//! Every effect kind has a static [`EffectRules`] entry. Effects are held in a
//! plain `Vec<StatusEffect>` per combatant with at most one entry per kind; a
//! second application always merges into the existing entry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Dice;
use crate::error::EngineError;

/// Extra apply chance granted to every ability roll on a critical hit.
pub const CRIT_APPLY_BONUS: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Bleed,
    Poison,
    Burn,
    Stun,
    Weakness,
    Slow,
    Defend,
}

impl EffectKind {
    pub const ALL: [EffectKind; 7] = [
        EffectKind::Bleed,
        EffectKind::Poison,
        EffectKind::Burn,
        EffectKind::Stun,
        EffectKind::Weakness,
        EffectKind::Slow,
        EffectKind::Defend,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EffectKind::Bleed => "bleed",
            EffectKind::Poison => "poison",
            EffectKind::Burn => "burn",
            EffectKind::Stun => "stun",
            EffectKind::Weakness => "weakness",
            EffectKind::Slow => "slow",
            EffectKind::Defend => "defend",
        }
    }

    pub fn rules(self) -> &'static EffectRules {
        rules_for(self)
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffectKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EffectKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| EngineError::UnknownEffect(s.to_string()))
    }
}

/// Static configuration for one effect kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectRules {
    pub kind: EffectKind,
    pub max_stacks: u32,
    pub base_duration: u32,
    pub max_duration: u32,
    /// Fraction of max HP dealt per stack at each tick. Zero for non-damaging kinds.
    pub damage_per_stack: f64,
    pub prevents_action: bool,
    pub base_apply_chance: f64,
}

const REGISTRY: [EffectRules; 7] = [
    EffectRules {
        kind: EffectKind::Bleed,
        max_stacks: 5,
        base_duration: 3,
        max_duration: 6,
        damage_per_stack: 0.03,
        prevents_action: false,
        base_apply_chance: 0.25,
    },
    EffectRules {
        kind: EffectKind::Poison,
        max_stacks: 5,
        base_duration: 4,
        max_duration: 8,
        damage_per_stack: 0.02,
        prevents_action: false,
        base_apply_chance: 0.30,
    },
    EffectRules {
        kind: EffectKind::Burn,
        max_stacks: 3,
        base_duration: 3,
        max_duration: 5,
        damage_per_stack: 0.05,
        prevents_action: false,
        base_apply_chance: 0.25,
    },
    EffectRules {
        kind: EffectKind::Stun,
        max_stacks: 1,
        base_duration: 1,
        max_duration: 2,
        damage_per_stack: 0.0,
        prevents_action: true,
        base_apply_chance: 0.15,
    },
    EffectRules {
        kind: EffectKind::Weakness,
        max_stacks: 5,
        base_duration: 3,
        max_duration: 6,
        damage_per_stack: 0.0,
        prevents_action: false,
        base_apply_chance: 0.30,
    },
    EffectRules {
        kind: EffectKind::Slow,
        max_stacks: 3,
        base_duration: 2,
        max_duration: 4,
        damage_per_stack: 0.0,
        prevents_action: false,
        base_apply_chance: 0.30,
    },
    EffectRules {
        kind: EffectKind::Defend,
        max_stacks: 1,
        base_duration: 1,
        max_duration: 1,
        damage_per_stack: 0.0,
        prevents_action: false,
        base_apply_chance: 1.0,
    },
];

pub fn rules_for(kind: EffectKind) -> &'static EffectRules {
    // REGISTRY is declared in `EffectKind::ALL` order.
    &REGISTRY[kind as usize]
}

/// An effect currently active on a combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: EffectKind,
    pub duration: u32,
    pub stacks: u32,
    pub source_id: String,
    pub applied_on_turn: u32,
}

/// Bonuses an ability contributes to a single application roll.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ApplyBonus {
    pub chance: f64,
    pub stacks: u32,
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    pub kind: EffectKind,
    pub applied: bool,
    pub resisted: bool,
    pub message: String,
    /// Snapshot of the effect after a successful application.
    pub effect: Option<StatusEffect>,
}

/// When an on-hit ability is eligible to roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    #[default]
    OnHit,
    OnCrit,
}

/// One row of an attacker's effect-application table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectAbility {
    pub kind: EffectKind,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default)]
    pub bonus_chance: f64,
    #[serde(default)]
    pub bonus_stacks: u32,
    #[serde(default)]
    pub bonus_duration: u32,
}

pub fn find_effect(effects: &[StatusEffect], kind: EffectKind) -> Option<&StatusEffect> {
    effects.iter().find(|e| e.kind == kind)
}

pub fn has_effect(effects: &[StatusEffect], kind: EffectKind) -> bool {
    find_effect(effects, kind).is_some()
}

/// Resistance granted by the target's defense, capped at 30%.
pub fn resistance(target_defense: i32) -> f64 {
    (target_defense.max(0) as f64 * 0.003).min(0.3)
}

pub fn final_apply_chance(kind: EffectKind, target_defense: i32, bonus_chance: f64) -> f64 {
    (rules_for(kind).base_apply_chance + bonus_chance - resistance(target_defense)).max(0.05)
}

/// Merge an application into `effects` without rolling. Returns the resulting effect.
///
/// Stacks add `1 + bonus.stacks`; duration is extended to the fresh duration
/// but never shortened. Both are clamped to the registry caps.
pub fn merge_effect(
    effects: &mut Vec<StatusEffect>,
    kind: EffectKind,
    source_id: &str,
    turn: u32,
    bonus: ApplyBonus,
) -> StatusEffect {
    let rules = rules_for(kind);
    let fresh_duration = rules.base_duration.saturating_add(bonus.duration).min(rules.max_duration);

    if let Some(existing) = effects.iter_mut().find(|e| e.kind == kind) {
        existing.stacks = existing
            .stacks
            .saturating_add(1)
            .saturating_add(bonus.stacks)
            .min(rules.max_stacks);
        existing.duration = existing.duration.max(fresh_duration).min(rules.max_duration);
        return existing.clone();
    }

    let effect = StatusEffect {
        kind,
        duration: fresh_duration,
        stacks: bonus.stacks.saturating_add(1).min(rules.max_stacks),
        source_id: source_id.to_string(),
        applied_on_turn: turn,
    };
    effects.push(effect.clone());
    effect
}

/// Roll once against the target's resistance and merge on success.
pub fn try_apply_effect(
    effects: &mut Vec<StatusEffect>,
    kind: EffectKind,
    source_id: &str,
    turn: u32,
    target_defense: i32,
    bonus: ApplyBonus,
    dice: &mut Dice,
) -> ApplyOutcome {
    let chance = final_apply_chance(kind, target_defense, bonus.chance);
    let roll = dice.unit();

    if roll > chance {
        debug!(%kind, roll, chance, "effect resisted");
        return ApplyOutcome {
            kind,
            applied: false,
            resisted: true,
            message: format!("[EFFECT] {} resisted (roll={:.3} > {:.3})", kind, roll, chance),
            effect: None,
        };
    }

    let had_before = has_effect(effects, kind);
    let effect = merge_effect(effects, kind, source_id, turn, bonus);
    debug!(
        %kind,
        roll,
        chance,
        stacks = effect.stacks,
        duration = effect.duration,
        "effect applied"
    );
    let message = if had_before {
        format!(
            "[EFFECT] {} stacks to {} ({} turns)",
            kind, effect.stacks, effect.duration
        )
    } else {
        format!("[EFFECT] {} applied ({} turns)", kind, effect.duration)
    };
    ApplyOutcome {
        kind,
        applied: true,
        resisted: false,
        message,
        effect: Some(effect),
    }
}

/// Roll every eligible row of an attacker's effect table against one target.
///
/// On-crit rows are skipped on a normal hit and produce no outcome.
#[allow(clippy::too_many_arguments)]
pub fn roll_attack_effects(
    abilities: &[EffectAbility],
    effects: &mut Vec<StatusEffect>,
    source_id: &str,
    turn: u32,
    target_defense: i32,
    is_critical: bool,
    extra_chance: f64,
    dice: &mut Dice,
) -> Vec<ApplyOutcome> {
    let mut outcomes = Vec::new();
    for ability in abilities {
        if ability.trigger == Trigger::OnCrit && !is_critical {
            continue;
        }
        let crit_bonus = if is_critical { CRIT_APPLY_BONUS } else { 0.0 };
        let bonus = ApplyBonus {
            chance: ability.bonus_chance + crit_bonus + extra_chance,
            stacks: ability.bonus_stacks,
            duration: ability.bonus_duration,
        };
        let outcome = try_apply_effect(
            effects,
            ability.kind,
            source_id,
            turn,
            target_defense,
            bonus,
            &mut *dice,
        );
        if outcome.applied || outcome.resisted {
            outcomes.push(outcome);
        }
    }
    outcomes
}

/// Check the per-holder invariants: one entry per kind, stacks and duration within caps.
pub fn effects_within_limits(effects: &[StatusEffect]) -> bool {
    effects.iter().enumerate().all(|(i, e)| {
        let rules = rules_for(e.kind);
        e.stacks >= 1
            && e.stacks <= rules.max_stacks
            && e.duration <= rules.max_duration
            && !effects[..i].iter().any(|other| other.kind == e.kind)
    })
}

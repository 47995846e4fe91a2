//! End-of-turn effect processing.
//!
//! Two accountings exist and are kept separate: [`process_status_effects`] is the
//! stack-scaled tick used by live encounters, [`process_legacy_dot`] is the flat
//! percentage tick used by PvP battles.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::effects::{EffectKind, StatusEffect, rules_for};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEntry {
    pub kind: EffectKind,
    pub damage: i32,
    pub stacks: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TickReport {
    pub new_hp: i32,
    pub total_damage: i32,
    pub results: Vec<TickEntry>,
    pub expired: Vec<EffectKind>,
}

/// Deal stack-scaled DoT, then decay every effect by one turn and drop the expired ones.
///
/// `effects` is filtered in place; the caller must also store `new_hp`.
pub fn process_status_effects(
    effects: &mut Vec<StatusEffect>,
    max_hp: i32,
    current_hp: i32,
) -> TickReport {
    let mut report = TickReport {
        new_hp: current_hp,
        ..TickReport::default()
    };

    for effect in effects.iter() {
        let per_stack = rules_for(effect.kind).damage_per_stack;
        if per_stack <= 0.0 {
            continue;
        }
        let damage = ((max_hp as f64 * per_stack * effect.stacks as f64).floor() as i32).max(1);
        report.new_hp = (report.new_hp - damage).max(0);
        report.total_damage += damage;
        report.results.push(TickEntry {
            kind: effect.kind,
            damage,
            stacks: effect.stacks,
        });
    }

    report.expired = decay_effects(effects);
    debug!(
        total_damage = report.total_damage,
        expired = report.expired.len(),
        "status effects ticked"
    );
    report
}

/// Decrement every duration by one and remove effects that reached zero.
pub fn decay_effects(effects: &mut Vec<StatusEffect>) -> Vec<EffectKind> {
    let mut expired = Vec::new();
    effects.retain_mut(|effect| {
        effect.duration = effect.duration.saturating_sub(1);
        if effect.duration == 0 {
            expired.push(effect.kind);
            false
        } else {
            true
        }
    });
    expired
}

/// Flat share of max HP each damaging kind deals per PvP turn, regardless of stacks.
pub fn legacy_dot_rate(kind: EffectKind) -> Option<f64> {
    match kind {
        EffectKind::Bleed => Some(0.05),
        EffectKind::Burn => Some(0.08),
        EffectKind::Poison => Some(0.03),
        _ => None,
    }
}

/// PvP end-of-turn tick: flat DoT per present kind, then the same decay as live ticks.
pub fn process_legacy_dot(
    effects: &mut Vec<StatusEffect>,
    max_hp: i32,
    current_hp: i32,
) -> TickReport {
    let mut report = TickReport {
        new_hp: current_hp,
        ..TickReport::default()
    };

    for effect in effects.iter() {
        let Some(rate) = legacy_dot_rate(effect.kind) else {
            continue;
        };
        let damage = ((max_hp as f64 * rate).floor() as i32).max(1);
        report.new_hp = (report.new_hp - damage).max(0);
        report.total_damage += damage;
        report.results.push(TickEntry {
            kind: effect.kind,
            damage,
            stacks: effect.stacks,
        });
    }

    report.expired = decay_effects(effects);
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effect(kind: EffectKind, stacks: u32, duration: u32) -> StatusEffect {
        StatusEffect {
            kind,
            duration,
            stacks,
            source_id: "src".into(),
            applied_on_turn: 1,
        }
    }

    #[test]
    fn legacy_dot_ignores_stacks() {
        let mut effects = vec![effect(EffectKind::Burn, 3, 2), effect(EffectKind::Poison, 5, 2)];
        let report = process_legacy_dot(&mut effects, 100, 100);
        assert_eq!(report.total_damage, 8 + 3);
        assert_eq!(report.new_hp, 89);
        assert!(effects.iter().all(|e| e.duration == 1));
    }

    #[test]
    fn decay_reports_each_expired_kind() {
        let mut effects = vec![effect(EffectKind::Stun, 1, 1), effect(EffectKind::Slow, 1, 3)];
        assert_eq!(decay_effects(&mut effects), vec![EffectKind::Stun]);
        assert_eq!(effects.len(), 1);
    }
}

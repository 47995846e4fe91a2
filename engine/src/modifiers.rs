//! Multipliers derived from a combatant's active effects.

use crate::effects::{EffectKind, StatusEffect, find_effect, has_effect};

const WEAKNESS_PER_STACK: f64 = 0.10;
const SLOW_PER_STACK: f64 = 0.15;
const MODIFIER_FLOOR: f64 = 0.5;
const BLEED_HEALING: f64 = 0.5;

fn stack_scaled(effects: &[StatusEffect], kind: EffectKind, rate: f64) -> f64 {
    match find_effect(effects, kind) {
        Some(e) => (1.0 - e.stacks as f64 * rate).max(MODIFIER_FLOOR),
        None => 1.0,
    }
}

pub fn is_stunned(effects: &[StatusEffect]) -> bool {
    effects.iter().any(|e| e.kind == EffectKind::Stun && e.duration > 0)
}

pub fn attack_modifier(effects: &[StatusEffect]) -> f64 {
    stack_scaled(effects, EffectKind::Weakness, WEAKNESS_PER_STACK)
}

pub fn speed_modifier(effects: &[StatusEffect]) -> f64 {
    stack_scaled(effects, EffectKind::Slow, SLOW_PER_STACK)
}

pub fn healing_modifier(effects: &[StatusEffect]) -> f64 {
    if has_effect(effects, EffectKind::Bleed) { BLEED_HEALING } else { 1.0 }
}

pub fn is_defending(effects: &[StatusEffect]) -> bool {
    has_effect(effects, EffectKind::Defend)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effect(kind: EffectKind, stacks: u32) -> StatusEffect {
        StatusEffect {
            kind,
            duration: 2,
            stacks,
            source_id: "s".into(),
            applied_on_turn: 0,
        }
    }

    #[test]
    fn slow_floors_at_half_speed() {
        assert!((speed_modifier(&[effect(EffectKind::Slow, 1)]) - 0.85).abs() < 1e-9);
        assert!((speed_modifier(&[effect(EffectKind::Slow, 9)]) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn bleed_halves_healing() {
        assert_eq!(healing_modifier(&[]), 1.0);
        assert_eq!(healing_modifier(&[effect(EffectKind::Bleed, 1)]), 0.5);
    }

    #[test]
    fn stun_with_zero_duration_does_not_stun() {
        let mut stun = effect(EffectKind::Stun, 1);
        stun.duration = 0;
        assert!(!is_stunned(&[stun]));
    }
}

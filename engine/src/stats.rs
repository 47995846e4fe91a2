use serde::{Deserialize, Serialize};

use crate::effects::StatusEffect;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantStats {
    pub max_hp: i32,
    pub current_hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub speed: i32,
    pub accuracy: i32,
    pub evasion: i32,
}

impl CombatantStats {
    /// Fresh stats at full health.
    pub fn new(
        max_hp: i32,
        attack: i32,
        defense: i32,
        speed: i32,
        accuracy: i32,
        evasion: i32,
    ) -> Self {
        Self {
            max_hp,
            current_hp: max_hp,
            attack,
            defense,
            speed,
            accuracy,
            evasion,
        }
    }

    /// Reject malformed stat blocks instead of coercing them.
    pub fn validate(&self, id: &str) -> Result<()> {
        let fail = |reason: String| {
            Err(EngineError::InvalidStats {
                id: id.to_string(),
                reason,
            })
        };
        if self.max_hp <= 0 {
            return fail(format!("max_hp must be positive, got {}", self.max_hp));
        }
        if !(0..=self.max_hp).contains(&self.current_hp) {
            return fail(format!(
                "current_hp {} outside [0, {}]",
                self.current_hp, self.max_hp
            ));
        }
        for (name, value) in [
            ("attack", self.attack),
            ("defense", self.defense),
            ("speed", self.speed),
            ("accuracy", self.accuracy),
            ("evasion", self.evasion),
        ] {
            if value < 0 {
                return fail(format!("{} must be non-negative, got {}", name, value));
            }
        }
        Ok(())
    }

    pub fn hp_ratio(&self) -> f64 {
        if self.max_hp <= 0 {
            return 0.0;
        }
        self.current_hp as f64 / self.max_hp as f64
    }

    pub fn is_alive(&self) -> bool {
        self.current_hp > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: String,
    pub stats: CombatantStats,
    #[serde(default)]
    pub effects: Vec<StatusEffect>,
    /// Set by a defend action; cleared at the end-of-turn tick.
    #[serde(default)]
    pub defended: bool,
}

impl Combatant {
    pub fn new(id: impl Into<String>, stats: CombatantStats) -> Result<Self> {
        let id = id.into();
        stats.validate(&id)?;
        Ok(Self {
            id,
            stats,
            effects: Vec::new(),
            defended: false,
        })
    }

    pub fn is_alive(&self) -> bool {
        self.stats.is_alive()
    }
}

/// Subtract `amount` from `hp`, never going below 0. Returns true if this call dropped it to 0.
pub fn apply_damage(
    name: &str,
    stats: &mut CombatantStats,
    amount: i32,
    mut log: impl FnMut(String),
) -> bool {
    let before = stats.current_hp;
    stats.current_hp = stats.current_hp.saturating_sub(amount.max(0)).max(0);
    log(format!("[HP][{}] {} → {} (−{})", name, before, stats.current_hp, amount));
    before > 0 && stats.current_hp == 0
}

/// Heal up to max HP. Returns the amount actually restored.
pub fn heal(
    name: &str,
    stats: &mut CombatantStats,
    amount: i32,
    mut log: impl FnMut(String),
) -> i32 {
    if amount <= 0 || stats.current_hp <= 0 {
        return 0;
    }
    let before = stats.current_hp;
    stats.current_hp = stats.current_hp.saturating_add(amount).min(stats.max_hp);
    log(format!(
        "[HEAL][{}] +{} HP ({} → {})",
        name,
        stats.current_hp - before,
        before,
        stats.current_hp
    ));
    stats.current_hp - before
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_hp_above_max() {
        let mut stats = CombatantStats::new(50, 10, 10, 10, 80, 10);
        stats.current_hp = 51;
        assert!(matches!(
            stats.validate("hero"),
            Err(EngineError::InvalidStats { .. })
        ));
    }

    #[test]
    fn rejects_negative_attributes() {
        let stats = CombatantStats::new(50, 10, -1, 10, 80, 10);
        assert!(Combatant::new("hero", stats).is_err());
    }

    #[test]
    fn damage_floors_at_zero_and_reports_the_drop() {
        let mut stats = CombatantStats::new(10, 1, 1, 1, 1, 1);
        stats.current_hp = 3;
        assert!(apply_damage("x", &mut stats, 7, |_| {}));
        assert_eq!(stats.current_hp, 0);
        assert!(!apply_damage("x", &mut stats, 7, |_| {}));
    }

    #[test]
    fn heal_caps_at_max_and_skips_the_dead() {
        let mut stats = CombatantStats::new(10, 1, 1, 1, 1, 1);
        stats.current_hp = 8;
        assert_eq!(heal("x", &mut stats, 5, |_| {}), 2);
        stats.current_hp = 0;
        assert_eq!(heal("x", &mut stats, 5, |_| {}), 0);
    }

    #[test]
    fn huge_amounts_saturate() {
        let mut stats = CombatantStats::new(i32::MAX, 1, 1, 1, 1, 1);
        stats.current_hp = i32::MAX - 1;
        assert_eq!(heal("x", &mut stats, i32::MAX, |_| {}), 1);
        assert_eq!(stats.current_hp, i32::MAX);
        assert!(apply_damage("x", &mut stats, i32::MAX, |_| {}));
        assert_eq!(stats.current_hp, 0);
    }
}

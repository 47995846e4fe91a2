//! Built-in classes, enemy archetypes and sample rooms.
//!
//! Rooms stand in for the external room generator: they only describe which
//! archetypes appear and how strongly they are scaled.

use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ai::{Behavior, BehaviorProfile};
use crate::config::EngineConfig;
use crate::effects::EffectAbility;
use crate::encounter::{Enemy, Player};
use crate::error::{EngineError, Result};
use crate::stats::CombatantStats;

const CLASSES: &str = include_str!("../content/classes.json");
const ENEMIES: &str = include_str!("../content/enemies.json");
const ROOMS: &str = include_str!("../content/rooms.json");

/// Stat block without current HP; spawned combatants start at full health.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatBlock {
    pub max_hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub speed: i32,
    pub accuracy: i32,
    pub evasion: i32,
}

impl StatBlock {
    /// Scale HP, attack and defense; speed, accuracy and evasion are not level-dependent.
    pub fn scaled(&self, scale: f64) -> CombatantStats {
        let s = |v: i32| (v as f64 * scale).round() as i32;
        CombatantStats::new(
            s(self.max_hp),
            s(self.attack),
            s(self.defense),
            self.speed,
            self.accuracy,
            self.evasion,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub stats: StatBlock,
    #[serde(default)]
    pub abilities: Vec<EffectAbility>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyDef {
    pub stats: StatBlock,
    pub profile: BehaviorProfile,
    #[serde(default)]
    pub abilities: Vec<EffectAbility>,
}

fn unit_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub enemy: String,
    pub count: u32,
    #[serde(default = "unit_scale")]
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomDef {
    pub depth: u32,
    pub difficulty: f64,
    pub roster: Vec<RosterEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentPack {
    pub classes: IndexMap<String, ClassDef>,
    pub enemies: IndexMap<String, EnemyDef>,
    pub rooms: IndexMap<String, RoomDef>,
}

impl ContentPack {
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_json(CLASSES, ENEMIES, ROOMS)
    }

    pub fn from_json(classes: &str, enemies: &str, rooms: &str) -> anyhow::Result<Self> {
        let classes: IndexMap<String, ClassDef> =
            serde_json::from_str(classes).context("failed to parse classes JSON")?;
        let enemies: IndexMap<String, EnemyDef> =
            serde_json::from_str(enemies).context("failed to parse enemies JSON")?;
        let rooms: IndexMap<String, RoomDef> =
            serde_json::from_str(rooms).context("failed to parse rooms JSON")?;

        for (id, def) in &enemies {
            def.profile
                .validate()
                .with_context(|| format!("enemy '{}' has an invalid profile", id))?;
        }
        for (id, room) in &rooms {
            for entry in &room.roster {
                if !enemies.contains_key(&entry.enemy) {
                    anyhow::bail!("room '{}' references unknown enemy '{}'", id, entry.enemy);
                }
            }
        }
        Ok(Self {
            classes,
            enemies,
            rooms,
        })
    }

    pub fn class(&self, id: &str) -> Result<&ClassDef> {
        self.classes.get(id).ok_or_else(|| EngineError::UnknownContent(format!("class '{}'", id)))
    }

    pub fn enemy(&self, id: &str) -> Result<&EnemyDef> {
        self.enemies.get(id).ok_or_else(|| EngineError::UnknownContent(format!("enemy '{}'", id)))
    }

    pub fn room(&self, id: &str) -> Result<&RoomDef> {
        self.rooms.get(id).ok_or_else(|| EngineError::UnknownContent(format!("room '{}'", id)))
    }

    pub fn player(&self, id: &str, class_id: &str, cfg: &EngineConfig) -> Result<Player> {
        let class = self.class(class_id)?;
        Player::new(
            id,
            class_id,
            class.stats.scaled(1.0),
            class.abilities.clone(),
            cfg.player_crit_chance,
        )
    }

    pub fn spawn_enemy(
        &self,
        enemy_id: &str,
        instance_id: &str,
        scale: f64,
        cfg: &EngineConfig,
    ) -> Result<Enemy> {
        let def = self.enemy(enemy_id)?;
        let crit = if def.profile.behavior == Behavior::Boss {
            cfg.boss_crit_chance
        } else {
            cfg.enemy_crit_chance
        };
        Enemy::new(
            instance_id,
            enemy_id,
            def.stats.scaled(scale),
            def.profile,
            def.abilities.clone(),
            crit,
        )
    }

    pub fn spawn_room(&self, room_id: &str, cfg: &EngineConfig) -> Result<Vec<Enemy>> {
        self.spawn_roster(self.room(room_id)?, cfg)
    }

    /// Instantiate a room's roster as `<type>-<n>` enemies, numbered per type.
    pub fn spawn_roster(&self, room: &RoomDef, cfg: &EngineConfig) -> Result<Vec<Enemy>> {
        let mut enemies = Vec::new();
        let mut counters: IndexMap<&str, u32> = IndexMap::new();
        for entry in &room.roster {
            for _ in 0..entry.count {
                let n = counters.entry(entry.enemy.as_str()).or_insert(0);
                *n += 1;
                let instance_id = format!("{}-{}", entry.enemy, n);
                enemies.push(self.spawn_enemy(&entry.enemy, &instance_id, entry.scale, cfg)?);
            }
        }
        Ok(enemies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_content_parses() {
        let pack = ContentPack::builtin().unwrap();
        assert!(pack.classes.contains_key("warrior"));
        assert_eq!(pack.enemy("ember_dragon").unwrap().profile.behavior, Behavior::Boss);
    }

    #[test]
    fn rooms_spawn_numbered_instances() {
        let pack = ContentPack::builtin().unwrap();
        let enemies = pack.spawn_room("goblin_ambush", &EngineConfig::default()).unwrap();
        let ids: Vec<_> = enemies.iter().map(|e| e.combatant.id.as_str()).collect();
        assert_eq!(ids, ["goblin-1", "goblin-2", "goblin-3"]);
    }

    #[test]
    fn unknown_room_is_an_error() {
        let pack = ContentPack::builtin().unwrap();
        assert!(matches!(
            pack.spawn_room("moon_base", &EngineConfig::default()),
            Err(EngineError::UnknownContent(_))
        ));
    }

    #[test]
    fn scaling_keeps_speed() {
        let block = StatBlock {
            max_hp: 40,
            attack: 10,
            defense: 5,
            speed: 12,
            accuracy: 80,
            evasion: 40,
        };
        let stats = block.scaled(1.5);
        assert_eq!((stats.max_hp, stats.current_hp, stats.attack, stats.speed), (60, 60, 15, 12));
    }
}

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tunables shared by the service and the simulation harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sessions untouched for longer than this are swept.
    pub idle_timeout_secs: u64,
    /// Safety cap for simulated PvP battles.
    pub max_pvp_turns: u32,
    pub player_crit_chance: f64,
    pub enemy_crit_chance: f64,
    pub boss_crit_chance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 900,
            max_pvp_turns: 100,
            player_crit_chance: 0.15,
            enemy_crit_chance: 0.12,
            boss_crit_chance: 0.15,
        }
    }
}

impl EngineConfig {
    /// Load from a `.json`, `.yaml` or `.yml` file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config: {}", path.display()))?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let cfg: EngineConfig = if is_yaml {
            serde_yaml::from_str(&text)
                .with_context(|| format!("failed to parse engine config: {}", path.display()))?
        } else {
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse engine config: {}", path.display()))?
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("player_crit_chance", self.player_crit_chance),
            ("enemy_crit_chance", self.enemy_crit_chance),
            ("boss_crit_chance", self.boss_crit_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{} must be within [0, 1], got {}", name, value);
            }
        }
        if self.max_pvp_turns == 0 {
            anyhow::bail!("max_pvp_turns must be at least 1");
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.idle_timeout_secs)
    }
}

use std::{fs, path::Path, path::PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use dungeon_engine::ai::Decision;
use dungeon_engine::api::{
    sample_boss_decisions, simulate_battle, simulate_encounter, BattleConfig, EncounterConfig,
    FighterConfig, PvpPolicy,
};
use dungeon_engine::effects::rules_for;
use dungeon_engine::{EffectKind, EngineConfig};
use encoding_rs::Encoding;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, ValueEnum)]
enum Policy {
    Aggressive,
    Cautious,
}

impl From<Policy> for PvpPolicy {
    fn from(p: Policy) -> Self {
        match p {
            Policy::Aggressive => PvpPolicy::Aggressive,
            Policy::Cautious => PvpPolicy::Cautious,
        }
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Run a PvP battle between two built-in classes (or a JSON battle config)
    Battle {
        /// Class of the first combatant
        #[arg(long, default_value = "warrior")]
        first: String,
        /// Class of the second combatant
        #[arg(long, default_value = "rogue")]
        second: String,
        /// Action policy used by both sides
        #[arg(long, value_enum, default_value_t = Policy::Aggressive)]
        policy: Policy,
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Battle config JSON; overrides the class flags
        #[arg(long)]
        file: Option<PathBuf>,
        /// Print the full result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Clear a room with a scripted player
    Encounter {
        /// Built-in room id
        #[arg(long, default_value = "goblin_ambush")]
        room: String,
        /// Room JSON file; overrides --room
        #[arg(long)]
        room_file: Option<PathBuf>,
        /// Player class
        #[arg(long, default_value = "warrior")]
        class: String,
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Print the full result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Sample boss decisions at a fixed HP ratio
    BossSplit {
        /// Boss HP as a fraction of max HP
        #[arg(long, default_value_t = 0.9)]
        hp_ratio: f64,
        /// Number of decisions to draw
        #[arg(long, default_value_t = 10_000)]
        samples: u32,
        /// RNG seed for determinism
        #[arg(long, default_value_t = 7)]
        seed: u64,
    },
    /// Print the status effect registry
    Effects,
}

#[derive(Parser)]
#[command(name = "dungeon-cli")]
#[command(about = "Dungeon arena combat harness")]
struct Cli {
    /// Engine config (JSON or YAML); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Cmd,
}

fn read_text_auto(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path)?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        Ok(String::from_utf8(bytes)?)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let engine = match &cli.config {
        Some(path) => {
            let cfg = EngineConfig::from_file(path)?;
            debug!(path = %path.display(), "engine config loaded");
            cfg
        }
        None => EngineConfig::default(),
    };

    match cli.cmd {
        Cmd::Battle {
            first,
            second,
            policy,
            seed,
            file,
            json,
        } => {
            let cfg = if let Some(path) = file {
                serde_json::from_str::<BattleConfig>(&read_text_auto(&path)?)?
            } else {
                let side = |id: &str, class: String| FighterConfig {
                    id: id.to_string(),
                    class_id: Some(class),
                    stats: None,
                    policy: policy.into(),
                };
                BattleConfig {
                    first: side("p1", first),
                    second: side("p2", second),
                    seed,
                    max_turns: None,
                }
            };
            let res = simulate_battle(cfg, &engine)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&res)?);
            } else {
                for line in &res.log {
                    println!("{}", line);
                }
                println!(
                    "winner={} turns={} hp={}/{}{}",
                    res.winner.as_deref().unwrap_or("draw"),
                    res.turns,
                    res.first_hp_end,
                    res.second_hp_end,
                    if res.capped { " (turn cap)" } else { "" }
                );
            }
        }
        Cmd::Encounter {
            room,
            room_file,
            class,
            seed,
            json,
        } => {
            let cfg = EncounterConfig {
                room_id: Some(room),
                room_path: room_file.map(|p| p.to_string_lossy().into_owned()),
                class_id: class,
                seed,
                player_hp: None,
                magic_find: 0.0,
                max_turns: None,
            };
            let res = simulate_encounter(cfg, &engine)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&res)?);
            } else {
                for line in &res.log {
                    println!("{}", line);
                }
                let outcome = match res.outcome {
                    Some(o) => format!("{:?}", o).to_lowercase(),
                    None => "unfinished".to_string(),
                };
                println!(
                    "room={} outcome={} turns={} hp={} defeated={} fled={}",
                    res.room,
                    outcome,
                    res.turns,
                    res.player_hp_end,
                    res.enemies_defeated,
                    res.enemies_fled
                );
            }
        }
        Cmd::BossSplit {
            hp_ratio,
            samples,
            seed,
        } => {
            if !(0.0..=1.0).contains(&hp_ratio) {
                anyhow::bail!("hp ratio must be within [0, 1], got {}", hp_ratio);
            }
            let tally = sample_boss_decisions(hp_ratio, samples, seed);
            println!("boss decisions at hp ratio {:.2} ({} samples)", hp_ratio, tally.samples);
            let decisions = [Decision::Attack, Decision::Ability, Decision::Defend, Decision::Flee];
            for decision in decisions {
                println!(
                    "{:<8} {:>5.1}%",
                    format!("{:?}", decision).to_lowercase(),
                    tally.share(decision) * 100.0
                );
            }
        }
        Cmd::Effects => {
            println!(
                "{:<9} {:>6} {:>5} {:>5} {:>7} {:>6} {:>6}",
                "kind", "stacks", "base", "max", "dmg/st", "chance", "stops"
            );
            for kind in EffectKind::ALL {
                let r = rules_for(kind);
                println!(
                    "{:<9} {:>6} {:>5} {:>5} {:>7.2} {:>6.2} {:>6}",
                    kind.as_str(),
                    r.max_stacks,
                    r.base_duration,
                    r.max_duration,
                    r.damage_per_stack,
                    r.base_apply_chance,
                    if r.prevents_action { "yes" } else { "no" }
                );
            }
        }
    }
    Ok(())
}


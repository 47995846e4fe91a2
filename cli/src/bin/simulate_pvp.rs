use clap::{Parser, ValueEnum};
use dungeon_engine::api::{simulate_battle_many, BattleConfig, FighterConfig, PvpPolicy};
use dungeon_engine::EngineConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, ValueEnum)]
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

#[derive(Parser)]
#[command(name = "simulate-pvp")]
#[command(about = "Monte Carlo sim: many PvP battles between two classes")]
struct Args {
    /// Class of the first side
    #[arg(long, default_value = "warrior")]
    first: String,

    /// Class of the second side
    #[arg(long, default_value = "rogue")]
    second: String,

    /// Policy of the first side
    #[arg(long, value_enum, default_value_t = Policy::Aggressive)]
    first_policy: Policy,

    /// Policy of the second side
    #[arg(long, value_enum, default_value_t = Policy::Aggressive)]
    second_policy: Policy,

    /// Number of trials
    #[arg(long, default_value_t = 1000)]
    trials: u32,

    /// Safety cap on turns per trial (defaults to the engine config)
    #[arg(long)]
    max_turns: Option<u32>,

    /// RNG base seed (trial i uses seed+i)
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Engine config (JSON or YAML)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    let args = Args::parse();
    let engine = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    let side = |id: &str, class: &str, policy: Policy| FighterConfig {
        id: id.to_string(),
        class_id: Some(class.to_string()),
        stats: None,
        policy: policy.into(),
    };
    let cfg = BattleConfig {
        first: side("first", &args.first, args.first_policy),
        second: side("second", &args.second, args.second_policy),
        seed: args.seed,
        max_turns: args.max_turns,
    };
    let stats = simulate_battle_many(cfg, &engine, args.trials)?;
    let trials_f = stats.samples.max(1) as f64;
    info!(
        trials = stats.samples,
        first_wins = stats.first_wins,
        second_wins = stats.second_wins,
        draws = stats.draws,
        "simulation finished"
    );

    println!("simulate-pvp results");
    println!("--------------------");
    println!("trials:             {}", stats.samples);
    println!("first:              {} ({:?})", args.first, args.first_policy);
    println!("second:             {} ({:?})", args.second, args.second_policy);
    println!();
    println!("first win rate:     {:.1}%", stats.first_win_rate * 100.0);
    println!("second win rate:    {:.1}%", stats.second_wins as f64 / trials_f * 100.0);
    println!("draws:              {:.1}%", stats.draws as f64 / trials_f * 100.0);
    println!("turn cap hits:      {}", stats.capped);
    println!("avg turns:          {:.2}", stats.avg_turns);
    println!("median turns:       {}", stats.median_turns);

    Ok(())
}

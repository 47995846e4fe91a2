use dungeon_engine::api::{
    BattleConfig, EncounterConfig, FighterConfig, PvpPolicy, simulate_battle, simulate_battle_many,
    simulate_encounter,
};
use dungeon_engine::content::StatBlock;
use dungeon_engine::EngineConfig;

fn fighter(id: &str, class_id: &str) -> FighterConfig {
    FighterConfig {
        id: id.into(),
        class_id: Some(class_id.into()),
        stats: None,
        policy: PvpPolicy::Aggressive,
    }
}

fn battle(first: FighterConfig, second: FighterConfig, seed: u64) -> BattleConfig {
    BattleConfig {
        first,
        second,
        seed,
        max_turns: None,
    }
}

fn encounter(room_id: &str, seed: u64) -> EncounterConfig {
    EncounterConfig {
        room_id: Some(room_id.into()),
        room_path: None,
        class_id: "warrior".into(),
        seed,
        player_hp: None,
        magic_find: 0.0,
        max_turns: None,
    }
}

#[test]
fn battle_with_builtin_classes_runs() {
    let cfg = battle(fighter("w", "warrior"), fighter("r", "rogue"), 2025);
    let res = simulate_battle(cfg, &EngineConfig::default()).unwrap();
    assert!(res.turns > 0);
    assert!(!res.log.is_empty());
    assert!(res.capped || res.winner.is_none() || res.first_hp_end == 0 || res.second_hp_end == 0);
}

#[test]
fn explicit_stats_override_class() {
    let tank = StatBlock {
        max_hp: 999,
        attack: 1,
        defense: 0,
        speed: 1,
        accuracy: 50,
        evasion: 50,
    };
    let mut first = fighter("tank", "mage");
    first.stats = Some(tank);
    first.policy = PvpPolicy::Cautious;
    let cfg = BattleConfig {
        first,
        second: fighter("m", "mage"),
        seed: 3,
        max_turns: Some(1),
    };
    let res = simulate_battle(cfg, &EngineConfig::default()).unwrap();
    assert_eq!(res.turns, 1);
    assert!(res.capped);
    assert!(res.first_hp_end > 800);
}

#[test]
fn fighter_without_stats_or_class_is_an_error() {
    let mut first = fighter("x", "warrior");
    first.class_id = None;
    let cfg = battle(first, fighter("y", "rogue"), 1);
    assert!(simulate_battle(cfg, &EngineConfig::default()).is_err());
}

#[test]
fn unknown_class_is_an_error() {
    let cfg = battle(fighter("x", "bard"), fighter("y", "rogue"), 1);
    let err = simulate_battle(cfg, &EngineConfig::default()).unwrap_err();
    assert!(err.to_string().contains("bard"));
}

#[test]
fn battle_many_summary_makes_sense() {
    let cfg = battle(fighter("w", "warrior"), fighter("m", "mage"), 1);
    let stats = simulate_battle_many(cfg, &EngineConfig::default(), 40).unwrap();
    assert_eq!(stats.samples, 40);
    assert_eq!(stats.first_wins + stats.second_wins + stats.draws, 40);
    assert!(stats.capped <= stats.draws);
    assert!(stats.avg_turns > 0.0);
}

#[test]
fn encounter_with_builtin_room_runs() {
    let res =
        simulate_encounter(encounter("goblin_ambush", 4242), &EngineConfig::default()).unwrap();
    assert!(res.turns > 0);
    assert_eq!(res.room, "goblin_ambush");
    if res.outcome.is_some() {
        assert!(res.log.iter().any(|l| l.starts_with("[END]")));
    }
}

#[test]
fn encounter_is_deterministic_per_seed() {
    let a = simulate_encounter(encounter("orc_den", 12), &EngineConfig::default()).unwrap();
    let b = simulate_encounter(encounter("orc_den", 12), &EngineConfig::default()).unwrap();
    assert_eq!(a.log, b.log);
    assert_eq!(a.outcome, b.outcome);
}

#[test]
fn encounter_needs_a_room() {
    let mut cfg = encounter("goblin_ambush", 1);
    cfg.room_id = None;
    assert!(simulate_encounter(cfg, &EngineConfig::default()).is_err());
}

#[test]
fn encounter_loads_a_room_file() {
    let dir = std::env::temp_dir().join(format!("dungeon-room-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("room.json");
    let room = r#"{"depth": 2, "difficulty": 1.0, "roster": [{"enemy": "goblin", "count": 1}]}"#;
    std::fs::write(&path, room).unwrap();

    let mut cfg = encounter("ignored", 5);
    cfg.room_path = Some(path.to_string_lossy().into_owned());
    let res = simulate_encounter(cfg, &EngineConfig::default()).unwrap();
    assert!(res.turns > 0);
    assert!(res.enemies_defeated + res.enemies_fled <= 1);
}

use dungeon_engine::effects::{
    ApplyBonus, EffectAbility, Trigger, effects_within_limits, merge_effect, roll_attack_effects,
    rules_for, try_apply_effect,
};
use dungeon_engine::events::serialize_effects;
use dungeon_engine::modifiers::{attack_modifier, healing_modifier, is_stunned, speed_modifier};
use dungeon_engine::ticks::process_status_effects;
use dungeon_engine::{Dice, EffectKind, StatusEffect};
use proptest::prelude::*;

fn effect(kind: EffectKind, stacks: u32, duration: u32) -> StatusEffect {
    StatusEffect {
        kind,
        duration,
        stacks,
        source_id: "src".into(),
        applied_on_turn: 1,
    }
}

fn row(kind: EffectKind, trigger: Trigger, bonus_duration: u32) -> EffectAbility {
    EffectAbility {
        kind,
        trigger,
        bonus_chance: 0.0,
        bonus_stacks: 0,
        bonus_duration,
    }
}

#[test]
fn bleed_single_stack_ticks_for_three_on_a_hundred_hp() {
    let mut effects = vec![effect(EffectKind::Bleed, 1, 3)];
    let report = process_status_effects(&mut effects, 100, 100);
    assert_eq!(report.total_damage, 3);
    assert_eq!(report.new_hp, 97);
    assert_eq!(effects[0].duration, 2);
}

#[test]
fn stun_applied_for_one_turn_covers_that_turn_only() {
    let mut effects = Vec::new();
    let mut dice = Dice::from_scripted(vec![0.0]);
    let bonus = ApplyBonus::default();
    let out = try_apply_effect(&mut effects, EffectKind::Stun, "orc", 4, 0, bonus, &mut dice);
    assert!(out.applied);
    assert_eq!(effects[0].duration, 1);

    // still stunned while turn 4 resolves
    assert!(is_stunned(&effects));

    // the end-of-turn tick removes it before turn 5
    let report = process_status_effects(&mut effects, 100, 100);
    assert_eq!(report.expired, vec![EffectKind::Stun]);
    assert!(!is_stunned(&effects));
}

#[test]
fn two_weakness_stacks_scale_attack_to_eighty_percent() {
    let effects = vec![effect(EffectKind::Weakness, 2, 3)];
    assert!((attack_modifier(&effects) - 0.8).abs() < 1e-9);
}

#[test]
fn modifiers_floor_at_half() {
    let effects = vec![effect(EffectKind::Weakness, 5, 3), effect(EffectKind::Slow, 3, 2)];
    assert!((attack_modifier(&effects) - 0.5).abs() < 1e-9);
    assert!((speed_modifier(&effects) - 0.55).abs() < 1e-9);
    assert!((healing_modifier(&[effect(EffectKind::Bleed, 1, 1)]) - 0.5).abs() < 1e-9);
    assert!((healing_modifier(&[]) - 1.0).abs() < 1e-9);
}

#[test]
fn reapplication_merges_and_clamps() {
    let mut effects = Vec::new();
    for turn in 1..=10 {
        let bonus = ApplyBonus {
            chance: 0.0,
            stacks: 1,
            duration: 4,
        };
        merge_effect(&mut effects, EffectKind::Burn, "mage", turn, bonus);
    }
    assert_eq!(effects.len(), 1);
    let burn = &effects[0];
    assert_eq!(burn.stacks, rules_for(EffectKind::Burn).max_stacks);
    assert_eq!(burn.duration, rules_for(EffectKind::Burn).max_duration);
    // source and turn of the first application are kept
    assert_eq!(burn.applied_on_turn, 1);
}

#[test]
fn reapplication_never_shortens_duration() {
    let mut effects = vec![effect(EffectKind::Poison, 1, 7)];
    let merged = merge_effect(&mut effects, EffectKind::Poison, "x", 2, ApplyBonus::default());
    assert_eq!(merged.duration, 7);
    assert_eq!(merged.stacks, 2);
}

#[test]
fn resisted_rolls_leave_effects_untouched() {
    let mut effects = Vec::new();
    let mut dice = Dice::from_scripted(vec![0.99]);
    let bonus = ApplyBonus::default();
    let out = try_apply_effect(&mut effects, EffectKind::Bleed, "rogue", 1, 0, bonus, &mut dice);
    assert!(out.resisted);
    assert!(!out.applied);
    assert!(effects.is_empty());
}

#[test]
fn on_crit_rows_only_roll_on_crits() {
    let table = vec![
        row(EffectKind::Bleed, Trigger::OnHit, 0),
        row(EffectKind::Stun, Trigger::OnCrit, 1),
    ];
    let mut effects = Vec::new();
    let mut dice = Dice::from_scripted(vec![0.0, 0.0]);
    let normal = roll_attack_effects(&table, &mut effects, "w", 1, 0, false, 0.0, &mut dice);
    assert_eq!(normal.len(), 1);
    assert!(!effects.iter().any(|e| e.kind == EffectKind::Stun));

    let crit = roll_attack_effects(&table, &mut effects, "w", 2, 0, true, 0.0, &mut dice);
    assert_eq!(crit.len(), 2);
    assert!(effects.iter().any(|e| e.kind == EffectKind::Stun && e.duration == 2));
}

#[test]
fn crits_add_fifteen_points_of_apply_chance() {
    let table = vec![row(EffectKind::Bleed, Trigger::OnHit, 0)];
    // chance at defense 0 is 0.25 on a hit and 0.40 on a crit
    let mut effects = Vec::new();
    let mut dice = Dice::from_scripted(vec![0.35]);
    let normal = roll_attack_effects(&table, &mut effects, "w", 1, 0, false, 0.0, &mut dice);
    assert!(normal[0].resisted);
    assert!(effects.is_empty());

    let mut dice = Dice::from_scripted(vec![0.35]);
    let crit = roll_attack_effects(&table, &mut effects, "w", 1, 0, true, 0.0, &mut dice);
    assert!(crit[0].applied);
    assert_eq!(effects.len(), 1);
    assert_eq!(effects[0].kind, EffectKind::Bleed);
}

#[test]
fn empty_tick_is_a_no_op() {
    let mut effects = Vec::new();
    let report = process_status_effects(&mut effects, 80, 42);
    assert_eq!(report.new_hp, 42);
    assert_eq!(report.total_damage, 0);
    assert!(report.results.is_empty() && report.expired.is_empty());
}

#[test]
fn tick_damage_never_drops_hp_below_zero() {
    let mut effects = vec![effect(EffectKind::Burn, 3, 2), effect(EffectKind::Bleed, 5, 2)];
    let report = process_status_effects(&mut effects, 100, 10);
    assert_eq!(report.new_hp, 0);
    assert_eq!(report.total_damage, 15 + 15);
}

#[test]
fn same_seed_same_applications() {
    let run = |seed| {
        let mut effects = Vec::new();
        let mut dice = Dice::from_seed(seed);
        for turn in 0..20 {
            let bonus = ApplyBonus::default();
            try_apply_effect(&mut effects, EffectKind::Poison, "c", turn, 30, bonus, &mut dice);
        }
        effects
    };
    assert_eq!(run(99), run(99));
}

#[test]
fn effect_summary_wire_shape() {
    let effects = vec![effect(EffectKind::Bleed, 2, 3), effect(EffectKind::Stun, 1, 1)];
    insta::assert_json_snapshot!(serialize_effects(&effects), @r###"
    [
      {
        "kind": "bleed",
        "stacks": 2,
        "duration": 3
      },
      {
        "kind": "stun",
        "stacks": 1,
        "duration": 1
      }
    ]
    "###);
}

fn any_kind() -> impl Strategy<Value = EffectKind> {
    prop::sample::select(EffectKind::ALL.to_vec())
}

proptest! {
    #[test]
    fn applications_and_ticks_keep_effects_within_limits(
        steps in prop::collection::vec((any_kind(), 0u32..4, 0u32..6, any::<bool>()), 1..60),
    ) {
        let mut effects = Vec::new();
        let mut hp = 500;
        for (turn, (kind, stacks, duration, tick)) in steps.into_iter().enumerate() {
            let bonus = ApplyBonus {
                chance: 0.0,
                stacks,
                duration,
            };
            merge_effect(&mut effects, kind, "p", turn as u32, bonus);
            prop_assert!(effects_within_limits(&effects));
            if tick {
                let report = process_status_effects(&mut effects, 500, hp);
                prop_assert!(report.new_hp <= hp && report.new_hp >= 0);
                hp = report.new_hp;
                prop_assert!(effects.iter().all(|e| e.duration >= 1));
            }
        }
    }
}

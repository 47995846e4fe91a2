use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn effects_lists_every_kind() {
    Command::cargo_bin("dungeon-cli")
        .unwrap()
        .arg("effects")
        .assert()
        .success()
        .stdout(predicate::str::contains("bleed").and(predicate::str::contains("defend")));
}

#[test]
fn battle_prints_a_winner_line() {
    Command::cargo_bin("dungeon-cli")
        .unwrap()
        .args(["battle", "--first", "warrior", "--second", "mage", "--seed", "9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[ORDER]").and(predicate::str::contains("winner=")));
}

#[test]
fn encounter_json_has_an_outcome_field() {
    Command::cargo_bin("dungeon-cli")
        .unwrap()
        .args(["encounter", "--room", "goblin_ambush", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"outcome\""));
}

#[test]
fn unknown_room_fails() {
    Command::cargo_bin("dungeon-cli")
        .unwrap()
        .args(["encounter", "--room", "moon_base"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("moon_base"));
}

#[test]
fn boss_split_rejects_bad_ratio() {
    Command::cargo_bin("dungeon-cli")
        .unwrap()
        .args(["boss-split", "--hp-ratio", "1.5"])
        .assert()
        .failure();
}

#[test]
fn simulate_pvp_reports_rates() {
    Command::cargo_bin("simulate-pvp")
        .unwrap()
        .args(["--trials", "20", "--first", "rogue", "--second", "mage"])
        .assert()
        .success()
        .stdout(predicate::str::contains("first win rate:"));
}

#[test]
fn simulate_pvp_rejects_unknown_policy() {
    Command::cargo_bin("simulate-pvp")
        .unwrap()
        .args(["--trials", "2", "--first-policy", "berserk"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("berserk"));
}

use dungeon_engine::api::{
    sample_boss_decisions, simulate_battle, simulate_battle_many, simulate_encounter, BattleConfig,
    EncounterConfig,
};
use dungeon_engine::EngineConfig;
use jni::objects::{JClass, JString};
use jni::sys::{jdouble, jint, jlong, jstring};
use jni::JNIEnv;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

const DEFAULT_SAMPLES: u32 = 100;

/// Request body: a harness config plus optional engine overrides.
#[derive(Deserialize)]
struct Request<T> {
    #[serde(flatten)]
    config: T,
    #[serde(default)]
    engine: Option<EngineConfig>,
    #[serde(default)]
    samples: Option<u32>,
}

fn ok(value: impl Serialize) -> String {
    match serde_json::to_value(value) {
        Ok(v) => json!({ "ok": true, "result": v }).to_string(),
        Err(e) => err(e),
    }
}

fn err(e: impl std::fmt::Display) -> String {
    json!({ "ok": false, "error": e.to_string() }).to_string()
}

fn parse<T: DeserializeOwned>(input: &str) -> Result<(T, EngineConfig, Option<u32>), String> {
    let req: Request<T> =
        serde_json::from_str(input).map_err(|e| format!("invalid_config: {}", e))?;
    let engine = req.engine.unwrap_or_default();
    engine.validate().map_err(|e| format!("invalid_engine_config: {}", e))?;
    Ok((req.config, engine, req.samples))
}

pub fn simulate_battle_json(input: &str) -> String {
    match parse::<BattleConfig>(input) {
        Ok((cfg, engine, _)) => simulate_battle(cfg, &engine).map_or_else(err, ok),
        Err(e) => err(e),
    }
}

pub fn simulate_battle_many_json(input: &str) -> String {
    match parse::<BattleConfig>(input) {
        Ok((cfg, engine, samples)) => {
            let samples = samples.unwrap_or(DEFAULT_SAMPLES);
            simulate_battle_many(cfg, &engine, samples).map_or_else(err, ok)
        }
        Err(e) => err(e),
    }
}

pub fn simulate_encounter_json(input: &str) -> String {
    match parse::<EncounterConfig>(input) {
        Ok((cfg, engine, _)) => simulate_encounter(cfg, &engine).map_or_else(err, ok),
        Err(e) => err(e),
    }
}

pub fn boss_split_json(hp_ratio: f64, samples: u32, seed: u64) -> String {
    if !(0.0..=1.0).contains(&hp_ratio) {
        return err(format!("hp ratio must be within [0, 1], got {}", hp_ratio));
    }
    ok(sample_boss_decisions(hp_ratio, samples, seed))
}

fn to_jstring(env: &JNIEnv, s: String) -> jstring {
    env.new_string(s).map(|j| j.into_raw()).unwrap_or(std::ptr::null_mut())
}

fn with_input(mut env: JNIEnv, json: JString, f: impl FnOnce(&str) -> String) -> jstring {
    let out = match env.get_string(&json) {
        Ok(s) => f(&String::from(s)),
        Err(e) => err(e),
    };
    to_jstring(&env, out)
}

#[no_mangle]
pub extern "system" fn Java_com_dungeonarena_Ffi_version(env: JNIEnv, _class: JClass) -> jstring {
    to_jstring(&env, format!("dungeon-ffi {}", env!("CARGO_PKG_VERSION")))
}

#[no_mangle]
pub extern "system" fn Java_com_dungeonarena_Ffi_simulateBattleJson(
    env: JNIEnv,
    _class: JClass,
    json: JString,
) -> jstring {
    with_input(env, json, simulate_battle_json)
}

#[no_mangle]
pub extern "system" fn Java_com_dungeonarena_Ffi_simulateBattleManyJson(
    env: JNIEnv,
    _class: JClass,
    json: JString,
) -> jstring {
    with_input(env, json, simulate_battle_many_json)
}

#[no_mangle]
pub extern "system" fn Java_com_dungeonarena_Ffi_simulateEncounterJson(
    env: JNIEnv,
    _class: JClass,
    json: JString,
) -> jstring {
    with_input(env, json, simulate_encounter_json)
}

#[no_mangle]
pub extern "system" fn Java_com_dungeonarena_Ffi_bossSplitJson(
    env: JNIEnv,
    _class: JClass,
    hp_ratio: jdouble,
    samples: jint,
    seed: jlong,
) -> jstring {
    to_jstring(&env, boss_split_json(hp_ratio, samples.max(0) as u32, seed as u64))
}

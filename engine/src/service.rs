//! Session-level entry points used by the realtime layer.
//!
//! [`ArenaService`] owns the battle and encounter registries and talks to the
//! external collaborators (loot, persistence) through traits. Every operation
//! returns the events the caller should forward to clients.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::Dice;
use crate::battle::Battle;
use crate::combat::{Action, ActionRequest};
use crate::config::EngineConfig;
use crate::encounter::{EncounterContext, EncounterOutcome, EncounterSession, Enemy, Player};
use crate::error::Result;
use crate::events::ServerEvent;
use crate::registry::{RegistryKind, SessionRegistry};
use crate::stats::Combatant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootRequest {
    pub depth: u32,
    pub difficulty: f64,
    pub magic_find: f64,
    pub enemy_type: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LootReward {
    pub gold: u32,
    pub xp: u32,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub materials: Vec<String>,
}

/// External loot roller. The engine never rolls loot itself.
pub trait LootEngine: Send + Sync {
    fn roll(&self, request: &LootRequest) -> LootReward;
}

/// Grants nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLoot;

impl LootEngine for NoLoot {
    fn roll(&self, _request: &LootRequest) -> LootReward {
        LootReward::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterSummary {
    pub session_id: String,
    pub player_id: String,
    pub outcome: EncounterOutcome,
    pub turns: u32,
    pub player_hp: i32,
}

/// External persistence for terminal outcomes.
pub trait OutcomeStore: Send + Sync {
    fn record_battle(&self, battle: &Battle);
    fn record_encounter(&self, summary: &EncounterSummary);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl OutcomeStore for NullStore {
    fn record_battle(&self, _battle: &Battle) {}
    fn record_encounter(&self, _summary: &EncounterSummary) {}
}

/// A PvP battle together with the dice that drive it.
#[derive(Debug)]
pub struct LiveBattle {
    pub battle: Battle,
    dice: Dice,
}

pub struct ArenaService<L = NoLoot, S = NullStore> {
    config: EngineConfig,
    battles: SessionRegistry<LiveBattle>,
    encounters: SessionRegistry<EncounterSession>,
    loot: L,
    store: S,
}

impl ArenaService<NoLoot, NullStore> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_collaborators(config, NoLoot, NullStore)
    }
}

impl<L: LootEngine, S: OutcomeStore> ArenaService<L, S> {
    pub fn with_collaborators(config: EngineConfig, loot: L, store: S) -> Self {
        Self {
            config,
            battles: SessionRegistry::new(RegistryKind::Battle),
            encounters: SessionRegistry::new(RegistryKind::Session),
            loot,
            store,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn active_battles(&self) -> usize {
        self.battles.len()
    }

    pub fn active_encounters(&self) -> usize {
        self.encounters.len()
    }

    pub fn start_battle(
        &self,
        battle_id: &str,
        first: &Combatant,
        second: &Combatant,
        seed: u64,
    ) -> Result<ServerEvent> {
        let battle = Battle::new(battle_id, first, second)?;
        let event = ServerEvent::battle_start(&battle);
        self.battles.create(battle_id, LiveBattle {
            battle,
            dice: Dice::from_seed(seed),
        })?;
        Ok(event)
    }

    /// Resolve one PvP turn from raw client payloads.
    pub fn submit_battle_turn(
        &self,
        battle_id: &str,
        first: ActionRequest,
        second: ActionRequest,
    ) -> Result<Vec<ServerEvent>> {
        let first = first.into_action()?;
        let second = second.into_action()?;
        self.battle_turn(battle_id, &first, &second)
    }

    pub fn battle_turn(
        &self,
        battle_id: &str,
        first: &Action,
        second: &Action,
    ) -> Result<Vec<ServerEvent>> {
        let (events, completed) = self.battles.with_session(battle_id, |live| {
            let turn = live.battle.process_turn([first, second], &mut live.dice)?.clone();
            let mut events = vec![ServerEvent::ActionResult {
                battle_id: battle_id.to_string(),
                turn,
            }];
            let completed = live.battle.is_completed();
            if completed {
                self.store.record_battle(&live.battle);
                events.push(ServerEvent::battle_end(&live.battle));
            }
            Ok((events, completed))
        })?;
        if completed {
            self.battles.remove(battle_id);
        }
        Ok(events)
    }

    /// Copy of a battle in progress.
    pub fn battle_snapshot(&self, battle_id: &str) -> Result<Battle> {
        self.battles.inspect(battle_id, |live| live.battle.clone())
    }

    pub fn start_encounter(
        &self,
        session_id: &str,
        player: Player,
        enemies: Vec<Enemy>,
        context: EncounterContext,
        seed: u64,
    ) -> Result<ServerEvent> {
        let session = EncounterSession::new(session_id, seed, player, enemies, context)?;
        let event = ServerEvent::EncounterStarted {
            session_id: session_id.to_string(),
            player: session.player_snapshot(),
            enemies: session.enemy_snapshots(),
        };
        self.encounters.create(session_id, session)?;
        Ok(event)
    }

    pub fn submit_encounter_action(
        &self,
        session_id: &str,
        request: ActionRequest,
    ) -> Result<Vec<ServerEvent>> {
        let action = request
            .into_action()
            .inspect_err(|e| warn!(session_id, error = %e, "action rejected"))?;
        self.encounter_action(session_id, &action)
    }

    pub fn encounter_action(
        &self,
        session_id: &str,
        action: &Action,
    ) -> Result<Vec<ServerEvent>> {
        let (events, finished) = self.encounters.with_session(session_id, |session| {
            let turn = session.act(action)?;
            let number = turn.turn;
            let outcome = turn.outcome;
            let mut events = vec![ServerEvent::TurnResult {
                session_id: session_id.to_string(),
                turn,
            }];

            if let Some(outcome) = outcome {
                self.store.record_encounter(&EncounterSummary {
                    session_id: session_id.to_string(),
                    player_id: session.player.combatant.id.clone(),
                    outcome,
                    turns: number,
                    player_hp: session.player.combatant.stats.current_hp,
                });
                match outcome {
                    EncounterOutcome::Won => {
                        // a field cleared only by fleeing earns nothing
                        let loot = match &session.last_defeated_type {
                            Some(enemy_type) => self.loot.roll(&LootRequest {
                                depth: session.context.depth,
                                difficulty: session.context.difficulty,
                                magic_find: session.context.magic_find,
                                enemy_type: enemy_type.clone(),
                            }),
                            None => LootReward::default(),
                        };
                        events.push(ServerEvent::EncounterWon {
                            session_id: session_id.to_string(),
                            turn: number,
                            loot,
                        });
                    }
                    EncounterOutcome::Lost => {
                        events.push(ServerEvent::EncounterLost {
                            session_id: session_id.to_string(),
                            turn: number,
                        });
                    }
                }
            }
            Ok((events, outcome.is_some()))
        })?;
        if finished {
            self.encounters.remove(session_id);
        }
        Ok(events)
    }

    /// Forget everything tied to a connection.
    pub fn disconnect(&self, connection_id: &str) -> bool {
        let had_encounter = self.encounters.remove(connection_id);
        let had_battle = self.battles.remove(connection_id);
        if had_encounter || had_battle {
            info!(connection_id, "connection state dropped");
        }
        had_encounter || had_battle
    }

    /// Remove sessions and battles idle past the configured timeout.
    pub fn sweep_idle(&self) -> Vec<String> {
        let timeout = self.config.idle_timeout();
        let mut swept = self.encounters.sweep_idle(timeout);
        swept.extend(self.battles.sweep_idle(timeout));
        swept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{Behavior, BehaviorProfile};
    use crate::stats::CombatantStats;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        battles: Mutex<Vec<String>>,
        encounters: Mutex<Vec<EncounterSummary>>,
    }

    impl OutcomeStore for &Recorder {
        fn record_battle(&self, battle: &Battle) {
            self.battles.lock().push(battle.id.clone());
        }
        fn record_encounter(&self, summary: &EncounterSummary) {
            self.encounters.lock().push(summary.clone());
        }
    }

    struct FixedLoot;

    impl LootEngine for FixedLoot {
        fn roll(&self, request: &LootRequest) -> LootReward {
            LootReward {
                gold: 10 * request.depth,
                xp: 5,
                items: vec![request.enemy_type.clone()],
                materials: vec![],
            }
        }
    }

    fn fighter(id: &str, hp: i32, attack: i32) -> Combatant {
        Combatant::new(id, CombatantStats::new(hp, attack, 0, 10, 100, 0)).unwrap()
    }

    fn player(hp: i32, attack: i32) -> Player {
        let stats = CombatantStats::new(hp, attack, 0, 10, 100, 0);
        Player::new("hero", "warrior", stats, vec![], 0.0).unwrap()
    }

    fn dummy(id: &str, hp: i32) -> Enemy {
        let profile = BehaviorProfile {
            behavior: Behavior::Aggressive,
            aggressiveness: 1.0,
            defensiveness: 0.0,
            ranged_preference: 0.0,
            flee_threshold: 0.0,
        };
        let stats = CombatantStats::new(hp, 1, 0, 1, 0, 0);
        Enemy::new(id, "training_dummy", stats, profile, vec![], 0.0).unwrap()
    }

    #[test]
    fn battle_runs_to_completion_and_is_recorded() {
        let recorder = Recorder::default();
        let svc = ArenaService::with_collaborators(EngineConfig::default(), NoLoot, &recorder);
        let (a, b) = (fighter("a", 30, 12), fighter("b", 30, 12));
        let start = svc.start_battle("b1", &a, &b, 7).unwrap();
        assert_eq!(start.name(), "battle_start");
        assert!(svc.start_battle("b1", &a, &b, 7).is_err());

        let mut last = Vec::new();
        for _ in 0..100 {
            let (first, second) = (ActionRequest::new("attack"), ActionRequest::new("attack"));
            last = svc.submit_battle_turn("b1", first, second).unwrap();
            if svc.active_battles() == 0 {
                break;
            }
        }
        assert_eq!(last.last().map(ServerEvent::name), Some("battle_end"));
        assert_eq!(*recorder.battles.lock(), vec!["b1".to_string()]);
        assert!(matches!(svc.battle_snapshot("b1"), Err(crate::EngineError::BattleNotFound(_))));
    }

    #[test]
    fn bad_action_payload_is_rejected_without_side_effects() {
        let svc = ArenaService::new(EngineConfig::default());
        svc.start_battle("b1", &fighter("a", 30, 5), &fighter("b", 30, 5), 1).unwrap();
        let err = svc
            .submit_battle_turn("b1", ActionRequest::new("dance"), ActionRequest::new("attack"))
            .unwrap_err();
        assert!(matches!(err, crate::EngineError::InvalidAction(_)));
        assert!(svc.battle_snapshot("b1").unwrap().turns.is_empty());
    }

    #[test]
    fn encounter_win_rolls_loot_and_closes_session() {
        let recorder = Recorder::default();
        let svc = ArenaService::with_collaborators(EngineConfig::default(), FixedLoot, &recorder);
        let ctx = EncounterContext {
            depth: 3,
            ..EncounterContext::default()
        };
        let started =
            svc.start_encounter("conn-1", player(100, 50), vec![dummy("d-1", 5)], ctx, 11).unwrap();
        assert_eq!(started.name(), "encounter_started");

        // accuracy 100 never misses; one hit kills the dummy
        let mut events = Vec::new();
        for _ in 0..20 {
            events = svc.encounter_action("conn-1", &Action::attack()).unwrap();
            if svc.active_encounters() == 0 {
                break;
            }
        }
        match events.last() {
            Some(ServerEvent::EncounterWon { loot, .. }) => {
                assert_eq!(loot.gold, 30);
                assert_eq!(loot.items, vec!["training_dummy".to_string()]);
            }
            other => panic!("expected a win, got {other:?}"),
        }
        let summaries = recorder.encounters.lock();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].outcome, EncounterOutcome::Won);
    }

    #[test]
    fn a_field_cleared_by_fleeing_rolls_no_loot() {
        let recorder = Recorder::default();
        let svc = ArenaService::with_collaborators(EngineConfig::default(), FixedLoot, &recorder);
        let mut coward = dummy("c-1", 100);
        coward.profile.flee_threshold = 0.5;
        coward.combatant.stats.current_hp = 10;
        svc.start_encounter("conn-2", player(100, 1), vec![coward], EncounterContext::default(), 5)
            .unwrap();

        let events = svc.encounter_action("conn-2", &Action::Defend).unwrap();
        match events.last() {
            Some(ServerEvent::EncounterWon { loot, .. }) => {
                assert_eq!(*loot, LootReward::default())
            }
            other => panic!("expected a win, got {other:?}"),
        }
        assert_eq!(svc.active_encounters(), 0);
        assert_eq!(recorder.encounters.lock()[0].outcome, EncounterOutcome::Won);
    }

    #[test]
    fn unknown_target_leaves_the_session_usable() {
        let svc = ArenaService::new(EngineConfig::default());
        let ctx = EncounterContext::default();
        svc.start_encounter("c", player(100, 1), vec![dummy("d-1", 500)], ctx, 3).unwrap();
        let err = svc.encounter_action("c", &Action::attack_target("ghost")).unwrap_err();
        assert!(matches!(err, crate::EngineError::TargetNotFound(_)));
        let events = svc.encounter_action("c", &Action::Defend).unwrap();
        assert_eq!(events[0].name(), "turn_result");
    }

    #[test]
    fn disconnect_and_sweep_drop_state() {
        let config = EngineConfig {
            idle_timeout_secs: 0,
            ..EngineConfig::default()
        };
        let svc = ArenaService::new(config);
        let ctx = EncounterContext::default();
        svc.start_encounter("c1", player(100, 1), vec![dummy("d-1", 50)], ctx, 1).unwrap();
        svc.start_encounter("c2", player(100, 1), vec![dummy("d-1", 50)], ctx, 2).unwrap();
        assert!(svc.disconnect("c1"));
        assert!(!svc.disconnect("c1"));
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(svc.sweep_idle(), vec!["c2".to_string()]);
        assert_eq!(svc.active_encounters(), 0);
    }
}

pub mod actions;
pub mod damage;

pub use actions::{Action, ActionRequest};
pub use damage::{AttackRoll, DamageMode, Strike, resolve_live_attack, resolve_pvp_attack};

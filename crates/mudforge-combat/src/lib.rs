//! Turn-based combat for Mudforge.
//!
//! Fights are pairings: exactly two combatants (players or mobs), one of
//! whom holds the initiative. Every combat round the
//! [`CombatCoordinator`] resolves one exchange per pairing: the side with
//! the initiative swings, the blow hits or misses per the
//! [`CombatPolicy`], and the initiative passes to the other side. A
//! lethal blow ends the pairing and hands the loser to an [`Aftermath`].
//!
//! Like every other subsystem, the coordinator never talks to clients. It
//! returns ordered [`Outbound`](mudforge_protocol::Outbound) notices for
//! the scheduler to deliver.

mod aftermath;
mod coordinator;
pub mod dialogue;
mod error;
mod policy;

pub use aftermath::{Aftermath, StandardAftermath};
pub use coordinator::{CombatCoordinator, CombatSession, PairingId, Side, combatant_name};
pub use error::CombatError;
pub use policy::CombatPolicy;

//! Error types for combat coordination.

use mudforge_protocol::CombatantId;

/// Errors returned by [`CombatCoordinator::engage`](crate::CombatCoordinator::engage).
///
/// Resolution itself never fails: inconsistent pairings are torn down
/// quietly instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CombatError {
    /// The attacker is already paired. Nothing was changed.
    #[error("You're already fighting {opponent_name}!")]
    AlreadyFighting {
        opponent: CombatantId,
        opponent_name: String,
    },

    /// The defender is paired with someone else.
    #[error("{0} is already fighting someone else.")]
    TargetBusy(String),

    #[error("You can't fight yourself.")]
    SelfTarget,

    /// One side is missing from the world, or already dead.
    #[error("{0} is not here to fight")]
    UnknownCombatant(CombatantId),
}

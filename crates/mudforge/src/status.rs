//! Per-tick status sweeps: waking sleepers caught in a fight, sleep
//! healing, affliction expiry and invisibility expiry.
//!
//! Each sweep walks logged-in sessions in id order and returns the notices
//! it produced; [`sweep`] runs them all.

use mudforge_protocol::{CombatantId, Outbound};
use mudforge_session::AfflictionKind;
use tokio::time::Instant;

use crate::GameContext;

/// Heals gained per sleep heal.
const SLEEP_HEAL_AMOUNT: i32 = 1;

/// Every third heal is announced with a snore.
const SNORE_EVERY: u32 = 3;

/// Runs every status sweep for one tick.
pub fn sweep(ctx: &mut GameContext, sleep_heal_interval: u32, now: Instant) -> Vec<Outbound> {
    let mut out = combat_wakeup(ctx);
    out.extend(sleep_healing(ctx, sleep_heal_interval));
    out.extend(affliction_expiry(ctx, now));
    out.extend(invisibility_expiry(ctx, now));
    out
}

/// Wakes every sleeping player who is in a fight.
///
/// Magic sleep is broken as well. The room hears about it.
pub fn combat_wakeup(ctx: &mut GameContext) -> Vec<Outbound> {
    let mut out = Vec::new();
    for session in ctx.sessions.iter_mut() {
        if !session.flags.sleeping {
            continue;
        }
        let Some(name) = session.player.clone() else {
            continue;
        };
        if !ctx.combat.is_in_combat(&CombatantId::Player(name.clone())) {
            continue;
        }

        session.wake();
        session.cure(AfflictionKind::MagicSleep);
        tracing::debug!(session = %session.id, player = %name, "woken by combat");
        out.push(Outbound::to_player(&name, "You are startled awake!"));
        if let Some(player) = ctx.world.player(&name) {
            out.push(Outbound::to_room_except(
                &player.current_room,
                vec![name.clone()],
                format!("{name} has woken up."),
            ));
        }
    }
    out
}

/// Heals sleeping players by one stamina every `interval` ticks and wakes
/// them once they're full. Players in a fight don't heal.
pub fn sleep_healing(ctx: &mut GameContext, interval: u32) -> Vec<Outbound> {
    let mut out = Vec::new();
    let interval = interval.max(1);

    for id in ctx.sessions.ids() {
        let Some(session) = ctx.sessions.get_mut(id) else {
            continue;
        };
        if !session.flags.sleeping {
            continue;
        }
        let Some(name) = session.player.clone() else {
            continue;
        };
        if ctx.combat.is_in_combat(&CombatantId::Player(name.clone())) {
            continue;
        }
        let Some(player) = ctx.world.player_mut(&name) else {
            continue;
        };

        session.flags.sleep_ticks += 1;
        if session.flags.sleep_ticks < interval {
            continue;
        }
        session.flags.sleep_ticks = 0;

        if !player.is_at_max_stamina() {
            player.heal(SLEEP_HEAL_AMOUNT);
            out.push(Outbound::Stats(name.clone()));
            if !player.is_at_max_stamina() {
                if session.flags.heal_count % SNORE_EVERY == 0 {
                    out.push(Outbound::to_player(&name, "ZZZzzz..."));
                }
                session.flags.heal_count += 1;
                continue;
            }
        }

        let stamina = player.stamina;
        let room = player.current_room.clone();
        session.wake();
        tracing::debug!(session = %id, player = %name, stamina, "woke fully rested");
        out.push(Outbound::to_room_except(
            &room,
            vec![name.clone()],
            format!("{name} has woken up."),
        ));
        out.push(Outbound::to_player(
            &name,
            format!("You are too alert to sleep any more! You wake up.\nYour stamina is now {stamina}."),
        ));
    }

    out
}

/// Removes afflictions that have run their course, telling each player
/// what wore off.
pub fn affliction_expiry(ctx: &mut GameContext, now: Instant) -> Vec<Outbound> {
    let mut out = Vec::new();
    for session in ctx.sessions.iter_mut() {
        let Some(name) = session.player.clone() else {
            continue;
        };
        for kind in session.take_expired_afflictions(now) {
            tracing::debug!(session = %session.id, player = %name, affliction = %kind, "affliction expired");
            out.push(Outbound::to_player(&name, kind.expiry_message()));
        }
    }
    out
}

/// Ends item-granted invisibility once its time is up.
pub fn invisibility_expiry(ctx: &mut GameContext, now: Instant) -> Vec<Outbound> {
    let mut out = Vec::new();
    for session in ctx.sessions.iter_mut() {
        let Some(name) = session.player.clone() else {
            continue;
        };
        if let Some(item) = session.take_expired_invisibility(now) {
            tracing::debug!(session = %session.id, player = %name, %item, "invisibility expired");
            out.push(Outbound::to_player(
                &name,
                format!("Your {item} fades and loses its power. You are now visible."),
            ));
        }
    }
    out
}

//! Combat narration.
//!
//! Every line is picked at random from a small table so long fights don't
//! read like a loop. Templates use `{target}` and `{weapon}` placeholders.

use rand::Rng;
use rand::seq::IndexedRandom;

const PLAYER_HIT: &[&str] = &[
    "You beat {target} with a punishing blow!",
    "You catch {target} with a hefty forehand!",
    "Your counter sends {target} sideways!",
    "You thrash {target} with a savage clout!",
    "Your precise strike lands squarely on {target}!",
    "You deliver a mighty blow that staggers {target}!",
];

const PLAYER_WEAPON_HIT: &[&str] = &[
    "Your {weapon} slices into {target}!",
    "You drive your {weapon} forward, catching {target} off guard!",
    "Your {weapon} finds its mark, sending {target} reeling!",
    "You swing your {weapon} in a wide arc, connecting with {target}!",
];

const PLAYER_MISS: &[&str] = &[
    "Your wild swing misses {target} completely!",
    "{target} narrowly evades your attack!",
    "You lunge forward but {target} steps aside!",
    "Your blow goes wide, missing {target} entirely!",
];

const OPPONENT_HIT: &[&str] = &[
    "A sudden strike from {target} catches you off guard!",
    "You reel from a powerful blow delivered by {target}!",
    "{target}'s attack lands with surprising force!",
    "You are stunned by the vigour of a whack by {target}!",
];

const OPPONENT_WEAPON_HIT: &[&str] = &[
    "{target}'s {weapon} strikes you with unexpected force!",
    "You feel the sting as {target}'s {weapon} finds its mark!",
    "{target} swings their {weapon}, landing a solid blow!",
];

const OPPONENT_MISS: &[&str] = &[
    "You easily duck a clumsy thrust by {target}.",
    "You deftly sidestep {target}'s attack!",
    "{target}'s wild swing meets nothing but air!",
    "You twist away from {target}'s poorly aimed strike!",
];

const HEAVY_DAMAGE_RECOVERY: &[&str] = &[
    "Gritting your teeth, you throw yourself back into the battle.",
    "Despite the pain, you steel yourself and press forward!",
    "The hit staggers you, but your fighting spirit remains unbroken!",
];

const KILLING_BLOW: &[&str] = &[
    "Your last punch killed {target}!",
    "Your final strike brings {target} crashing down!",
    "With one last mighty blow, you defeat {target}!",
];

const WEAPON_KILLING_BLOW: &[&str] = &[
    "Your {weapon} delivers the final, fatal blow to {target}!",
    "Your {weapon} flashes one last time, and {target} falls!",
];

const VICTORY: &str = "You are victorious - this time...";

fn pick<R: Rng + ?Sized>(
    table: &[&str],
    target: &str,
    weapon: Option<&str>,
    rng: &mut R,
) -> String {
    let template = table.choose(rng).copied().unwrap_or("{target}");
    template
        .replace("{target}", target)
        .replace("{weapon}", weapon.unwrap_or("weapon"))
}

/// What the acting player sees when their blow lands.
pub fn player_hit<R: Rng + ?Sized>(target: &str, weapon: Option<&str>, rng: &mut R) -> String {
    match weapon {
        Some(_) => pick(PLAYER_WEAPON_HIT, target, weapon, rng),
        None => pick(PLAYER_HIT, target, None, rng),
    }
}

pub fn player_miss<R: Rng + ?Sized>(target: &str, rng: &mut R) -> String {
    pick(PLAYER_MISS, target, None, rng)
}

/// What a player sees when `attacker` hits them.
pub fn opponent_hit<R: Rng + ?Sized>(attacker: &str, weapon: Option<&str>, rng: &mut R) -> String {
    match weapon {
        Some(_) => pick(OPPONENT_WEAPON_HIT, attacker, weapon, rng),
        None => pick(OPPONENT_HIT, attacker, None, rng),
    }
}

pub fn opponent_miss<R: Rng + ?Sized>(attacker: &str, rng: &mut R) -> String {
    pick(OPPONENT_MISS, attacker, None, rng)
}

pub fn heavy_damage_recovery<R: Rng + ?Sized>(rng: &mut R) -> String {
    pick(HEAVY_DAMAGE_RECOVERY, "", None, rng)
}

/// The finishing blow, followed by the victory line.
pub fn killing_blow<R: Rng + ?Sized>(target: &str, weapon: Option<&str>, rng: &mut R) -> String {
    let line = match weapon {
        Some(_) => pick(WEAPON_KILLING_BLOW, target, weapon, rng),
        None => pick(KILLING_BLOW, target, None, rng),
    };
    format!("{line}\n{VICTORY}")
}

/// Bystanders' view of a landed blow.
pub fn observer_hit(attacker: &str, defender: &str) -> String {
    format!("{attacker} lands a blow on {defender}!")
}

pub fn observer_miss(attacker: &str, defender: &str) -> String {
    format!("{attacker} swings at {defender} and misses.")
}

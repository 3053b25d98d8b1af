//! The numbers behind a combat exchange.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tunable hit and damage parameters.
///
/// - Hit chance: `base_hit * attacker_dex / defender_dex`, clamped to
///   `[min_hit, max_hit]`.
/// - Damage: `(strength / strength_divisor + weapon_bonus) * U(variance_lo,
///   variance_hi)`, truncated, never below `min_damage`.
///
/// Setting `min_hit == max_hit` and `variance_lo == variance_hi` makes
/// combat fully deterministic, which is what the tests do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatPolicy {
    pub base_hit: f64,
    pub min_hit: f64,
    pub max_hit: f64,
    pub variance_lo: f64,
    pub variance_hi: f64,
    pub strength_divisor: u32,
    pub min_damage: u32,
}

impl Default for CombatPolicy {
    fn default() -> Self {
        Self {
            base_hit: 0.5,
            min_hit: 0.10,
            max_hit: 0.95,
            variance_lo: 0.8,
            variance_hi: 1.2,
            strength_divisor: 10,
            min_damage: 1,
        }
    }
}

impl CombatPolicy {
    /// Chance (0.0–1.0) that an attacker with `att_dex` lands a blow on a
    /// defender with `def_dex`.
    pub fn hit_chance(&self, att_dex: u32, def_dex: u32) -> f64 {
        let raw = self.base_hit * f64::from(att_dex) / f64::from(def_dex.max(1));
        let (lo, hi) = ordered(self.min_hit, self.max_hit);
        let chance = raw.max(lo).min(hi);
        if chance.is_nan() {
            0.0
        } else {
            chance.clamp(0.0, 1.0)
        }
    }

    /// Rolls whether a blow lands.
    pub fn roll_hit<R: Rng + ?Sized>(&self, att_dex: u32, def_dex: u32, rng: &mut R) -> bool {
        rng.random_bool(self.hit_chance(att_dex, def_dex))
    }

    /// Rolls the damage of a landed blow.
    pub fn roll_damage<R: Rng + ?Sized>(&self, strength: u32, weapon_bonus: u32, rng: &mut R) -> u32 {
        let base = f64::from(strength / self.strength_divisor.max(1) + weapon_bonus);
        let (lo, hi) = ordered(self.variance_lo, self.variance_hi);
        let factor = if lo >= hi { lo } else { rng.random_range(lo..=hi) };
        let damage = (base * factor.max(0.0)) as u32;
        damage.max(self.min_damage)
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

//! Autonomous behavior for Mudforge mobs.
//!
//! The [`MobAIEngine`] runs once per game tick. For every living mob that
//! isn't locked in a fight it:
//!
//! 1. counts the aggro delay down by one
//! 2. walks the patrol route when the movement timer says so
//! 3. ambushes a visible player in its room once the countdown hits zero
//!
//! Mobs in combat are frozen: they neither move nor count down until the
//! fight is over.

mod engine;

pub use engine::MobAIEngine;

//! Integration tests for the world: templates loaded from JSON, spawned
//! into a small map, and walked along their patrol routes.

use mudforge_protocol::{MobId, RoomId};
use mudforge_world::{MobState, Player, Room, World, load_templates};
use rand::SeedableRng;
use rand::rngs::StdRng;

// =========================================================================
// Helpers
// =========================================================================

const TEMPLATES: &str = r#"{
    "guard": {
        "name": "town guard",
        "patrol_rooms": ["gate", "square", "market"],
        "movement_interval": 2
    },
    "wolf": {
        "name": "grey wolf",
        "aggressive": true,
        "aggro_delay_min": 3,
        "aggro_delay_max": 3,
        "instant_death": true,
        "point_value": 25,
        "loot_table": [
            { "item": { "id": "pelt", "name": "wolf pelt" }, "chance": 1.0 }
        ]
    }
}"#;

fn room(id: &str) -> RoomId {
    RoomId::new(id)
}

fn hamlet() -> World {
    let mut world = World::new();
    world.add_room(Room::new("gate", "Town Gate").with_exit("north", "square"));
    world.add_room(
        Room::new("square", "Village Square")
            .with_exit("south", "gate")
            .with_exit("east", "market"),
    );
    world.add_room(Room::new("market", "Market").with_exit("west", "square"));
    world.add_templates(load_templates(TEMPLATES).unwrap());
    world
}

// =========================================================================
// Spawning from JSON templates
// =========================================================================

#[test]
fn test_spawned_wolf_carries_template_fields() {
    let mut world = hamlet();
    let mut rng = StdRng::seed_from_u64(3);

    let id = world.spawn_mob("wolf", &room("market"), &mut rng).unwrap();
    let wolf = world.mob(&id).unwrap();

    assert_eq!(wolf.name, "grey wolf");
    assert_eq!(wolf.aggro_counter, Some(3));
    assert!(wolf.instant_death);
    assert_eq!(wolf.point_value, 25);
    assert_eq!(wolf.loot_table.len(), 1);
}

// =========================================================================
// Patrol walk
// =========================================================================

#[test]
fn test_guard_patrol_walks_route_on_interval() {
    let mut world = hamlet();
    let mut rng = StdRng::seed_from_u64(3);
    let id = world.spawn_mob("guard", &room("gate"), &mut rng).unwrap();

    let mut rooms_seen = Vec::new();
    for tick in 1..=6u64 {
        let guard = world.mob_mut(&id).unwrap();
        if guard.should_move(tick) {
            let next = guard.choose_next_room();
            guard.move_to(next, tick);
        }
        rooms_seen.push(guard.current_room.clone());
    }

    assert_eq!(
        rooms_seen,
        vec![
            room("gate"),
            room("square"),
            room("square"),
            room("market"),
            room("market"),
            room("gate"),
        ]
    );
}

// =========================================================================
// Death and loot
// =========================================================================

#[test]
fn test_killed_wolf_drops_loot_and_disappears_from_room_listing() {
    let mut world = hamlet();
    let mut rng = StdRng::seed_from_u64(3);
    let market = room("market");
    let id: MobId = world.spawn_mob("wolf", &market, &mut rng).unwrap();

    let died = world.mob_mut(&id).unwrap().take_damage(1);
    let loot = world.mob(&id).unwrap().drop_loot(&mut rng);
    world.drop_items(&market, loot).unwrap();

    assert!(died);
    assert_eq!(world.mob(&id).unwrap().state, MobState::Dead);
    assert!(world.mobs_in_room(&market).is_empty());
    assert_eq!(world.room(&market).unwrap().items[0].name, "wolf pelt");
}

#[test]
fn test_world_snapshot_round_trips_players_and_mobs() {
    let mut world = hamlet();
    let mut rng = StdRng::seed_from_u64(3);
    world.spawn_mob("guard", &room("gate"), &mut rng).unwrap();
    world.add_player(Player::new("Alice", room("square")));

    let json = serde_json::to_string(&world).unwrap();
    let restored: World = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.mobs().count(), 1);
    assert_eq!(restored.players().count(), 1);
    assert!(restored.template("guard").is_none(), "templates are not saved");
}

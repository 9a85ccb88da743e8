//! Works out which actors must react to an event, and in what order.

use std::collections::{BTreeMap, HashSet};

use game_rules::{ActorId, ActorRecord, EnvironmentStateStore, GameEvent};

/// Actions loud enough to be heard in neighbouring locations.
pub const BROADCAST_ACTIONS: [&str; 3] = ["shout", "explosion", "combat"];

/// Ordered, duplicate-free list of actors affected by `event`.
///
/// 1. the explicit target, if it is a known actor;
/// 2. actors at the event's location;
/// 3. for broadcast actions, actors in locations with an exit leading to the
///    event's location.
///
/// Groups 2 and 3 are sorted by actor id and never include the initiator.
/// The first entry is the primary actor.
pub fn resolve(
    event: &GameEvent,
    env: &EnvironmentStateStore,
    roster: &BTreeMap<ActorId, ActorRecord>,
) -> Vec<ActorId> {
    let mut affected = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |id: ActorId| {
        if roster.contains_key(&id) && seen.insert(id.clone()) {
            affected.push(id);
        }
    };

    if let Some(target) = &event.target {
        push(ActorId::new(target.as_str()));
    }

    let not_initiator = |id: &ActorId| id.as_str() != event.initiator;

    for id in env.actors_at(&event.location).into_iter().filter(not_initiator) {
        push(id);
    }

    if BROADCAST_ACTIONS.contains(&event.action.as_str()) {
        let mut nearby: Vec<ActorId> = env
            .locations_connecting_to(&event.location)
            .iter()
            .flat_map(|location| env.actors_at(location))
            .filter(not_initiator)
            .collect();
        nearby.sort();
        for id in nearby {
            push(id);
        }
    }

    affected
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_rules::{EventKind, Location, LocationId, LocationType};

    struct World {
        env: EnvironmentStateStore,
        roster: BTreeMap<ActorId, ActorRecord>,
    }

    impl World {
        fn new() -> Self {
            let mut env = EnvironmentStateStore::default();
            for location in [
                Location::new("square", "Square", LocationType::Outdoor).connected_to("forge"),
                Location::new("forge", "Forge", LocationType::Building),
                Location::new("tavern", "Tavern", LocationType::Building).connected_to("square"),
            ] {
                env.add_location(location).unwrap();
            }
            Self {
                env,
                roster: BTreeMap::new(),
            }
        }

        fn actor(mut self, id: &str, location: &str) -> Self {
            let location = LocationId::new(location);
            self.env.place_actor(ActorId::new(id), &location).unwrap();
            self.roster
                .insert(ActorId::new(id), ActorRecord::new(id, id, location));
            self
        }

        fn resolve(&self, event: &GameEvent) -> Vec<ActorId> {
            resolve(event, &self.env, &self.roster)
        }
    }

    fn ids(names: &[&str]) -> Vec<ActorId> {
        names.iter().map(|n| ActorId::new(*n)).collect()
    }

    #[test]
    fn test_target_comes_first_and_initiator_is_excluded() {
        let world = World::new()
            .actor("zed", "square")
            .actor("anna", "square")
            .actor("mia", "square");

        let event =
            GameEvent::new(EventKind::ActorAction, "anna", "speak", "square").with_target("zed");
        assert_eq!(world.resolve(&event), ids(&["zed", "mia"]));
    }

    #[test]
    fn test_unknown_target_is_ignored() {
        let world = World::new().actor("mia", "square");
        let event = GameEvent::new(EventKind::PlayerAction, "player", "greet", "square")
            .with_target("ghost");
        assert_eq!(world.resolve(&event), ids(&["mia"]));
    }

    #[test]
    fn test_remote_target_still_reacts() {
        let world = World::new().actor("mia", "square").actor("bob", "tavern");
        let event =
            GameEvent::new(EventKind::PlayerAction, "player", "wave", "square").with_target("bob");
        assert_eq!(world.resolve(&event), ids(&["bob", "mia"]));
    }

    #[test]
    fn test_broadcast_reaches_locations_leading_here() {
        let world = World::new()
            .actor("marcus", "forge")
            .actor("elena", "square")
            .actor("bob", "tavern");

        // The tavern leads to the square; the square only leads to the forge.
        let shout = GameEvent::new(EventKind::PlayerAction, "player", "shout", "square");
        assert_eq!(world.resolve(&shout), ids(&["elena", "bob"]));

        let whisper = GameEvent::new(EventKind::PlayerAction, "player", "whisper", "square");
        assert_eq!(world.resolve(&whisper), ids(&["elena"]));
    }

    #[test]
    fn test_broadcast_does_not_follow_outgoing_exits() {
        let world = World::new().actor("elena", "square").actor("marcus", "forge");
        let shout = GameEvent::new(EventKind::PlayerAction, "player", "shout", "forge");
        assert_eq!(world.resolve(&shout), ids(&["marcus", "elena"]));

        let shout = GameEvent::new(EventKind::PlayerAction, "player", "shout", "square");
        assert_eq!(world.resolve(&shout), ids(&["elena"]));
    }

    #[test]
    fn test_empty_location() {
        let world = World::new().actor("marcus", "forge");
        let event = GameEvent::new(EventKind::PlayerAction, "player", "wave", "tavern");
        assert!(world.resolve(&event).is_empty());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let world = World::new()
            .actor("c", "square")
            .actor("a", "square")
            .actor("b", "tavern");
        let event = GameEvent::new(EventKind::PlayerAction, "player", "explosion", "square");

        let first = world.resolve(&event);
        for _ in 0..10 {
            assert_eq!(world.resolve(&event), first);
        }
        assert_eq!(first, ids(&["a", "c", "b"]));
        assert_eq!(world.resolve(&event.clone().with_target("b")), ids(&["b", "a", "c"]));
    }
}

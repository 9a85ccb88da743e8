use game_rules::{
    ActorId, EnvironmentStateStore, EventKind, GameEvent, Location, LocationId, LocationType,
};
use proptest::prelude::*;

const LOCATIONS: [&str; 4] = ["square", "forge", "tavern", "cellar"];
const ACTORS: [&str; 3] = ["marcus", "elena", "tom"];

#[derive(Debug, Clone)]
enum Op {
    Place { actor: usize, location: usize },
    Move { actor: usize, from: usize, to: usize },
    Remove { actor: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..ACTORS.len(), 0..LOCATIONS.len())
            .prop_map(|(actor, location)| Op::Place { actor, location }),
        (0..ACTORS.len(), 0..LOCATIONS.len(), 0..LOCATIONS.len())
            .prop_map(|(actor, from, to)| Op::Move { actor, from, to }),
        (0..ACTORS.len()).prop_map(|actor| Op::Remove { actor }),
    ]
}

fn village() -> EnvironmentStateStore {
    let mut store = EnvironmentStateStore::new(8);
    store
        .add_location(
            Location::new("square", "Town Square", LocationType::Outdoor).connected_to("forge"),
        )
        .expect("add square");
    for id in &LOCATIONS[1..] {
        store
            .add_location(Location::new(*id, *id, LocationType::Building))
            .expect("add location");
    }
    store
}

proptest! {
    #[test]
    fn property_every_actor_occupies_at_most_one_location(
        ops in prop::collection::vec(op(), 1..60)
    ) {
        let mut store = village();

        for op in ops {
            match op {
                Op::Place { actor, location } => {
                    let location = LocationId::new(LOCATIONS[location]);
                    store
                        .place_actor(ActorId::new(ACTORS[actor]), &location)
                        .expect("known location");
                }
                Op::Move { actor, from, to } => {
                    let _ = store.move_actor(
                        &ActorId::new(ACTORS[actor]),
                        &LocationId::new(LOCATIONS[from]),
                        &LocationId::new(LOCATIONS[to]),
                    );
                }
                Op::Remove { actor } => {
                    store.remove_actor(&ActorId::new(ACTORS[actor]));
                }
            }

            for name in ACTORS {
                let actor = ActorId::new(name);
                let holding: Vec<_> = store
                    .locations()
                    .filter(|l| l.occupants().contains(&actor))
                    .map(|l| l.id.clone())
                    .collect();
                match store.actor_location(&actor) {
                    Some(at) => prop_assert_eq!(holding, vec![at.clone()]),
                    None => prop_assert!(holding.is_empty()),
                }
            }
        }
    }

    #[test]
    fn property_log_never_exceeds_capacity(count in 0_usize..40) {
        let mut store = village();
        for i in 0..count {
            let action = format!("act{}", i);
            store.append_event(GameEvent::new(EventKind::PlayerAction, "player", action, "square"));
        }

        prop_assert_eq!(store.event_log().len(), count.min(8));
        prop_assert_eq!(store.event_log().total_appended(), count as u64);
        if count > 0 {
            let newest = &store.recent_events(1)[0].action;
            prop_assert_eq!(newest, &format!("act{}", count - 1));
        }
    }
}

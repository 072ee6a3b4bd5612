//! Property-based tests for rosters, sessions and the registry.
//!
//! Each property drives the state machines with arbitrary names and
//! connection ids and checks an invariant that must hold for every input.

use std::{cmp::Ordering, collections::HashSet, time::Duration};

use proptest::prelude::*;
use unveil_core::{
    JoinRequest, OwnerClaimPolicy, Roster, Session, SessionDefaults, SessionError,
    SessionRegistry, natural_cmp,
};

const OWNER: u64 = 1;

fn name() -> impl Strategy<Value = String> {
    "[A-Za-z]{0,3}[0-9]{0,3}[A-Za-z]{0,2}"
}

fn owned_session(players: &[String]) -> Session {
    let mut session = Session::new("R1", OWNER, 0, 10);
    for (i, name) in players.iter().enumerate() {
        session.join(name, i as u64 + 10, false);
    }
    session
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: natural order is antisymmetric and only equal for equal names
    #[test]
    fn prop_natural_cmp_is_total(a in name(), b in name()) {
        let forward = natural_cmp(&a, &b);
        prop_assert_eq!(forward, natural_cmp(&b, &a).reverse());
        prop_assert_eq!(forward == Ordering::Equal, a == b);
    }

    /// Property: natural order is transitive
    #[test]
    fn prop_natural_cmp_is_transitive(a in name(), b in name(), c in name()) {
        let mut names = [a, b, c];
        names.sort_by(|x, y| natural_cmp(x, y));
        prop_assert_ne!(natural_cmp(&names[0], &names[2]), Ordering::Greater);
    }

    /// Property: sorted() is stable under repeated calls and independent of
    /// insertion order
    #[test]
    fn prop_sorted_is_deterministic(names in prop::collection::vec(name(), 0..12)) {
        let mut forward = Roster::new();
        let mut backward = Roster::new();
        for (i, n) in names.iter().enumerate() {
            forward.add_or_update(n, i as u64, false);
        }
        for (i, n) in names.iter().enumerate().rev() {
            backward.add_or_update(n, i as u64, false);
        }

        let first: Vec<String> = forward.sorted().into_iter().map(|p| p.name).collect();
        let again: Vec<String> = forward.sorted().into_iter().map(|p| p.name).collect();
        let other: Vec<String> = backward.sorted().into_iter().map(|p| p.name).collect();

        prop_assert_eq!(&first, &again);
        prop_assert_eq!(&first, &other);
    }

    /// Property: rejoining with an existing name never grows the roster and
    /// moves the player to the new connection
    #[test]
    fn prop_rejoin_never_duplicates(
        names in prop::collection::vec(name(), 1..10),
        pick in any::<prop::sample::Index>(),
        new_conn in 1_000u64..,
    ) {
        let mut roster = Roster::new();
        for (i, n) in names.iter().enumerate() {
            roster.add_or_update(n, i as u64, false);
        }
        let unique: HashSet<&String> = names.iter().collect();
        prop_assert_eq!(roster.len(), unique.len());

        let target = pick.get(&names);
        roster.add_or_update(target, new_conn, false);

        prop_assert_eq!(roster.len(), unique.len());
        let player = roster.find_by_name(target).unwrap();
        prop_assert_eq!(player.connection_id, new_conn);
    }

    /// Property: submitting while idle never mutates any choice
    #[test]
    fn prop_idle_submission_is_ignored(
        names in prop::collection::vec(name(), 1..8),
        caller in 0u64..20,
        choice in ".{0,8}",
    ) {
        let mut session = owned_session(&names);

        let result = session.submit_choice(caller, choice);

        prop_assert_eq!(result, Err(SessionError::TimerIdle("R1".into())));
        prop_assert!(session.roster().iter().all(|p| p.choice.is_none()));
    }

    /// Property: after a full round, choices are the last in-round submission
    #[test]
    fn prop_reveal_keeps_last_submission(
        names in prop::collection::vec(name(), 1..6),
        submissions in prop::collection::vec((any::<prop::sample::Index>(), "[0-9]{1,2}"), 0..20),
    ) {
        let mut session = owned_session(&names);
        let countdown = session.start_timer(OWNER, Duration::ZERO).unwrap();

        let ids: Vec<u64> = session.roster().iter().map(|p| p.connection_id).collect();
        let mut expected = std::collections::HashMap::new();
        for (index, choice) in submissions {
            let id = *index.get(&ids);
            session.submit_choice(id, choice.clone()).unwrap();
            expected.insert(id, choice);
        }

        let revealed = session.expire(countdown.generation()).unwrap();

        prop_assert!(!session.is_timer_active());
        for player in revealed {
            prop_assert_eq!(player.choice.as_ref(), expected.get(&player.connection_id));
        }
    }

    /// Property: privileged commands from anyone but the owner change nothing
    #[test]
    fn prop_non_owner_commands_are_inert(
        names in prop::collection::vec(name(), 1..6),
        caller in 2u64..1_000,
        limit in 1u32..600,
        target in 0u64..20,
    ) {
        let mut session = owned_session(&names);
        let before = session.roster().sorted();

        prop_assert!(session.set_time_limit(caller, limit).is_err());
        prop_assert!(session.start_timer(caller, Duration::ZERO).is_err());
        prop_assert!(session.kick(caller, target).is_err());

        prop_assert_eq!(session.time_limit(), 10);
        prop_assert!(!session.is_timer_active());
        prop_assert_eq!(session.generation(), 0);
        prop_assert_eq!(session.roster().sorted(), before);
    }

    /// Property: a disconnect removes the connection from every room it was
    /// in and leaves other rooms untouched
    #[test]
    fn prop_disconnect_is_isolated(
        memberships in prop::collection::vec((0usize..4, 0u64..6), 1..24),
        leaving in 0u64..6,
    ) {
        let mut registry = SessionRegistry::new(SessionDefaults::default());
        for room in 0..4 {
            let room_id = format!("R{room}");
            let request = JoinRequest {
                room_id: &room_id,
                name: "host",
                connection_id: 100,
                claim_owner: true,
                owner_token: None,
            };
            registry.join(request, OwnerClaimPolicy::Open, || 0).unwrap();
        }
        for (room, conn) in &memberships {
            let (room_id, name) = (format!("R{room}"), format!("p{conn}"));
            let request = JoinRequest {
                room_id: &room_id,
                name: &name,
                connection_id: *conn,
                claim_owner: false,
                owner_token: None,
            };
            registry.join(request, OwnerClaimPolicy::Open, || 0).unwrap();
        }

        let sizes_before: Vec<usize> =
            registry.rooms().map(|r| registry.get(r).unwrap().roster().len()).collect();
        let affected = registry.remove_connection(leaving);

        for (i, room_id) in registry.rooms().enumerate() {
            let roster = registry.get(room_id).unwrap().roster();
            prop_assert!(roster.find_by_connection(leaving).is_none());
            let expected = if affected.contains(room_id) {
                sizes_before[i] - 1
            } else {
                sizes_before[i]
            };
            prop_assert_eq!(roster.len(), expected);
        }
    }
}

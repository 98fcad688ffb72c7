//! The same behavioural checks, run against every storage engine.

use std::sync::Barrier;
use std::thread;

use chrono::{Duration, SubsecRound, Utc};
use uuid::Uuid;

use hearth_db::{Database, MemoryStore, Store, StoreError};
use hearth_types::models::{FriendRequest, FriendRequestStatus, Message, UserRecord};

fn engines() -> Vec<(&'static str, Box<dyn Store>)> {
    vec![
        ("sqlite", Box::new(Database::open_in_memory().unwrap())),
        ("memory", Box::new(MemoryStore::new())),
    ]
}

fn add_user(store: &dyn Store, username: &str) -> UserRecord {
    let user = UserRecord {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{}@example.com", username.to_lowercase()),
        created_at: Utc::now().trunc_subsecs(6),
    };
    store.create_user(&user, "argon2-hash").unwrap();
    user
}

fn message(from: &UserRecord, to: &UserRecord, content: &str, offset_ms: i64) -> Message {
    Message {
        id: Uuid::new_v4(),
        from_user_id: from.id,
        to_user_id: to.id,
        content: content.to_string(),
        created_at: (Utc::now() + Duration::milliseconds(offset_ms)).trunc_subsecs(6),
    }
}

#[test]
fn users_round_trip_and_stay_unique() {
    for (engine, store) in engines() {
        let alice = add_user(store.as_ref(), "alice");

        assert_eq!(store.user_by_id(alice.id).unwrap(), Some(alice.clone()), "{engine}");
        assert_eq!(store.user_by_email("alice@example.com").unwrap(), Some(alice.clone()));
        assert_eq!(store.user_by_username("alice").unwrap(), Some(alice.clone()));
        assert_eq!(store.user_by_username("bob").unwrap(), None);

        let creds = store.credentials_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(creds.user, alice);
        assert_eq!(creds.password_hash, "argon2-hash");

        let clone = UserRecord {
            id: Uuid::new_v4(),
            email: "other@example.com".into(),
            ..alice.clone()
        };
        assert!(
            matches!(store.create_user(&clone, "x"), Err(StoreError::Conflict(_))),
            "{engine}: duplicate username accepted"
        );

        let clone = UserRecord {
            id: Uuid::new_v4(),
            username: "alice2".into(),
            ..alice
        };
        assert!(
            matches!(store.create_user(&clone, "x"), Err(StoreError::Conflict(_))),
            "{engine}: duplicate email accepted"
        );
    }
}

#[test]
fn search_is_case_insensitive_substring() {
    for (engine, store) in engines() {
        add_user(store.as_ref(), "Alice");
        add_user(store.as_ref(), "malice");
        add_user(store.as_ref(), "bob");
        add_user(store.as_ref(), "100%_real");

        let names: Vec<String> = store
            .search_users("ALI")
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["Alice", "malice"], "{engine}");

        let literal: Vec<String> = store
            .search_users("%_")
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(literal, vec!["100%_real"], "{engine}");

        add_user(store.as_ref(), "Élodie");
        for query in ["élo", "ÉLO", "odie"] {
            let names: Vec<String> = store
                .search_users(query)
                .unwrap()
                .into_iter()
                .map(|u| u.username)
                .collect();
            assert_eq!(names, vec!["Élodie"], "{engine}: {query}");
        }
    }
}

#[test]
fn one_request_per_unordered_pair() {
    for (engine, store) in engines() {
        let alice = add_user(store.as_ref(), "alice");
        let bob = add_user(store.as_ref(), "bob");

        let first = FriendRequest::pending(alice.id, bob.id, Utc::now().trunc_subsecs(6));
        store.open_friend_request(&first).unwrap();

        let reverse = FriendRequest::pending(bob.id, alice.id, Utc::now().trunc_subsecs(6));
        assert!(
            matches!(store.open_friend_request(&reverse), Err(StoreError::Conflict(_))),
            "{engine}: reverse duplicate accepted"
        );

        let again = FriendRequest::pending(alice.id, bob.id, Utc::now().trunc_subsecs(6));
        assert!(matches!(store.open_friend_request(&again), Err(StoreError::Conflict(_))));

        assert_eq!(store.friend_request_between(bob.id, alice.id).unwrap(), Some(first.clone()));
        assert_eq!(store.friend_request(first.id).unwrap(), Some(first.clone()));
        assert_eq!(store.incoming_pending(bob.id).unwrap(), vec![first.clone()]);
        assert!(store.incoming_pending(alice.id).unwrap().is_empty(), "{engine}");
        assert_eq!(store.friend_requests_for(alice.id).unwrap().len(), 1);
        assert_eq!(store.friend_requests_for(bob.id).unwrap().len(), 1);
    }
}

#[test]
fn concurrent_opposite_requests_leave_one_record() {
    for (engine, store) in engines() {
        for _ in 0..25 {
            let alice = add_user(store.as_ref(), &format!("a{}", Uuid::new_v4().simple()));
            let bob = add_user(store.as_ref(), &format!("b{}", Uuid::new_v4().simple()));
            let forward = FriendRequest::pending(alice.id, bob.id, Utc::now().trunc_subsecs(6));
            let backward = FriendRequest::pending(bob.id, alice.id, Utc::now().trunc_subsecs(6));

            let store = store.as_ref();
            let barrier = Barrier::new(2);
            let results = thread::scope(|s| {
                let handles = [&forward, &backward].map(|request| {
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        store.open_friend_request(request)
                    })
                });
                handles.map(|h| h.join().unwrap())
            });

            let opened: Vec<_> = results.iter().filter(|r| r.is_ok()).collect();
            assert_eq!(opened.len(), 1, "{engine}: {results:?}");
            assert!(
                results.iter().any(|r| matches!(r, Err(StoreError::Conflict(_)))),
                "{engine}: loser did not see a conflict"
            );
            assert_eq!(store.friend_requests_for(alice.id).unwrap().len(), 1, "{engine}");
        }
    }
}

#[test]
fn requests_for_a_user_come_back_oldest_first() {
    for (engine, store) in engines() {
        let alice = add_user(store.as_ref(), "alice");
        let bob = add_user(store.as_ref(), "bob");
        let carol = add_user(store.as_ref(), "carol");

        let base = Utc::now().trunc_subsecs(6);
        let newer = FriendRequest::pending(alice.id, bob.id, base + Duration::seconds(5));
        let older = FriendRequest::pending(carol.id, alice.id, base);
        store.open_friend_request(&newer).unwrap();
        store.open_friend_request(&older).unwrap();

        let ids: Vec<Uuid> = store
            .friend_requests_for(alice.id)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![older.id, newer.id], "{engine}");
    }
}

#[test]
fn resolve_only_moves_pending_requests() {
    for (engine, store) in engines() {
        let alice = add_user(store.as_ref(), "alice");
        let bob = add_user(store.as_ref(), "bob");

        let request = FriendRequest::pending(alice.id, bob.id, Utc::now().trunc_subsecs(6));
        store.open_friend_request(&request).unwrap();

        let at = Utc::now().trunc_subsecs(6);
        let accepted = store
            .resolve_friend_request(request.id, FriendRequestStatus::Accepted, at)
            .unwrap()
            .unwrap();
        assert_eq!(accepted.status, FriendRequestStatus::Accepted, "{engine}");
        assert_eq!(accepted.responded_at, Some(at));

        let second = store
            .resolve_friend_request(request.id, FriendRequestStatus::Rejected, Utc::now())
            .unwrap();
        assert_eq!(second, None, "{engine}: terminal request moved");
        assert_eq!(
            store.friend_request(request.id).unwrap().unwrap().status,
            FriendRequestStatus::Accepted
        );

        assert_eq!(
            store
                .resolve_friend_request(Uuid::new_v4(), FriendRequestStatus::Accepted, Utc::now())
                .unwrap(),
            None
        );
    }
}

#[test]
fn rejected_pair_can_be_reopened_but_accepted_cannot() {
    for (engine, store) in engines() {
        let alice = add_user(store.as_ref(), "alice");
        let bob = add_user(store.as_ref(), "bob");

        let request = FriendRequest::pending(alice.id, bob.id, Utc::now().trunc_subsecs(6));
        store.open_friend_request(&request).unwrap();
        store
            .resolve_friend_request(request.id, FriendRequestStatus::Rejected, Utc::now())
            .unwrap();

        let retry = FriendRequest::pending(bob.id, alice.id, Utc::now().trunc_subsecs(6));
        store.open_friend_request(&retry).unwrap();

        assert_eq!(store.friend_request(request.id).unwrap(), None, "{engine}");
        assert_eq!(store.friend_request_between(alice.id, bob.id).unwrap(), Some(retry.clone()));
        assert_eq!(store.incoming_pending(alice.id).unwrap(), vec![retry.clone()]);

        store
            .resolve_friend_request(retry.id, FriendRequestStatus::Accepted, Utc::now())
            .unwrap();
        let third = FriendRequest::pending(alice.id, bob.id, Utc::now().trunc_subsecs(6));
        assert!(matches!(store.open_friend_request(&third), Err(StoreError::Conflict(_))));
    }
}

#[test]
fn conversations_are_ordered_and_symmetric() {
    for (engine, store) in engines() {
        let alice = add_user(store.as_ref(), "alice");
        let bob = add_user(store.as_ref(), "bob");
        let carol = add_user(store.as_ref(), "carol");

        let late = message(&alice, &bob, "second", 50);
        let early = message(&bob, &alice, "first", 0);
        let elsewhere = message(&alice, &carol, "not for bob", 10);
        store.insert_message(&late).unwrap();
        store.insert_message(&early).unwrap();
        store.insert_message(&elsewhere).unwrap();

        let forward = store.messages_between(alice.id, bob.id).unwrap();
        let backward = store.messages_between(bob.id, alice.id).unwrap();
        assert_eq!(forward, vec![early.clone(), late.clone()], "{engine}");
        assert_eq!(forward, backward);
    }
}

#[test]
fn equal_timestamps_keep_insertion_order() {
    for (engine, store) in engines() {
        let alice = add_user(store.as_ref(), "alice");
        let bob = add_user(store.as_ref(), "bob");

        let at = Utc::now().trunc_subsecs(6);
        let contents = ["one", "two", "three"];
        for content in contents {
            store
                .insert_message(&Message {
                    id: Uuid::new_v4(),
                    from_user_id: alice.id,
                    to_user_id: bob.id,
                    content: content.to_string(),
                    created_at: at,
                })
                .unwrap();
        }

        let seen: Vec<String> = store
            .messages_between(bob.id, alice.id)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(seen, contents, "{engine}");
    }
}

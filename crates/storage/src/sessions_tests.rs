// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{run_migrations, Store};

fn repo() -> SessionRepo {
    let store = Store::open_in_memory().unwrap();
    run_migrations(&store).unwrap();
    SessionRepo::new(store)
}

fn session(id: &str, start: u64, end: Option<u64>) -> SessionState {
    let mut s = SessionState::new(id, "signal", start);
    s.end_time = end;
    s.hot_topics = vec!["augur".into(), "gateway".into()];
    s.pending_tasks = vec!["fix probe".into()];
    s
}

#[test]
fn save_and_get_round_trip() {
    let repo = repo();
    repo.save(&session("s-1", 1_000, Some(5_000))).unwrap();
    let loaded = repo.get("s-1").unwrap().unwrap();
    assert_eq!(loaded.channel, "signal");
    assert_eq!(loaded.hot_topics, vec!["augur", "gateway"]);
}

#[test]
fn save_twice_updates_in_place() {
    let repo = repo();
    repo.save(&session("s-1", 1_000, None)).unwrap();
    repo.save(&session("s-1", 1_000, Some(9_000))).unwrap();
    let loaded = repo.get("s-1").unwrap().unwrap();
    assert_eq!(loaded.end_time, Some(9_000));
}

#[test]
fn ended_since_skips_open_and_old_sessions() {
    let repo = repo();
    repo.save(&session("s-open", 1_000, None)).unwrap();
    repo.save(&session("s-old", 1_000, Some(2_000))).unwrap();
    repo.save(&session("s-new", 5_000, Some(9_000))).unwrap();

    let found = repo.ended_since(3_000).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].session_id, "s-new");
}

#[test]
fn purge_drops_only_old_ended_sessions() {
    let repo = repo();
    repo.save(&session("s-open", 1_000, None)).unwrap();
    repo.save(&session("s-old", 1_000, Some(2_000))).unwrap();
    repo.save(&session("s-new", 5_000, Some(9_000))).unwrap();

    assert_eq!(repo.purge_before(3_000).unwrap(), 1);
    assert!(repo.get("s-old").unwrap().is_none());
    assert!(repo.get("s-open").unwrap().is_some());
    assert!(repo.get("s-new").unwrap().is_some());
}

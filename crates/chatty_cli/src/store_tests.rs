use camino_tempfile::tempdir;
use chatty_client::Message;
use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_create_append_and_load() {
    let store = Store::open_in_memory().unwrap();

    let id = store.create_session("  what is rust?\nsecond line").unwrap();
    store
        .append(id, &[Message::user("what is rust?"), Message::assistant("a language")])
        .unwrap();
    store
        .append(id, &[Message::user("why?"), Message::assistant("speed")])
        .unwrap();

    let saved = store.load(id).unwrap();
    assert_eq!(saved.summary.id, id);
    assert_eq!(saved.summary.name, "what is rust?");
    assert_eq!(saved.summary.message_count, 4);
    assert_eq!(saved.messages, vec![
        Message::user("what is rust?"),
        Message::assistant("a language"),
        Message::user("why?"),
        Message::assistant("speed"),
    ]);
}

#[test]
fn test_title_is_truncated() {
    let store = Store::open_in_memory().unwrap();
    let id = store.create_session(&"ä".repeat(200)).unwrap();

    let name = store.load(id).unwrap().summary.name;
    assert_eq!(name.chars().count(), MAX_TITLE_LENGTH);
}

#[test]
fn test_list_counts_messages() {
    let store = Store::open_in_memory().unwrap();
    assert!(store.list().unwrap().is_empty());

    let first = store.create_session("first").unwrap();
    let second = store.create_session("second").unwrap();
    store
        .append(first, &[Message::user("a"), Message::assistant("b")])
        .unwrap();

    let sessions = store.list().unwrap();
    let counts: Vec<_> = sessions
        .iter()
        .map(|session| (session.id, session.name.as_str(), session.message_count))
        .collect();

    assert_eq!(sessions.len(), 2);
    assert!(counts.contains(&(first, "first", 2)), "{counts:?}");
    assert!(counts.contains(&(second, "second", 0)), "{counts:?}");
}

#[test]
fn test_load_missing_session() {
    let store = Store::open_in_memory().unwrap();
    let error = store.load(42).unwrap_err();

    assert!(matches!(error, Error::SessionNotFound(42)), "{error:?}");
}

#[test]
fn test_sessions_survive_reopening() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("chatty.db");

    let id = {
        let store = Store::open(path.as_std_path()).unwrap();
        let id = store.create_session("kept").unwrap();
        store
            .append(id, &[Message::user("kept"), Message::assistant("yes")])
            .unwrap();
        id
    };

    let store = Store::open(path.as_std_path()).unwrap();
    assert_eq!(store.load(id).unwrap().messages.len(), 2);
}

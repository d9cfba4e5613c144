use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use corkboard_core::model::{
    Board, Card, CardContent, Chat, ChatMessage, RichTextContent, Role, UserSettings,
};
use corkboard_core::{Observer, SqliteStore, Store};

fn collect<T: Send + 'static>() -> (Observer<T>, Arc<Mutex<Vec<T>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let observer: Observer<T> = Arc::new(move |value| {
        sink.lock().unwrap().push(value);
    });
    (observer, seen)
}

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().expect("timestamp should parse")
}

fn board(title: &str, created: &str) -> Board {
    Board {
        id: Uuid::new_v4(),
        title: title.to_string(),
        view_type: "grid".to_string(),
        layout_config: serde_json::json!({}),
        created_at: ts(created),
        updated_at: ts(created),
    }
}

fn card(board_id: Uuid, title: &str, created: &str) -> Card {
    Card {
        id: Uuid::new_v4(),
        board_id,
        title: title.to_string(),
        content: CardContent::RichText(RichTextContent {
            markdown: format!("# {}", title),
        }),
        created_at: ts(created),
        updated_at: ts(created),
    }
}

fn chat(board_id: Uuid, title: &str, created: &str) -> Chat {
    Chat {
        id: Uuid::new_v4(),
        board_id,
        title: title.to_string(),
        messages: vec![ChatMessage {
            role: Role::User,
            content: "hello".to_string(),
            llm: None,
            created_at: ts(created),
        }],
        created_at: ts(created),
        updated_at: ts(created),
    }
}

#[tokio::test]
async fn test_watch_boards_delivers_current_state_immediately() {
    let store = SqliteStore::open_in_memory().expect("open should succeed");
    let existing = board("already there", "2024-03-01T10:00:00Z");
    store
        .set_board(existing.clone())
        .await
        .expect("set should succeed");

    let (observer, seen) = collect::<Vec<Board>>();
    let _sub = store
        .watch_boards(observer)
        .await
        .expect("watch should succeed");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], vec![existing]);
}

#[tokio::test]
async fn test_live_subscription_observes_writes_and_updates() {
    let store = SqliteStore::open_in_memory().expect("open should succeed");
    let (observer, seen) = collect::<Vec<Board>>();
    let _sub = store
        .watch_boards(observer)
        .await
        .expect("watch should succeed");

    let mut b = board("first title", "2024-03-01T10:00:00Z");
    store.set_board(b.clone()).await.expect("set should succeed");

    b.title = "renamed".to_string();
    b.updated_at = ts("2024-03-01T11:00:00Z");
    store.set_board(b.clone()).await.expect("set should succeed");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen[0].is_empty());
    assert_eq!(seen[1][0].title, "first title");
    assert_eq!(seen[2][0].title, "renamed");
}

#[tokio::test]
async fn test_watch_single_board_none_until_created() {
    let store = SqliteStore::open_in_memory().expect("open should succeed");
    let b = board("late arrival", "2024-03-01T10:00:00Z");

    let (observer, seen) = collect::<Option<Board>>();
    let _sub = store
        .watch_board(b.id, observer)
        .await
        .expect("watch should succeed");

    store.set_board(b.clone()).await.expect("set should succeed");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].is_none());
    assert_eq!(seen[1].as_ref(), Some(&b));
}

#[tokio::test]
async fn test_board_lists_sorted_by_creation_time() {
    let store = SqliteStore::open_in_memory().expect("open should succeed");
    let newer = board("newer", "2024-03-02T10:00:00Z");
    let older = board("older", "2024-03-01T10:00:00Z");
    store.set_board(newer).await.expect("set should succeed");
    store.set_board(older).await.expect("set should succeed");

    let (observer, seen) = collect::<Vec<Board>>();
    let _sub = store
        .watch_boards(observer)
        .await
        .expect("watch should succeed");

    let seen = seen.lock().unwrap();
    let titles: Vec<&str> = seen[0].iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["older", "newer"]);
}

#[tokio::test]
async fn test_remove_board_cascades_to_cards_and_chats() {
    let store = SqliteStore::open_in_memory().expect("open should succeed");
    let doomed = board("doomed", "2024-03-01T10:00:00Z");
    let survivor = board("survivor", "2024-03-01T10:00:00Z");
    let doomed_card = card(doomed.id, "doomed card", "2024-03-01T10:05:00Z");
    let doomed_chat = chat(doomed.id, "doomed chat", "2024-03-01T10:05:00Z");
    let survivor_card = card(survivor.id, "survivor card", "2024-03-01T10:05:00Z");

    store.set_board(doomed.clone()).await.expect("set should succeed");
    store.set_board(survivor.clone()).await.expect("set should succeed");
    store.set_card(doomed_card.clone()).await.expect("set should succeed");
    store.set_chat(doomed_chat.clone()).await.expect("set should succeed");
    store.set_card(survivor_card.clone()).await.expect("set should succeed");

    let (boards_obs, boards_seen) = collect::<Vec<Board>>();
    let (cards_obs, cards_seen) = collect::<Vec<Card>>();
    let (chats_obs, chats_seen) = collect::<Vec<Chat>>();
    let (card_obs, card_seen) = collect::<Option<Card>>();
    let _b = store.watch_boards(boards_obs).await.expect("watch should succeed");
    let _c = store
        .watch_cards_by_board(doomed.id, cards_obs)
        .await
        .expect("watch should succeed");
    let _h = store
        .watch_chats_by_board(doomed.id, chats_obs)
        .await
        .expect("watch should succeed");
    let _s = store
        .watch_card(doomed_card.id, card_obs)
        .await
        .expect("watch should succeed");

    store.remove_board(doomed.id).await.expect("remove should succeed");

    let boards = boards_seen.lock().unwrap();
    assert_eq!(boards.last().unwrap(), &vec![survivor]);
    let cards = cards_seen.lock().unwrap();
    assert!(cards.last().unwrap().is_empty());
    let chats = chats_seen.lock().unwrap();
    assert!(chats.last().unwrap().is_empty());
    let single = card_seen.lock().unwrap();
    assert!(single.last().unwrap().is_none());

    // Other boards' content is untouched.
    let (other_obs, other_seen) = collect::<Vec<Card>>();
    let _o = store
        .watch_cards_by_board(survivor_card.board_id, other_obs)
        .await
        .expect("watch should succeed");
    assert_eq!(other_seen.lock().unwrap()[0], vec![survivor_card]);
}

#[tokio::test]
async fn test_remove_card_never_cascades() {
    let store = SqliteStore::open_in_memory().expect("open should succeed");
    let b = board("home", "2024-03-01T10:00:00Z");
    let c1 = card(b.id, "one", "2024-03-01T10:01:00Z");
    let c2 = card(b.id, "two", "2024-03-01T10:02:00Z");
    store.set_board(b.clone()).await.expect("set should succeed");
    store.set_card(c1.clone()).await.expect("set should succeed");
    store.set_card(c2.clone()).await.expect("set should succeed");

    store.remove_card(c1.id).await.expect("remove should succeed");

    let (cards_obs, cards_seen) = collect::<Vec<Card>>();
    let _c = store
        .watch_cards_by_board(b.id, cards_obs)
        .await
        .expect("watch should succeed");
    let (board_obs, board_seen) = collect::<Option<Board>>();
    let _b = store
        .watch_board(b.id, board_obs)
        .await
        .expect("watch should succeed");

    assert_eq!(cards_seen.lock().unwrap()[0], vec![c2]);
    assert!(board_seen.lock().unwrap()[0].is_some());
}

#[tokio::test]
async fn test_remove_missing_records_is_a_no_op() {
    let store = SqliteStore::open_in_memory().expect("open should succeed");
    store
        .remove_board(Uuid::new_v4())
        .await
        .expect("removing a missing board should succeed");
    store
        .remove_card(Uuid::new_v4())
        .await
        .expect("removing a missing card should succeed");
    store
        .remove_chat(Uuid::new_v4())
        .await
        .expect("removing a missing chat should succeed");
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let store = SqliteStore::open_in_memory().expect("open should succeed");
    let (observer, seen) = collect::<Vec<Board>>();
    let sub = store
        .watch_boards(observer)
        .await
        .expect("watch should succeed");

    sub.unsubscribe();
    sub.unsubscribe();

    store
        .set_board(board("unseen", "2024-03-01T10:00:00Z"))
        .await
        .expect("set should succeed");

    // Only the initial snapshot was delivered.
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_settings_round_trip() {
    let store = SqliteStore::open_in_memory().expect("open should succeed");
    let (observer, seen) = collect::<Option<UserSettings>>();
    let _sub = store
        .watch_user_settings(observer)
        .await
        .expect("watch should succeed");

    let mut settings = UserSettings::default();
    settings
        .llm
        .insert("model".to_string(), "local".to_string());
    store
        .set_user_settings(settings.clone())
        .await
        .expect("set should succeed");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].is_none());
    assert_eq!(seen[1].as_ref(), Some(&settings));
}

#[tokio::test]
async fn test_reopen_preserves_records() {
    let dir = tempfile::tempdir().expect("tempdir should succeed");
    let path = dir.path().join("corkboard.db");
    let b = board("persistent", "2024-03-01T10:00:00Z");

    {
        let store = SqliteStore::open(&path).expect("open should succeed");
        store.set_board(b.clone()).await.expect("set should succeed");
    }

    let store = SqliteStore::open(&path).expect("reopen should succeed");
    let (observer, seen) = collect::<Vec<Board>>();
    let _sub = store
        .watch_boards(observer)
        .await
        .expect("watch should succeed");

    assert_eq!(seen.lock().unwrap()[0], vec![b]);
}

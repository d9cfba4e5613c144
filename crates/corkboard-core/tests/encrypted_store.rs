use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use corkboard_core::model::{Board, Card, CardContent, Chat, ChatMessage, RichTextContent, Role,
    UserSettings};
use corkboard_core::store::DocumentDb;
use corkboard_core::{
    CipherRemoteStore, EncryptedStore, MemoryDocumentDb, Observer, Session, Store, StoreError,
};

const PASSWORD: &str = "correct horse battery";

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
        view_type: "canvas".to_string(),
        layout_config: serde_json::json!({"zoom": 1.0}),
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
            role: Role::Assistant,
            content: "hi".to_string(),
            llm: Some("gpt-x".to_string()),
            created_at: ts(created),
        }],
        created_at: ts(created),
        updated_at: ts(created),
    }
}

async fn setup() -> (Arc<MemoryDocumentDb>, EncryptedStore) {
    let db = Arc::new(MemoryDocumentDb::new());
    let remote = CipherRemoteStore::new(db.clone(), &Session::authenticated("u1"))
        .expect("authenticated session should build a store");
    let key = remote
        .initialize(PASSWORD)
        .await
        .expect("initialize should succeed");
    (db, EncryptedStore::new(remote, key))
}

#[tokio::test]
async fn test_reopen_with_validated_password_reads_existing_data() {
    let (db, store) = setup().await;
    let b = board("private board", "2024-03-01T10:00:00Z");
    store.set_board(b.clone()).await.expect("set should succeed");
    drop(store);

    // A fresh session over the same database, as after an app restart.
    let remote = CipherRemoteStore::new(db, &Session::authenticated("u1"))
        .expect("authenticated session should build a store");
    let key = remote
        .validate_password(PASSWORD)
        .await
        .expect("validate should succeed")
        .expect("correct password should yield a key");
    let store = EncryptedStore::new(remote, key);

    let (observer, seen) = collect::<Vec<Board>>();
    let _sub = store
        .watch_boards(observer)
        .await
        .expect("watch should succeed");

    assert_eq!(seen.lock().unwrap()[0], vec![b]);
}

#[tokio::test]
async fn test_card_lifecycle_through_live_subscription() {
    let (_db, store) = setup().await;
    let b = board("work", "2024-03-01T10:00:00Z");
    store.set_board(b.clone()).await.expect("set should succeed");

    let (observer, seen) = collect::<Vec<Card>>();
    let _sub = store
        .watch_cards_by_board(b.id, observer)
        .await
        .expect("watch should succeed");

    let mut c = card(b.id, "draft", "2024-03-01T10:05:00Z");
    store.set_card(c.clone()).await.expect("set should succeed");

    c.title = "final".to_string();
    c.updated_at = ts("2024-03-01T10:10:00Z");
    store.set_card(c.clone()).await.expect("set should succeed");

    store.remove_card(c.id).await.expect("remove should succeed");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 4);
    assert!(seen[0].is_empty());
    assert_eq!(seen[1][0].title, "draft");
    assert_eq!(seen[2][0].title, "final");
    assert!(seen[3].is_empty());
}

#[tokio::test]
async fn test_no_plaintext_reaches_the_database() {
    let (db, store) = setup().await;
    let b = board("work", "2024-03-01T10:00:00Z");
    let c = card(b.id, "launch plan", "2024-03-01T10:05:00Z");
    store.set_board(b.clone()).await.expect("set should succeed");
    store.set_card(c.clone()).await.expect("set should succeed");

    let doc = db
        .get_doc(&format!("users/u1/cards/{}", c.id))
        .await
        .expect("get should succeed")
        .expect("card doc should exist");

    let wire = doc.to_string();
    assert!(!wire.contains("launch plan"));
    assert!(!wire.contains("richtext"));
    // The queryable envelope stays plaintext.
    assert_eq!(doc["boardId"], b.id.to_string());
    assert!(doc["data"]["ciphertext"].is_string());
    assert!(doc["data"]["iv"].is_string());
}

#[tokio::test]
async fn test_corrupted_record_is_isolated() {
    let (db, store) = setup().await;
    let b = board("work", "2024-03-01T10:00:00Z");
    store.set_board(b.clone()).await.expect("set should succeed");

    let c1 = card(b.id, "one", "2024-03-01T10:01:00Z");
    let c2 = card(b.id, "two", "2024-03-01T10:02:00Z");
    let c3 = card(b.id, "three", "2024-03-01T10:03:00Z");
    for c in [&c1, &c2, &c3] {
        store.set_card(c.clone()).await.expect("set should succeed");
    }

    // Corrupt the second card's ciphertext in place.
    let path = format!("users/u1/cards/{}", c2.id);
    let mut doc = db
        .get_doc(&path)
        .await
        .expect("get should succeed")
        .expect("card doc should exist");
    doc["data"]["ciphertext"] = serde_json::json!("AAAAAAAAAAAAAAAAAAAAAAAAAAAA");
    db.set_doc(&path, doc).await.expect("set should succeed");

    let (list_obs, list_seen) = collect::<Vec<Card>>();
    let _l = store
        .watch_cards_by_board(b.id, list_obs)
        .await
        .expect("watch should succeed");
    let (one_obs, one_seen) = collect::<Option<Card>>();
    let _o = store
        .watch_card(c2.id, one_obs)
        .await
        .expect("watch should succeed");

    let list = list_seen.lock().unwrap();
    let titles: Vec<&str> = list[0].iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["one", "three"]);
    assert!(one_seen.lock().unwrap()[0].is_none());
}

#[tokio::test]
async fn test_remove_board_cascades_through_decorator() {
    let (db, store) = setup().await;
    let doomed = board("doomed", "2024-03-01T10:00:00Z");
    let survivor = board("survivor", "2024-03-01T10:00:00Z");
    let doomed_card = card(doomed.id, "card", "2024-03-01T10:01:00Z");
    let doomed_chat = chat(doomed.id, "chat", "2024-03-01T10:01:00Z");
    let survivor_card = card(survivor.id, "kept", "2024-03-01T10:01:00Z");

    store.set_board(doomed.clone()).await.expect("set should succeed");
    store.set_board(survivor.clone()).await.expect("set should succeed");
    store.set_card(doomed_card.clone()).await.expect("set should succeed");
    store.set_chat(doomed_chat.clone()).await.expect("set should succeed");
    store.set_card(survivor_card.clone()).await.expect("set should succeed");

    store
        .remove_board(doomed.id)
        .await
        .expect("remove should succeed");

    assert!(db
        .get_doc(&format!("users/u1/boards/{}", doomed.id))
        .await
        .expect("get should succeed")
        .is_none());
    assert!(db
        .get_doc(&format!("users/u1/cards/{}", doomed_card.id))
        .await
        .expect("get should succeed")
        .is_none());
    assert!(db
        .get_doc(&format!("users/u1/chats/{}", doomed_chat.id))
        .await
        .expect("get should succeed")
        .is_none());
    assert!(db
        .get_doc(&format!("users/u1/cards/{}", survivor_card.id))
        .await
        .expect("get should succeed")
        .is_some());
}

#[tokio::test]
async fn test_chats_round_trip_encrypted() {
    let (_db, store) = setup().await;
    let b = board("work", "2024-03-01T10:00:00Z");
    let h = chat(b.id, "brainstorm", "2024-03-01T10:05:00Z");
    store.set_board(b.clone()).await.expect("set should succeed");
    store.set_chat(h.clone()).await.expect("set should succeed");

    let (observer, seen) = collect::<Option<Chat>>();
    let _sub = store
        .watch_chat(h.id, observer)
        .await
        .expect("watch should succeed");

    assert_eq!(seen.lock().unwrap()[0].as_ref(), Some(&h));
}

#[tokio::test]
async fn test_settings_round_trip_encrypted() {
    let (db, store) = setup().await;
    let mut settings = UserSettings::default();
    settings
        .llm
        .insert("openai".to_string(), "sk-secret".to_string());
    store
        .set_user_settings(settings.clone())
        .await
        .expect("set should succeed");

    let (observer, seen) = collect::<Option<UserSettings>>();
    let _sub = store
        .watch_user_settings(observer)
        .await
        .expect("watch should succeed");
    assert_eq!(seen.lock().unwrap()[0].as_ref(), Some(&settings));

    // The stored settings document is an opaque blob.
    let doc = db
        .get_doc("users/u1/settings/user")
        .await
        .expect("get should succeed")
        .expect("settings doc should exist");
    assert!(!doc.to_string().contains("sk-secret"));
}

#[tokio::test]
async fn test_wrong_password_key_cannot_read_records() {
    let (db, store) = setup().await;
    let b = board("private", "2024-03-01T10:00:00Z");
    store.set_board(b.clone()).await.expect("set should succeed");

    let remote = CipherRemoteStore::new(db, &Session::authenticated("u1"))
        .expect("authenticated session should build a store");
    let validated = remote
        .validate_password("not the password")
        .await
        .expect("validate should succeed");
    assert!(validated.is_none());
}

#[tokio::test]
async fn test_users_do_not_share_records() {
    let (db, store) = setup().await;
    let b = board("mine", "2024-03-01T10:00:00Z");
    store.set_board(b).await.expect("set should succeed");

    // The other user has their own encryption setup and an empty namespace.
    let other = CipherRemoteStore::new(db, &Session::authenticated("u2"))
        .expect("authenticated session should build a store");
    let result = other.validate_password(PASSWORD).await;
    assert!(matches!(result, Err(StoreError::NotInitialized)));

    let key = other
        .initialize(PASSWORD)
        .await
        .expect("initialize should succeed");
    let other_store = EncryptedStore::new(other, key);
    let (observer, seen) = collect::<Vec<Board>>();
    let _sub = other_store
        .watch_boards(observer)
        .await
        .expect("watch should succeed");
    assert!(seen.lock().unwrap()[0].is_empty());
}

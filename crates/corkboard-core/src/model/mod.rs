//! Core data types for the board organizer.
//!
//! These are plain data shapes with no behavior. Ids and timestamps are
//! minted by the caller; every mutation is a full-record replacement, so
//! the store never rewrites individual fields.
//!
//! Wire names are camelCase (`boardId`, `createdAt`, ...) to match the
//! record format shared with the remote document database.

mod encrypted;

pub use encrypted::{EncryptedBlob, EncryptedRecord, EncryptionConfig};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A board owning cards and chats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Caller-minted globally unique id, immutable once created
    pub id: Uuid,

    /// User-facing title
    pub title: String,

    /// View the board opens in (e.g. "grid", "canvas")
    pub view_type: String,

    /// Opaque per-view layout configuration owned by the UI
    pub layout_config: serde_json::Value,

    /// When this board was created
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// A card pinned to a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Caller-minted globally unique id
    pub id: Uuid,

    /// Board this card belongs to (referential integrity enforced by the caller)
    pub board_id: Uuid,

    /// User-facing title
    pub title: String,

    /// Type-specific payload (tagged union)
    #[serde(flatten)]
    pub content: CardContent,

    /// When this card was created
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// The tagged card payload union.
///
/// Serialized as `{"type": "richtext", "content": {...}}` so the variant tag
/// travels with the record. Deserialization is the structural validity check:
/// a payload that matches none of the variants is rejected at this boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum CardContent {
    /// Markdown-formatted note
    RichText(RichTextContent),
    /// Embedded image
    Image(ImageContent),
    /// Attached file
    File(FileContent),
}

/// Payload of a richtext card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextContent {
    /// Markdown source
    pub markdown: String,
}

/// Payload of an image card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    /// Image location
    pub url: String,

    /// Optional alt text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// Payload of a file card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    /// File location
    pub url: String,

    /// Original file name
    pub name: String,

    /// Optional MIME type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// An AI chat attached to a board.
///
/// Messages are append-only in practice but stored as a full array snapshot
/// on every write; there are no partial or delta writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    /// Caller-minted globally unique id
    pub id: Uuid,

    /// Board this chat belongs to
    pub board_id: Uuid,

    /// User-facing title
    pub title: String,

    /// Ordered message history
    pub messages: Vec<ChatMessage>,

    /// When this chat was created
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// A single message inside a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Who authored the message
    pub role: Role,

    /// Message text
    pub content: String,

    /// Model that produced an assistant message, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<String>,

    /// When this message was created
    pub created_at: DateTime<Utc>,
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Per-user settings singleton.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Provider key name -> secret (e.g. "openai" -> API key)
    #[serde(default)]
    pub llm: BTreeMap<String, String>,
}

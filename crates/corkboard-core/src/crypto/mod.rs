//! Cryptographic operations for record encryption.
//!
//! This module provides key derivation and record encryption using
//! well-audited libraries:
//! - **Argon2id**: memory-hard key derivation from the user's password
//! - **AES-256-GCM**: authenticated encryption with a fresh 96-bit IV per call
//!
//! ## Security Model
//!
//! - One master key per account, derived from the password and a random
//!   per-user salt persisted at initialization
//! - Password validation happens only through a known-plaintext probe; there
//!   is no separate "check password" primitive
//! - Key material is zeroized from memory on drop
//! - No plaintext passwords are ever stored
//!
//! ## Threat Model
//!
//! We defend against a remote database operator (or anyone with a copy of the
//! stored records) reading note contents, and against offline brute-force of
//! the password. We do NOT defend against a compromised device or access to
//! an unlocked session.

pub mod blob;
pub mod key;
pub mod password;

pub use blob::{decrypt, encrypt};
pub use key::{derive_master_key, generate_salt, MasterKey};
pub use password::validate_password_strength;

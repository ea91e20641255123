//! `leadsync-client`: blocking REST client for the lead platform API.
//!
//! Implements the engine's `LeadApi` seam over HTTP: OAuth token grant,
//! chunked lead sync, key lookup, targeted update. Blocking reqwest, no
//! async runtime required.

pub mod auth;
pub mod client;

pub use auth::{auth_file_path, delete_auth, load_auth, save_auth, Credentials};
pub use client::{ClientError, RestClient, DEFAULT_CHUNK_SIZE};

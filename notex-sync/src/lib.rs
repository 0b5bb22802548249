//! # NoteX Sync Library
//!
//! Offline support for NoteX clients: a local store, an API client that
//! answers from that store while the server is unreachable, and replay of
//! queued note changes once it is back.
//!
//! ## Modules
//!
//! - `client`: Offline-aware request interceptor
//! - `config`: Environment configuration
//! - `error`: Error types
//! - `monitor`: Connectivity polling and reconnect replay
//! - `store`: Local JSON store and note merging
//! - `sync`: Replay of queued mutations
//! - `transport`: HTTP and mock transports
//!
//! ## Example
//!
//! ```no_run
//! use notex_sync::{client::OfflineClient, store::OfflineStore, transport::HttpTransport};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), notex_sync::error::SyncError> {
//! let transport = Arc::new(HttpTransport::new("http://localhost:8080", None)?);
//! let store = Arc::new(OfflineStore::open("notex-store.json").await?);
//! let client = OfflineClient::new(transport, store);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod monitor;
pub mod store;
pub mod sync;
pub mod transport;

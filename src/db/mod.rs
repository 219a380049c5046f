//! Relational store adapters over libsql.
//!
//! One thin adapter per entity (users, projects, assets, chunks, query
//! logs). Adapters never leak libsql error types; every failure is mapped
//! to a taxonomy kind at the call site.

pub mod assets;
pub mod chunks;
mod client;
pub mod projects;
pub mod query_logs;
pub mod users;

pub use assets::{Asset, AssetStore, ASSET_TYPE_FILE};
pub use chunks::{Chunk, ChunkStore, NewChunk};
pub use client::DbClient;
pub use projects::{Project, ProjectStore};
pub use query_logs::{QueryLog, QueryLogStore};
pub use users::{User, UserStore};

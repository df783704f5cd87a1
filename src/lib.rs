//! Semantic memory for AI agents, served over MCP.
//!
//! Cairn stores short text memories as embedded points in a Qdrant vector
//! database and retrieves them by meaning. Records live in one of two
//! collections:
//!
//! | Collection | Holds | Searched by |
//! |------------|-------|-------------|
//! | **Global** | records with `scope = "global"` | every search |
//! | **Workspace** | all other records, keyed by a `scope` payload field | scoped searches for that scope |
//!
//! # Architecture
//!
//! - **Storage**: Qdrant, cosine distance, 768-dim vectors, keyword indexes on
//!   `scope`, `agent` and `type`
//! - **Embeddings**: Local ONNX Runtime with bge-base-en-v1.5
//! - **Search**: global leg (threshold 0.5) plus optional workspace leg (0.5),
//!   merged by score; global-only recall uses threshold 0.4
//! - **Transport**: MCP over stdio (primary) or Streamable HTTP
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`embedding`]: Text-to-vector embedding pipeline via ONNX Runtime
//! - [`error`]: The [`MemoryError`](error::MemoryError) taxonomy
//! - [`memory`]: Core memory service: provisioning, store, search, update, delete
//! - [`store`]: Vector store boundary with Qdrant and in-process implementations

pub mod config;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod store;

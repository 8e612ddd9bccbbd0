//! Storage abstractions for service layer
//!
//! Contains the file-backed JSON lines document collection that typed stores
//! wrap to persist their records.

pub mod document_store;

pub use document_store::{Document, DocumentStore, StoreOptions};

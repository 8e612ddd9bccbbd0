//! User records: domain, repository, file-backed store and service.
//!
//! `UserService` owns the request-level contract (validation, uniqueness
//! check, outcome mapping); `UserStore` is the file-backed record store.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod store;

pub use errors::UserError;
pub use service::UserService;
pub use store::UserStore;

//! Service layer for the user record API.
//! - `storage` holds the JSON lines document collection.
//! - `users` builds the user record store and its business rules on top.
//! - Errors are typed per layer (`StoreError`, `UserError`).

pub mod errors;
pub mod storage;
pub mod users;

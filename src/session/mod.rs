//! Session credential ownership.
//!
//! `SessionStore` is the single owner of the bearer token. It persists the
//! token through a `CredentialStorage` and publishes every change on a watch
//! channel so the controller can react without polling.

pub mod storage;
pub mod store;

pub use storage::{CredentialStorage, FileCredentialStorage, MemoryCredentialStorage};
pub use store::{Credential, SessionSnapshot, SessionStore};

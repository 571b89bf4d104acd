//! Client-local anonymous identity and the storage it lives in

pub mod kv;
pub mod session;

pub use kv::{FileKv, KeyValueStore, MemoryKv};
pub use session::{SessionId, SessionIdentity, SESSION_KEY};

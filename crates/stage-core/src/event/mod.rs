//! Log de eventos de sesión y trait EventStore.

mod store;
mod types;

pub use store::{read_jsonl, write_jsonl, EventStore, InMemoryEventStore};
pub use types::{SessionEvent, SessionEventKind};

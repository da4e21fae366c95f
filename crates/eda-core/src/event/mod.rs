//! Eventos del engine: registro append-only de lo que ocurrió en cada run.

mod store;
mod types;

pub use store::{EventStore, InMemoryEventStore};
pub use types::{FlowEvent, FlowEventKind};

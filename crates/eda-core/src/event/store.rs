use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use super::{FlowEvent, FlowEventKind};

/// Almacenamiento de eventos append-only. Los workers del scheduler emiten
/// en paralelo, por eso trabaja sobre `&self`.
pub trait EventStore: Send + Sync {
    /// Agrega un evento y devuelve el evento completo (con seq y ts).
    fn append_kind(&self, run_id: Uuid, kind: FlowEventKind) -> FlowEvent;
    /// Eventos de una run en orden ascendente de seq.
    fn list(&self, run_id: Uuid) -> Vec<FlowEvent>;
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: Mutex<HashMap<Uuid, Vec<FlowEvent>>>,
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&self, run_id: Uuid, kind: FlowEventKind) -> FlowEvent {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let events = inner.entry(run_id).or_default();
        let ev = FlowEvent { seq: events.len() as u64,
                             run_id,
                             kind,
                             ts: Utc::now() };
        events.push(ev.clone());
        ev
    }

    fn list(&self, run_id: Uuid) -> Vec<FlowEvent> {
        let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.get(&run_id).cloned().unwrap_or_default()
    }
}

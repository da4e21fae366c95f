use std::sync::{Arc, Condvar, Mutex};

use super::ResultCache;
use crate::errors::NodeError;
use crate::model::{Fingerprint, FlowResult};

pub enum Reservation<'c> {
    /// Éxito ya almacenado.
    Hit(Arc<FlowResult>),
    /// Se esperó a otra ejecución del mismo fingerprint; su resultado.
    Joined(Arc<FlowResult>),
    /// El llamador es dueño de la ejecución.
    Acquired(ReservationGuard<'c>),
}

#[derive(Debug, Default)]
pub(super) struct InFlight {
    result: Mutex<Option<Arc<FlowResult>>>,
    ready: Condvar,
}

impl InFlight {
    pub(super) fn publish(&self, result: Arc<FlowResult>) {
        let mut slot = self.result.lock().unwrap_or_else(|p| p.into_inner());
        *slot = Some(result);
        self.ready.notify_all();
    }

    pub(super) fn wait(&self) -> Arc<FlowResult> {
        let mut slot = self.result.lock().unwrap_or_else(|p| p.into_inner());
        loop {
            if let Some(r) = slot.as_ref() {
                return r.clone();
            }
            slot = self.ready.wait(slot).unwrap_or_else(|p| p.into_inner());
        }
    }
}

/// Reserva en curso. Si se descarta sin `complete`, los que esperan reciben
/// un resultado CANCELLED y el slot queda libre.
pub struct ReservationGuard<'c> {
    cache: &'c ResultCache,
    fingerprint: Fingerprint,
    flow: String,
    inflight: Arc<InFlight>,
    done: bool,
}

impl<'c> ReservationGuard<'c> {
    pub(super) fn new(cache: &'c ResultCache, fingerprint: Fingerprint, flow: &str, inflight: Arc<InFlight>) -> Self {
        Self { cache,
               fingerprint,
               flow: flow.to_string(),
               inflight,
               done: false }
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn complete(mut self, result: FlowResult) -> Arc<FlowResult> {
        let result = Arc::new(result);
        self.cache.complete(&self.fingerprint, &self.inflight, result.clone());
        self.done = true;
        result
    }
}

impl Drop for ReservationGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            let abandoned = FlowResult::cancelled(self.flow.clone(), self.fingerprint.clone(), NodeError::Cancelled);
            self.cache.complete(&self.fingerprint, &self.inflight, Arc::new(abandoned));
        }
    }
}

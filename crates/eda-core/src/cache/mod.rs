//! Cache de resultados por fingerprint.
//!
//! - Sólo los resultados SUCCEEDED quedan almacenados.
//! - `reserve` es atómico: para un fingerprint hay a lo sumo una ejecución
//!   en vuelo; el resto de los pedidos espera y recibe ese mismo resultado.
//! - Un `CacheBackend` opcional persiste los éxitos entre procesos.
mod reservation;

use std::fmt::Debug;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

pub use reservation::{Reservation, ReservationGuard};
use reservation::InFlight;

use crate::model::{Fingerprint, FlowResult};

/// Almacenamiento persistente de resultados exitosos.
pub trait CacheBackend: Send + Sync + Debug {
    fn load(&self, fingerprint: &Fingerprint) -> Option<FlowResult>;
    /// Idempotente: guardar dos veces el mismo fingerprint no hace nada.
    fn store(&self, fingerprint: &Fingerprint, result: &FlowResult);
}

#[derive(Debug, Clone)]
enum Slot {
    Done(Arc<FlowResult>),
    InFlight(Arc<InFlight>),
}

#[derive(Debug, Default)]
pub struct ResultCache {
    slots: DashMap<Fingerprint, Slot>,
    backend: Option<Box<dyn CacheBackend>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(backend: Box<dyn CacheBackend>) -> Self {
        Self { slots: DashMap::new(),
               backend: Some(backend) }
    }

    /// Resultado exitoso almacenado, si existe.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<FlowResult>> {
        if let Some(slot) = self.slots.get(fingerprint) {
            return match slot.value() {
                Slot::Done(r) => Some(r.clone()),
                Slot::InFlight(_) => None,
            };
        }
        let loaded = self.backend.as_ref()?.load(fingerprint)?;
        if !loaded.is_success() || &loaded.fingerprint != fingerprint {
            return None;
        }
        let loaded = Arc::new(loaded);
        match self.slots.entry(fingerprint.clone()) {
            Entry::Occupied(o) => match o.get() {
                Slot::Done(r) => Some(r.clone()),
                Slot::InFlight(_) => Some(loaded),
            },
            Entry::Vacant(v) => {
                v.insert(Slot::Done(loaded.clone()));
                Some(loaded)
            }
        }
    }

    /// Guarda un resultado. Sólo los éxitos se almacenan; si ya había uno
    /// para ese fingerprint se devuelve el existente.
    pub fn put(&self, fingerprint: &Fingerprint, result: FlowResult) -> Arc<FlowResult> {
        let result = Arc::new(result);
        if !result.is_success() {
            return result;
        }
        match self.slots.entry(fingerprint.clone()) {
            Entry::Occupied(mut o) => {
                if let Slot::Done(existing) = o.get() {
                    return existing.clone();
                }
                o.insert(Slot::Done(result.clone()));
                self.persist(fingerprint, &result);
                result
            }
            Entry::Vacant(v) => {
                v.insert(Slot::Done(result.clone()));
                self.persist(fingerprint, &result);
                result
            }
        }
    }

    /// Reserva atómica del fingerprint.
    pub fn reserve(&self, fingerprint: &Fingerprint, flow: &str) -> Reservation<'_> {
        if let Some(hit) = self.get(fingerprint) {
            return Reservation::Hit(hit);
        }
        let waiting = match self.slots.entry(fingerprint.clone()) {
            Entry::Occupied(o) => match o.get() {
                Slot::Done(r) => return Reservation::Hit(r.clone()),
                Slot::InFlight(f) => f.clone(),
            },
            Entry::Vacant(v) => {
                let inflight = Arc::new(InFlight::default());
                v.insert(Slot::InFlight(inflight.clone()));
                return Reservation::Acquired(ReservationGuard::new(self, fingerprint.clone(), flow, inflight));
            }
        };
        // esperar fuera del lock del shard
        Reservation::Joined(waiting.wait())
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| matches!(s.value(), Slot::Done(_))).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, fingerprint: &Fingerprint, result: &FlowResult) {
        if let Some(backend) = &self.backend {
            backend.store(fingerprint, result);
        }
    }

    /// Cierra una reserva: el éxito queda almacenado; cualquier otro estado
    /// libera el slot para que un pedido posterior vuelva a ejecutar.
    fn complete(&self, fingerprint: &Fingerprint, inflight: &Arc<InFlight>, result: Arc<FlowResult>) {
        if result.is_success() {
            self.slots.insert(fingerprint.clone(), Slot::Done(result.clone()));
            self.persist(fingerprint, &result);
        } else {
            self.slots.remove_if(fingerprint, |_, slot| matches!(slot, Slot::InFlight(f) if Arc::ptr_eq(f, inflight)));
        }
        inflight.publish(result);
    }
}

//! Registro inmutable de descriptores, indexado por nombre y alias.
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use super::FlowDescriptor;

#[derive(Debug, Clone, Default)]
pub struct FlowRegistry {
    flows: IndexMap<String, Arc<dyn FlowDescriptor>>,
    aliases: HashMap<String, String>,
}

impl FlowRegistry {
    pub fn builder() -> FlowRegistryBuilder {
        FlowRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn FlowDescriptor>> {
        let canonical = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.flows.get(canonical).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Nombres canónicos en orden de registro.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.flows.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct FlowRegistryBuilder {
    inner: FlowRegistry,
}

impl FlowRegistryBuilder {
    /// Registra un descriptor; uno posterior con el mismo nombre reemplaza
    /// al anterior.
    pub fn register<F: FlowDescriptor + 'static>(self, flow: F) -> Self {
        self.register_arc(Arc::new(flow))
    }

    pub fn register_arc(mut self, flow: Arc<dyn FlowDescriptor>) -> Self {
        let kind = flow.kind().to_string();
        for alias in flow.aliases() {
            self.inner.aliases.insert(alias.to_string(), kind.clone());
        }
        if self.inner.flows.insert(kind.clone(), flow).is_some() {
            log::warn!("flow {kind} registered twice; keeping the last one");
        }
        self
    }

    pub fn build(self) -> FlowRegistry {
        self.inner
    }
}

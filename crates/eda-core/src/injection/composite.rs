//! `CompositeInjector`: aplica una secuencia de `ParamInjector` de forma
//! determinista y devuelve la capa de plataforma resultante.

use serde_json::{Map, Value};

use super::merge::merge_json;
use super::param_injector::ParamInjector;

#[derive(Debug, Default)]
pub struct CompositeInjector {
    pub injectors: Vec<Box<dyn ParamInjector>>,
}

impl CompositeInjector {
    pub fn with_injectors(inj: Vec<Box<dyn ParamInjector>>) -> Self {
        Self { injectors: inj }
    }

    pub fn apply(&self, flow_kind: &str) -> Value {
        Self::apply_injectors(&self.injectors, flow_kind)
    }

    /// Versión estática sobre un slice (el engine guarda los injectors).
    /// Parte de un objeto vacío; el orden de los injectors es el de merge.
    pub fn apply_injectors(injectors: &[Box<dyn ParamInjector>], flow_kind: &str) -> Value {
        let mut accumulated = Value::Object(Map::new());
        for inj in injectors.iter() {
            let v = inj.inject(flow_kind, &accumulated);
            accumulated = merge_json(&accumulated, &v);
        }
        accumulated
    }
}

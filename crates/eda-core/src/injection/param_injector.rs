use serde_json::Value;

/// Trait para inyectores de settings de plataforma.
pub trait ParamInjector: Send + Sync + std::fmt::Debug {
    /// Recibe el flow kind y lo acumulado por los injectors anteriores y
    /// devuelve una extensión/overrides que será mergeada en orden fijo.
    fn inject(&self, flow_kind: &str, accumulated: &Value) -> Value;
}

/// Injector estático: aplica el mismo objeto a todos los flujos, o sólo a
/// los listados en `flows`.
#[derive(Debug, Clone)]
pub struct StaticInjector {
    pub values: Value,
    pub flows: Vec<String>,
}

impl StaticInjector {
    pub fn new(values: Value) -> Self {
        Self { values,
               flows: Vec::new() }
    }

    pub fn only_for(mut self, flow: &str) -> Self {
        self.flows.push(flow.to_string());
        self
    }
}

impl ParamInjector for StaticInjector {
    fn inject(&self, flow_kind: &str, _accumulated: &Value) -> Value {
        if self.flows.is_empty() || self.flows.iter().any(|f| f == flow_kind) {
            self.values.clone()
        } else {
            Value::Null
        }
    }
}

//! Injectors de plataforma para los flujos de este crate.
use std::collections::BTreeMap;

use eda_core::ParamInjector;
use serde_json::{Map, Value};

use crate::flows::{implement, sim, synth, vivado_synth};

/// Settings de ejecutable que usa cada flujo.
fn tool_settings(flow_kind: &str) -> &'static [&'static str] {
    match flow_kind {
        sim::KIND => &["ghdl", "iverilog", "vvp"],
        synth::KIND => &["yosys"],
        implement::KIND => &["yosys", "nextpnr"],
        vivado_synth::KIND => &["vivado"],
        _ => &[],
    }
}

/// Rutas de herramientas instaladas en la plataforma (`yosys` →
/// `/opt/oss-cad-suite/bin/yosys`). Cada flujo recibe sólo los ejecutables
/// que usa, como capa de plataforma bajo los settings de proyecto.
#[derive(Debug, Clone, Default)]
pub struct ToolPathsInjector {
    paths: BTreeMap<String, String>,
}

impl ToolPathsInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, tool: impl Into<String>, executable: impl Into<String>) -> Self {
        self.paths.insert(tool.into(), executable.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl ParamInjector for ToolPathsInjector {
    fn inject(&self, flow_kind: &str, _accumulated: &Value) -> Value {
        let out: Map<String, Value> = tool_settings(flow_kind).iter()
                                                              .filter_map(|t| {
                                                                  self.paths
                                                                      .get(*t)
                                                                      .map(|p| (t.to_string(), Value::String(p.clone())))
                                                              })
                                                              .collect();
        if out.is_empty() {
            Value::Null
        } else {
            Value::Object(out)
        }
    }
}

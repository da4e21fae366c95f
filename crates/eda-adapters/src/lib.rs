//! eda-adapters: flujos EDA concretos sobre `eda-core`.
//!
//! - `sim`: GHDL / Icarus Verilog.
//! - `synth`: Yosys (genérico, ECP5, iCE40, Xilinx).
//! - `impl`: nextpnr (ECP5, iCE40), depende de `synth`.
//! - `vivado_synth`: Vivado en batch.
//!
//! Cada flujo renderiza su script de control de forma determinista y
//! parsea logs/reportes de su herramienta a métricas normalizadas.

pub mod flows;
pub mod fpga;
pub mod injectors;
pub mod reports;
pub mod script;

use eda_core::FlowRegistry;

pub use flows::{NextpnrImplFlow, SimFlow, VivadoSynthFlow, YosysSynthFlow};
pub use injectors::ToolPathsInjector;

/// Registro con todos los flujos de este crate.
pub fn default_registry() -> FlowRegistry {
    FlowRegistry::builder().register(SimFlow)
                           .register(YosysSynthFlow)
                           .register(NextpnrImplFlow)
                           .register(VivadoSynthFlow)
                           .build()
}

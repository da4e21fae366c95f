//! Supervisión de procesos de herramientas externas.
//!
//! Cada herramienta corre en su propio grupo de procesos (Unix) para poder
//! terminar el árbol completo: timeout, cancelación y barrido final de
//! helpers que sobreviven al proceso líder.

pub mod cancel;
pub mod process;
pub mod run_dir;

pub use cancel::CancellationToken;
pub use process::{ControlScript, ProcessOutcome, ProcessSupervisor, SupervisorConfig, ToolInvocation};
pub use run_dir::RunDir;

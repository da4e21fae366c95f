//! Motor de ejecución: resolución, scheduling y ejecución de nodos.

mod builder;
mod core;
mod fmax;
mod report;
mod runner;
mod scheduler;

pub use self::core::{EngineConfig, FlowEngine};
pub use builder::EngineBuilder;
pub use fmax::{FmaxOptions, FmaxOutcome, FmaxPoint};
pub use report::{NodeReport, RunReport};

//! Inyección de settings de plataforma determinista.
//!
//! Los injectors aportan la capa "plataforma" de la resolución de settings
//! (p.ej. la parte FPGA de una placa o rutas de herramientas instaladas).

pub mod composite;
pub mod merge;
pub mod param_injector;

pub use composite::CompositeInjector;
pub use merge::merge_json;
pub use param_injector::ParamInjector;

//! Flujos concretos: cada uno es un `FlowDescriptor` sin estado.

pub mod implement;
pub mod sim;
pub mod synth;
pub mod vivado_synth;

pub use implement::NextpnrImplFlow;
pub use sim::SimFlow;
pub use synth::YosysSynthFlow;
pub use vivado_synth::VivadoSynthFlow;

//! Descriptores de flujo y su registro.

pub mod descriptor;
pub mod registry;

pub use descriptor::{DependencyOutput, DependencySpec, ExpectedArtifact, FlowDescriptor, ParseContext, SetupContext};
pub use registry::{FlowRegistry, FlowRegistryBuilder};

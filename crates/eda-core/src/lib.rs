//! eda-core: motor de orquestación de flujos EDA.
//!
//! Resolución de dependencias a un grafo deduplicado por fingerprint,
//! scheduling con un pool acotado de workers, supervisión de procesos de
//! herramientas externas y cache de resultados con reserva atómica.

pub mod cache;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod flow;
pub mod hashing;
pub mod injection;
pub mod model;
pub mod policy;
pub mod report;
pub mod resolver;
pub mod settings;
pub mod supervisor;

pub use cache::{CacheBackend, Reservation, ResultCache};
pub use engine::{EngineBuilder, EngineConfig, FlowEngine, FmaxOptions, FmaxOutcome, FmaxPoint, NodeReport, RunReport};
pub use errors::{CoreEngineError, FieldViolation, NodeError, SettingsValidationError};
pub use event::{EventStore, FlowEvent, FlowEventKind, InMemoryEventStore};
pub use flow::{DependencyOutput, DependencySpec, ExpectedArtifact, FlowDescriptor, FlowRegistry, ParseContext, SetupContext};
pub use injection::{CompositeInjector, ParamInjector};
pub use injection::param_injector::StaticInjector;
pub use model::{Artifact, ArtifactKind, Fingerprint, FlowResult, MetricValue, Metrics, NodeStatus, Table, ToolIdentity};
pub use policy::{OutcomePolicy, PolicyReason, RecordOnly, StandardPolicy};
pub use report::ParsedReport;
pub use resolver::{FlowGraph, FlowNode, FlowRequest, NodeSettings};
pub use settings::{FieldSpec, Settings, SettingsSchema};
pub use supervisor::{CancellationToken, ProcessSupervisor, RunDir, SupervisorConfig, ToolInvocation};

pub use eda_domain::{Design, DomainError};

//! Contrato de un flujo EDA.
//!
//! Un descriptor es una definición estática: declara su esquema de
//! settings, sus dependencias (función de sus settings), la herramienta que
//! usa y cómo generar (SETUP) y leer (PARSE) cada ejecución. No guarda
//! estado de ejecución; el engine comparte una instancia entre hilos.
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use eda_domain::Design;
use serde_json::Value;

use crate::errors::NodeError;
use crate::model::{ArtifactKind, FlowResult, ToolIdentity};
use crate::report::ParsedReport;
use crate::settings::{Settings, SettingsSchema};
use crate::supervisor::{RunDir, ToolInvocation};

/// Dependencia declarada: flujo + overrides explícitos para sus settings.
/// Los settings del padre nunca se heredan implícitamente.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencySpec {
    pub flow: String,
    pub overrides: Value,
}

impl DependencySpec {
    pub fn new(flow: impl Into<String>, overrides: Value) -> Self {
        Self { flow: flow.into(),
               overrides }
    }

    pub fn plain(flow: impl Into<String>) -> Self {
        Self::new(flow, Value::Null)
    }
}

/// Archivo que debe existir tras una ejecución exitosa (relativo al run dir).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

impl ExpectedArtifact {
    pub fn new(kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        Self { kind,
               path: path.into() }
    }
}

/// Resultado de una dependencia ya SUCCEEDED.
#[derive(Debug, Clone)]
pub struct DependencyOutput {
    pub flow: String,
    pub result: Arc<FlowResult>,
}

pub struct SetupContext<'a> {
    pub design: &'a Design,
    pub settings: &'a Settings,
    pub run_dir: &'a RunDir,
    pub dependencies: &'a [DependencyOutput],
}

impl SetupContext<'_> {
    /// Resultado de la dependencia de tipo `flow`.
    pub fn dependency(&self, flow: &str) -> Option<&FlowResult> {
        self.dependencies.iter().find(|d| d.flow == flow).map(|d| d.result.as_ref())
    }
}

pub struct ParseContext<'a> {
    pub design: &'a Design,
    pub settings: &'a Settings,
    pub run_dir: &'a RunDir,
    /// Contenido completo del log de la herramienta.
    pub log: &'a str,
    pub exit_code: Option<i32>,
}

pub trait FlowDescriptor: Send + Sync + Debug {
    /// Nombre canónico del flujo.
    fn kind(&self) -> &str;

    fn aliases(&self) -> &[&str] {
        &[]
    }

    fn schema(&self) -> SettingsSchema;

    fn dependencies(&self, _settings: &Settings) -> Vec<DependencySpec> {
        Vec::new()
    }

    fn tool(&self, settings: &Settings) -> ToolIdentity;

    fn expected_artifacts(&self, _settings: &Settings) -> Vec<ExpectedArtifact> {
        Vec::new()
    }

    /// SETUP: genera la invocación (y su script) a partir de diseño y
    /// settings. Misma entrada, mismo script byte a byte.
    fn setup(&self, ctx: &SetupContext<'_>) -> Result<ToolInvocation, NodeError>;

    /// PARSE: extrae métricas; lo que falte se marca como parcial.
    fn parse(&self, ctx: &ParseContext<'_>) -> ParsedReport;
}

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use eda_core::event::FlowEventKind;
use eda_core::{ArtifactKind, Design, DependencySpec, EngineBuilder, ExpectedArtifact, FieldSpec, FlowDescriptor, FlowEngine,
               FlowRegistry, NodeError, ParseContext, ParsedReport, RunReport, Settings, SettingsSchema, SetupContext,
               SupervisorConfig, ToolIdentity, ToolInvocation};

/// Flujo de prueba: ejecuta un script `sh` fijo. Las líneas `METRIC <k> <v>`
/// del log se registran como métricas.
#[derive(Debug, Clone)]
pub struct ShellFlow {
    kind: &'static str,
    script: String,
    deps: Vec<DependencySpec>,
    expected: Vec<ExpectedArtifact>,
}

impl ShellFlow {
    pub fn new(kind: &'static str, script: &str) -> Self {
        Self { kind,
               script: script.to_string(),
               deps: Vec::new(),
               expected: Vec::new() }
    }

    pub fn with_dep(mut self, flow: &str, overrides: serde_json::Value) -> Self {
        self.deps.push(DependencySpec::new(flow, overrides));
        self
    }

    pub fn expecting(mut self, path: &str) -> Self {
        self.expected.push(ExpectedArtifact::new(ArtifactKind::Other, path));
        self
    }
}

impl FlowDescriptor for ShellFlow {
    fn kind(&self) -> &str {
        self.kind
    }

    fn schema(&self) -> SettingsSchema {
        SettingsSchema::common(self.kind).field(FieldSpec::any("payload"))
    }

    fn dependencies(&self, _settings: &Settings) -> Vec<DependencySpec> {
        self.deps.clone()
    }

    fn tool(&self, _settings: &Settings) -> ToolIdentity {
        ToolIdentity::new("sh", "sh")
    }

    fn expected_artifacts(&self, _settings: &Settings) -> Vec<ExpectedArtifact> {
        self.expected.clone()
    }

    fn setup(&self, ctx: &SetupContext<'_>) -> Result<ToolInvocation, NodeError> {
        let payload = ctx.settings.get("payload").map(|v| v.to_string()).unwrap_or_default();
        let deps: Vec<String> = ctx.dependencies.iter().map(|d| d.flow.clone()).collect();
        let body = format!("# payload: {payload}\n# deps: {}\n{}\n", deps.join(","), self.script);
        Ok(ToolInvocation::new("sh").arg("run.sh").script("run.sh", body))
    }

    fn parse(&self, ctx: &ParseContext<'_>) -> ParsedReport {
        let mut report = ParsedReport::new();
        for line in ctx.log.lines() {
            let mut parts = line.split_whitespace();
            if parts.next() == Some("METRIC") {
                if let (Some(k), Some(v)) = (parts.next(), parts.next().and_then(|v| v.parse::<f64>().ok())) {
                    report.set_metric(k, v);
                }
            }
        }
        report
    }
}

pub fn design(dir: &Path) -> Arc<Design> {
    let src = dir.join("top.v");
    fs::write(&src, "module top(input clk); endmodule\n").unwrap();
    Arc::new(Design::new("demo", "top").with_source(src).with_clock("main_clock", "clk"))
}

pub fn registry(flows: Vec<ShellFlow>) -> FlowRegistry {
    flows.into_iter().fold(FlowRegistry::builder(), |b, f| b.register(f)).build()
}

pub fn engine_builder(flows: Vec<ShellFlow>, run_root: &Path) -> EngineBuilder {
    FlowEngine::builder(registry(flows)).run_root(run_root)
                                        .jobs(4)
                                        .supervisor(SupervisorConfig { grace_period: Duration::from_millis(200),
                                                                       echo_output: false,
                                                                       ..Default::default() })
}

pub fn launches(engine: &FlowEngine, report: &RunReport) -> usize {
    engine.events()
          .list(report.run_id)
          .iter()
          .filter(|e| matches!(e.kind, FlowEventKind::ProcessLaunched { .. }))
          .count()
}

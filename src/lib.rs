//! edaflow-rust
//!
//! Cableado de la librería: arma un `FlowEngine` con los flujos concretos,
//! la política por métricas y la cache en disco según `EnvConfig`, y carga
//! proyectos (diseño + settings por flujo) desde JSON.
//!
//! Puede usarse desde `main.rs` o por otros crates/clientes.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use eda_adapters::{default_registry, ToolPathsInjector};
use eda_core::{CoreEngineError, Design, FlowEngine, FlowRequest, FmaxOptions, ResultCache};
use eda_persistence::{EnvConfig, FsCacheBackend, PersistenceError};
use eda_policies::MetricsPolicy;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EdaflowError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid project file {path}: {source}")]
    Project {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid override `{0}` (expected key=value)")]
    Override(String),
    #[error("invalid value `{value}` for --{flag}")]
    Flag { flag: String, value: String },
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Engine(#[from] CoreEngineError),
}

/// Engine configurado desde el entorno (`.env` + `EDAFLOW_*`).
pub fn engine_from_env() -> Result<FlowEngine, EdaflowError> {
    engine_from_config(&EnvConfig::from_env())
}

pub fn engine_from_config(cfg: &EnvConfig) -> Result<FlowEngine, EdaflowError> {
    let mut builder = FlowEngine::builder(default_registry()).run_root(&cfg.run_dir)
                                                             .policy(MetricsPolicy::new());
    if let Some(jobs) = cfg.jobs {
        builder = builder.jobs(jobs);
    }
    if let Some(timeout) = cfg.timeout {
        builder = builder.default_timeout(timeout);
    }
    if let Some(dir) = &cfg.cache_dir {
        let backend = FsCacheBackend::open(dir)?;
        log::info!("persistent cache at {}", backend.dir().display());
        builder = builder.cache(Arc::new(ResultCache::with_backend(Box::new(backend))));
    }
    let tools = cfg.tools
                   .iter()
                   .fold(ToolPathsInjector::new(), |inj, (name, exe)| inj.with_tool(name, exe));
    if !tools.is_empty() {
        builder = builder.injector(Box::new(tools));
    }
    Ok(builder.build())
}

/// Archivo de proyecto: el diseño más settings de proyecto por flujo.
#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    #[serde(flatten)]
    pub design: Design,
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
}

impl Project {
    /// Lee el JSON; las rutas relativas de las fuentes se resuelven contra
    /// el directorio del archivo.
    pub fn load(path: &Path) -> Result<Self, EdaflowError> {
        let text = fs::read_to_string(path).map_err(|source| EdaflowError::Io { path: path.to_path_buf(),
                                                                               source })?;
        let mut project: Project = serde_json::from_str(&text).map_err(|source| EdaflowError::Project { path:
                                                                                                            path.to_path_buf(),
                                                                                                        source })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let tb = &mut project.design.testbench.sources;
        for src in project.design.sources.iter_mut().chain(tb.iter_mut()) {
            if src.path.is_relative() {
                src.path = base.join(&src.path);
            }
        }
        Ok(project)
    }

    pub fn request(&self, flow: &str, overrides: Value) -> FlowRequest {
        self.settings.iter().fold(FlowRequest::new(flow, Arc::new(self.design.clone())), |req, (kind, settings)| {
                                req.with_project_settings(kind.clone(), settings.clone())
                            })
                            .with_overrides(overrides)
    }
}

/// `key=value`; el valor se interpreta como JSON y si no lo es queda como
/// texto (`clock_period=10`, `board=ulx3s`, `xdc_files=["a.xdc"]`).
pub fn parse_override(arg: &str) -> Result<(String, Value), EdaflowError> {
    let (key, raw) = arg.split_once('=').ok_or_else(|| EdaflowError::Override(arg.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(EdaflowError::Override(arg.to_string()));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

pub fn overrides_from_args<'a>(args: impl IntoIterator<Item = &'a str>) -> Result<Value, EdaflowError> {
    let mut map = Map::new();
    for arg in args {
        let (k, v) = parse_override(arg)?;
        map.insert(k, v);
    }
    Ok(Value::Object(map))
}

/// Opciones del barrido Fmax a partir de los flags de la línea de comandos
/// (`low`, `high`, `resolution`, `points`, `max-iterations`, `timeout`,
/// `max-luts`). Los ausentes quedan con su valor por defecto.
pub fn fmax_options(flags: &BTreeMap<String, String>) -> Result<FmaxOptions, EdaflowError> {
    fn parse<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, EdaflowError> {
        value.parse().map_err(|_| EdaflowError::Flag { flag: flag.to_string(),
                                                       value: value.to_string() })
    }
    let mut opts = FmaxOptions::default();
    for (flag, value) in flags {
        match flag.as_str() {
            "low" => opts.low_mhz = parse(flag, value)?,
            "high" => opts.high_mhz = parse(flag, value)?,
            "resolution" => opts.resolution_mhz = parse(flag, value)?,
            "points" => opts.points = parse(flag, value)?,
            "max-iterations" => opts.max_iterations = parse(flag, value)?,
            "timeout" => opts.run_timeout_seconds = Some(parse(flag, value)?),
            "max-luts" => opts.max_luts = Some(parse(flag, value)?),
            _ => return Err(EdaflowError::Flag { flag: flag.clone(),
                                                 value: value.clone() }),
        }
    }
    Ok(opts)
}

/// Dónde se guarda el resultado de un barrido.
pub fn fmax_report_path(run_dir: &Path, design: &str, flow: &str) -> PathBuf {
    run_dir.join(format!("fmax_{design}_{flow}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overrides_are_json_or_text() {
        let v = overrides_from_args(["clock_period=10", "board=ulx3s", "abc9=false", r#"xdc_files=["a.xdc"]"#]).unwrap();
        assert_eq!(v, json!({"clock_period": 10, "board": "ulx3s", "abc9": false, "xdc_files": ["a.xdc"]}));
        assert!(matches!(parse_override("no_equals"), Err(EdaflowError::Override(_))));
        assert!(matches!(parse_override("=1"), Err(EdaflowError::Override(_))));
    }

    #[test]
    fn project_paths_are_relative_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blinky.json");
        fs::write(&path,
                  r#"{"name": "blinky", "top": "top", "sources": [{"path": "rtl/top.v"}, {"path": "/abs/pkg.v"}],
                      "settings": {"synth": {"abc9": false}}}"#).unwrap();
        let project = Project::load(&path).unwrap();
        assert_eq!(project.design.sources[0].path, dir.path().join("rtl/top.v"));
        assert_eq!(project.design.sources[1].path, PathBuf::from("/abs/pkg.v"));
        let req = project.request("impl", json!({"seed": 1}));
        assert_eq!(req.project.get("synth"), Some(&json!({"abc9": false})));
        assert_eq!(req.overrides, json!({"seed": 1}));
    }

    #[test]
    fn fmax_flags() {
        let flags: BTreeMap<String, String> =
            [("low", "50"), ("high", "250.5"), ("timeout", "600")].into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let opts = fmax_options(&flags).unwrap();
        assert_eq!((opts.low_mhz, opts.high_mhz, opts.run_timeout_seconds), (50.0, 250.5, Some(600)));
        assert_eq!(opts.max_iterations, FmaxOptions::default().max_iterations);

        let bad: BTreeMap<String, String> = [("points".to_string(), "many".to_string())].into();
        assert!(matches!(fmax_options(&bad), Err(EdaflowError::Flag { flag, .. }) if flag == "points"));
        let unknown: BTreeMap<String, String> = [("speed".to_string(), "1".to_string())].into();
        assert!(fmax_options(&unknown).is_err());
    }

    #[test]
    fn engine_from_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EnvConfig { run_dir: dir.path().join("runs"),
                              jobs: Some(3),
                              cache_dir: Some(dir.path().join("cache")),
                              ..Default::default() };
        let engine = engine_from_config(&cfg).unwrap();
        assert_eq!(engine.config().jobs, 3);
        assert!(engine.registry().contains("vivado_synth"));
        assert!(dir.path().join("cache").is_dir());
    }
}

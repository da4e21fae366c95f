//! Carga de configuración desde variables de entorno.
//! Convención `EDAFLOW_*`; los valores que no se pueden interpretar usan el
//! default correspondiente.

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

pub const RUN_DIR_VAR: &str = "EDAFLOW_RUN_DIR";
pub const JOBS_VAR: &str = "EDAFLOW_JOBS";
pub const CACHE_DIR_VAR: &str = "EDAFLOW_CACHE_DIR";
pub const TIMEOUT_VAR: &str = "EDAFLOW_TIMEOUT_SECS";
/// Prefijo de rutas de herramientas: `EDAFLOW_TOOL_YOSYS=/opt/yosys/bin/yosys`.
pub const TOOL_PREFIX: &str = "EDAFLOW_TOOL_";

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone, PartialEq)]
pub struct EnvConfig {
    pub run_dir: PathBuf,
    /// `None` = un job por CPU.
    pub jobs: Option<usize>,
    /// Sin directorio la cache vive sólo en memoria.
    pub cache_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
    /// Nombre de setting (en minúsculas) -> ejecutable.
    pub tools: BTreeMap<String, String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self { run_dir: PathBuf::from("eda_run"),
               jobs: None,
               cache_dir: None,
               timeout: None,
               tools: BTreeMap::new() }
    }
}

impl EnvConfig {
    pub fn from_env() -> Self {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        let mut cfg = Self::from_lookup(|k| env::var(k).ok());
        for (key, value) in env::vars() {
            if let Some(tool) = key.strip_prefix(TOOL_PREFIX) {
                if !tool.is_empty() && !value.is_empty() {
                    cfg.tools.insert(tool.to_ascii_lowercase(), value);
                }
            }
        }
        cfg
    }

    /// Igual que `from_env` pero leyendo de una función arbitraria; no
    /// incluye las rutas de herramientas.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let run_dir = non_empty(RUN_DIR_VAR).map(PathBuf::from).unwrap_or(defaults.run_dir);
        let jobs = non_empty(JOBS_VAR).and_then(|v| parse_or_warn::<usize>(JOBS_VAR, &v)).filter(|n| *n > 0);
        let cache_dir = non_empty(CACHE_DIR_VAR).map(PathBuf::from);
        let timeout = non_empty(TIMEOUT_VAR).and_then(|v| parse_or_warn::<u64>(TIMEOUT_VAR, &v))
                                            .filter(|s| *s > 0)
                                            .map(Duration::from_secs);
        Self { run_dir,
               jobs,
               cache_dir,
               timeout,
               tools: BTreeMap::new() }
    }
}

fn parse_or_warn<T: std::str::FromStr>(var: &str, value: &str) -> Option<T> {
    let parsed = value.parse().ok();
    if parsed.is_none() {
        log::warn!("ignoring {var}={value:?}: not a valid number");
    }
    parsed
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        assert_eq!(EnvConfig::from_lookup(|_| None), EnvConfig::default());
    }

    #[test]
    fn reads_all_variables() {
        let cfg = EnvConfig::from_lookup(lookup(&[(RUN_DIR_VAR, "/tmp/runs"),
                                                  (JOBS_VAR, "4"),
                                                  (CACHE_DIR_VAR, "/tmp/cache"),
                                                  (TIMEOUT_VAR, " 600 ")]));
        assert_eq!(cfg.run_dir, PathBuf::from("/tmp/runs"));
        assert_eq!(cfg.jobs, Some(4));
        assert_eq!(cfg.cache_dir, Some(PathBuf::from("/tmp/cache")));
        assert_eq!(cfg.timeout, Some(Duration::from_secs(600)));
    }

    #[test]
    fn unparsable_values_fall_back() {
        let cfg = EnvConfig::from_lookup(lookup(&[(JOBS_VAR, "many"), (TIMEOUT_VAR, "-1"), (CACHE_DIR_VAR, "")]));
        assert_eq!(cfg.jobs, None);
        assert_eq!(cfg.timeout, None);
        assert_eq!(cfg.cache_dir, None);
        let zero = EnvConfig::from_lookup(lookup(&[(JOBS_VAR, "0")]));
        assert_eq!(zero.jobs, None);
    }
}

//! Constantes del motor core.
//!
//! `ENGINE_VERSION` forma parte del input de cada fingerprint: cambiarlo
//! invalida de forma determinista todas las entradas del cache aunque el
//! diseño y los settings no cambien. Mantener estable mientras no haya
//! cambios incompatibles en el modelo de resultados.

/// Versión lógica del motor.
pub const ENGINE_VERSION: &str = "E1.0";

/// Prefijo del fingerprint usado en nombres de directorio de ejecución.
pub const DIR_NAME_HASH_LEN: usize = 16;

pub const REPORTS_DIR: &str = "reports";
pub const OUTPUTS_DIR: &str = "outputs";
pub const LOG_FILE: &str = "tool.log";
pub const SETTINGS_FILE: &str = "settings.json";
/// Stamp terminal con el `FlowResult` completo.
pub const STAMP_FILE: &str = "status.json";

/// Target de `log` para la salida en vivo de las herramientas.
pub const TOOL_LOG_TARGET: &str = "edaflow::tool";

/// Profundidad máxima de expansión de dependencias.
pub const MAX_RESOLUTION_DEPTH: usize = 64;

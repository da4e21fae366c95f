//! eda-persistence
//!
//! Configuración desde entorno (`.env` + variables `EDAFLOW_*`) y un backend
//! de cache en disco que conserva los resultados SUCCEEDED entre sesiones.
//!
//! Módulos:
//! - `config`: `EnvConfig::from_env`.
//! - `fs_cache`: `FsCacheBackend`, un archivo JSON por fingerprint.
//! - `error`: `PersistenceError`.

pub mod config;
pub mod error;
pub mod fs_cache;

pub use config::{init_dotenv, EnvConfig};
pub use error::PersistenceError;
pub use fs_cache::FsCacheBackend;

// errors.rs
use thiserror::Error;

/// Errores del dominio de diseño.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("diseño inválido: {}", .0.join("; "))]
    InvalidDesign(Vec<String>),

    #[error("no se pudo leer la fuente {path}: {reason}")]
    SourceUnreadable { path: String, reason: String },

    #[error("valor con unidad inválido: {0}")]
    InvalidUnit(String),
}

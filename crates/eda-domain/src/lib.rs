//! eda-domain: modelo de diseño HDL (fuentes, top, clocks, parámetros).
//!
//! El core lo consume en modo sólo lectura: el loader externo construye un
//! `Design`, lo valida y a partir de ahí no se modifica. También agrupa la
//! conversión de unidades de tiempo/frecuencia que usan los settings de clock.

pub mod design;
pub mod errors;
pub mod units;

pub use design::{Clock, Design, SourceFile, SourceKind, Testbench};
pub use errors::DomainError;

use serde::{Deserialize, Serialize};

/// Identidad de la herramienta externa que ejecuta un nodo. Entra al
/// fingerprint: cambiar de ejecutable (o de versión declarada) invalida el
/// cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolIdentity {
    pub name: String,
    pub executable: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ToolIdentity {
    pub fn new(name: impl Into<String>, executable: impl Into<String>) -> Self {
        Self { name: name.into(),
               executable: executable.into(),
               version: None }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error_handler::ConfigError;

/// Identifies which of the two RAG backends a request targets.
///
/// Both backends implement the same REST contract; only the base URL differs.
/// The serialized form is the lowercase key used on the wire (`"python"`, `"java"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKey {
    /// FastAPI implementation.
    Python,
    /// Spring Boot implementation.
    Java,
}

impl BackendKey {
    /// Every known backend, in display order.
    pub const ALL: [BackendKey; 2] = [BackendKey::Python, BackendKey::Java];

    /// Wire key.
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKey::Python => "python",
            BackendKey::Java => "java",
        }
    }

    /// Environment variable that holds this backend's base URL.
    pub fn base_url_var(self) -> &'static str {
        match self {
            BackendKey::Python => "PY_API_BASE_URL",
            BackendKey::Java => "JAVA_API_BASE_URL",
        }
    }

    /// Human-facing name.
    pub fn label(self) -> &'static str {
        match self {
            BackendKey::Python => "Python",
            BackendKey::Java => "Java",
        }
    }
}

impl fmt::Display for BackendKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive match on the wire key.
impl FromStr for BackendKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "python" => Ok(BackendKey::Python),
            "java" => Ok(BackendKey::Java),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_known_keys() {
        assert_eq!("python".parse::<BackendKey>().unwrap(), BackendKey::Python);
        assert_eq!("java".parse::<BackendKey>().unwrap(), BackendKey::Java);
        assert!("rust".parse::<BackendKey>().is_err());
        assert!("Python".parse::<BackendKey>().is_err());
        assert!("".parse::<BackendKey>().is_err());
    }

    #[test]
    fn serde_uses_wire_keys() {
        let json = serde_json::to_string(&BackendKey::Java).unwrap();
        assert_eq!(json, "\"java\"");
        let back: BackendKey = serde_json::from_str("\"python\"").unwrap();
        assert_eq!(back, BackendKey::Python);
    }

    #[test]
    fn each_backend_has_its_own_env_var() {
        assert_eq!(BackendKey::Python.base_url_var(), "PY_API_BASE_URL");
        assert_eq!(BackendKey::Java.base_url_var(), "JAVA_API_BASE_URL");
    }
}

use crate::error::ConfigError;
use crate::model::new_id;
use serde::{Deserialize, Serialize};

/// Identity and scripted behaviour shared by simulated kernels.
///
/// Every field is optional when loading from JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Client session id stamped into message headers.
    pub client_id: String,
    pub username: String,
    /// Spec name used when a start request names none.
    pub default_spec: String,
    /// Code that makes an execute request fail with `ename = "mock"`.
    pub error_sentinel: String,
    /// Text broadcast on `stdout` while an execute request runs.
    pub stream_text: String,
}

impl KernelConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            client_id: new_id(),
            username: new_id(),
            default_spec: "python".into(),
            error_sentinel: "trigger execute error".into(),
            stream_text: "foo".into(),
        }
    }
}

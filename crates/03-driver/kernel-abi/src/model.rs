use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates an opaque identifier for kernels, sessions and messages.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Identity of a running kernel.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KernelModel {
    pub id: String,
    /// Kernel spec name as requested by the client.
    pub name: String,
}

/// Partial kernel model supplied when starting or changing a kernel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelModelOptions {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl KernelModelOptions {
    /// Options selecting the kernel spec `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A session binds a document path to a kernel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionModel {
    pub id: String,
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub session_type: String,
    pub kernel: Option<KernelModel>,
}

//! Read-only catalog of kernel specs.

use kernel_messages::{HelpLink, KernelInfo, LanguageInfo, PROTOCOL_VERSION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Launch description for one kernel language.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelSpec {
    pub name: String,
    pub display_name: String,
    pub language: String,
    pub argv: Vec<String>,
    pub mimetype: String,
    pub file_extension: String,
}

/// A spec together with the info banner its kernels answer with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisteredSpec {
    pub spec: KernelSpec,
    pub info: KernelInfo,
}

/// Name → spec lookup with a guaranteed default entry.
#[derive(Clone, Debug)]
pub struct KernelSpecRegistry {
    default: RegisteredSpec,
    entries: BTreeMap<String, RegisteredSpec>,
}

impl KernelSpecRegistry {
    /// Creates a registry whose default (and only) entry is `default`.
    pub fn new(default: RegisteredSpec) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(default.spec.name.clone(), default.clone());
        Self { default, entries }
    }

    /// Adds or replaces an entry.
    pub fn with_spec(mut self, entry: RegisteredSpec) -> Self {
        if entry.spec.name == self.default.spec.name {
            self.default = entry.clone();
        }
        self.entries.insert(entry.spec.name.clone(), entry);
        self
    }

    /// The `python` and `shell` specs, defaulting to `python`.
    pub fn builtin() -> Self {
        Self::new(python()).with_spec(shell())
    }

    pub fn default_name(&self) -> &str {
        &self.default.spec.name
    }

    /// Exact lookup.
    pub fn get(&self, name: &str) -> Option<&RegisteredSpec> {
        self.entries.get(name)
    }

    /// Lookup that falls back to the default entry for unknown names.
    pub fn resolve(&self, name: &str) -> &RegisteredSpec {
        self.entries.get(name).unwrap_or(&self.default)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn specs(&self) -> impl Iterator<Item = &KernelSpec> {
        self.entries.values().map(|entry| &entry.spec)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for KernelSpecRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn python() -> RegisteredSpec {
    RegisteredSpec {
        spec: KernelSpec {
            name: "python".into(),
            display_name: "Python 3".into(),
            language: "python".into(),
            argv: vec![
                "python".into(),
                "-m".into(),
                "ipykernel_launcher".into(),
                "-f".into(),
                "{connection_file}".into(),
            ],
            mimetype: "text/x-python".into(),
            file_extension: ".py".into(),
        },
        info: KernelInfo {
            protocol_version: PROTOCOL_VERSION.into(),
            implementation: "ipython".into(),
            implementation_version: "7.0.0".into(),
            language_info: LanguageInfo {
                name: "python".into(),
                version: "3.8.0".into(),
                mimetype: "text/x-python".into(),
                file_extension: ".py".into(),
            },
            banner: "Mock Python Kernel".into(),
            help_links: vec![HelpLink {
                text: "Python Reference".into(),
                url: "https://docs.python.org/3/".into(),
            }],
        },
    }
}

fn shell() -> RegisteredSpec {
    RegisteredSpec {
        spec: KernelSpec {
            name: "shell".into(),
            display_name: "Shell".into(),
            language: "shell".into(),
            argv: vec![
                "bash_kernel".into(),
                "-f".into(),
                "{connection_file}".into(),
            ],
            mimetype: "text/x-sh".into(),
            file_extension: ".sh".into(),
        },
        info: KernelInfo {
            protocol_version: PROTOCOL_VERSION.into(),
            implementation: "bash_kernel".into(),
            implementation_version: "0.7.2".into(),
            language_info: LanguageInfo {
                name: "shell".into(),
                version: "5.0".into(),
                mimetype: "text/x-sh".into(),
                file_extension: ".sh".into(),
            },
            banner: "Mock Shell Kernel".into(),
            help_links: Vec::new(),
        },
    }
}

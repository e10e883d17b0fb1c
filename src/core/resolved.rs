//! Immutable snapshots produced once per build invocation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::dependency::DependencyRequirement;
use crate::core::option::OptionValue;
use crate::core::registry::OptionRequest;

/// Host platform facts captured when options are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    /// Detect the current host platform.
    pub fn host() -> Self {
        Platform {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }

    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Platform {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Shared library extension for this platform.
    pub fn dylib_extension(&self) -> &'static str {
        match self.os.as_str() {
            "macos" | "ios" => "dylib",
            "windows" => "dll",
            _ => "so",
        }
    }
}

/// The effective value of every registered option.
///
/// Never mutated after construction; a different request produces a
/// different instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedOptions {
    values: BTreeMap<String, OptionValue>,
    platform: Platform,
}

impl ResolvedOptions {
    pub(crate) fn new(values: BTreeMap<String, OptionValue>, platform: Platform) -> Self {
        ResolvedOptions { values, platform }
    }

    pub fn get(&self, id: &str) -> Option<&OptionValue> {
        self.values.get(id)
    }

    /// Whether the option is registered and truthy.
    pub fn is_enabled(&self, id: &str) -> bool {
        self.values.get(id).is_some_and(OptionValue::is_truthy)
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Identifiers of every truthy option, in sorted order.
    pub fn enabled(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, v)| v.is_truthy())
            .map(|(k, _)| k)
            .collect()
    }

    /// Re-express this resolution as a request using canonical identifiers.
    pub fn to_request(&self) -> OptionRequest {
        let mut request = OptionRequest::new();
        for (id, value) in &self.values {
            request = request.set(id.clone(), value.to_string());
        }
        request
    }
}

/// Resolved options together with the dependency requirements they activate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfiguration {
    options: ResolvedOptions,
    requirements: Vec<DependencyRequirement>,
}

impl ResolvedConfiguration {
    pub fn new(options: ResolvedOptions, requirements: Vec<DependencyRequirement>) -> Self {
        ResolvedConfiguration {
            options,
            requirements,
        }
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    pub fn requirements(&self) -> &[DependencyRequirement] {
        &self.requirements
    }

    pub fn requirement(&self, name: &str) -> Option<&DependencyRequirement> {
        self.requirements.iter().find(|r| r.name == name)
    }
}

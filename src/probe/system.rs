//! Probe backed by the real host: PATH lookup, pkg-config and the filesystem.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::dependency::{DependencyRequirement, ProbeSpec};
use crate::probe::{Availability, DependencyProbe};
use crate::util::config::DependencyOverride;
use crate::util::process::{find_executable, ProcessBuilder};

/// Probes the host system, honoring per-dependency config overrides.
#[derive(Debug, Clone, Default)]
pub struct SystemProbe {
    overrides: BTreeMap<String, DependencyOverride>,
}

impl SystemProbe {
    pub fn new() -> Self {
        SystemProbe::default()
    }

    /// Use `[dependencies.<name>]` overrides from the configuration.
    pub fn with_overrides(overrides: BTreeMap<String, DependencyOverride>) -> Self {
        SystemProbe { overrides }
    }

    fn probe_spec(&self, spec: &ProbeSpec) -> Availability {
        match spec {
            ProbeSpec::Program(program) => match find_executable(program) {
                // <prefix>/bin/<program>
                Some(path) => Availability::Present {
                    prefix: path.parent().and_then(Path::parent).map(Path::to_path_buf),
                },
                None => Availability::Absent,
            },
            ProbeSpec::PkgConfig(module) => {
                let Some(pkg_config) = find_executable("pkg-config") else {
                    tracing::debug!("pkg-config not found; cannot probe `{}`", module);
                    return Availability::Absent;
                };
                let exists = ProcessBuilder::new(&pkg_config)
                    .args(["--exists", module.as_str()])
                    .status()
                    .map(|s| s.success())
                    .unwrap_or(false);
                if !exists {
                    return Availability::Absent;
                }
                let prefix = ProcessBuilder::new(&pkg_config)
                    .args(["--variable=prefix", module.as_str()])
                    .exec_and_check()
                    .ok()
                    .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from);
                Availability::Present { prefix }
            }
            ProbeSpec::Path(path) => {
                if path.exists() {
                    Availability::present()
                } else {
                    Availability::Absent
                }
            }
        }
    }
}

impl DependencyProbe for SystemProbe {
    fn availability(&self, dep: &DependencyRequirement) -> Availability {
        let overridden = self.overrides.get(&dep.name);

        if let Some(DependencyOverride {
            present: Some(false),
            ..
        }) = overridden
        {
            return Availability::Absent;
        }
        if let Some(prefix) = overridden.and_then(|o| o.prefix.clone()) {
            return Availability::at(prefix);
        }
        if let Some(DependencyOverride {
            present: Some(true),
            ..
        }) = overridden
        {
            return Availability::present();
        }

        match dep.probe {
            Some(ref spec) => {
                let result = self.probe_spec(spec);
                tracing::debug!("probe {:?} for `{}`: {:?}", spec, dep.name, result);
                result
            }
            None => {
                tracing::debug!("no probe declared for `{}`; assuming present", dep.name);
                Availability::present()
            }
        }
    }

    fn locate_program(&self, program: &str) -> Option<PathBuf> {
        find_executable(program)
    }

    fn query(&self, program: &Path, args: &[String]) -> Result<String, String> {
        let output = ProcessBuilder::new(program)
            .args(args)
            .exec_and_check()
            .map_err(|e| format!("{:#}", e))?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dependency::DependencyRule;
    use tempfile::TempDir;

    #[test]
    fn test_path_probe() {
        let tmp = TempDir::new().unwrap();
        let probe = SystemProbe::new();

        let present = DependencyRule::new("headers")
            .probe(ProbeSpec::Path(tmp.path().to_path_buf()))
            .to_requirement();
        assert!(probe.availability(&present).is_present());

        let absent = DependencyRule::new("headers")
            .probe(ProbeSpec::Path(tmp.path().join("missing.h")))
            .to_requirement();
        assert_eq!(probe.availability(&absent), Availability::Absent);
    }

    #[test]
    fn test_overrides_win() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "pyqt5".to_string(),
            DependencyOverride {
                prefix: Some(PathBuf::from("/opt/pyqt5")),
                present: None,
            },
        );
        overrides.insert(
            "cmake".to_string(),
            DependencyOverride {
                prefix: None,
                present: Some(false),
            },
        );
        let probe = SystemProbe::with_overrides(overrides);

        let pyqt = DependencyRule::new("pyqt5")
            .probe(ProbeSpec::Program("definitely-not-a-real-program".to_string()))
            .to_requirement();
        assert_eq!(probe.availability(&pyqt).prefix(), Some(Path::new("/opt/pyqt5")));

        let cmake = DependencyRule::new("cmake").to_requirement();
        assert_eq!(probe.availability(&cmake), Availability::Absent);
    }

    #[test]
    fn test_undeclared_probe_assumed_present() {
        let dep = DependencyRule::new("netcdf").to_requirement();
        assert!(SystemProbe::new().availability(&dep).is_present());
    }

    #[cfg(unix)]
    #[test]
    fn test_query_trims_stdout() {
        let probe = SystemProbe::new();
        let out = probe
            .query(Path::new("echo"), &["  3.11  ".to_string()])
            .unwrap();
        assert_eq!(out, "3.11");
    }
}

//! CMake toolchain driver.

use std::path::{Path, PathBuf};

use crate::builder::driver::{check_step, DriverOptions, DriverOutput, ToolchainDriver};
use crate::builder::plan::BuildPlan;
use crate::core::errors::RiggingError;
use crate::util::process::{find_cmake, ProcessBuilder};

/// Runs `cmake` configure, `--build` and `--install` in a scratch build tree.
///
/// The build tree is a temporary directory removed on every exit path,
/// including failure, timeout and cancellation.
#[derive(Debug, Default)]
pub struct CMakeDriver;

impl CMakeDriver {
    pub fn new() -> Self {
        CMakeDriver
    }

    fn cmake(options: &DriverOptions) -> Result<PathBuf, RiggingError> {
        match options.cmake {
            Some(ref path) => Ok(path.clone()),
            None => find_cmake().ok_or_else(|| RiggingError::ToolchainFailure {
                step: "configure".to_string(),
                status: None,
                output: "CMake not found\n\
                         \n\
                         CMake is required to build this package.\n\
                         Install CMake and ensure it's in your PATH."
                    .to_string(),
            }),
        }
    }

    /// The three invocations, in order.
    pub fn steps(
        cmake: &Path,
        plan: &BuildPlan,
        options: &DriverOptions,
        build_dir: &Path,
    ) -> Vec<(&'static str, ProcessBuilder)> {
        let with_env = |mut cmd: ProcessBuilder| {
            for var in &plan.env {
                cmd = cmd.env(&var.key, &var.value);
            }
            cmd
        };

        let mut configure = ProcessBuilder::new(cmake)
            .arg("-S")
            .arg(&options.source_dir)
            .arg("-B")
            .arg(build_dir);
        if let Some(ref generator) = options.generator {
            configure = configure.arg("-G").arg(generator);
        }
        configure = configure.args(plan.configure_args());

        let mut build = ProcessBuilder::new(cmake)
            .arg("--build")
            .arg(build_dir)
            .arg("--parallel");
        if let Some(jobs) = options.jobs {
            build = build.arg(jobs.to_string());
        }

        let install = ProcessBuilder::new(cmake).arg("--install").arg(build_dir);

        vec![
            ("configure", with_env(configure)),
            ("build", with_env(build)),
            ("install", with_env(install)),
        ]
    }
}

impl ToolchainDriver for CMakeDriver {
    fn execute(&self, plan: &BuildPlan, options: &DriverOptions) -> Result<DriverOutput, RiggingError> {
        let cmake = Self::cmake(options)?;

        let scratch = match options.work_dir {
            Some(ref dir) => {
                std::fs::create_dir_all(dir).map_err(|e| {
                    RiggingError::io(format!("failed to create {}", dir.display()), e)
                })?;
                tempfile::Builder::new().prefix("rigging-build-").tempdir_in(dir)
            }
            None => tempfile::Builder::new().prefix("rigging-build-").tempdir(),
        }
        .map_err(|e| RiggingError::io("failed to create build directory", e))?;

        let mut result = DriverOutput::default();
        for (step, cmd) in Self::steps(&cmake, plan, options, scratch.path()) {
            tracing::info!("{} {}", step, plan.package);
            tracing::debug!("{}", cmd.display_command());

            let outcome = cmd
                .exec_with_deadline(options.timeout, &options.cancel)
                .map_err(|e| RiggingError::ToolchainFailure {
                    step: step.to_string(),
                    status: None,
                    output: format!("{:#}", e),
                })?;
            let output = check_step(step, outcome, options.timeout)?;
            result.steps.push((step.to_string(), output));
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::plan::VerifyPlan;
    use crate::core::dependency::Arg;

    fn plan() -> BuildPlan {
        BuildPlan {
            package: "demo".to_string(),
            version: "1.0.0".to_string(),
            prefix: PathBuf::from("/opt/demo"),
            args: vec![
                Arg::new("CMAKE_INSTALL_PREFIX", "/opt/demo"),
                Arg::new("BUILD_SHARED_LIBS", "ON"),
            ],
            env: vec![Arg::new("CXXFLAGS", "-std=c++11")],
            pre_steps: Vec::new(),
            caveats: Vec::new(),
            extras: Vec::new(),
            verify: VerifyPlan {
                prefix: PathBuf::from("/opt/demo"),
                expected_version: "1.0.0".to_string(),
                include_dir: None,
                compiler: None,
                harness_name: "harness.cpp".to_string(),
                harness: None,
                entry_point: None,
            },
        }
    }

    #[test]
    fn test_step_sequence() {
        let mut options = DriverOptions::new("/src/demo");
        options.jobs = Some(4);
        options.generator = Some("Ninja".to_string());

        let steps = CMakeDriver::steps(Path::new("cmake"), &plan(), &options, Path::new("/tmp/b"));
        let names: Vec<_> = steps.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["configure", "build", "install"]);

        assert_eq!(
            steps[0].1.display_command(),
            "cmake -S /src/demo -B /tmp/b -G Ninja -DCMAKE_INSTALL_PREFIX=/opt/demo -DBUILD_SHARED_LIBS=ON"
        );
        assert_eq!(steps[1].1.display_command(), "cmake --build /tmp/b --parallel 4");
        assert_eq!(steps[2].1.display_command(), "cmake --install /tmp/b");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_configure_surfaces_output_and_cleans_up() {
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        let tmp = TempDir::new().unwrap();
        let fake = tmp.path().join("cmake");
        std::fs::write(&fake, "#!/bin/sh\necho \"CMake Error: boom\" >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let work = tmp.path().join("work");
        let mut options = DriverOptions::new(tmp.path());
        options.cmake = Some(fake);
        options.work_dir = Some(work.clone());

        let err = CMakeDriver::new().execute(&plan(), &options).unwrap_err();
        assert!(matches!(err, RiggingError::ToolchainFailure { ref step, status: Some(1), .. } if step == "configure"));
        assert!(err.captured_output().unwrap().contains("CMake Error: boom"));
        assert_eq!(std::fs::read_dir(&work).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_run_records_each_step() {
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        let tmp = TempDir::new().unwrap();
        let fake = tmp.path().join("cmake");
        std::fs::write(&fake, "#!/bin/sh\necho \"$1 CXXFLAGS=$CXXFLAGS\"\n").unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut options = DriverOptions::new(tmp.path());
        options.cmake = Some(fake);

        let output = CMakeDriver::new().execute(&plan(), &options).unwrap();
        assert_eq!(output.steps.len(), 3);
        assert!(output.output_of("configure").unwrap().contains("-S CXXFLAGS=-std=c++11"));
        assert!(output.output_of("install").unwrap().contains("--install"));
    }
}

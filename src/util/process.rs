//! Subprocess execution utilities.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(&self.env);
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }

    /// Execute the command and wait for completion.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        cmd.output()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))
    }

    /// Execute and require success.
    pub fn exec_and_check(&self) -> Result<Output> {
        let output = self.exec()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "`{}` failed with exit code {:?}\n{}",
                self.display_command(),
                output.status.code(),
                stderr
            );
        }
        Ok(output)
    }

    /// Execute and return status only, discarding output.
    pub fn status(&self) -> Result<ExitStatus> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());
        cmd.status()
            .with_context(|| format!("failed to execute `{}`", self.program.display()))
    }

    /// Run to completion unless the deadline passes or `cancel` fires first.
    ///
    /// Standard output and error are captured interleaved into one buffer.
    /// On timeout or cancellation the child's whole process group is
    /// killed, so build tools that fork compilers do not leak them.
    pub fn exec_with_deadline(
        &self,
        deadline: Option<Duration>,
        cancel: &CancelToken,
    ) -> Result<StepOutcome> {
        let capture = tempfile::tempfile().context("failed to create output capture file")?;
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(capture.try_clone().context("failed to share capture file")?);
        cmd.stderr(capture.try_clone().context("failed to share capture file")?);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        tracing::debug!("running `{}`", self.display_command());
        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        let started = Instant::now();
        let ending = loop {
            if let Some(status) = child
                .try_wait()
                .with_context(|| format!("failed to wait for `{}`", self.program.display()))?
            {
                break Ending::Exited(status);
            }
            if cancel.is_cancelled() {
                kill_tree(&mut child);
                break Ending::Cancelled;
            }
            if deadline.is_some_and(|limit| started.elapsed() >= limit) {
                kill_tree(&mut child);
                break Ending::TimedOut;
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let output = read_capture(capture)?;
        Ok(match ending {
            Ending::Exited(status) => StepOutcome::Exited {
                code: status.code(),
                success: status.success(),
                output,
            },
            Ending::TimedOut => StepOutcome::TimedOut { output },
            Ending::Cancelled => StepOutcome::Cancelled { output },
        })
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

enum Ending {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
}

/// How a deadline-bounded subprocess finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Exited {
        code: Option<i32>,
        success: bool,
        output: String,
    },
    TimedOut {
        output: String,
    },
    Cancelled {
        output: String,
    },
}

impl StepOutcome {
    pub fn output(&self) -> &str {
        match self {
            StepOutcome::Exited { output, .. }
            | StepOutcome::TimedOut { output }
            | StepOutcome::Cancelled { output } => output,
        }
    }
}

/// Cooperative cancellation shared between the caller and running steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        // negative pid targets the process group created at spawn
        let group = format!("-{}", child.id());
        let _ = Command::new("kill")
            .args(["-KILL", "--", group.as_str()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn read_capture(mut file: std::fs::File) -> Result<String> {
    file.seek(SeekFrom::Start(0))
        .context("failed to rewind output capture")?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .context("failed to read output capture")?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find a C++ compiler: `$CXX` first, then the usual names.
pub fn find_cxx_compiler() -> Option<PathBuf> {
    if let Ok(cxx) = std::env::var("CXX") {
        if let Some(path) = find_executable(&cxx) {
            return Some(path);
        }
    }

    for compiler in &["c++", "g++", "clang++"] {
        if let Some(path) = find_executable(compiler) {
            return Some(path);
        }
    }

    None
}

/// Find CMake.
pub fn find_cmake() -> Option<PathBuf> {
    find_executable("cmake")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("cmake").args(["--build", "build", "--parallel", "8"]);

        assert_eq!(pb.display_command(), "cmake --build build --parallel 8");
    }

    #[cfg(unix)]
    #[test]
    fn test_process_builder() {
        let output = ProcessBuilder::new("echo").arg("hello").exec().unwrap();

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn test_deadline_captures_both_streams() {
        let outcome = ProcessBuilder::new("sh")
            .args(["-c", "echo out; echo err >&2; exit 3"])
            .exec_with_deadline(Some(Duration::from_secs(30)), &CancelToken::new())
            .unwrap();

        match outcome {
            StepOutcome::Exited { code, success, ref output } => {
                assert_eq!(code, Some(3));
                assert!(!success);
                assert!(output.contains("out"));
                assert!(output.contains("err"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_deadline_kills_slow_step() {
        let started = Instant::now();
        let outcome = ProcessBuilder::new("sh")
            .args(["-c", "echo started; sleep 30"])
            .exec_with_deadline(Some(Duration::from_millis(200)), &CancelToken::new())
            .unwrap();

        assert!(matches!(outcome, StepOutcome::TimedOut { .. }));
        assert!(outcome.output().contains("started"));
        assert!(started.elapsed() < Duration::from_secs(20));
    }

    #[cfg(unix)]
    #[test]
    fn test_cancelled_before_start_stops_promptly() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let outcome = ProcessBuilder::new("sleep")
            .arg("30")
            .exec_with_deadline(None, &cancel)
            .unwrap();
        assert!(matches!(outcome, StepOutcome::Cancelled { .. }));
    }

    #[test]
    fn test_env_is_applied() {
        let pb = ProcessBuilder::new("cmake").env("CXXFLAGS", "-std=c++11");
        let cmd = pb.build_command();
        let envs: Vec<_> = cmd.get_envs().collect();
        assert_eq!(envs.len(), 1);
        assert_eq!(envs[0].0, "CXXFLAGS");
    }
}

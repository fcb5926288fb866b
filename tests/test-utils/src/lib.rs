//! Fixtures for driving test binaries against fake image tools.

use anyhow::{Context, Result, anyhow};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
};
use tempfile::TempDir;

/// Environment variable the fake tools append their invocations to.
pub const TOOL_LOG_ENV: &str = "FAKE_TOOL_LOG";

/// Throwaway checkout mirroring the real layout:
///
/// ```text
/// <root>/oiio-images/            shared fixture images
/// <root>/oiio/build/linux/       build root with <app>/<app> tools
/// <root>/oiio/build/linux/testsuite/<name>/   test source dir
/// ```
pub struct Sandbox {
    root: TempDir,
    name: String,
}

impl Sandbox {
    pub fn new(name: &str) -> Result<Self> {
        let root = tempfile::tempdir().context("failed to create sandbox directory")?;
        let sandbox = Self {
            root,
            name: name.to_string(),
        };
        fs::create_dir_all(sandbox.image_dir())?;
        fs::create_dir_all(sandbox.srcdir().join("ref"))?;
        Ok(sandbox)
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn image_dir(&self) -> PathBuf {
        self.root().join("oiio-images")
    }

    pub fn build_root(&self) -> PathBuf {
        self.root().join("oiio").join("build").join("linux")
    }

    pub fn srcdir(&self) -> PathBuf {
        self.build_root().join("testsuite").join(&self.name)
    }

    pub fn tool_log(&self) -> PathBuf {
        self.root().join("tools.log")
    }

    /// Create an empty fixture image.
    pub fn add_image(&self, name: &str) -> Result<PathBuf> {
        let path = self.image_dir().join(name);
        fs::write(&path, name.as_bytes()).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn write_reference(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.srcdir().join("ref").join(name);
        fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn write_manifest(&self, toml: &str) -> Result<()> {
        let path = self.srcdir().join("run.toml");
        fs::write(&path, toml).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Install `<build_root>/<app>/<app>` as a shell script with `body`.
    ///
    /// Every invocation is logged as `<app> <args>` to [`Sandbox::tool_log`].
    #[cfg(unix)]
    pub fn install_tool(&self, app: &str, body: &str) -> Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let dir = self.build_root().join(app);
        fs::create_dir_all(&dir)?;
        let path = dir.join(app);
        let script = format!("#!/bin/sh\necho \"{app} $*\" >> \"${TOOL_LOG_ENV}\"\n{body}\n");
        fs::write(&path, script).with_context(|| format!("failed to write {}", path.display()))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }

    /// Tools that behave like a faithful reader/writer: `oiiotool` and
    /// `idiff` succeed only when their inputs exist, `iconvert` copies.
    #[cfg(unix)]
    pub fn install_working_tools(&self) -> Result<()> {
        self.install_tool("oiiotool", "for last; do :; done\ntest -f \"$last\"")?;
        self.install_tool("iconvert", "cp \"$1\" \"$2\"")?;
        self.install_tool("idiff", "cmp -s \"$2\" \"$3\"")?;
        Ok(())
    }

    /// Recorded tool invocations, one per line.
    pub fn tool_calls(&self) -> Result<Vec<String>> {
        let path = self.tool_log();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
        Ok(content.lines().map(str::to_owned).collect())
    }

    /// Touch the tool log so tools can append to it.
    pub fn reset_tool_log(&self) -> Result<()> {
        File::create(self.tool_log())?;
        Ok(())
    }
}

/// Exit status and captured UTF-8 stdout/stderr of a child process.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn trimmed_stdout(&self) -> &str {
        self.stdout.trim()
    }
}

/// Run `command` with piped stdout/stderr and capture both.
pub fn run_command(mut command: Command) -> Result<CommandOutput> {
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    let output = command.output().context("failed to spawn child process")?;

    let stdout = String::from_utf8(output.stdout).context("child stdout is not valid UTF-8")?;
    let stderr = String::from_utf8(output.stderr).context("child stderr is not valid UTF-8")?;

    Ok(CommandOutput {
        status: output.status,
        stdout,
        stderr,
    })
}

/// Fail with the child's stderr unless it exited successfully.
pub fn ensure_success(output: &CommandOutput, context: &str) -> Result<()> {
    if output.status.success() {
        Ok(())
    } else {
        Err(anyhow!(
            "{context} -> exit={:?}, stderr={}",
            output.status,
            output.stderr.trim()
        ))
    }
}

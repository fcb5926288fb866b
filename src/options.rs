use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use crate::paths;

/// Reference outputs live in this directory, relative to the test source dir.
pub const REF_DIR: &str = "ref";

/// Root holding the shared test-image checkouts, relative to the test source dir.
pub const PARENT: &str = "../../../../../";

/// Shared image collection under [`PARENT`].
pub const IMAGE_DIR: &str = "oiio-images";

/// Build root used when none is given on the command line.
pub const DEFAULT_BUILD_ROOT: &str = "../..";

/// Standard arguments every test driver accepts.
#[derive(Parser, Debug, Clone, Default)]
#[command(version, about = "Run an image library test and compare its outputs against references")]
pub struct Options {
    /// Test source directory; commands run here and outputs are written here
    pub srcdir: Option<PathBuf>,
    /// Build root containing `<app>/<app>` tool binaries
    pub build_root: Option<PathBuf>,
    /// Add to executable path
    #[arg(short = 'p', long = "path", default_value = "")]
    pub path: String,
    /// Use a MS Visual Studio configuration
    #[arg(long = "devenv-config", default_value = "")]
    pub devenv_config: String,
    /// MS Visual Studio solution path
    #[arg(long = "solution-path", default_value = "")]
    pub solution_path: String,
}

/// Resolved locations a test runs against.
#[derive(Debug, Clone)]
pub struct TestEnv {
    /// Absolute test source directory. Doubles as the temp dir outputs land in.
    pub srcdir: PathBuf,
    /// Normalized build root, relative paths are interpreted from `srcdir`.
    pub build_root: PathBuf,
    pub extra_path: String,
    pub devenv_config: String,
    pub solution_path: String,
}

impl TestEnv {
    pub fn from_options(options: &Options) -> Result<Self> {
        let srcdir = options.srcdir.clone().unwrap_or_else(|| PathBuf::from("."));
        let srcdir = paths::absolute(&srcdir)
            .with_context(|| format!("failed to resolve test directory {}", srcdir.display()))?;
        let build_root = options
            .build_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_ROOT));

        Ok(Self {
            srcdir,
            build_root: paths::normalize(&build_root),
            extra_path: options.path.clone(),
            devenv_config: options.devenv_config.clone(),
            solution_path: options.solution_path.clone(),
        })
    }

    pub fn tmpdir(&self) -> &Path {
        &self.srcdir
    }

    pub fn ref_dir(&self) -> PathBuf {
        self.srcdir.join(REF_DIR)
    }

    /// The shared `oiio-images` fixture directory. Not checked for existence.
    pub fn image_dir(&self) -> PathBuf {
        self.srcdir.join(PARENT).join(IMAGE_DIR)
    }

    /// Invocation prefix for a built tool, with a trailing space.
    pub fn oiio_app(&self, app: &str) -> String {
        let exe = if cfg!(windows) && !self.devenv_config.is_empty() {
            self.build_root.join(app).join(&self.devenv_config).join(app)
        } else {
            self.build_root.join(app).join(app)
        };
        format!("{} ", exe.display())
    }

    /// `path` relative to the temp dir, `/`-separated.
    pub fn relpath(&self, path: &Path) -> String {
        // Only fails when the current directory is gone; fall back to the path as given.
        paths::relpath(path, self.tmpdir()).unwrap_or_else(|_| path.display().to_string())
    }
}

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{
    commands::{
        DiffOptions, MaketxOptions, OUT_FILE, RwOptions, diff_command, info_command, maketx_command, rw_command,
        testtex_command,
    },
    options::TestEnv,
};

/// Per-test manifest file name inside the test source directory.
pub const MANIFEST_FILE: &str = "run.toml";

/// Declarative description of one test: what to run and what to compare.
#[derive(Debug, Deserialize)]
pub struct TestManifest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default = "default_outputs")]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub failure_ok: bool,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Rw {
        /// Files live in the shared image collection.
        #[serde(default)]
        image_dir: bool,
        /// Otherwise, a directory relative to the test dir.
        #[serde(default)]
        dir: Option<PathBuf>,
        files: Vec<String>,
        #[serde(default = "default_true")]
        test_write: bool,
        #[serde(default)]
        use_oiiotool: bool,
        #[serde(default)]
        extra_args: String,
        #[serde(default)]
        pre_args: String,
        #[serde(default)]
        idiff_extra_args: String,
    },
    Info {
        file: PathBuf,
        #[serde(default)]
        extra_args: String,
    },
    Diff {
        a: PathBuf,
        b: PathBuf,
        #[serde(default)]
        extra_args: String,
        #[serde(default)]
        silent: bool,
    },
    Maketx {
        input: PathBuf,
        output: PathBuf,
        #[serde(default)]
        extra_args: String,
    },
    Testtex {
        file: String,
        #[serde(default)]
        extra_args: String,
    },
    Shell {
        command: String,
    },
}

fn default_outputs() -> Vec<String> {
    vec![OUT_FILE.to_string()]
}

fn default_true() -> bool {
    true
}

impl TestManifest {
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(srcdir: &Path) -> Result<Self> {
        let path = srcdir.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse manifest {}", path.display()))
    }

    /// Concatenate every step's fragment, in order.
    pub fn command(&self, env: &TestEnv) -> String {
        self.steps.iter().map(|step| step.command(env)).collect()
    }
}

impl Step {
    pub fn command(&self, env: &TestEnv) -> String {
        let local = |path: &Path| env.srcdir.join(path);
        match self {
            Step::Rw {
                image_dir,
                dir,
                files,
                test_write,
                use_oiiotool,
                extra_args,
                pre_args,
                idiff_extra_args,
            } => {
                let dir = if *image_dir {
                    env.image_dir()
                } else {
                    local(dir.as_deref().unwrap_or(Path::new(".")))
                };
                let options = RwOptions {
                    test_write: *test_write,
                    use_oiiotool: *use_oiiotool,
                    extra_args: extra_args.clone(),
                    pre_args: pre_args.clone(),
                    idiff_extra_args: idiff_extra_args.clone(),
                };
                files
                    .iter()
                    .map(|file| rw_command(env, &dir, file, &options))
                    .collect()
            }
            Step::Info { file, extra_args } => info_command(env, &local(file), extra_args),
            Step::Diff {
                a,
                b,
                extra_args,
                silent,
            } => {
                let options = DiffOptions {
                    extra_args: extra_args.clone(),
                    silent: *silent,
                    ..DiffOptions::default()
                };
                diff_command(env, &local(a), &local(b), &options)
            }
            Step::Maketx {
                input,
                output,
                extra_args,
            } => {
                let options = MaketxOptions {
                    extra_args: extra_args.clone(),
                    ..MaketxOptions::default()
                };
                maketx_command(env, &local(input), &local(output), &options)
            }
            Step::Testtex { file, extra_args } => testtex_command(env, file, extra_args),
            Step::Shell { command } => format!("{command} ;\n"),
        }
    }
}

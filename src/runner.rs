use std::{
    ffi::OsString,
    fs::{self, File},
    path::{Path, PathBuf},
    process::Command,
    time::Instant,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use colored::Colorize;
use serde::Serialize;

use crate::{
    commands::{DiffOptions, OUT_FILE, diff_command},
    diff::text_diff_labeled,
    options::TestEnv,
};

/// Machine-readable record of a run, written next to `out.txt`.
pub const SUMMARY_FILE: &str = "last_run.json";

#[derive(Debug, Serialize)]
struct CommandDetail {
    command: String,
    exit_code: Option<i32>,
    duration_ms: u128,
}

#[derive(Debug, Serialize)]
struct OutputDetail {
    name: String,
    status: String,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    srcdir: PathBuf,
    started_at: DateTime<Local>,
    finished_at: DateTime<Local>,
    failure_ok: bool,
    commands: Vec<CommandDetail>,
    outputs: Vec<OutputDetail>,
    result: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputStatus {
    Match,
    NoMatch,
}

impl OutputStatus {
    fn as_str(&self) -> &'static str {
        match self {
            OutputStatus::Match => "match",
            OutputStatus::NoMatch => "no_match",
        }
    }
}

/// Run `command` from the test directory, then compare every file in
/// `outputs` with its copy under `ref/`.
///
/// `command` is a `;`-separated list of shell commands, run one at a time.
/// Returns 0 when every command succeeded and every output matched, 1
/// otherwise. With `failure_ok`, failing commands don't abort the run.
pub fn runtest(env: &TestEnv, command: &str, outputs: &[String], failure_ok: bool) -> Result<i32> {
    let started_at = Local::now();
    let out_path = env.srcdir.join(OUT_FILE);
    File::create(&out_path).with_context(|| format!("failed to truncate {}", out_path.display()))?;
    remove_stale_summary(env)?;

    println!("command = {command}");

    let path_var = subprocess_path(env)?;
    let mut summary = RunSummary {
        srcdir: env.srcdir.clone(),
        started_at,
        finished_at: started_at,
        failure_ok,
        commands: Vec::new(),
        outputs: Vec::new(),
        result: String::new(),
    };

    for sub_command in command.split(';').map(str::trim).filter(|c| !c.is_empty()) {
        tracing::debug!(command = sub_command, "running");
        let start = Instant::now();
        let mut cmd = shell(sub_command);
        cmd.current_dir(&env.srcdir);
        if let Some(path_var) = &path_var {
            cmd.env("PATH", path_var);
        }
        let status = match cmd.status() {
            Ok(status) => status,
            Err(err) => {
                summary.result = "error".into();
                write_summary(env, summary);
                return Err(err).with_context(|| format!("failed to run {sub_command}"));
            }
        };
        summary.commands.push(CommandDetail {
            command: sub_command.to_string(),
            exit_code: status.code(),
            duration_ms: start.elapsed().as_millis(),
        });

        if !status.success() && !failure_ok {
            println!("#### Error: this command failed:  {sub_command}");
            println!("{}", "FAIL".red().bold());
            summary.result = "fail".into();
            write_summary(env, summary);
            return Ok(1);
        }
    }

    let mut err = 0;
    for out in outputs {
        let status = compare_output(env, out, path_var.as_ref());
        match status {
            OutputStatus::Match => println!("\tmatch {out}"),
            OutputStatus::NoMatch => {
                println!("\tNO MATCH {out}");
                err = 1;
            }
        }
        summary.outputs.push(OutputDetail {
            name: out.clone(),
            status: status.as_str().to_string(),
        });
    }

    if err == 0 {
        println!("{}", "PASS".green().bold());
        summary.result = "pass".into();
    } else {
        println!("{}", "FAIL".red().bold());
        summary.result = "fail".into();
    }
    write_summary(env, summary);
    Ok(err)
}

fn compare_output(env: &TestEnv, out: &str, path_var: Option<&OsString>) -> OutputStatus {
    let actual = env.srcdir.join(out);
    let reference = env.ref_dir().join(out);
    let extension = Path::new(out)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    let matched = match extension {
        "tif" | "exr" => {
            let options = DiffOptions {
                concat: false,
                ..DiffOptions::default()
            };
            let cmp = diff_command(env, &actual, &reference, &options);
            tracing::debug!(command = %cmp, "comparing image");
            let mut cmd = shell(&cmp);
            cmd.current_dir(&env.srcdir);
            if let Some(path_var) = path_var {
                cmd.env("PATH", path_var);
            }
            match cmd.status() {
                Ok(status) => status.success(),
                Err(err) => {
                    println!("Unexpected error: {err}");
                    false
                }
            }
        }
        "txt" => {
            let diff_file = env.srcdir.join(format!("{out}.diff"));
            let labels = [env.relpath(&actual), env.relpath(&reference)];
            match text_diff_labeled(&actual, &reference, &labels, Some(&diff_file)) {
                Ok(same) => same,
                Err(err) => {
                    println!("Unexpected error: {err:#}");
                    false
                }
            }
        }
        _ => match (fs::read(&actual), fs::read(&reference)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        },
    };

    if matched {
        OutputStatus::Match
    } else {
        OutputStatus::NoMatch
    }
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

/// `PATH` for test subprocesses: `--path` first, then on Windows the
/// solution's library directory so freshly built DLLs are found.
///
/// `None` when there is nothing to prepend; the inherited environment is used as is.
fn subprocess_path(env: &TestEnv) -> Result<Option<OsString>> {
    let mut entries: Vec<PathBuf> = Vec::new();
    if !env.extra_path.is_empty() {
        entries.push(PathBuf::from(&env.extra_path));
    }

    let solution = Path::new(&env.solution_path);
    if cfg!(windows) && !env.solution_path.is_empty() && solution.is_dir() {
        let mut lib_dir = solution.join("libOpenImageIO");
        if !env.devenv_config.is_empty() {
            lib_dir.push(&env.devenv_config);
        }
        entries.push(crate::paths::normalize(&lib_dir));
    }

    if entries.is_empty() {
        return Ok(None);
    }

    if let Some(current) = std::env::var_os("PATH") {
        entries.extend(std::env::split_paths(&current));
    }
    std::env::join_paths(entries)
        .map(Some)
        .context("invalid entry in PATH")
}

fn remove_stale_summary(env: &TestEnv) -> Result<()> {
    let path = env.srcdir.join(SUMMARY_FILE);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("failed to remove stale summary {}", path.display())),
    }
}

fn write_summary(env: &TestEnv, mut summary: RunSummary) {
    summary.finished_at = Local::now();
    let path = env.srcdir.join(SUMMARY_FILE);
    let result = serde_json::to_string_pretty(&summary)
        .map_err(anyhow::Error::from)
        .and_then(|json| fs::write(&path, json).map_err(anyhow::Error::from));
    if let Err(err) = result {
        tracing::warn!(path = %path.display(), error = %err, "failed to write run summary");
    }
}

//! Unified diffs of text outputs against their references.

use std::{
    fs,
    path::Path,
    time::SystemTime,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

/// Lines of context around each change.
const CONTEXT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Equal,
    Replace,
    Delete,
    Insert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Opcode {
    tag: Tag,
    i1: usize,
    i2: usize,
    j1: usize,
    j2: usize,
}

/// Compare two text files line by line.
///
/// Returns `Ok(true)` when they match. Otherwise a unified diff is written to
/// `diff_file` (if given) and `Ok(false)` is returned.
pub fn text_diff(from: &Path, to: &Path, diff_file: Option<&Path>) -> Result<bool> {
    let labels = [from.display().to_string(), to.display().to_string()];
    text_diff_labeled(from, to, &labels, diff_file)
}

/// [`text_diff`], naming the files `labels` in the diff headers.
pub fn text_diff_labeled(from: &Path, to: &Path, labels: &[String; 2], diff_file: Option<&Path>) -> Result<bool> {
    let from_date = ctime(from)?;
    let to_date = ctime(to)?;
    let from_lines = read_lines(from)?;
    let to_lines = read_lines(to)?;
    if from_lines == to_lines {
        return Ok(true);
    }

    let diff = unified_diff(&from_lines, &to_lines, &labels[0], &labels[1], &from_date, &to_date);

    if let Some(diff_file) = diff_file {
        fs::write(diff_file, diff.concat())
            .with_context(|| format!("failed to write diff {}", diff_file.display()))?;
    }
    Ok(false)
}

fn ctime(path: &Path) -> Result<String> {
    let modified: SystemTime = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .with_context(|| format!("failed to stat {}", path.display()))?;
    let modified: DateTime<Local> = modified.into();
    Ok(modified.format("%a %b %e %H:%M:%S %Y").to_string())
}

/// Read `path` with universal newlines, keeping the terminator on each line.
fn read_lines(path: &Path) -> Result<Vec<String>> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes)
        .replace("\r\n", "\n")
        .replace('\r', "\n");
    Ok(text.split_inclusive('\n').map(str::to_owned).collect())
}

/// Unified diff lines, each carrying its own newline. Empty when `a == b`.
pub fn unified_diff(
    a: &[String],
    b: &[String],
    from_name: &str,
    to_name: &str,
    from_date: &str,
    to_date: &str,
) -> Vec<String> {
    let mut out = Vec::new();
    for group in grouped_opcodes(&opcodes(a, b), CONTEXT) {
        if out.is_empty() {
            out.push(format!("--- {from_name}\t{from_date}\n"));
            out.push(format!("+++ {to_name}\t{to_date}\n"));
        }

        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        out.push(format!(
            "@@ -{} +{} @@\n",
            format_range(first.i1, last.i2),
            format_range(first.j1, last.j2)
        ));

        for op in &group {
            match op.tag {
                Tag::Equal => out.extend(a[op.i1..op.i2].iter().map(|line| format!(" {line}"))),
                Tag::Delete | Tag::Replace | Tag::Insert => {
                    out.extend(a[op.i1..op.i2].iter().map(|line| format!("-{line}")));
                    out.extend(b[op.j1..op.j2].iter().map(|line| format!("+{line}")));
                }
            }
        }
    }
    out
}

fn format_range(start: usize, stop: usize) -> String {
    let mut beginning = start + 1;
    let length = stop - start;
    if length == 1 {
        return beginning.to_string();
    }
    if length == 0 {
        beginning -= 1;
    }
    format!("{beginning},{length}")
}

/// Edit script from a longest-common-subsequence alignment of `a` and `b`.
///
/// The common prefix and suffix are matched directly, so the table only
/// spans the changed region.
fn opcodes(a: &[String], b: &[String]) -> Vec<Opcode> {
    let (n, m) = (a.len(), b.len());
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let (a_mid, b_mid) = (&a[prefix..n - suffix], &b[prefix..m - suffix]);
    let (mn, mm) = (a_mid.len(), b_mid.len());

    // lcs[i][j]: LCS length of a_mid[i..] and b_mid[j..]
    let mut lcs = vec![vec![0u32; mm + 1]; mn + 1];
    for i in (0..mn).rev() {
        for j in (0..mm).rev() {
            lcs[i][j] = if a_mid[i] == b_mid[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut matches: Vec<(usize, usize)> = (0..prefix).map(|k| (k, k)).collect();
    let (mut i, mut j) = (0, 0);
    while i < mn && j < mm {
        if a_mid[i] == b_mid[j] {
            matches.push((prefix + i, prefix + j));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    matches.extend((0..suffix).map(|k| (n - suffix + k, m - suffix + k)));
    matches.push((n, m));

    let mut ops = Vec::new();
    let (mut i, mut j) = (0, 0);
    let mut run_start: Option<(usize, usize)> = None;
    for (mi, mj) in matches {
        if i < mi || j < mj {
            if let Some((si, sj)) = run_start.take() {
                ops.push(Opcode { tag: Tag::Equal, i1: si, i2: i, j1: sj, j2: j });
            }
            let tag = match (i < mi, j < mj) {
                (true, true) => Tag::Replace,
                (true, false) => Tag::Delete,
                _ => Tag::Insert,
            };
            ops.push(Opcode { tag, i1: i, i2: mi, j1: j, j2: mj });
        }
        if mi < n && mj < m && run_start.is_none() {
            run_start = Some((mi, mj));
        }
        i = mi + 1;
        j = mj + 1;
    }
    if let Some((si, sj)) = run_start {
        ops.push(Opcode { tag: Tag::Equal, i1: si, i2: n, j1: sj, j2: m });
    }

    if ops.is_empty() {
        ops.push(Opcode { tag: Tag::Equal, i1: 0, i2: n, j1: 0, j2: m });
    }
    ops
}

/// Split the edit script into hunks with at most `n` lines of context.
fn grouped_opcodes(ops: &[Opcode], n: usize) -> Vec<Vec<Opcode>> {
    let mut ops = ops.to_vec();
    if let Some(first) = ops.first_mut() {
        if first.tag == Tag::Equal {
            first.i1 = first.i1.max(first.i2.saturating_sub(n));
            first.j1 = first.j1.max(first.j2.saturating_sub(n));
        }
    }
    if let Some(last) = ops.last_mut() {
        if last.tag == Tag::Equal {
            last.i2 = last.i2.min(last.i1 + n);
            last.j2 = last.j2.min(last.j1 + n);
        }
    }

    let mut groups = Vec::new();
    let mut group = Vec::new();
    for mut op in ops {
        if op.tag == Tag::Equal && op.i2 - op.i1 > 2 * n {
            group.push(Opcode {
                i2: op.i2.min(op.i1 + n),
                j2: op.j2.min(op.j1 + n),
                ..op
            });
            groups.push(std::mem::take(&mut group));
            op.i1 = op.i1.max(op.i2.saturating_sub(n));
            op.j1 = op.j1.max(op.j2.saturating_sub(n));
        }
        group.push(op);
    }
    if !group.is_empty() && !(group.len() == 1 && group[0].tag == Tag::Equal) {
        groups.push(group);
    }
    groups
}

//! Shell fragment builders for the image tools.
//!
//! Every builder appends the tool's console output to `out.txt` unless told
//! otherwise, and terminates the fragment with ` ;\n` so fragments can be
//! concatenated into one command string. Spacing is significant: reference
//! `out.txt` files were produced with these exact strings.

use std::path::Path;

use crate::options::TestEnv;

/// Console output of every test step is appended here, relative to the test dir.
pub const OUT_FILE: &str = "out.txt";

const APPEND_OUT: &str = " >> out.txt";
const TERMINATOR: &str = " ;\n";

#[derive(Debug, Clone)]
pub struct DiffOptions {
    pub extra_args: String,
    /// Don't redirect output into `out.txt`.
    pub silent: bool,
    /// Terminate with ` ;\n`.
    pub concat: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            extra_args: String::new(),
            silent: false,
            concat: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaketxOptions {
    pub extra_args: String,
    pub silent: bool,
    pub concat: bool,
}

impl Default for MaketxOptions {
    fn default() -> Self {
        Self {
            extra_args: String::new(),
            silent: false,
            concat: true,
        }
    }
}

/// Knobs for [`rw_command`].
#[derive(Debug, Clone)]
pub struct RwOptions {
    /// Also write a copy and compare it with the original.
    pub test_write: bool,
    /// Write the copy with `oiiotool -o` instead of `iconvert`.
    pub use_oiiotool: bool,
    pub extra_args: String,
    pub pre_args: String,
    pub idiff_extra_args: String,
}

impl Default for RwOptions {
    fn default() -> Self {
        Self {
            test_write: true,
            use_oiiotool: false,
            extra_args: String::new(),
            pre_args: String::new(),
            idiff_extra_args: String::new(),
        }
    }
}

fn finish(mut command: String, silent: bool, concat: bool) -> String {
    if !silent {
        command.push_str(APPEND_OUT);
    }
    if concat {
        command.push_str(TERMINATOR);
    }
    command
}

/// Print verbose info and a pixel hash for `file`.
pub fn info_command(env: &TestEnv, file: &Path, extra_args: &str) -> String {
    format!(
        "{}--info -v -a --hash {} {}{APPEND_OUT}{TERMINATOR}",
        env.oiio_app("oiiotool"),
        extra_args,
        env.relpath(file)
    )
}

/// Compare two images.
///
/// A small number of pixels may be off by one 8-bit LSB; platforms and
/// compilers rarely agree to the last floating point bit.
pub fn diff_command(env: &TestEnv, a: &Path, b: &Path, options: &DiffOptions) -> String {
    let command = format!(
        "{}-a -failpercent 0.01 -hardfail 0.004 -warn 0.004 {} {} {}",
        env.oiio_app("idiff"),
        options.extra_args,
        env.relpath(a),
        env.relpath(b)
    );
    finish(command, options.silent, options.concat)
}

/// Turn `input` into a texture at `output`.
pub fn maketx_command(env: &TestEnv, input: &Path, output: &Path, options: &MaketxOptions) -> String {
    let command = format!(
        "{} {} {} -o {}",
        env.oiio_app("maketx"),
        env.relpath(input),
        options.extra_args,
        env.relpath(output)
    );
    finish(command, options.silent, options.concat)
}

/// Read `dir/filename`, and unless disabled, write a copy named `filename`
/// into the test dir and compare it with the original.
///
/// The info step includes a hash, which is very unlikely to match if the
/// reader got anything wrong.
pub fn rw_command(env: &TestEnv, dir: &Path, filename: &str, options: &RwOptions) -> String {
    let source = env.relpath(&dir.join(filename));
    let mut command = format!(
        "{} --info -v -a --hash {source}{APPEND_OUT}{TERMINATOR}",
        env.oiio_app("oiiotool")
    );

    if options.test_write {
        if options.use_oiiotool {
            command.push_str(&format!(
                "{}{} {source} {} -o {filename}{APPEND_OUT}{TERMINATOR}",
                env.oiio_app("oiiotool"),
                options.pre_args,
                options.extra_args
            ));
        } else {
            command.push_str(&format!(
                "{}{} {source} {} {filename}{APPEND_OUT}{TERMINATOR}",
                env.oiio_app("iconvert"),
                options.pre_args,
                options.extra_args
            ));
        }
        command.push_str(&format!(
            "{} -a {source} {} {filename}{APPEND_OUT}{TERMINATOR}",
            env.oiio_app("idiff"),
            options.idiff_extra_args
        ));
    }

    command
}

pub fn testtex_command(env: &TestEnv, file: &str, extra_args: &str) -> String {
    format!(
        "{} {file} {extra_args} {APPEND_OUT}{TERMINATOR}",
        env.oiio_app("testtex")
    )
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn env() -> TestEnv {
        TestEnv {
            srcdir: PathBuf::from("/w/oiio/build/linux/testsuite/rla"),
            build_root: PathBuf::from("/w/oiio/build/linux"),
            extra_path: String::new(),
            devenv_config: String::new(),
            solution_path: String::new(),
        }
    }

    #[test]
    fn rw_command_reads_writes_and_compares() {
        let env = env();
        let command = rw_command(&env, &env.image_dir(), "ginsu_a_nc10.rla", &RwOptions::default());
        let src = "../../../../../oiio-images/ginsu_a_nc10.rla";
        let expected = format!(
            "/w/oiio/build/linux/oiiotool/oiiotool  --info -v -a --hash {src} >> out.txt ;\n\
             /w/oiio/build/linux/iconvert/iconvert  {src}  ginsu_a_nc10.rla >> out.txt ;\n\
             /w/oiio/build/linux/idiff/idiff  -a {src}  ginsu_a_nc10.rla >> out.txt ;\n"
        );
        assert_eq!(command, expected);
    }

    #[test]
    fn rw_command_without_write_only_reads() {
        let env = env();
        let options = RwOptions {
            test_write: false,
            ..RwOptions::default()
        };
        let command = rw_command(&env, &env.srcdir, "a.tif", &options);
        assert_eq!(command.matches(" ;\n").count(), 1);
        assert!(!command.contains("iconvert"));
    }

    #[test]
    fn rw_command_can_write_through_oiiotool() {
        let env = env();
        let options = RwOptions {
            use_oiiotool: true,
            pre_args: "--threads 1".into(),
            ..RwOptions::default()
        };
        let command = rw_command(&env, &env.srcdir, "a.tif", &options);
        assert!(command.contains("oiiotool/oiiotool --threads 1 a.tif  -o a.tif >> out.txt ;\n"));
        assert!(!command.contains("iconvert"));
    }

    #[test]
    fn diff_command_suffixes_follow_flags() {
        let env = env();
        let a = env.srcdir.join("out.tif");
        let b = env.ref_dir().join("out.tif");
        assert_eq!(
            diff_command(&env, &a, &b, &DiffOptions::default()),
            "/w/oiio/build/linux/idiff/idiff -a -failpercent 0.01 -hardfail 0.004 -warn 0.004  out.tif ref/out.tif >> out.txt ;\n"
        );
        let bare = diff_command(
            &env,
            &a,
            &b,
            &DiffOptions {
                silent: true,
                concat: false,
                ..DiffOptions::default()
            },
        );
        assert!(bare.ends_with("out.tif ref/out.tif"));
    }

    #[test]
    fn info_maketx_and_testtex_fragments() {
        let env = env();
        assert_eq!(
            info_command(&env, &env.srcdir.join("a.exr"), "--stats"),
            "/w/oiio/build/linux/oiiotool/oiiotool --info -v -a --hash --stats a.exr >> out.txt ;\n"
        );
        assert_eq!(
            maketx_command(
                &env,
                &env.srcdir.join("grid.tif"),
                &env.srcdir.join("grid.tx"),
                &MaketxOptions::default()
            ),
            "/w/oiio/build/linux/maketx/maketx  grid.tif  -o grid.tx >> out.txt ;\n"
        );
        assert_eq!(
            testtex_command(&env, "grid.tx", "-res 64 64"),
            "/w/oiio/build/linux/testtex/testtex  grid.tx -res 64 64  >> out.txt ;\n"
        );
    }
}

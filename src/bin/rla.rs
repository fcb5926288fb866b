//! Round-trip every RLA sample image through the reader and writer.

use anyhow::Result;
use clap::Parser;
use oiio_testsuite::{Options, RwOptions, TestEnv, commands::OUT_FILE, logging, rw_command, runtest};

const FILES: [&str; 15] = [
    "ginsu_a_nc10.rla",
    "ginsu_a_ncf.rla",
    "ginsu_rgba_nc8.rla",
    "ginsu_rgb_nc16.rla",
    "imgmake_rgba_nc10.rla",
    "ginsu_a_nc16.rla",
    "ginsu_rgba_nc10.rla",
    "ginsu_rgba_ncf.rla",
    "ginsu_rgb_nc8.rla",
    "imgmake_rgba_nc16.rla",
    "ginsu_a_nc8.rla",
    "ginsu_rgba_nc16.rla",
    "ginsu_rgb_nc10.rla",
    "ginsu_rgb_ncf.rla",
    "imgmake_rgba_nc8.rla",
];

fn main() -> Result<()> {
    logging::init();
    let env = TestEnv::from_options(&Options::parse())?;

    let imagedir = env.image_dir();
    let command: String = FILES
        .iter()
        .map(|file| rw_command(&env, &imagedir, file, &RwOptions::default()))
        .collect();

    let ret = runtest(&env, &command, &[OUT_FILE.to_string()], false)?;
    std::process::exit(ret)
}

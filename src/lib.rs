//! Shared machinery for image library test drivers: building tool command
//! lines, running them, and comparing outputs against reference copies.

pub mod commands;
pub mod diff;
pub mod logging;
pub mod manifest;
pub mod options;
pub mod paths;
pub mod runner;

pub use commands::{
    DiffOptions, MaketxOptions, RwOptions, diff_command, info_command, maketx_command, rw_command, testtex_command,
};
pub use manifest::TestManifest;
pub use options::{Options, TestEnv};
pub use runner::runtest;

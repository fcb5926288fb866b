use anyhow::Result;
use clap::Parser;
use oiio_testsuite::{Options, TestEnv, TestManifest, logging, runtest};

fn main() -> Result<()> {
    logging::init();
    let options = Options::parse();
    let env = TestEnv::from_options(&options)?;

    let manifest = TestManifest::load(&env.srcdir)?;
    if let Some(name) = &manifest.name {
        tracing::debug!(test = %name, description = manifest.description.as_deref().unwrap_or(""), "loaded manifest");
    }

    let command = manifest.command(&env);
    let ret = runtest(&env, &command, &manifest.outputs, manifest.failure_ok)?;
    std::process::exit(ret)
}

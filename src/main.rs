/*!
 * Enclave Host - Main Entry Point
 *
 * Loads every enclave listed in the JSON file named by ENCLAVE_HOST_CONFIG
 * into simulated regions, runs each once and tears them down.
 */

use anyhow::{bail, Context, Result};
use enclave_host::config::EnclaveSource;
use enclave_host::manager::global;
use enclave_host::primitives::{EchoProgram, SectionImage, CALLING_PROCESS_BINARY_FILE};
use enclave_host::{
    init_tracing, EnclaveFinal, EnclaveInput, EnclaveLoadConfig, ManagerOptions, SimulatedDriver,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};

fn main() -> Result<()> {
    init_tracing();

    let config_path = std::env::var("ENCLAVE_HOST_CONFIG")
        .map(PathBuf::from)
        .context("ENCLAVE_HOST_CONFIG must name a JSON list of load configurations")?;

    let load_configs = EnclaveLoadConfig::list_from_json_file(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    if load_configs.is_empty() {
        bail!("{} lists no enclaves", config_path.display());
    }

    let driver = SimulatedDriver::new();
    for load_config in &load_configs {
        let image = read_image(load_config)?;
        driver.register_image(image, EchoProgram::new());
    }

    global::configure(ManagerOptions::from_env())?;
    global::install_native_driver(driver.clone())?;
    let manager = global::instance()?;

    info!(count = load_configs.len(), "Loading enclaves");

    let mut failures = 0;
    for load_config in load_configs {
        let name = load_config.name.clone();
        let client = match manager.load_enclave_from_config(load_config) {
            Ok(client) => client,
            Err(e) => {
                error!(enclave = %name, error = %e, "Load failed");
                failures += 1;
                continue;
            }
        };

        match client.enter_and_run(&EnclaveInput::default()) {
            Ok(output) => info!(enclave = %name, bytes = output.payload.len(), "Run completed"),
            Err(e) => {
                error!(enclave = %name, error = %e, "Run failed");
                failures += 1;
            }
        }

        if let Err(e) = manager.destroy_enclave(Some(&client), &EnclaveFinal::default(), false) {
            error!(enclave = %name, error = %e, "Finalize failed");
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{} enclave operation(s) failed", failures);
    }
    info!("All enclaves completed");
    Ok(())
}

/// Image bytes a load configuration refers to
fn read_image(load_config: &EnclaveLoadConfig) -> Result<Vec<u8>> {
    let source = load_config
        .native_config()
        .and_then(|native| native.source.as_ref())
        .with_context(|| format!("Enclave {} has no native source", load_config.name))?;

    match source {
        EnclaveSource::File { path } => std::fs::read(path)
            .with_context(|| format!("Failed to read enclave image {}", path.display())),
        EnclaveSource::Embedded { section_name } => {
            let image = SectionImage::read(Path::new(CALLING_PROCESS_BINARY_FILE), section_name)?;
            Ok(image.as_slice().to_vec())
        }
    }
}

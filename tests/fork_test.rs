/*!
 * Fork Tests
 * Re-creating a parent's enclave at the same placement in a child
 */

use enclave_host::client::{ClientState, FileEnclaveLoader};
use enclave_host::config::{EnclaveConfig, EnclaveLoadConfig, ForkConfig, NativeLoadConfig};
use enclave_host::manager::EnclaveManager;
use enclave_host::primitives::{EchoProgram, SimulatedDriver};
use enclave_host::signals::SignalDispatcher;
use enclave_host::EnclaveInput;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn setup(image: &[u8]) -> (Arc<SimulatedDriver>, EnclaveManager, TempDir, PathBuf) {
    let driver = SimulatedDriver::new();
    driver.register_image(image.to_vec(), EchoProgram::new());
    let manager = EnclaveManager::builder()
        .with_driver(driver.clone())
        .with_dispatcher(Arc::new(SignalDispatcher::new()))
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fork.so");
    std::fs::write(&path, image).unwrap();
    (driver, manager, dir, path)
}

#[test]
fn test_reload_in_child_reuses_placement() {
    let (driver, manager, _dir, path) = setup(b"fork-image");
    let parent = manager
        .load_enclave_with_config(
            "forked",
            &FileEnclaveLoader::new(&path),
            Some(EnclaveConfig::default().with_fork(true)),
            0,
            0,
        )
        .unwrap();

    let child = manager.reload_in_child("forked").unwrap();

    assert_ne!(child.id(), parent.id());
    assert_eq!(child.base_address(), parent.base_address());
    assert_eq!(child.enclave_size(), parent.enclave_size());
    assert_eq!(manager.get_client("forked").unwrap().id(), child.id());
    assert!(manager.get_name(parent.as_ref()).is_none());
    // The parent's region belongs to the parent process
    assert_eq!(parent.state(), ClientState::Initialized);

    let params = driver.create_params();
    assert_eq!(params.len(), 2);
    assert_eq!(params[1].base_address, parent.base_address());
    assert!(params[1].enable_fork);

    let persisted = manager.get_load_config_from_client(child.as_ref());
    assert_eq!(
        persisted.fork_config(),
        Some(ForkConfig {
            base_address: parent.base_address(),
            enclave_size: parent.enclave_size(),
        })
    );
    assert!(child.enter_and_run(&EnclaveInput::default()).is_ok());
}

#[test]
fn test_reload_requires_fork_enabled() {
    let (_driver, manager, _dir, path) = setup(b"no-fork-image");
    manager
        .load_enclave("plain", &FileEnclaveLoader::new(&path))
        .unwrap();

    let err = manager.reload_in_child("plain").err().unwrap();
    assert_eq!(err.kind(), "failed_precondition");
    assert!(manager.get_client("plain").is_some());
}

#[test]
fn test_reload_unknown_name() {
    let (_driver, manager, _dir, _path) = setup(b"unknown-image");
    let err = manager.reload_in_child("ghost").err().unwrap();
    assert_eq!(err.kind(), "not_found");
}

#[test]
fn test_fork_placement_without_fork_flag_is_a_duplicate() {
    let (driver, manager, _dir, path) = setup(b"dup-fork-image");
    let loader = FileEnclaveLoader::new(&path);
    let original = manager.load_enclave("same", &loader).unwrap();

    let err = manager
        .load_enclave_with_config(
            "same",
            &loader,
            None,
            original.base_address(),
            original.enclave_size(),
        )
        .err()
        .unwrap();

    assert_eq!(err.kind(), "already_exists");
    assert_eq!(driver.create_attempts(), 1);
}

#[test]
fn test_load_config_fork_placement() {
    let (driver, manager, _dir, path) = setup(b"explicit-fork-image");
    let load_config = EnclaveLoadConfig::native(
        NativeLoadConfig::file(&path).with_fork_config(ForkConfig {
            base_address: 0x7300_0000_0000,
            enclave_size: 0x3000,
        }),
    )
    .with_name("explicit")
    .with_config(EnclaveConfig::default().with_fork(true));

    let client = manager.load_enclave_from_config(load_config).unwrap();

    assert_eq!(client.base_address(), 0x7300_0000_0000);
    assert_eq!(client.enclave_size(), 0x3000);
    assert_eq!(driver.create_params()[0].enclave_size, 0x3000);
}

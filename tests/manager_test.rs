/*!
 * Enclave Manager Tests
 * Registry, lifecycle and teardown behavior
 */

use enclave_host::client::{ClientState, EnclaveClient, EnclaveLoader, FileEnclaveLoader};
use enclave_host::config::{EnclaveConfig, EnclaveLoadConfig, HostConfig, ManagerOptions};
use enclave_host::core::{bincode, Address, ClientId, EnclaveResult, Size};
use enclave_host::manager::{EnclaveManager, SharedName, CLOCK_MONOTONIC, CLOCK_REALTIME};
use enclave_host::primitives::selectors::{SELECTOR_FINI, SELECTOR_INIT, SELECTOR_RUN};
use enclave_host::primitives::{program_fn, EchoProgram, NativeStatus, SimulatedDriver};
use enclave_host::signals::{EnclaveSignal, SignalDispatcher};
use enclave_host::{EnclaveFinal, EnclaveInput, EnclaveOutput};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    driver: Arc<SimulatedDriver>,
    manager: EnclaveManager,
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self::with_options(ManagerOptions::default())
    }

    fn with_options(options: ManagerOptions) -> Self {
        let driver = SimulatedDriver::new();
        let manager = EnclaveManager::builder()
            .with_options(options)
            .with_driver(driver.clone())
            .with_dispatcher(Arc::new(SignalDispatcher::new()))
            .with_clock_period(Duration::from_millis(1))
            .build()
            .unwrap();
        Self {
            driver,
            manager,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Write `image` to disk and register it with an echo program
    fn echo_image(&self, file: &str, image: &[u8]) -> (PathBuf, Arc<EchoProgram>) {
        let program = EchoProgram::new();
        self.driver.register_image(image.to_vec(), program.clone());
        (self.write(file, image), program)
    }

    fn write(&self, file: &str, image: &[u8]) -> PathBuf {
        let path = self.dir.path().join(file);
        std::fs::write(&path, image).unwrap();
        path
    }
}

#[test]
fn test_load_run_destroy() {
    let fx = Fixture::new();
    let (path, program) = fx.echo_image("echo.so", b"echo-image");

    let client = fx
        .manager
        .load_enclave("echo", &FileEnclaveLoader::new(&path))
        .unwrap();
    assert_eq!(client.state(), ClientState::Initialized);
    assert_eq!(fx.manager.get_client("echo").unwrap().id(), client.id());
    assert_eq!(fx.manager.get_name(client.as_ref()).as_deref(), Some("echo"));

    let output = client
        .enter_and_run(&EnclaveInput {
            payload: b"ping".to_vec(),
        })
        .unwrap();
    assert_eq!(output.payload, b"ping".to_vec());

    fx.manager
        .destroy_enclave(Some(&client), &EnclaveFinal::default(), false)
        .unwrap();

    assert!(fx.manager.get_client("echo").is_none());
    assert!(fx.manager.get_name(client.as_ref()).is_none());
    assert_eq!(client.state(), ClientState::Destroyed);
    assert_eq!(fx.driver.live_regions(), 0);
    assert_eq!(program.calls(), vec![SELECTOR_INIT, SELECTOR_RUN, SELECTOR_FINI]);
}

#[test]
fn test_duplicate_name_rejected_before_creation() {
    let fx = Fixture::new();
    let (path, _) = fx.echo_image("dup.so", b"dup-image");
    let loader = FileEnclaveLoader::new(&path);

    let original = fx.manager.load_enclave("dup", &loader).unwrap();
    let err = fx.manager.load_enclave("dup", &loader).unwrap_err();

    assert_eq!(err.kind(), "already_exists");
    assert_eq!(fx.driver.create_attempts(), 1);
    assert_eq!(fx.manager.len(), 1);
    assert!(original.enter_and_run(&EnclaveInput::default()).is_ok());
}

#[test]
fn test_failed_initialize_leaves_no_trace() {
    let fx = Fixture::new();
    fx.driver.register_image(
        b"bad-init".to_vec(),
        program_fn(|selector, _, _| if selector == SELECTOR_INIT { 7 } else { 0 }),
    );
    let path = fx.write("bad.so", b"bad-init");

    let err = fx
        .manager
        .load_enclave("bad", &FileEnclaveLoader::new(&path))
        .unwrap_err();

    assert_eq!(err.kind(), "enclave_internal");
    assert!(fx.manager.get_client("bad").is_none());
    assert!(fx.manager.is_empty());
    assert_eq!(fx.driver.live_regions(), 0);
}

#[test]
fn test_finalize_failure_surfaces_after_full_teardown() {
    let fx = Fixture::new();
    fx.driver.register_image(
        b"bad-fini".to_vec(),
        program_fn(|selector, _, _| if selector == SELECTOR_FINI { 1 } else { 0 }),
    );
    let path = fx.write("fini.so", b"bad-fini");
    let client = fx
        .manager
        .load_enclave("fini", &FileEnclaveLoader::new(&path))
        .unwrap();

    let err = fx
        .manager
        .destroy_enclave(Some(&client), &EnclaveFinal::default(), false)
        .unwrap_err();

    assert_eq!(err.kind(), "enclave_internal");
    assert!(fx.manager.get_client("fini").is_none());
    assert_eq!(fx.driver.live_regions(), 0);
}

#[test]
fn test_destroy_failure_is_absorbed() {
    let fx = Fixture::new();
    let (path, _) = fx.echo_image("stuck.so", b"stuck-image");
    let client = fx
        .manager
        .load_enclave("stuck", &FileEnclaveLoader::new(&path))
        .unwrap();

    fx.driver.fail_destroy_with(Some(NativeStatus::Failure(0x1)));
    fx.manager
        .destroy_enclave(Some(&client), &EnclaveFinal::default(), false)
        .unwrap();

    assert!(fx.manager.get_client("stuck").is_none());
}

#[test]
fn test_skip_finalize() {
    let fx = Fixture::new();
    let (path, program) = fx.echo_image("skip.so", b"skip-image");
    let client = fx
        .manager
        .load_enclave("skip", &FileEnclaveLoader::new(&path))
        .unwrap();

    fx.manager
        .destroy_enclave(Some(&client), &EnclaveFinal::default(), true)
        .unwrap();

    assert_eq!(program.calls(), vec![SELECTOR_INIT]);
    assert_eq!(fx.driver.live_regions(), 0);
}

#[test]
fn test_destroy_none_is_noop() {
    let fx = Fixture::new();
    assert!(fx
        .manager
        .destroy_enclave(None, &EnclaveFinal::default(), false)
        .is_ok());
}

#[test]
fn test_destroy_removes_signal_routing() {
    let fx = Fixture::new();
    let (path, program) = fx.echo_image("sig.so", b"sig-image");
    let client = fx
        .manager
        .load_enclave("sig", &FileEnclaveLoader::new(&path))
        .unwrap();

    let dispatcher = fx.manager.dispatcher();
    dispatcher.register_signal(10, &client).unwrap();
    dispatcher.deliver(&EnclaveSignal::new(10)).unwrap();
    assert_eq!(program.signals().len(), 1);

    fx.manager
        .destroy_enclave(Some(&client), &EnclaveFinal::default(), false)
        .unwrap();

    let err = dispatcher.deliver(&EnclaveSignal::new(10)).unwrap_err();
    assert_eq!(err.kind(), "invalid_argument");
    assert!(dispatcher.signals_for_client(client.id()).unwrap().is_empty());
}

#[test]
fn test_config_defaults_reach_region() {
    let mut options = ManagerOptions::new();
    options.set_host_config(HostConfig::default().with_local_name("host-a"));
    let fx = Fixture::with_options(options);
    let (path, program) = fx.echo_image("cfg.so", b"cfg-image");

    fx.manager
        .load_enclave_with_config(
            "cfg",
            &FileEnclaveLoader::new(&path),
            Some(EnclaveConfig::default().with_env("MODE", "test")),
            0,
            0,
        )
        .unwrap();

    let config: EnclaveConfig = bincode::from_slice(&program.config().unwrap()).unwrap();
    assert_eq!(config.stdin_fd, Some(0));
    assert_eq!(config.stderr_fd, Some(2));
    assert_eq!(
        config.host_config.and_then(|host| host.local_name).as_deref(),
        Some("host-a")
    );
    assert_eq!(config.environment_variables.len(), 1);
}

#[test]
fn test_load_config_persisted_only_with_fork() {
    let fx = Fixture::new();
    let (path, _) = fx.echo_image("persist.so", b"persist-image");
    let loader = FileEnclaveLoader::new(&path);

    let plain = fx.manager.load_enclave("plain", &loader).unwrap();
    assert_eq!(
        fx.manager.get_load_config_from_client(plain.as_ref()),
        EnclaveLoadConfig::default()
    );

    let forkable = fx
        .manager
        .load_enclave_with_config(
            "forkable",
            &loader,
            Some(EnclaveConfig::default().with_fork(true)),
            0,
            0,
        )
        .unwrap();
    let persisted = fx.manager.get_load_config_from_client(forkable.as_ref());
    assert_eq!(persisted.name, "forkable");
    assert!(persisted.config.unwrap().enable_fork);
    assert!(fx.driver.create_params().last().unwrap().enable_fork);
}

#[test]
fn test_interrupted_creation_is_retried() {
    let fx = Fixture::new();
    let (path, _) = fx.echo_image("retry.so", b"retry-image");
    fx.driver.script_create_outcomes(
        std::iter::repeat(NativeStatus::CreateInterrupted)
            .take(5)
            .chain(std::iter::once(NativeStatus::Success)),
    );

    fx.manager
        .load_enclave("retry", &FileEnclaveLoader::new(&path))
        .unwrap();
    assert_eq!(fx.driver.create_attempts(), 6);
}

#[test]
fn test_retry_budget_exhausted() {
    let fx = Fixture::new();
    let (path, _) = fx.echo_image("exhaust.so", b"exhaust-image");
    fx.driver
        .script_create_outcomes(std::iter::repeat(NativeStatus::CreateInterrupted).take(6));

    let err = fx
        .manager
        .load_enclave("exhaust", &FileEnclaveLoader::new(&path))
        .unwrap_err();
    assert_eq!(err.kind(), "boundary");
    assert_eq!(fx.driver.create_attempts(), 6);
    assert!(fx.manager.get_client("exhaust").is_none());
}

#[test]
fn test_other_creation_failures_are_not_retried() {
    let fx = Fixture::new();
    let (path, _) = fx.echo_image("fail.so", b"fail-image");
    fx.driver
        .script_create_outcomes([NativeStatus::Failure(0x3001)]);

    assert!(fx
        .manager
        .load_enclave("fail", &FileEnclaveLoader::new(&path))
        .is_err());
    assert_eq!(fx.driver.create_attempts(), 1);
}

#[test]
fn test_clock_published_as_shared_resources() {
    let fx = Fixture::new();
    let shared = fx.manager.shared_resources();

    let monotonic = shared
        .acquire::<AtomicI64>(&SharedName::address(CLOCK_MONOTONIC))
        .unwrap();
    let realtime = shared
        .acquire::<AtomicI64>(&SharedName::address(CLOCK_REALTIME))
        .unwrap();
    assert!(monotonic.load(Ordering::Acquire) > 0);
    assert!(realtime.load(Ordering::Acquire) > 0);
}

#[test]
fn test_config_server_options_use_default_host_config() {
    let mut options = ManagerOptions::new();
    options.set_config_server_connection_attributes("localhost:4321", Duration::from_millis(10));
    let fx = Fixture::with_options(options);

    assert_eq!(fx.manager.host_config(), &HostConfig::default());
    assert!(!fx.manager.options().holds_host_config());
}

struct NoBackendLoader;

impl EnclaveLoader for NoBackendLoader {
    fn load_config(&self) -> EnclaveLoadConfig {
        EnclaveLoadConfig::default()
    }
}

#[test]
fn test_loader_without_backend_is_unsupported() {
    let fx = Fixture::new();
    let err = fx.manager.load_enclave("none", &NoBackendLoader).unwrap_err();
    assert_eq!(err.kind(), "invalid_argument");
    assert!(fx.manager.is_empty());
}

/// Client created outside the native backends
struct HostOnlyClient {
    id: ClientId,
    name: String,
    initialized_with: Mutex<Option<EnclaveConfig>>,
}

impl EnclaveClient for HostOnlyClient {
    fn id(&self) -> ClientId {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn state(&self) -> ClientState {
        if self.initialized_with.lock().is_some() {
            ClientState::Initialized
        } else {
            ClientState::Loaded
        }
    }
    fn enter_and_initialize(&self, config: &EnclaveConfig) -> EnclaveResult<()> {
        *self.initialized_with.lock() = Some(config.clone());
        Ok(())
    }
    fn enter_and_run(&self, input: &EnclaveInput) -> EnclaveResult<EnclaveOutput> {
        Ok(EnclaveOutput {
            payload: input.payload.clone(),
        })
    }
    fn enter_and_finalize(&self, _final_input: &EnclaveFinal) -> EnclaveResult<()> {
        Ok(())
    }
    fn enter_and_handle_signal(&self, _signal: &EnclaveSignal) -> EnclaveResult<()> {
        Ok(())
    }
    fn destroy_enclave(&self) -> EnclaveResult<()> {
        Ok(())
    }
}

struct HostOnlyLoader;

impl EnclaveLoader for HostOnlyLoader {
    fn load_config(&self) -> EnclaveLoadConfig {
        EnclaveLoadConfig::default()
    }

    fn load_enclave(
        &self,
        name: &str,
        _base_address: Address,
        _enclave_size: Size,
        _config: &EnclaveConfig,
    ) -> EnclaveResult<Arc<dyn EnclaveClient>> {
        Ok(Arc::new(HostOnlyClient {
            id: ClientId::next(),
            name: name.to_string(),
            initialized_with: Mutex::new(None),
        }))
    }
}

#[test]
fn test_loader_without_backend_creates_its_own_client() {
    let fx = Fixture::new();
    let client = fx.manager.load_enclave("host-only", &HostOnlyLoader).unwrap();

    assert_eq!(client.state(), ClientState::Initialized);
    assert_eq!(fx.manager.get_name(client.as_ref()).as_deref(), Some("host-only"));
    assert_eq!(fx.driver.create_attempts(), 0);
}

#[test]
fn test_exit_calls_reachable_during_run() {
    let fx = Fixture::new();
    fx.driver.register_image(
        b"exit-image".to_vec(),
        program_fn(|selector, params, exits| {
            if selector != SELECTOR_RUN {
                return 0;
            }
            match exits.invoke(7, params) {
                Ok(()) => 0,
                Err(_) => 1,
            }
        }),
    );
    let path = fx.write("exit.so", b"exit-image");
    let client = fx
        .manager
        .load_enclave("exit", &FileEnclaveLoader::new(&path))
        .unwrap();

    let seen = Arc::new(Mutex::new(0usize));
    let recorder = Arc::clone(&seen);
    client
        .exit_calls()
        .unwrap()
        .register(7, move |params| {
            *recorder.lock() = params.len();
            Ok(())
        })
        .unwrap();

    client.enter_and_run(&EnclaveInput::default()).unwrap();
    assert_eq!(*seen.lock(), 1);
}

#[test]
fn test_silent_region_returns_empty_output() {
    let fx = Fixture::new();
    fx.driver
        .register_image(b"silent-image".to_vec(), program_fn(|_, _, _| 0));
    let path = fx.write("silent.so", b"silent-image");
    let client = fx
        .manager
        .load_enclave("silent", &FileEnclaveLoader::new(&path))
        .unwrap();

    let output = client
        .enter_and_run(&EnclaveInput {
            payload: b"secret".to_vec(),
        })
        .unwrap();
    assert_eq!(output, EnclaveOutput::default());
}

//! Runtime bootstrap
//!
//! Every carrier runs this logic once at process start, single-threaded and
//! strictly before any embedded-program code. It recovers the payload that
//! the patcher installed in the runtime's embedded-module table, then hands
//! control to it as if the runtime had been invoked on a source file placed
//! next to the executable.
//!
//! The runtime itself is reached through two seams: [`ModuleTable`] (the
//! compiled-in module registry the placeholder lives in) and [`RuntimeHost`]
//! (argv, environment, clustering setup, and main-module evaluation). A
//! corrupt payload is fatal: there is no program to fall back to, so the
//! process must terminate immediately and visibly.

pub mod mode;

pub use mode::{StartMode, WORKER_ID_ENV};

use std::path::{Path, PathBuf};
use thiserror::Error;
use unibin_core::{CodecError, PAYLOAD_TERMINATOR};

/// Reserved name the payload is registered under in the module table.
pub const RESERVED_MODULE: &str = "app_main";

/// Process exit code used when the embedded payload cannot be decoded
/// (EX_SOFTWARE).
pub const EXIT_CORRUPT_PAYLOAD: i32 = 70;

/// Errors that abort the bootstrap
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The reserved module is absent from the runtime's module table
    #[error("embedded module {0:?} not found in runtime module table")]
    MissingModule(String),

    /// The embedded payload cannot be decoded; fatal, nothing to run
    #[error(transparent)]
    Corrupt(#[from] CodecError),

    /// The runtime's clustering setup entry point failed
    #[error("cluster worker setup failed: {0}")]
    ClusterSetup(String),

    /// Evaluating the recovered program failed to start
    #[error("failed to execute embedded program: {0}")]
    Exec(String),
}

/// The runtime's compiled-in module registry.
pub trait ModuleTable {
    /// Raw bytes registered under `name`, including any placeholder padding.
    fn lookup(&self, name: &str) -> Option<&[u8]>;
}

/// Host interface to the surrounding runtime process.
pub trait RuntimeHost {
    /// Path of the current executable.
    fn exec_path(&self) -> PathBuf;

    /// Read an environment variable.
    fn env_var(&self, key: &str) -> Option<String>;

    /// Remove an environment variable so the embedded program never sees it.
    fn env_remove(&mut self, key: &str);

    /// Insert an argument into the program's argument vector.
    fn insert_arg(&mut self, index: usize, arg: String);

    /// Route initialization through the runtime's clustering setup entry
    /// point.
    fn setup_cluster_worker(&mut self) -> Result<(), String>;

    /// Evaluate `source` as the program's main module under `filename`.
    /// Control does not return to the bootstrap afterwards.
    fn eval_main(&mut self, filename: &Path, source: &[u8]) -> Result<(), String>;
}

/// A recovered application payload.
#[derive(Debug, PartialEq, Eq)]
pub struct Payload {
    pub name: String,
    pub source: Vec<u8>,
}

/// Recover the payload from the module table.
///
/// The patcher zero-fills the placeholder tail, so the installed bytes are
/// the encoded payload followed by padding; truncate at the first terminator
/// byte, then decode.
pub fn recover_payload(table: &impl ModuleTable) -> Result<Payload, BootstrapError> {
    let raw = table
        .lookup(RESERVED_MODULE)
        .ok_or_else(|| BootstrapError::MissingModule(RESERVED_MODULE.to_string()))?;

    let end = raw
        .iter()
        .position(|&b| b == PAYLOAD_TERMINATOR)
        .unwrap_or(raw.len());
    let (name, source) = unibin_core::decode(&raw[..end])?;
    Ok(Payload { name, source })
}

/// Run the bootstrap: resolve the start mode, recover the payload, shape the
/// process accordingly and hand control to the embedded program.
///
/// Standalone: the synthetic filename (`<name>.js` next to the executable)
/// is inserted as argv[1] so the program sees the same argument shape as a
/// direct `runtime app.js` invocation. Cluster worker: initialization goes
/// through the clustering setup entry point, argv is left untouched, and the
/// worker-id variable is cleared before handoff.
pub fn run<T, H>(table: &T, host: &mut H) -> Result<(), BootstrapError>
where
    T: ModuleTable,
    H: RuntimeHost,
{
    let mode = StartMode::from_worker_id(host.env_var(WORKER_ID_ENV).as_deref());
    let payload = recover_payload(table)?;

    let exec_dir = host.exec_path().parent().map(Path::to_path_buf).unwrap_or_default();
    let filename = exec_dir.join(format!("{}.js", payload.name));

    match mode {
        StartMode::ClusterWorker => {
            host.setup_cluster_worker()
                .map_err(BootstrapError::ClusterSetup)?;
            host.env_remove(WORKER_ID_ENV);
        }
        StartMode::Standalone => {
            host.insert_arg(1, filename.display().to_string());
        }
    }

    host.eval_main(&filename, &payload.source)
        .map_err(BootstrapError::Exec)
}

/// [`run`], with the mandated failure behavior: a corrupt or missing payload
/// terminates the process immediately with [`EXIT_CORRUPT_PAYLOAD`].
pub fn run_or_exit<T, H>(table: &T, host: &mut H)
where
    T: ModuleTable,
    H: RuntimeHost,
{
    if let Err(err) = run(table, host) {
        eprintln!("unibin bootstrap: {}", err);
        std::process::exit(EXIT_CORRUPT_PAYLOAD);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapTable(HashMap<String, Vec<u8>>);

    impl ModuleTable for MapTable {
        fn lookup(&self, name: &str) -> Option<&[u8]> {
            self.0.get(name).map(Vec::as_slice)
        }
    }

    /// Records everything the bootstrap asks the runtime to do.
    struct MockHost {
        env: HashMap<String, String>,
        args: Vec<String>,
        cluster_setup_calls: usize,
        evaluated: Option<(PathBuf, Vec<u8>)>,
    }

    impl MockHost {
        fn new() -> Self {
            Self {
                env: HashMap::new(),
                args: vec!["/opt/app/bundled".to_string()],
                cluster_setup_calls: 0,
                evaluated: None,
            }
        }
    }

    impl RuntimeHost for MockHost {
        fn exec_path(&self) -> PathBuf {
            PathBuf::from("/opt/app/bundled")
        }

        fn env_var(&self, key: &str) -> Option<String> {
            self.env.get(key).cloned()
        }

        fn env_remove(&mut self, key: &str) {
            self.env.remove(key);
        }

        fn insert_arg(&mut self, index: usize, arg: String) {
            self.args.insert(index, arg);
        }

        fn setup_cluster_worker(&mut self) -> Result<(), String> {
            self.cluster_setup_calls += 1;
            Ok(())
        }

        fn eval_main(&mut self, filename: &Path, source: &[u8]) -> Result<(), String> {
            self.evaluated = Some((filename.to_path_buf(), source.to_vec()));
            Ok(())
        }
    }

    /// Module table holding an encoded payload plus placeholder padding,
    /// exactly as a patched carrier would.
    fn table_with_payload(name: &str, source: &[u8], padding: usize) -> MapTable {
        let mut bytes = unibin_core::encode(name, source).unwrap();
        bytes.extend(std::iter::repeat(0u8).take(padding));
        let mut map = HashMap::new();
        map.insert(RESERVED_MODULE.to_string(), bytes);
        MapTable(map)
    }

    #[test]
    fn test_standalone_recovers_and_shapes_argv() {
        let source = b"0123456789";
        let table = table_with_payload("demo", source, 512);
        let mut host = MockHost::new();

        run(&table, &mut host).unwrap();

        let (filename, evaluated) = host.evaluated.expect("program evaluated");
        assert_eq!(filename, PathBuf::from("/opt/app/demo.js"));
        assert_eq!(evaluated, source);
        assert_eq!(host.args, vec!["/opt/app/bundled", "/opt/app/demo.js"]);
        assert_eq!(host.cluster_setup_calls, 0);
    }

    #[test]
    fn test_worker_routes_through_cluster_setup() {
        let table = table_with_payload("demo", b"0123456789", 64);
        let mut host = MockHost::new();
        host.env
            .insert(WORKER_ID_ENV.to_string(), "1".to_string());

        run(&table, &mut host).unwrap();

        // Cluster entry point invoked, argv untouched, signal cleared.
        assert_eq!(host.cluster_setup_calls, 1);
        assert_eq!(host.args, vec!["/opt/app/bundled"]);
        assert!(host.env.get(WORKER_ID_ENV).is_none());
        assert!(host.evaluated.is_some());
    }

    #[test]
    fn test_recover_without_padding() {
        // Exact payload with no zero tail still decodes.
        let table = table_with_payload("demo", b"abc", 0);
        let payload = recover_payload(&table).unwrap();
        assert_eq!(payload.name, "demo");
        assert_eq!(payload.source, b"abc");
    }

    #[test]
    fn test_missing_module() {
        let table = MapTable(HashMap::new());
        assert!(matches!(
            recover_payload(&table),
            Err(BootstrapError::MissingModule(_))
        ));
    }

    #[test]
    fn test_corrupt_payload_is_fatal_error() {
        let mut map = HashMap::new();
        map.insert(
            RESERVED_MODULE.to_string(),
            b"not a valid payload at all\0\0\0".to_vec(),
        );
        let table = MapTable(map);
        let mut host = MockHost::new();

        let result = run(&table, &mut host);
        assert!(matches!(result, Err(BootstrapError::Corrupt(_))));
        assert!(host.evaluated.is_none());
    }
}

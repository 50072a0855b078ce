//! ConfigBridge core: validate a configuration request, resolve it against a
//! store, and launch the target application with the values.
//!
//! The stages are independent and wired together by the `configbridge`
//! binary:
//!
//! ```text
//! request JSON -> validate -> ConfigResolver -> InvocationBuilder -> ProcessRunner
//! ```

pub mod error;
pub mod fs;
pub mod invocation;
pub mod process;
pub mod request;
pub mod resolver;
pub mod runner;
pub mod runtime_env;
pub mod store;

pub use error::{BridgeError, BridgeResult, StoreError};
pub use fs::{FileSystem, OsFileSystem};
pub use invocation::{InvocationBuilder, InvocationSpec, Transport, RUNTIME_LAUNCHER};
pub use process::{ConsoleSink, OutputSink, ProcessLauncher, RunningProcess, SystemLauncher};
pub use request::{validate, ConfigKind, ConfigRequest, MAX_REQUEST_CHARS};
pub use resolver::{ConfigResolver, ResolvedValues};
pub use runner::{ProcessOutcome, ProcessRunner, RunState};
pub use runtime_env::RuntimeEnv;
pub use store::{ConfigStore, EnvStore, MemoryStore, TomlFileStore};

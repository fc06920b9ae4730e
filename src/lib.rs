// Crate root: declare modules and control visibility
pub mod adb;
pub mod cli;
pub mod session;
pub mod vscode;

// Re-export commonly used API from the library for binaries/tests
pub use adb::{CommandRunner, Gateway, GatewayConfig, GatewayError};
pub use session::{Session, SessionError, SessionParams, Step};
pub use vscode::{splice, MarkerPair, SpliceError};

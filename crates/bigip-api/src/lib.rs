// bigip-api: Async Rust client for the F5 BIG-IP iControl REST surface
//
// Session, auth, transparent retry and the raw endpoint families the
// deployment engines in `bigip-core` are built on.

pub mod authn;
pub mod cm;
pub mod error;
pub mod file_transfer;
pub mod iapp;
pub mod models;
pub mod session;
pub mod sys;
pub mod transport;
pub mod util;
pub mod wire;

pub use error::Error;
pub use file_transfer::UploadedFile;
pub use models::{PackageOperation, PackageTask};
pub use session::{AUTH_TOKEN_HEADER, Session};
pub use transport::{RetryPolicy, TlsMode, TransportConfig};
pub use wire::{TracingWireHook, WireExchange, WireHook};

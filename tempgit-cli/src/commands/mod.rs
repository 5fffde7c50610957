//! CLI command implementations

pub mod clone;
pub mod init;
pub mod session;

pub use clone::CloneArgs;
pub use init::InitArgs;

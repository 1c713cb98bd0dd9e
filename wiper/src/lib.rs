//! # wiper
//!
//! Provision Cisco APICs through the CIMC Serial-Over-LAN console.
//!
//! wiper opens two SSH sessions to a controller's CIMC: one for the CIMC shell,
//! one relaying the APIC serial console. It makes sure SOL is set up, reaches
//! the console (power cycling the host when it stays silent), erases any
//! previous setup, and answers the first-boot setup wizard.
//!
//! ## Features
//!
//! - Async SSH sessions via russh, with keepalives across long reboots
//! - Expect-style prompt matching on escape-stripped console output
//! - An explicit state graph: prompts arriving out of order stop the run
//! - Per-target TOML configuration with a shared `[DEFAULT]` table
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use secrecy::{ExposeSecret, SecretString};
//! use wiper::{ConfigFile, Options, Provisioner, SshConfig, SshConnector, TargetConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), wiper::Error> {
//!     let file = ConfigFile::load(Path::new("wiper.toml"))?;
//!     let cli = Options {
//!         cimc_ip: Some("172.16.176.191".to_string()),
//!         ..Options::default()
//!     };
//!     let target = TargetConfig::resolve(cli, file.as_ref())?;
//!
//!     let ssh = SshConfig::new(
//!         target.cimc_ip.clone(),
//!         target.cimc_username.clone(),
//!         SecretString::from(target.cimc_password.expose_secret().to_string()),
//!     );
//!     let mut provisioner = Provisioner::new(target, SshConnector::new(ssh));
//!     provisioner.run().await
//! }
//! ```

pub mod channel;
pub mod config;
pub mod driver;
pub mod error;
pub mod provision;
pub mod transport;

// Re-export main types for convenience
pub use channel::{Session, SessionKind};
pub use config::{ConfigFile, Options, TargetConfig};
pub use error::{Error, Result};
pub use provision::{Provisioner, State, Trigger};
pub use transport::{HostKeyVerification, SshConfig, SshConnector};

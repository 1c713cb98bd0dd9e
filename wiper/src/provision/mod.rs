//! APIC provisioning over the CIMC Serial-Over-LAN console.
//!
//! [`Provisioner`] walks a fixed [`StateGraph`]: bring up the CIMC sessions,
//! make sure SOL is set up, reach the APIC console (power cycling the host if
//! it stays silent), erase the old setup, and answer the setup wizard.

use std::time::Duration;

mod machine;
pub mod prompts;
mod sol;
mod state;


pub use machine::Provisioner;
pub use sol::{REQUIRED_BAUD_RATE, REQUIRED_COM_PORT, SolStatus};
pub use state::{State, StateGraph, TRANSITIONS, Transition, Trigger};

/// Time allowed for `commit` in the CIMC SOL scope.
pub const COMMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Time allowed for a login that may race the end of a boot.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Time allowed for the APIC to reboot.
pub const REBOOT_TIMEOUT: Duration = Duration::from_secs(600);

/// Pause before reconfiguring SOL.
pub const SOL_RETRY_DELAY: Duration = Duration::from_secs(3);

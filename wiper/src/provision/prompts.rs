//! Prompt patterns seen on the CIMC shell and the APIC console.
//!
//! All patterns are matched against the escape-stripped session output.

// CIMC management shell.
pub const CIMC: &str = r".*C220.*# ";
pub const CIMC_TOP: &str = r"C220-.*# ";
pub const CIMC_SOL_SCOPE: &str = r"C220-.* /sol # ";
pub const CIMC_SOL_UNCOMMITTED: &str = r"C220-.* /sol \*# ";
pub const CIMC_CHASSIS_SCOPE: &str = r"C220-.* /chassis # ";
pub const CIMC_POWER_CYCLE_CONFIRM: &str = r".*Do you want to continue\?\[.*\].*";

// APIC console, outside the setup wizard.
pub const LOGIN: &str = r".*login:.*";
pub const PASSWORD: &str = r".*Password:.*";
pub const SHELL: &str = r".*:~> ";
pub const SHELL_AFTER_LOGIN: &str = r".*~> .*";
pub const PRESS_ANY_KEY: &str = r".*Press any key to continue....*";
pub const ERASE_CONFIRM: &str =
    r".*Do you want to cleanup the initial setup data\? The system will be REBOOTED. \(Y/n\):.*";

// Setup wizard fields, in the order the wizard asks them.
pub const FABRIC_NAME: &str = r".*Enter the fabric name \[.*\]:.*";
pub const CONTROLLER_COUNT: &str =
    r".*Enter the number of controllers in the fabric \(1-[1-9]\) \[[0-9]+]:.*";
pub const CONTROLLER_ID: &str = r".*Enter the controller ID \(1-[1-9]\) \[[0-9]+\]:.*";
pub const CONTROLLER_NAME: &str = r".*Enter the controller name \[.*\]:.*";
pub const TEP_ADDRESS_POOL: &str = r".*Enter address pool for TEP addresses \[.*\]:.*";
pub const INFRA_VLAN_ID: &str = r".*Enter the VLAN ID for infra network \(1-4094\).*:.*";
pub const MULTICAST_POOL: &str =
    r".*Enter address pool for BD multicast addresses \(GIPO\) \[.*\]:.*";
pub const OOB_ADDRESS: &str = r".*Enter the IP address \[.*\].*";
pub const OOB_GATEWAY: &str = r".*Enter the IP address of the default gateway \[.*\]:.*";
pub const INTERFACE_SPEED: &str = r".*Enter the interface speed/duplex mode \[.*\]:.*";
pub const STRONG_PASSWORDS: &str = r".*Enable strong passwords\? \[.*\]:.*";
pub const ADMIN_PASSWORD: &str = r".*Enter the password for admin:.*";
pub const REENTER_ADMIN_PASSWORD: &str = r".*Reenter the password for admin:.*";
pub const EDIT_CONFIG: &str = r".*Would you like to edit the configuration\? \(y/n\) \[.*\].*";

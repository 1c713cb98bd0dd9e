use std::path::PathBuf;

use clap::builder::PossibleValuesParser;
use clap::{Parser, ValueEnum};

use wiper::config::{DEFAULT_CONFIG_FILE, INT_SPEEDS, Options, STRONG_PASSWORD_ANSWERS};
use wiper::HostKeyVerification;

#[derive(Parser, Debug)]
#[command(
    name = "wiper",
    about = "Provision APICs via CIMC Serial Over LAN",
    version
)]
pub struct Cli {
    /// CIMC hostname or IP address used to ssh to CIMC
    pub cimc_ip: String,

    /// Config file with DEFAULT and per-CIMC settings
    #[arg(short = 'i', long, alias = "ini-file", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,

    /// CIMC username
    #[arg(long, alias = "cimc_username")]
    pub cimc_username: Option<String>,

    /// CIMC password
    #[arg(long, alias = "cimc_password")]
    pub cimc_password: Option<String>,

    /// The APIC admin user password to enter into the APIC setup script
    #[arg(long, alias = "apic_admin_password")]
    pub apic_admin_password: Option<String>,

    /// The fabric name to enter into the APIC setup script
    #[arg(long)]
    pub fabric_name: Option<String>,

    /// The number of controllers to enter into the APIC setup script
    #[arg(long)]
    pub number_of_controllers: Option<String>,

    /// The controller number (id) to enter into the APIC setup script
    #[arg(long, alias = "controller_number")]
    pub controller_number: Option<String>,

    /// The controller name; `{controller_number}` is replaced by the id
    #[arg(long)]
    pub controller_name: Option<String>,

    /// The TEP address pool to enter into the APIC setup script
    #[arg(long)]
    pub tep_address_pool: Option<String>,

    /// The infra VLAN id to enter into the APIC setup script
    #[arg(long)]
    pub infra_vlan_id: Option<String>,

    /// The bridge domain multicast address range
    #[arg(long)]
    pub bd_mc_addresses: Option<String>,

    /// The APIC out-of-band IP address and prefix length
    #[arg(long)]
    pub oob_ip_address: Option<String>,

    /// The APIC out-of-band default gateway
    #[arg(long)]
    pub oob_default_gateway: Option<String>,

    /// Interface speed/duplex mode
    #[arg(long, value_parser = PossibleValuesParser::new(INT_SPEEDS))]
    pub int_speed: Option<String>,

    /// Strong password option to enter into the APIC setup script
    #[arg(long, value_parser = PossibleValuesParser::new(STRONG_PASSWORD_ANSWERS))]
    pub strong_passwords: Option<String>,

    /// The APIC is a simulator
    #[arg(long)]
    pub simulator: bool,

    /// Enable debugging and echo console output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only report warnings and errors
    #[arg(short, long)]
    pub quiet: bool,

    /// CIMC SSH port
    #[arg(long, default_value_t = 22)]
    pub port: u16,

    /// SSH connect timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// How to treat CIMC host keys
    #[arg(long, value_enum, default_value_t = HostKeyChecking::AcceptNew)]
    pub host_key_checking: HostKeyChecking,

    /// known_hosts file (default: ~/.ssh/known_hosts)
    #[arg(long)]
    pub known_hosts: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostKeyChecking {
    Strict,
    AcceptNew,
    Off,
}

impl From<HostKeyChecking> for HostKeyVerification {
    fn from(mode: HostKeyChecking) -> Self {
        match mode {
            HostKeyChecking::Strict => HostKeyVerification::Strict,
            HostKeyChecking::AcceptNew => HostKeyVerification::AcceptNew,
            HostKeyChecking::Off => HostKeyVerification::Disabled,
        }
    }
}

impl Cli {
    /// Options given on the command line; unset flags stay unset.
    ///
    /// `-v` and `-q` are set together so either one overrides both file values.
    pub fn options(&self) -> Options {
        let verbosity_given = self.verbose || self.quiet;
        Options {
            cimc_ip: Some(self.cimc_ip.clone()),
            cimc_username: self.cimc_username.clone(),
            cimc_password: self.cimc_password.clone(),
            apic_admin_password: self.apic_admin_password.clone(),
            fabric_name: self.fabric_name.clone(),
            number_of_controllers: self.number_of_controllers.clone(),
            controller_number: self.controller_number.clone(),
            controller_name: self.controller_name.clone(),
            tep_address_pool: self.tep_address_pool.clone(),
            infra_vlan_id: self.infra_vlan_id.clone(),
            bd_mc_addresses: self.bd_mc_addresses.clone(),
            oob_ip_address: self.oob_ip_address.clone(),
            oob_default_gateway: self.oob_default_gateway.clone(),
            int_speed: self.int_speed.clone(),
            strong_passwords: self.strong_passwords.clone(),
            verbose: verbosity_given.then_some(self.verbose),
            quiet: verbosity_given.then_some(self.quiet),
            simulator: self.simulator.then_some(true),
        }
    }
}

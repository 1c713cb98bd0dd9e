//! `wiper`: provision an APIC through its CIMC.
//!
//! ```bash
//! wiper 172.16.176.191 -i wiper.toml
//! wiper 172.16.176.191 --cimc-password secret --controller-number 2 -v
//! ```

mod cli;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::{error, info};
use secrecy::{ExposeSecret, SecretString};

use cli::Cli;
use wiper::error::ConfigError;
use wiper::{ConfigFile, Error, Provisioner, SshConfig, SshConnector, TargetConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let file = ConfigFile::load(&cli.config_file);

    // RUST_LOG overrides the verbosity options.
    let level = match &file {
        Ok(Some(file)) => cli.options().or(file.options_for(&cli.cimc_ip)).log_level(),
        _ => cli.options().log_level(),
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli, file).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Unable to complete provisioning: {e}");
            if let Error::Config(ConfigError::Missing { .. }) = &e {
                error!("These can also be set in the config file.");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, file: Result<Option<ConfigFile>, ConfigError>) -> wiper::Result<()> {
    let file = file?;
    match &file {
        Some(file) if !file.has_target(&cli.cimc_ip) => info!(
            "No section for {} in {}, using its DEFAULT section.",
            cli.cimc_ip,
            cli.config_file.display()
        ),
        Some(_) => {}
        None => info!(
            "Config file {} not found, using command line options only.",
            cli.config_file.display()
        ),
    }

    let target = TargetConfig::resolve(cli.options(), file.as_ref())?;

    let mut ssh = SshConfig::new(
        target.cimc_ip.clone(),
        target.cimc_username.clone(),
        SecretString::from(target.cimc_password.expose_secret().to_string()),
    );
    ssh.port = cli.port;
    ssh.timeout = Duration::from_secs(cli.timeout);
    ssh.host_key_verification = cli.host_key_checking.into();
    ssh.known_hosts_path = cli.known_hosts;

    let mut provisioner = Provisioner::new(target, SshConnector::new(ssh));
    provisioner.run().await
}

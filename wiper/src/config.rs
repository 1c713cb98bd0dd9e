//! Target configuration: CLI flags, a per-target TOML file, and defaults.
//!
//! ```toml
//! [DEFAULT]
//! cimc_username = "admin"
//! controller_name = "apic{controller_number}"
//! number_of_controllers = 3
//!
//! ["172.16.176.191"]
//! controller_number = 3
//! oob_ip_address = "172.16.176.192/24"
//! ```
//!
//! Each option is taken from the first source that sets it: CLI flag, then
//! the table named after the CIMC address, then `[DEFAULT]`.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::Path;

use secrecy::SecretString;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::error::ConfigError;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "wiper.toml";

/// Name of the table whose values apply to every target.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Placeholder in `controller_name` replaced by the controller number.
pub const CONTROLLER_NUMBER_PLACEHOLDER: &str = "{controller_number}";

/// Interface speed/duplex values the wizard accepts.
pub const INT_SPEEDS: [&str; 6] = [
    "auto",
    "10baseT/Half",
    "10baseT/Full",
    "100baseT/Half",
    "100baseT/Full",
    "1000baseT/Full",
];

/// Answers to the strong-password question.
pub const STRONG_PASSWORD_ANSWERS: [&str; 2] = ["Y", "n"];

/// Options from one source, any of which may be unset.
///
/// File values may be strings, integers or booleans; all are kept as text
/// until [`TargetConfig::resolve`] checks them.
#[derive(Default, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
    #[serde(deserialize_with = "scalar")]
    pub cimc_ip: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub cimc_username: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub cimc_password: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub apic_admin_password: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub fabric_name: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub number_of_controllers: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub controller_number: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub controller_name: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub tep_address_pool: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub infra_vlan_id: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub bd_mc_addresses: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub oob_ip_address: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub oob_default_gateway: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub int_speed: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub strong_passwords: Option<String>,
    #[serde(deserialize_with = "flag")]
    pub verbose: Option<bool>,
    #[serde(deserialize_with = "flag")]
    pub quiet: Option<bool>,
    #[serde(deserialize_with = "flag")]
    pub simulator: Option<bool>,
}

impl Options {
    /// Fill every option unset in `self` from `fallback`.
    pub fn or(self, fallback: Options) -> Options {
        Options {
            cimc_ip: self.cimc_ip.or(fallback.cimc_ip),
            cimc_username: self.cimc_username.or(fallback.cimc_username),
            cimc_password: self.cimc_password.or(fallback.cimc_password),
            apic_admin_password: self.apic_admin_password.or(fallback.apic_admin_password),
            fabric_name: self.fabric_name.or(fallback.fabric_name),
            number_of_controllers: self.number_of_controllers.or(fallback.number_of_controllers),
            controller_number: self.controller_number.or(fallback.controller_number),
            controller_name: self.controller_name.or(fallback.controller_name),
            tep_address_pool: self.tep_address_pool.or(fallback.tep_address_pool),
            infra_vlan_id: self.infra_vlan_id.or(fallback.infra_vlan_id),
            bd_mc_addresses: self.bd_mc_addresses.or(fallback.bd_mc_addresses),
            oob_ip_address: self.oob_ip_address.or(fallback.oob_ip_address),
            oob_default_gateway: self.oob_default_gateway.or(fallback.oob_default_gateway),
            int_speed: self.int_speed.or(fallback.int_speed),
            strong_passwords: self.strong_passwords.or(fallback.strong_passwords),
            verbose: self.verbose.or(fallback.verbose),
            quiet: self.quiet.or(fallback.quiet),
            simulator: self.simulator.or(fallback.simulator),
        }
    }

    /// Log filter for the merged verbosity options; `quiet` wins over `verbose`.
    pub fn log_level(&self) -> &'static str {
        if self.quiet.unwrap_or(false) {
            "warn"
        } else if self.verbose.unwrap_or(false) {
            "debug"
        } else {
            "info"
        }
    }
}

/// A parsed config file: the `[DEFAULT]` table and one table per target.
#[derive(Default)]
pub struct ConfigFile {
    sections: HashMap<String, Options>,
}

impl ConfigFile {
    /// Parse config file contents.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let sections: HashMap<String, Options> = toml::from_str(contents)?;
        Ok(Self { sections })
    }

    /// Load a config file. A file that does not exist yields `None`.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::parse(&contents).map(Some)
    }

    /// Options for `cimc_ip`, its own table taking precedence over `[DEFAULT]`.
    pub fn options_for(&self, cimc_ip: &str) -> Options {
        let defaults = self.sections.get(DEFAULT_SECTION).cloned().unwrap_or_default();
        match self.sections.get(cimc_ip) {
            Some(target) => target.clone().or(defaults),
            None => defaults,
        }
    }

    /// Whether the file has a table for `cimc_ip`.
    pub fn has_target(&self, cimc_ip: &str) -> bool {
        self.sections.contains_key(cimc_ip)
    }
}

/// Everything one provisioning run needs, fully resolved.
pub struct TargetConfig {
    pub cimc_ip: String,
    pub cimc_username: String,
    pub cimc_password: SecretString,
    pub apic_admin_password: SecretString,
    pub fabric_name: String,
    pub number_of_controllers: u8,
    pub controller_number: u8,
    pub controller_name: String,
    pub tep_address_pool: String,
    pub infra_vlan_id: String,
    pub bd_mc_addresses: String,
    pub oob_ip_address: String,
    pub oob_default_gateway: String,
    pub int_speed: String,
    pub strong_passwords: String,
    pub simulator: bool,
}

impl TargetConfig {
    /// Resolve CLI options against an optional config file.
    ///
    /// Every missing required option is reported at once.
    pub fn resolve(cli: Options, file: Option<&ConfigFile>) -> Result<Self, ConfigError> {
        let fallback = match (file, &cli.cimc_ip) {
            (Some(file), Some(ip)) => file.options_for(ip),
            _ => Options::default(),
        };
        let merged = cli.or(fallback);

        let mut missing = Vec::new();
        let mut take = |value: Option<String>, option: &str| {
            if value.is_none() {
                missing.push(format!("--{option}"));
            }
            value.unwrap_or_default()
        };

        let controller_number = take(merged.controller_number, "controller-number");
        let strong_passwords = take(merged.strong_passwords, "strong-passwords");
        let infra_vlan_id = take(merged.infra_vlan_id, "infra-vlan-id");
        let cimc_ip = take(merged.cimc_ip, "cimc-ip");
        let fabric_name = take(merged.fabric_name, "fabric-name");
        let cimc_username = take(merged.cimc_username, "cimc-username");
        let controller_name = take(merged.controller_name, "controller-name");
        let apic_admin_password = take(merged.apic_admin_password, "apic-admin-password");
        let bd_mc_addresses = take(merged.bd_mc_addresses, "bd-mc-addresses");
        let cimc_password = take(merged.cimc_password, "cimc-password");
        let oob_default_gateway = take(merged.oob_default_gateway, "oob-default-gateway");
        let int_speed = take(merged.int_speed, "int-speed");
        let oob_ip_address = take(merged.oob_ip_address, "oob-ip-address");
        let tep_address_pool = take(merged.tep_address_pool, "tep-address-pool");
        let number_of_controllers = take(merged.number_of_controllers, "number-of-controllers");

        if !missing.is_empty() {
            return Err(ConfigError::Missing { options: missing });
        }

        let controller_number = parse_number("controller-number", &controller_number)?;
        let number_of_controllers = parse_number("number-of-controllers", &number_of_controllers)?;
        let controller_name = controller_name.replace(
            CONTROLLER_NUMBER_PLACEHOLDER,
            &controller_number.to_string(),
        );

        Ok(Self {
            cimc_ip,
            cimc_username,
            cimc_password: SecretString::from(cimc_password),
            apic_admin_password: SecretString::from(apic_admin_password),
            fabric_name,
            number_of_controllers,
            controller_number,
            controller_name,
            tep_address_pool,
            infra_vlan_id,
            bd_mc_addresses,
            oob_ip_address,
            oob_default_gateway,
            int_speed,
            strong_passwords,
            simulator: merged.simulator.unwrap_or(false),
        })
    }
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("cimc_ip", &self.cimc_ip)
            .field("cimc_username", &self.cimc_username)
            .field("fabric_name", &self.fabric_name)
            .field("number_of_controllers", &self.number_of_controllers)
            .field("controller_number", &self.controller_number)
            .field("controller_name", &self.controller_name)
            .field("tep_address_pool", &self.tep_address_pool)
            .field("infra_vlan_id", &self.infra_vlan_id)
            .field("bd_mc_addresses", &self.bd_mc_addresses)
            .field("oob_ip_address", &self.oob_ip_address)
            .field("oob_default_gateway", &self.oob_default_gateway)
            .field("int_speed", &self.int_speed)
            .field("strong_passwords", &self.strong_passwords)
            .finish_non_exhaustive()
    }
}

fn parse_number(option: &str, value: &str) -> Result<u8, ConfigError> {
    value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        option: option.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, integer or boolean")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
        Ok(if v { "True" } else { "False" }.to_string())
    }
}

fn scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    deserializer.deserialize_any(ScalarVisitor).map(Some)
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let value = deserializer.deserialize_any(ScalarVisitor)?;
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(Some(true)),
        "false" | "no" | "off" | "0" => Ok(Some(false)),
        _ => Err(de::Error::invalid_value(
            de::Unexpected::Str(&value),
            &"a boolean",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const FILE: &str = r#"
[DEFAULT]
simulator = false
cimc_username = "admin"
cimc_password = "password"
fabric_name = "ACI Fabric1"
controller_number = 1
number_of_controllers = 3
controller_name = "apic{controller_number}"
tep_address_pool = "10.0.0.0/16"
infra_vlan_id = 4093
bd_mc_addresses = "225.0.0.0/15"
oob_ip_address = "192.168.10.1/24"
oob_default_gateway = "192.168.10.254"
int_speed = "auto"
strong_passwords = "Y"
apic_admin_password = "p@s$w0rd"

["172.16.176.191"]
cimc_password = "ins3965!"
controller_number = 3
oob_ip_address = "172.16.176.192/24"
oob_default_gateway = "172.16.176.1"
apic_admin_password = "ins3965!"
"#;

    fn cli(ip: &str) -> Options {
        Options {
            cimc_ip: Some(ip.to_string()),
            ..Options::default()
        }
    }

    #[test]
    fn test_defaults_only() {
        let file = ConfigFile::parse(FILE).unwrap();
        let config = TargetConfig::resolve(cli("10.1.1.1"), Some(&file)).unwrap();

        assert_eq!(config.cimc_ip, "10.1.1.1");
        assert_eq!(config.cimc_username, "admin");
        assert_eq!(config.controller_number, 1);
        assert_eq!(config.number_of_controllers, 3);
        assert_eq!(config.controller_name, "apic1");
        assert_eq!(config.infra_vlan_id, "4093");
        assert_eq!(config.apic_admin_password.expose_secret(), "p@s$w0rd");
        assert_eq!(config.controller_number, 1);
        assert!(!config.simulator);
    }

    #[test]
    fn test_target_section_overrides_default() {
        let file = ConfigFile::parse(FILE).unwrap();
        assert!(file.has_target("172.16.176.191"));
        let config = TargetConfig::resolve(cli("172.16.176.191"), Some(&file)).unwrap();

        assert_eq!(config.controller_number, 3);
        assert_eq!(config.controller_name, "apic3");
        assert_eq!(config.oob_ip_address, "172.16.176.192/24");
        assert_eq!(config.cimc_password.expose_secret(), "ins3965!");
        // Not set in the target table.
        assert_eq!(config.fabric_name, "ACI Fabric1");
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = ConfigFile::parse(FILE).unwrap();
        let options = Options {
            controller_number: Some("2".to_string()),
            fabric_name: Some("Lab".to_string()),
            ..cli("172.16.176.191")
        };
        let config = TargetConfig::resolve(options, Some(&file)).unwrap();

        assert_eq!(config.controller_number, 2);
        assert_eq!(config.controller_name, "apic2");
        assert_eq!(config.fabric_name, "Lab");
        assert_eq!(config.oob_default_gateway, "172.16.176.1");
    }

    #[test]
    fn test_verbosity_from_file() {
        let file = ConfigFile::parse(
            "[DEFAULT]\nverbose = true\n\n[\"10.2.2.2\"]\nquiet = \"yes\"\n",
        )
        .unwrap();

        assert_eq!(file.options_for("10.1.1.1").log_level(), "debug");
        assert_eq!(file.options_for("10.2.2.2").log_level(), "warn");
        assert_eq!(Options::default().log_level(), "info");

        // Flags given on the command line are set as a pair and win.
        let flags = Options {
            verbose: Some(true),
            quiet: Some(false),
            ..cli("10.2.2.2")
        };
        assert_eq!(flags.or(file.options_for("10.2.2.2")).log_level(), "debug");
    }

    #[test]
    fn test_file_is_not_consulted_without_an_address() {
        let file = ConfigFile::parse(FILE).unwrap();
        let err = TargetConfig::resolve(Options::default(), Some(&file)).unwrap_err();
        let ConfigError::Missing { options } = err else {
            panic!("expected missing options");
        };
        assert_eq!(options.len(), 15);
        assert!(options.contains(&"--cimc-ip".to_string()));
    }

    #[test]
    fn test_explicit_controller_name_is_kept() {
        let file = ConfigFile::parse(FILE).unwrap();
        let options = Options {
            controller_name: Some("pod1-apic".to_string()),
            ..cli("10.1.1.1")
        };
        let config = TargetConfig::resolve(options, Some(&file)).unwrap();
        assert_eq!(config.controller_name, "pod1-apic");
    }

    #[test]
    fn test_missing_options_reported_together() {
        let options = Options {
            fabric_name: Some("ACI Fabric1".to_string()),
            ..cli("10.1.1.1")
        };
        let err = TargetConfig::resolve(options, None).unwrap_err();
        let ConfigError::Missing { options } = err else {
            panic!("expected missing options");
        };
        assert_eq!(options.len(), 13);
        assert_eq!(options[0], "--controller-number");
        assert!(options.contains(&"--cimc-password".to_string()));
        assert!(!options.contains(&"--fabric-name".to_string()));
        assert!(!options.contains(&"--cimc-ip".to_string()));
    }

    #[test]
    fn test_invalid_number() {
        let file = ConfigFile::parse(FILE).unwrap();
        let options = Options {
            number_of_controllers: Some("three".to_string()),
            ..cli("10.1.1.1")
        };
        let err = TargetConfig::resolve(options, Some(&file)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { ref option, .. } if option == "number-of-controllers"
        ));
    }

    #[test]
    fn test_flag_accepts_strings() {
        let file = ConfigFile::parse("[DEFAULT]\nsimulator = \"True\"\nquiet = true\n").unwrap();
        let options = file.options_for("10.1.1.1");
        assert_eq!(options.simulator, Some(true));
        assert_eq!(options.quiet, Some(true));
        assert_eq!(options.verbose, None);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            ConfigFile::parse("[DEFAULT]\nsimulator = \"maybe\"\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(ConfigFile::parse("[DEFAULT\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("wiper-test-does-not-exist.toml");
        assert!(ConfigFile::load(&path).unwrap().is_none());
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("wiper-test-{}.toml", std::process::id()));
        std::fs::write(&path, FILE).unwrap();
        let file = ConfigFile::load(&path).unwrap().unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(file.options_for("10.1.1.1").int_speed.as_deref(), Some("auto"));
    }

    #[test]
    fn test_debug_hides_passwords() {
        let file = ConfigFile::parse(FILE).unwrap();
        let config = TargetConfig::resolve(cli("10.1.1.1"), Some(&file)).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("p@s$w0rd"));
        assert!(!debug.contains("password\""));
    }
}

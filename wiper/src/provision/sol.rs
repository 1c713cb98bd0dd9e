//! Parser for the CIMC `show sol` table.

use crate::error::ProtocolError;

/// Baud rate the APIC console runs at.
pub const REQUIRED_BAUD_RATE: &str = "115200";

/// Serial port the APIC console is attached to.
pub const REQUIRED_COM_PORT: &str = "com0";

/// The status row of `show sol`.
///
/// ```text
/// Enabled Baud Rate(bps)  Com Port SOL SSH Port
/// ------- --------------- -------- ------------
/// yes     115200          com0     2400
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolStatus {
    pub enabled: String,
    pub baud_rate: String,
    pub com_port: String,
}

impl SolStatus {
    /// Parse the clean output of `show sol`.
    ///
    /// The row following the `Enabled ... Baud Rate` header (and its dashed
    /// separator) must have at least three whitespace-separated fields.
    pub fn parse(output: &str) -> Result<Self, ProtocolError> {
        let malformed = || ProtocolError::MalformedSolStatus {
            output: output.to_string(),
        };

        let mut lines = output.lines().map(str::trim);
        lines
            .by_ref()
            .find(|line| line.contains("Enabled") && line.contains("Baud"))
            .ok_or_else(malformed)?;

        let row = lines
            .find(|line| !line.is_empty() && !line.chars().all(|c| c == '-' || c.is_whitespace()))
            .ok_or_else(malformed)?;

        let mut fields = row.split_whitespace();
        match (fields.next(), fields.next(), fields.next()) {
            (Some(enabled), Some(baud_rate), Some(com_port)) => Ok(Self {
                enabled: enabled.to_string(),
                baud_rate: baud_rate.to_string(),
                com_port: com_port.to_string(),
            }),
            _ => Err(malformed()),
        }
    }

    /// Whether SOL is enabled at the console's baud rate on its port.
    pub fn is_configured(&self) -> bool {
        self.enabled.contains("yes")
            && self.baud_rate.contains(REQUIRED_BAUD_RATE)
            && self.com_port.contains(REQUIRED_COM_PORT)
    }
}

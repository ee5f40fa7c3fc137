use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use num::bigint::BigUint;
use num::Zero;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attack::{CoarseConfig, DEFAULT_PROGRESS_INTERVAL};
use crate::oracle::{KeyProfile, OracleType, PublicKeyInfo};

/// Configuration errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Attack variant to run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Bleichenbacher's original algorithm
    #[default]
    Canonical,
    /// Original algorithm after trimming the initial interval
    Trimming,
    /// Experimental search for coarse (BigIP-style) oracles
    Coarse,
}

/// Which oracle answers the queries
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OracleKind {
    #[default]
    Plaintext,
    Rsa,
    Command,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackSection {
    pub variant: Variant,
    pub msg_is_pkcs: bool,
    pub progress_interval: u64,
    /// Largest trimmer t tried by the trimming variant
    pub max_trimmer: u64,
    /// Zero means unbounded
    pub query_limit: u64,
}

impl Default for AttackSection {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            msg_is_pkcs: true,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            max_trimmer: 1500,
            query_limit: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    pub kind: OracleKind,
    /// Checks the oracle enforces, also declared for command oracles
    pub oracle_type: OracleType,
    /// Key generated for the plaintext and rsa oracles
    pub key: KeyProfile,
    /// Command oracle program
    pub program: Option<PathBuf>,
    pub args: Vec<String>,
    /// Whether the command oracle takes plaintexts instead of ciphertexts
    pub plaintext: bool,
    /// Hex modulus of the command oracle's target
    pub modulus: Option<String>,
    /// Hex public exponent of the command oracle's target
    pub exponent: String,
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            kind: OracleKind::default(),
            oracle_type: OracleType::default(),
            key: KeyProfile::default(),
            program: None,
            args: Vec::new(),
            plaintext: false,
            modulus: None,
            exponent: "010001".into(),
        }
    }
}

/// Attack profile, usually loaded from a TOML file
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackConfig {
    pub attack: AttackSection,
    pub coarse: CoarseConfig,
    pub oracle: OracleSection,
}

impl AttackConfig {
    /// Load and validate a config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Render the config as TOML
    pub fn to_toml(&self) -> Result<String, Error> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject inconsistent profiles
    pub fn validate(&self) -> Result<(), Error> {
        if self.coarse.start == 0 || self.coarse.start >= self.coarse.cap {
            return Err(Error::Invalid(format!(
                "coarse.start ({}) must be in [1, coarse.cap ({}))",
                self.coarse.start, self.coarse.cap
            )));
        }
        if self.attack.variant == Variant::Trimming && self.attack.max_trimmer < 5 {
            return Err(Error::Invalid("attack.max_trimmer must be at least 5".into()));
        }

        match self.oracle.kind {
            OracleKind::Command => {
                if self.oracle.program.is_none() {
                    return Err(Error::Invalid("command oracle requires oracle.program".into()));
                }
                self.command_public_key()?;
            }
            OracleKind::Plaintext | OracleKind::Rsa => {
                if let KeyProfile::Small { bits } = self.oracle.key {
                    if bits < 8 * 16 {
                        return Err(Error::Invalid(format!("key of {} bits is too small", bits)));
                    }
                }
            }
        }

        Ok(())
    }

    /// Public key of the command oracle's target
    pub fn command_public_key(&self) -> Result<PublicKeyInfo, Error> {
        let modulus = self
            .oracle
            .modulus
            .as_deref()
            .ok_or_else(|| Error::Invalid("command oracle requires oracle.modulus".into()))?;

        let n = parse_hex("oracle.modulus", modulus)?;
        let e = parse_hex("oracle.exponent", &self.oracle.exponent)?;
        if n.is_zero() || e.is_zero() {
            return Err(Error::Invalid("modulus and exponent must be non-zero".into()));
        }

        Ok(PublicKeyInfo::new(n, e))
    }
}

impl FromStr for AttackConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: AttackConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

fn parse_hex(field: &str, value: &str) -> Result<BigUint, Error> {
    let value = value.trim().trim_start_matches("0x");
    BigUint::parse_bytes(value.as_bytes(), 16).ok_or_else(|| Error::Invalid(format!("{} is not valid hex", field)))
}

//! # Configuration
//!
//! [`WireConfig`] has a `[protocol]` section for the framer and a
//! `[logging]` section for the subscriber. It is read from TOML, from
//! `RPC_WIRE_*` environment variables, or built in code from defaults.
//!
//! ## Environment Variables
//! - `RPC_WIRE_DEFAULT_CODEC`: `compact` or `msgpack`
//! - `RPC_WIRE_MAX_PAYLOAD_SIZE`: bytes, at most 2^24 - 1
//! - `RPC_WIRE_LOG_LEVEL`: `trace`, `debug`, `info`, `warn` or `error`

use crate::core::header::MAX_PAYLOAD_LEN;
use crate::error::{ProtocolError, Result};
use crate::serialization::converter::CodecKind;
use crate::utils::crypto::CryptoKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::Level;

/// Whether to register the crypto provider by default
pub const ENABLE_ENCRYPTION: bool = true;

/// `[protocol]` and `[logging]` sections
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct WireConfig {
    #[serde(default)]
    pub protocol: ProtocolConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WireConfig {
    /// Reads and parses a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ProtocolError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
    }

    /// Parses TOML. Missing sections and missing `crypto` fall back to defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ProtocolError::ConfigError(format!("invalid rpc-wire TOML: {e}")))
    }

    /// Defaults overridden by `RPC_WIRE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(codec) = lookup("RPC_WIRE_DEFAULT_CODEC") {
            config.protocol.default_codec = parse_codec(&codec)?;
        }

        if let Some(size) = lookup("RPC_WIRE_MAX_PAYLOAD_SIZE") {
            config.protocol.max_payload_size = size.trim().parse::<usize>().map_err(|e| {
                ProtocolError::ConfigError(format!("RPC_WIRE_MAX_PAYLOAD_SIZE={size:?}: {e}"))
            })?;
        }

        if let Some(level) = lookup("RPC_WIRE_LOG_LEVEL") {
            config.logging.log_level = Level::from_str(level.trim()).map_err(|_| {
                ProtocolError::ConfigError(format!("RPC_WIRE_LOG_LEVEL={level:?} is not a level"))
            })?;
        }

        Ok(config)
    }

    /// Defaults with a few fields changed by `mutator`.
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Commented TOML holding every default, suitable as a starting file.
    pub fn example_config() -> String {
        let body = toml::to_string_pretty(&Self::default()).unwrap_or_default();
        format!(
            "# rpc-wire configuration\n\
             # default_codec: \"compact\" or \"msgpack\"\n\
             # max_payload_size: 1 ..= {MAX_PAYLOAD_LEN} bytes\n\n{body}"
        )
    }

    /// Writes this configuration as TOML, replacing any existing file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("cannot encode config: {e}")))?;
        std::fs::write(path, content).map_err(|e| {
            ProtocolError::ConfigError(format!("cannot write {}: {e}", path.display()))
        })
    }

    /// Every problem found in both sections; empty when the config is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.protocol.validate();
        errors.extend(self.logging.validate());
        errors
    }

    /// [`validate`](Self::validate) folded into a single `ConfigError`.
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            return Ok(());
        }
        Err(ProtocolError::ConfigError(format!(
            "invalid rpc-wire configuration: {}",
            errors.join("; ")
        )))
    }
}

fn parse_codec(name: &str) -> Result<CodecKind> {
    match name.trim().to_ascii_lowercase().as_str() {
        "compact" => Ok(CodecKind::Compact),
        "msgpack" | "messagepack" => Ok(CodecKind::MessagePack),
        other => Err(ProtocolError::ConfigError(format!(
            "RPC_WIRE_DEFAULT_CODEC={other:?}, expected \"compact\" or \"msgpack\""
        ))),
    }
}

/// Framer settings, consumed by `WireProtocol::from_config` and
/// `FrameCodec::from_config`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProtocolConfig {
    /// Codec used by `WireProtocol::write_default`
    pub default_codec: CodecKind,

    /// Registers the crypto provider; without it encrypted frames are dropped
    pub encryption_enabled: bool,

    /// Provider used for encrypted frames
    #[serde(default)]
    pub crypto: CryptoKind,

    /// Largest payload written or accepted, at most the 3-byte header limit
    pub max_payload_size: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            default_codec: CodecKind::default(),
            encryption_enabled: ENABLE_ENCRYPTION,
            crypto: CryptoKind::default(),
            max_payload_size: MAX_PAYLOAD_LEN,
        }
    }
}

impl ProtocolConfig {
    pub fn validate(&self) -> Vec<String> {
        match self.max_payload_size {
            0 => vec!["protocol.max_payload_size must be at least 1".to_string()],
            n if n > MAX_PAYLOAD_LEN => vec![format!(
                "protocol.max_payload_size {n} exceeds the header limit of {MAX_PAYLOAD_LEN}"
            )],
            _ => Vec::new(),
        }
    }
}

/// Longest accepted `app_name`, in bytes
const MAX_APP_NAME_LEN: usize = 64;

/// Settings for `utils::logging::init`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Recorded on the startup log line
    pub app_name: String,

    /// Default filter level when `RUST_LOG` is unset
    #[serde(with = "level_name")]
    pub log_level: Level,

    /// One JSON object per event instead of the plain text format
    pub json_format: bool,

    /// Append to this file instead of writing to stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("rpc-wire"),
            log_level: Level::INFO,
            json_format: false,
            log_file_path: None,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("logging.app_name is empty".to_string());
        } else if self.app_name.len() > MAX_APP_NAME_LEN {
            errors.push(format!(
                "logging.app_name is {} bytes, limit is {MAX_APP_NAME_LEN}",
                self.app_name.len()
            ));
        }

        let missing_dir = self
            .log_file_path
            .as_deref()
            .and_then(|path| Path::new(path).parent())
            .filter(|dir| !dir.as_os_str().is_empty() && !dir.exists());
        if let Some(dir) = missing_dir {
            errors.push(format!(
                "logging.log_file_path directory {} is missing",
                dir.display()
            ));
        }

        errors
    }
}

/// `tracing::Level` as its lowercase name in TOML.
mod level_name {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use tracing::Level;

    pub fn serialize<S: Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&level.as_str().to_ascii_lowercase())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse()
            .map_err(|_| D::Error::custom(format!("unknown log level {name:?}")))
    }
}

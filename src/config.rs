//! # Configuration Management
//!
//! Centralized configuration for the transport codec and the device-side
//! CONNECT negotiator.
//!
//! Everything the negotiator needs arrives through these types: the protocol
//! version and payload limits are passed in as a [`ProtocolConfig`], and the
//! device identity comes from a [`PropertySource`] that yields a validated
//! [`DeviceProperties`] record.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `from_env()`
//!
//! ## Property Validation
//! Property values end up inside the `;`-delimited CONNECT banner, so values that
//! would break that grammar are rejected when the source is loaded.

use crate::error::{constants, ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::Level;

/// Protocol version advertised by default
pub const PROTOCOL_VERSION: u32 = 0x0100_0000;

/// Max payload a device advertises by default, and the substitute used when a
/// peer requests a max payload of zero
pub const DEFAULT_MAX_PAYLOAD: u32 = 4096;

/// Upper bound on any configured max payload (1 MiB)
pub const MAX_PAYLOAD_CEILING: u32 = 1024 * 1024;

/// Largest payload the stream codec will buffer by default
pub const DEFAULT_MAX_FRAME_PAYLOAD: usize = MAX_PAYLOAD_CEILING as usize;

/// Property keys understood in a device property source
pub mod keys {
    pub const PRODUCT_NAME: &str = "ro.product.name";
    pub const PRODUCT_MODEL: &str = "ro.product.model";
    pub const PRODUCT_DEVICE: &str = "ro.product.device";
    pub const SERIALNO: &str = "ro.serialno";
}

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AdbConfig {
    /// Version and payload negotiation limits
    #[serde(default)]
    pub protocol: ProtocolConfig,

    /// Device identity advertised in the CONNECT banner
    #[serde(default)]
    pub device: DeviceProperties,

    /// Stream framing limits
    #[serde(default)]
    pub transport: TransportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AdbConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = read_file(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `ADB_WIRE_*` environment overrides. Unparsable values are errors.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(version) = std::env::var("ADB_WIRE_PROTOCOL_VERSION") {
            self.protocol.version = parse_u32(&version).ok_or_else(|| {
                ProtocolError::ConfigError(format!(
                    "ADB_WIRE_PROTOCOL_VERSION is not a u32: {version:?}"
                ))
            })?;
        }

        if let Ok(max) = std::env::var("ADB_WIRE_MAX_PAYLOAD") {
            self.protocol.max_payload = parse_u32(&max).ok_or_else(|| {
                ProtocolError::ConfigError(format!("ADB_WIRE_MAX_PAYLOAD is not a u32: {max:?}"))
            })?;
        }

        if let Ok(serial) = std::env::var("ADB_WIRE_SERIALNO") {
            self.device.serialno = Some(serial);
        }

        if let Ok(level) = std::env::var("ADB_WIRE_LOG_LEVEL") {
            self.logging.log_level = level.parse::<Level>().map_err(|_| {
                ProtocolError::ConfigError(format!("Invalid log level: {level}"))
            })?;
        }

        Ok(())
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        let example = Self::default_with_overrides(|c| {
            c.device = DeviceProperties::default()
                .with_name("aosp_cf_x86_64_phone")
                .with_model("Pixel 7")
                .with_device("vsoc_x86_64")
                .with_serialno("emu-00000001")
                .with_features(["shell_v2", "cmd", "stat_v2"]);
        });
        toml::to_string_pretty(&example)
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.protocol.validate());
        errors.extend(self.device.validate());
        errors.extend(self.transport.validate());
        errors.extend(self.logging.validate());

        if self.protocol.max_payload as usize > self.transport.max_frame_payload {
            errors.push(format!(
                "Protocol max payload {} exceeds transport frame limit {}",
                self.protocol.max_payload, self.transport.max_frame_payload
            ));
        }

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        strict(self.validate())
    }
}

/// Protocol version and payload limits used by the negotiator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProtocolConfig {
    /// Highest protocol version this peer speaks
    pub version: u32,

    /// Largest payload this peer accepts in one packet
    pub max_payload: u32,

    /// Substituted when a peer requests a max payload of zero
    pub default_max_payload: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            max_payload: DEFAULT_MAX_PAYLOAD,
            default_max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl ProtocolConfig {
    /// Replace an unusable requested max payload with the configured default.
    #[inline]
    pub fn resolve_max_payload(&self, requested: u32) -> u32 {
        if requested == 0 {
            self.default_max_payload
        } else {
            requested
        }
    }

    /// Validate protocol configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.version == 0 {
            errors.push("Protocol version cannot be 0".to_string());
        }

        for (label, value) in [
            ("Max payload", self.max_payload),
            ("Default max payload", self.default_max_payload),
        ] {
            if value == 0 {
                errors.push(format!("{label} cannot be 0"));
            } else if value > MAX_PAYLOAD_CEILING {
                errors.push(format!(
                    "{label} too large: {value} bytes (maximum: {MAX_PAYLOAD_CEILING})"
                ));
            }
        }

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        strict(self.validate())
    }
}

/// Validated device identity: the product properties, optional serial and the
/// ordered feature list the device supports.
///
/// Missing product properties are legal and render as `unknown` in a banner.
/// In TOML the keys may be quoted (`"ro.product.model" = ..`) or written as
/// plain dotted keys (`ro.product.model = ..`); unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "RawProperties")]
pub struct DeviceProperties {
    #[serde(rename = "ro.product.name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "ro.product.model", default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(rename = "ro.product.device", default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    #[serde(rename = "ro.serialno", default, skip_serializing_if = "Option::is_none")]
    pub serialno: Option<String>,

    /// Features this device supports, in advertisement order
    #[serde(default)]
    pub features: Vec<String>,
}

impl DeviceProperties {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_serialno(mut self, serialno: impl Into<String>) -> Self {
        self.serialno = Some(serialno.into());
        self
    }

    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    /// Build from a loosely-typed key/value map plus a feature list.
    ///
    /// Unknown keys are ignored; the result is validated.
    pub fn from_map(map: &HashMap<String, String>, features: Vec<String>) -> Result<Self> {
        let props = Self {
            name: map.get(keys::PRODUCT_NAME).cloned(),
            model: map.get(keys::PRODUCT_MODEL).cloned(),
            device: map.get(keys::PRODUCT_DEVICE).cloned(),
            serialno: map.get(keys::SERIALNO).cloned(),
            features,
        };
        props.validated()
    }

    /// Look up a property by its `ro.*` key.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            keys::PRODUCT_NAME => self.name.as_deref(),
            keys::PRODUCT_MODEL => self.model.as_deref(),
            keys::PRODUCT_DEVICE => self.device.as_deref(),
            keys::SERIALNO => self.serialno.as_deref(),
            _ => None,
        }
    }

    /// Validate device properties
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for key in [
            keys::PRODUCT_NAME,
            keys::PRODUCT_MODEL,
            keys::PRODUCT_DEVICE,
            keys::SERIALNO,
        ] {
            let Some(value) = self.get(key) else { continue };
            if value.is_empty() {
                errors.push(format!("{key} cannot be empty (omit it instead)"));
            }
            if value.contains('\0') {
                errors.push(format!("{key}: {}", constants::ERR_PROPERTY_NUL));
            }
            if value.contains(';') || value.contains("features=") {
                errors.push(format!("{key}: {}", constants::ERR_PROPERTY_DELIMITER));
            }
            if key == keys::SERIALNO && value.contains(':') {
                errors.push(format!("{key} cannot contain ':'"));
            }
        }

        for feature in &self.features {
            if feature.trim().is_empty() {
                errors.push(constants::ERR_FEATURE_EMPTY.to_string());
            } else if feature.contains([',', ';', '\0']) {
                errors.push(format!("{}: {feature:?}", constants::ERR_FEATURE_DELIMITER));
            } else if feature.trim() != feature {
                errors.push(format!("Feature name has surrounding whitespace: {feature:?}"));
            }
        }

        errors
    }

    /// Consume and return self if valid.
    pub fn validated(self) -> Result<Self> {
        strict(self.validate())?;
        Ok(self)
    }
}

/// On-disk shape of [`DeviceProperties`], accepting both key spellings.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProperties {
    #[serde(rename = "ro.product.name", default)]
    name: Option<String>,
    #[serde(rename = "ro.product.model", default)]
    model: Option<String>,
    #[serde(rename = "ro.product.device", default)]
    device: Option<String>,
    #[serde(rename = "ro.serialno", default)]
    serialno: Option<String>,
    #[serde(default)]
    ro: RoTable,
    #[serde(default)]
    features: Vec<String>,
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RoTable {
    #[serde(default)]
    product: ProductTable,
    #[serde(default)]
    serialno: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProductTable {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    device: Option<String>,
}

impl TryFrom<RawProperties> for DeviceProperties {
    type Error = String;

    fn try_from(raw: RawProperties) -> std::result::Result<Self, Self::Error> {
        fn merge(
            key: &str,
            quoted: Option<String>,
            dotted: Option<String>,
        ) -> std::result::Result<Option<String>, String> {
            match (quoted, dotted) {
                (Some(_), Some(_)) => Err(format!("{key} is set more than once")),
                (quoted, dotted) => Ok(quoted.or(dotted)),
            }
        }

        let RawProperties {
            name,
            model,
            device,
            serialno,
            ro,
            features,
        } = raw;
        Ok(Self {
            name: merge(keys::PRODUCT_NAME, name, ro.product.name)?,
            model: merge(keys::PRODUCT_MODEL, model, ro.product.model)?,
            device: merge(keys::PRODUCT_DEVICE, device, ro.product.device)?,
            serialno: merge(keys::SERIALNO, serialno, ro.serialno)?,
            features,
        })
    }
}

/// A collaborator that supplies device properties once per connection.
pub trait PropertySource {
    /// Load and validate the property record.
    fn load(&self) -> Result<DeviceProperties>;
}

impl PropertySource for DeviceProperties {
    fn load(&self) -> Result<DeviceProperties> {
        self.clone().validated()
    }
}

impl PropertySource for AdbConfig {
    fn load(&self) -> Result<DeviceProperties> {
        self.device.load()
    }
}

/// A TOML file whose top-level table holds `ro.*` keys and a `features` array.
#[derive(Debug, Clone)]
pub struct PropertyFile {
    path: PathBuf,
}

impl PropertyFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PropertySource for PropertyFile {
    fn load(&self) -> Result<DeviceProperties> {
        let contents = read_file(&self.path)?;
        let props = toml::from_str::<DeviceProperties>(&contents).map_err(|e| {
            ProtocolError::ConfigError(format!(
                "Failed to parse property file {}: {e}",
                self.path.display()
            ))
        })?;
        props.validated()
    }
}

/// Stream framing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    /// Largest payload the stream codec will buffer, in bytes
    pub max_frame_payload: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_frame_payload: DEFAULT_MAX_FRAME_PAYLOAD,
        }
    }
}

impl TransportConfig {
    /// Validate transport configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_frame_payload == 0 {
            errors.push("Max frame payload cannot be 0".to_string());
        } else if self.max_frame_payload > 16 * MAX_PAYLOAD_CEILING as usize {
            errors.push(format!(
                "Max frame payload too large: {} bytes (maximum recommended: 16 MB)",
                self.max_frame_payload
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,

    /// Whether to emit ANSI colours in plain-text output
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("adb-wire"),
            log_level: Level::INFO,
            json_format: false,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

fn strict(errors: Vec<String>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ProtocolError::ConfigError(format!(
            "Configuration validation failed:\n  - {}",
            errors.join("\n  - ")
        )))
    }
}

fn read_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

    Ok(contents)
}

/// Accepts decimal or `0x`-prefixed hex.
fn parse_u32(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}

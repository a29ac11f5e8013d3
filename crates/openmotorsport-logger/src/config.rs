//! Logger configuration
//!
//! Configuration is a flat set of key/value options. It is usually read from
//! an `OpenMotorsport.xml` file next to the host executable:
//!
//! ```xml
//! <configuration>
//!     <option key="SamplingInterval" value="200"/>
//!     <option key="OutputDirectory" value="UserData/LOG/OpenMotorsport"/>
//!     <option key="Filename" value="%Y%M%D%h%m_%d_%c_%t.om"/>
//!     <option key="RequireOneLap" value="true"/>
//! </configuration>
//! ```
//!
//! Unknown keys and values that fail to parse are reported with `warn!` and
//! leave the default in place.

use crate::error::{ConfigError, ConfigResult};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "OpenMotorsport.xml";

/// Default sampling interval in milliseconds (5 Hz).
pub const DEFAULT_SAMPLING_INTERVAL_MS: u32 = 200;

/// Default output directory, relative to the host working directory.
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "UserData/LOG/OpenMotorsport";

/// Default filename template.
pub const DEFAULT_FILENAME_TEMPLATE: &str = "%Y%M%D%h%m_%d_%c_%t.om";

/// Default telemetry queue capacity for queued sampling.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default data source written to session metadata.
pub const DEFAULT_DATA_SOURCE: &str = "rFactor";

/// Where samples are taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMode {
    /// Sample on the host callback thread
    #[default]
    Inline,
    /// Enqueue updates and sample on a dedicated worker thread
    Queued,
}

impl SamplingMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "inline" => Some(SamplingMode::Inline),
            "queued" => Some(SamplingMode::Queued),
            _ => None,
        }
    }
}

/// Logger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Sampling interval in milliseconds, at least 1
    pub sampling_interval_ms: u32,
    /// Directory sessions are written to
    pub output_directory: PathBuf,
    /// Output filename template (see [`crate::filename`])
    pub filename_template: String,
    /// Discard sessions in which no lap was completed
    pub require_completed_lap: bool,
    /// Inline or queued sampling
    pub sampling_mode: SamplingMode,
    /// Bound of the telemetry queue in queued mode
    pub queue_capacity: usize,
    /// Data source written to session metadata
    pub data_source: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            sampling_interval_ms: DEFAULT_SAMPLING_INTERVAL_MS,
            output_directory: PathBuf::from(DEFAULT_OUTPUT_DIRECTORY),
            filename_template: DEFAULT_FILENAME_TEMPLATE.to_string(),
            require_completed_lap: false,
            sampling_mode: SamplingMode::Inline,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            data_source: DEFAULT_DATA_SOURCE.to_string(),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl LoggerConfig {
    /// Apply one option. Returns `false` if the key is unknown or the value
    /// could not be parsed.
    pub fn apply_option(&mut self, key: &str, value: &str) -> bool {
        let applied = match key {
            "SamplingInterval" => value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|ms| *ms >= 1)
                .map(|ms| self.sampling_interval_ms = ms),
            "OutputDirectory" => Some(value.trim())
                .filter(|dir| !dir.is_empty())
                .map(|dir| self.output_directory = PathBuf::from(dir)),
            "Filename" => Some(value.trim())
                .filter(|template| !template.is_empty())
                .map(|template| self.filename_template = template.to_string()),
            "RequireOneLap" => parse_bool(value).map(|flag| self.require_completed_lap = flag),
            "SamplingMode" => SamplingMode::parse(value).map(|mode| self.sampling_mode = mode),
            "QueueCapacity" => value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|capacity| *capacity >= 1)
                .map(|capacity| self.queue_capacity = capacity),
            "DataSource" => {
                self.data_source = value.trim().to_string();
                Some(())
            }
            _ => {
                warn!(key, value, "Unknown configuration option ignored");
                return false;
            }
        };

        if applied.is_none() {
            warn!(key, value, "Invalid configuration value ignored");
        }
        applied.is_some()
    }

    /// Build a configuration from key/value pairs on top of the defaults.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in pairs {
            config.apply_option(key.as_ref(), value.as_ref());
        }
        config
    }

    /// Parse an `<configuration><option key=".." value=".."/></configuration>`
    /// document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Xml`] if the document is not well-formed.
    pub fn from_xml_str(raw: &str) -> ConfigResult<Self> {
        let mut reader = Reader::from_str(raw);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut pairs = Vec::new();
        let mut depth = 0usize;
        let mut in_configuration = false;

        loop {
            match reader
                .read_event_into(&mut buf)
                .map_err(|e| ConfigError::Xml(e.to_string()))?
            {
                Event::Start(element) => {
                    depth += 1;
                    let name = element.name();
                    if depth == 1 {
                        in_configuration = name.as_ref() == b"configuration";
                    } else if depth == 2 && in_configuration && name.as_ref() == b"option" {
                        pairs.extend(parse_option(&element)?);
                    }
                }
                Event::Empty(element) => {
                    if depth == 1 && in_configuration && element.name().as_ref() == b"option" {
                        pairs.extend(parse_option(&element)?);
                    }
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        debug!(options = pairs.len(), "Parsed configuration document");
        Ok(Self::from_pairs(pairs))
    }

    /// Load configuration from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file exists but cannot be read and
    /// [`ConfigError::Xml`] if it is malformed.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_xml_str(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No configuration file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

fn parse_option(element: &BytesStart<'_>) -> ConfigResult<Option<(String, String)>> {
    let mut key = None;
    let mut value = None;

    for attr in element.attributes().with_checks(false) {
        let attr = attr.map_err(|e| ConfigError::Xml(e.to_string()))?;
        let text = attr
            .unescape_value()
            .map_err(|e| ConfigError::Xml(e.to_string()))?
            .into_owned();
        match attr.key.as_ref() {
            b"key" => key = Some(text),
            b"value" => value = Some(text),
            _ => {}
        }
    }

    match (key, value) {
        (Some(key), Some(value)) => Ok(Some((key, value))),
        (key, _) => {
            warn!(?key, "Configuration option without key or value ignored");
            Ok(None)
        }
    }
}

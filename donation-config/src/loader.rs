// Settings files
//
// TOML, JSON and dotenv syntax all decode to one flat key space. Nested
// tables are joined with `_`, so `[gateway] timeout_secs = 10` and
// `gateway_timeout_secs = 10` set the same field.

use crate::env::coerce;
use crate::{ConfigError, ENV_PREFIX, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Supported settings file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Toml,
    Json,
    /// `KEY=value` lines, as in `.env`
    Dotenv,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            "env" => Some(Self::Dotenv),
            _ => None,
        }
    }

    /// Detect from the extension; `.env` and `.env.*` files are dotenv
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name == ".env" || name.starts_with(".env.") {
            return Some(Self::Dotenv);
        }
        path.extension()?.to_str().and_then(Self::from_extension)
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            Self::Dotenv => "dotenv",
        }
    }
}

/// Reads one settings file into a flat JSON object
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        FileFormat::from_path(path)
            .map(Self::new)
            .ok_or_else(|| ConfigError::Source {
                path: path.display().to_string(),
                message: "unrecognised settings file type".to_string(),
            })
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Source {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.parse(&content)
    }

    pub fn parse(&self, content: &str) -> Result<Value> {
        let malformed = |message: String| ConfigError::Malformed {
            format: self.format.name(),
            message,
        };

        let document = match self.format {
            FileFormat::Json => {
                serde_json::from_str::<Value>(content).map_err(|e| malformed(e.to_string()))?
            }
            FileFormat::Toml => {
                let table: toml::Table =
                    toml::from_str(content).map_err(|e| malformed(e.to_string()))?;
                serde_json::to_value(table).map_err(|e| malformed(e.to_string()))?
            }
            FileFormat::Dotenv => Value::Object(parse_dotenv(content)),
        };

        match document {
            Value::Object(map) => {
                let mut flat = Map::new();
                flatten("", map, &mut flat);
                Ok(Value::Object(flat))
            }
            other => Err(malformed(format!("expected a table at the top level, got {}", other))),
        }
    }
}

fn flatten(prefix: &str, map: Map<String, Value>, out: &mut Map<String, Value>) {
    for (key, value) in map {
        let key = if prefix.is_empty() {
            key.to_lowercase()
        } else {
            format!("{}_{}", prefix, key.to_lowercase())
        };
        match value {
            Value::Object(nested) => flatten(&key, nested, out),
            other => {
                out.insert(key, other);
            }
        }
    }
}

/// `KEY=value` lines; `export` and the `DONATION_` prefix are optional
fn parse_dotenv(content: &str) -> Map<String, Value> {
    let prefix = format!("{}_", ENV_PREFIX);
    let mut map = Map::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let key = key.strip_prefix(prefix.as_str()).unwrap_or(key);
            let value = value.trim().trim_matches('"').trim_matches('\'');
            map.insert(key.to_lowercase(), coerce(value));
        }
    }

    map
}

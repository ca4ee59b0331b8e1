//! Configuration file support for md2docx CLI
//!
//! Loads settings from `_md2docx.toml` configuration file.

use anyhow::{Context, Result};
use md2docx_core::ConverterOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "_md2docx.toml";

/// Schema location written into generated configuration files
///
/// Generate the file with `md2docx --print-config-schema > md2docx.schema.json`.
pub const SCHEMA_PATH: &str = "./md2docx.schema.json";

/// EMU per inch, for `image_max_width_in`
const EMU_PER_INCH: f64 = 914_400.0;

/// Root configuration structure
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Output and file discovery configuration
    #[serde(skip_serializing_if = "OutputConfig::is_empty")]
    pub output: OutputConfig,
    /// Document rendering configuration
    #[serde(skip_serializing_if = "RenderConfig::is_empty")]
    pub render: RenderConfig,
}

/// Output and file discovery configuration
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct OutputConfig {
    /// Process directories recursively (default: false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recursive: Option<bool>,
    /// Number of parallel jobs (default: number of CPUs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

impl OutputConfig {
    fn is_empty(&self) -> bool {
        self.recursive.is_none() && self.jobs.is_none()
    }
}

/// Document rendering configuration
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct RenderConfig {
    /// Syntax-highlight fenced code blocks (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_code: Option<bool>,
    /// Draw matrix, chart, graph and workflow fences as images (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_diagrams: Option<bool>,
    /// Maximum image width in inches (default: 5.5)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_max_width_in: Option<f64>,
    /// Label printed above the footnotes (default: "Notes")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_label: Option<String>,
}

impl RenderConfig {
    fn is_empty(&self) -> bool {
        self.highlight_code.is_none()
            && self.render_diagrams.is_none()
            && self.image_max_width_in.is_none()
            && self.notes_label.is_none()
    }
}

impl Config {
    /// Load configuration from a specific file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Try to load configuration from a directory (looks for `_md2docx.toml`)
    ///
    /// Returns `Ok(None)` if the config file doesn't exist.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Generate JSON schema for the configuration
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }

    /// Generate JSON schema as a string
    pub fn json_schema_string() -> Result<String> {
        let schema = Self::json_schema();
        serde_json::to_string_pretty(&schema).context("Failed to serialize JSON schema")
    }

    /// Serialize configuration to TOML string with schema directive
    pub fn to_toml_with_schema(&self) -> Result<String> {
        let toml_content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        Ok(format!("#:schema {}\n\n{}", SCHEMA_PATH, toml_content))
    }

    /// Create a sample configuration with common defaults for init command
    pub fn sample() -> Self {
        Config {
            output: OutputConfig {
                recursive: Some(false),
                jobs: None, // number of CPUs
            },
            render: RenderConfig {
                highlight_code: Some(true),
                render_diagrams: Some(true),
                image_max_width_in: Some(5.5),
                notes_label: Some("Notes".to_string()),
            },
        }
    }

    /// Converter options with this configuration applied over the defaults
    pub fn converter_options(&self) -> ConverterOptions {
        let defaults = ConverterOptions::default();
        let render = &self.render;
        ConverterOptions {
            highlight_code: render.highlight_code.unwrap_or(defaults.highlight_code),
            render_diagrams: render.render_diagrams.unwrap_or(defaults.render_diagrams),
            image_max_width_emu: render
                .image_max_width_in
                .filter(|inches| inches.is_finite() && *inches > 0.0)
                .map_or(defaults.image_max_width_emu, |inches| {
                    (inches * EMU_PER_INCH).round() as u64
                }),
            notes_label: render
                .notes_label
                .clone()
                .unwrap_or_else(|| defaults.notes_label.clone()),
            ..defaults
        }
    }
}

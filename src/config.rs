use ab_glyph::FontArc;
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

use crate::{
    annotator::{default_font, MAX_LINE_WIDTH},
    inference::DetectionRequest,
};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    pub request: RequestConfig,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub annotation: AnnotationConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

pub trait Validatable {
    fn validate(&self) -> Result<(), String>;
}

#[derive(Debug, Deserialize, Clone)]
pub struct RequestConfig {
    pub bucket: String,
    pub object_key: String,
    pub model_arn: String,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
}

fn default_min_confidence() -> f32 {
    50.0
}

impl RequestConfig {
    pub fn to_request(&self) -> DetectionRequest {
        DetectionRequest {
            bucket: self.bucket.clone(),
            object_key: self.object_key.clone(),
            model_arn: self.model_arn.clone(),
            min_confidence: self.min_confidence,
        }
    }
}

impl Validatable for RequestConfig {
    fn validate(&self) -> Result<(), String> {
        if self.bucket.trim().is_empty() {
            return Err("request.bucket must not be empty".to_string());
        }
        if self.object_key.trim().is_empty() {
            return Err("request.object_key must not be empty".to_string());
        }
        if self.model_arn.trim().is_empty() {
            return Err("request.model_arn must not be empty".to_string());
        }
        if !(0.0..=100.0).contains(&self.min_confidence) {
            return Err(format!(
                "request.min_confidence must be within 0..=100, got {}",
                self.min_confidence
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AwsConfig {
    pub region: Option<String>,
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
}

fn default_operation_timeout_secs() -> u64 {
    30
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: None,
            operation_timeout_secs: default_operation_timeout_secs(),
        }
    }
}

impl AwsConfig {
    pub fn get_operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

impl Validatable for AwsConfig {
    fn validate(&self) -> Result<(), String> {
        if self.operation_timeout_secs == 0 {
            return Err("aws.operation_timeout_secs must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnnotationConfig {
    #[serde(default = "default_color")]
    pub color: [u8; 3],
    #[serde(default = "default_line_width")]
    pub line_width: u32,
    pub font_path: Option<PathBuf>,
    #[serde(default = "default_font_scale")]
    pub font_scale: f32,
    pub output_path: Option<PathBuf>,
}

// #00d400
fn default_color() -> [u8; 3] {
    [0, 212, 0]
}

fn default_line_width() -> u32 {
    5
}

fn default_font_scale() -> f32 {
    16.0
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            color: default_color(),
            line_width: default_line_width(),
            font_path: None,
            font_scale: default_font_scale(),
            output_path: None,
        }
    }
}

impl AnnotationConfig {
    /// The configured font file, or the bundled font when none is set.
    pub fn load_font(&self) -> Result<FontArc, String> {
        let Some(path) = &self.font_path else {
            return default_font().map_err(|e| format!("Bundled font invalid: {}", e));
        };
        let data =
            std::fs::read(path).map_err(|e| format!("Font file {:?} unreadable: {}", path, e))?;
        let font = FontArc::try_from_vec(data)
            .map_err(|e| format!("Font file {:?} invalid: {}", path, e))?;
        Ok(font)
    }
}

impl Validatable for AnnotationConfig {
    fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_LINE_WIDTH).contains(&self.line_width) {
            return Err(format!(
                "annotation.line_width must be within 1..={}, got {}",
                MAX_LINE_WIDTH, self.line_width
            ));
        }
        if self.font_scale <= 0.0 {
            return Err("annotation.font_scale must be positive".to_string());
        }
        if let Some(path) = &self.font_path {
            if !path.exists() {
                return Err(format!("Font file not found: {:?}", path));
            }
        }
        Ok(())
    }
}

impl Validatable for Config {
    fn validate(&self) -> Result<(), String> {
        self.request.validate()?;
        self.aws.validate()?;
        self.annotation.validate()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("No current directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    let config = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(
            config::File::from(
                configuration_directory.join(format!("{}.yaml", environment.as_str())),
            )
            .required(false),
        )
        .add_source(
            config::Environment::with_prefix("CL")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let config: Config = config.try_deserialize::<Config>()?;
    config.validate().map_err(config::ConfigError::Message)?;

    Ok(config)
}

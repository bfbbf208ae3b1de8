use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ConversionConfig {
    pub common: core_config::Config,
    pub storage: StorageConfig,
    pub converter: ConverterConfig,
    pub worker: WorkerConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Scratch directory for uploads and converter output.
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct ConverterConfig {
    pub soffice_path: String,
    pub timeout_secs: u64,
}

impl ConverterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub enabled: bool,
    pub worker_count: usize,
    pub queue_size: usize,
    /// How long a finished task and its output are kept.
    pub task_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl WorkerConfig {
    pub fn task_ttl(&self) -> Duration {
        Duration::from_secs(self.task_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        // tokio intervals panic on a zero period
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

const DEFAULT_MAX_UPLOAD_BYTES: &str = "104857600";

impl ConversionConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(ConversionConfig {
            common: common_config,
            storage: StorageConfig {
                upload_dir: PathBuf::from(get_env("UPLOAD_DIR", Some("uploads"), is_prod)?),
                max_upload_bytes: parse_env(
                    "MAX_UPLOAD_BYTES",
                    Some(DEFAULT_MAX_UPLOAD_BYTES),
                    is_prod,
                )?,
            },
            converter: ConverterConfig {
                soffice_path: get_env("SOFFICE_PATH", Some("soffice"), is_prod)?,
                timeout_secs: parse_env("CONVERTER_TIMEOUT_SECS", Some("120"), is_prod)?,
            },
            worker: WorkerConfig {
                enabled: parse_env("WORKER_ENABLED", Some("true"), is_prod)?,
                worker_count: parse_env::<usize>("WORKER_COUNT", Some("2"), is_prod)?.max(1),
                queue_size: parse_env::<usize>("WORKER_QUEUE_SIZE", Some("64"), is_prod)?.max(1),
                task_ttl_secs: parse_env("TASK_TTL_SECS", Some("3600"), is_prod)?,
                sweep_interval_secs: parse_env("TASK_SWEEP_INTERVAL_SECS", Some("60"), is_prod)?,
            },
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
        })
    }
}

/// In production only variables with a default may be omitted.
fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => match default {
            Some(def) if !is_prod || key_has_prod_default(key) => Ok(def.to_string()),
            _ => Err(AppError::ConfigError(anyhow::anyhow!(
                "{} is required but not set",
                key
            ))),
        },
    }
}

// Tuning knobs keep their defaults in production; paths must be explicit.
fn key_has_prod_default(key: &str) -> bool {
    !matches!(key, "UPLOAD_DIR" | "SOFFICE_PATH")
}

fn parse_env<T>(key: &str, default: Option<&str>, is_prod: bool) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(key, default, is_prod)?;
    raw.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("Invalid value for {}: {} ({})", key, raw, e))
    })
}

use crate::models::asset::BackendKind;
use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};

const DEFAULT_PORT: u16 = 8800;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com";
const DEFAULT_CLOUDINARY_FOLDER: &str = "haifriends";
const DEFAULT_CLOUDINARY_TIMEOUT_SECS: u64 = 60;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments; built once at startup
/// and never read from the process environment afterwards.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageConfig,
    pub max_upload_bytes: usize,
    /// Empty means "reflect the request origin".
    pub cors_allowed_origins: Vec<String>,
}

/// Which storage backend is active, with the settings it needs.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Local(LocalStoreConfig),
    Cloudinary(CloudinaryConfig),
}

#[derive(Debug, Clone)]
pub struct LocalStoreConfig {
    pub upload_dir: PathBuf,
    /// Overrides the scheme and host taken from the inbound request.
    pub public_base_url: Option<String>,
}

#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
    pub api_base: String,
    pub timeout: Duration,
    pub staging_dir: PathBuf,
}

impl fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("folder", &self.folder)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .field("staging_dir", &self.staging_dir)
            .finish()
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "haifriends REST API gateway")]
pub struct Args {
    /// Host to bind to (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Storage backend for uploads (overrides STORAGE_BACKEND)
    #[arg(long, value_enum)]
    pub storage_backend: Option<BackendKind>,

    /// Directory uploads are written to and served from (overrides UPLOAD_DIR)
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    /// Directory for staging files before a remote upload (overrides STAGING_DIR)
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// Public base URL used when building local asset URLs (overrides PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Largest accepted upload in bytes (overrides MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Comma-separated CORS origin allow-list (overrides CORS_ALLOWED_ORIGINS)
    #[arg(long)]
    pub cors_allowed_origins: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::resolve(Args::parse(), |key| env::var(key).ok())
    }

    /// Merge parsed CLI args over values looked up through `env`.
    pub fn resolve(args: Args, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parse_var(&env, "PORT")?.unwrap_or(DEFAULT_PORT);
        let env_max_upload =
            parse_var(&env, "MAX_UPLOAD_BYTES")?.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        let env_backend = match env("STORAGE_BACKEND") {
            Some(value) => <BackendKind as ValueEnum>::from_str(value.trim(), true)
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("parsing STORAGE_BACKEND value `{}`", value))?,
            None => BackendKind::Local,
        };

        // --- Merge ---
        let backend = args.storage_backend.unwrap_or(env_backend);
        let storage = match backend {
            BackendKind::Local => StorageConfig::Local(LocalStoreConfig {
                upload_dir: args
                    .upload_dir
                    .or_else(|| env("UPLOAD_DIR").map(PathBuf::from))
                    .unwrap_or_else(|| PathBuf::from("uploads/posts")),
                public_base_url: args
                    .public_base_url
                    .or_else(|| env("PUBLIC_BASE_URL"))
                    .map(|url| url.trim_end_matches('/').to_string())
                    .filter(|url| !url.is_empty()),
            }),
            BackendKind::Cloudinary => {
                let timeout_secs = parse_var(&env, "CLOUDINARY_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_CLOUDINARY_TIMEOUT_SECS);
                StorageConfig::Cloudinary(CloudinaryConfig {
                    cloud_name: required(&env, "CLOUDINARY_CLOUD_NAME")?,
                    api_key: required(&env, "CLOUDINARY_API_KEY")?,
                    api_secret: required(&env, "CLOUDINARY_API_SECRET")?,
                    folder: env("CLOUDINARY_FOLDER")
                        .unwrap_or_else(|| DEFAULT_CLOUDINARY_FOLDER.into()),
                    api_base: env("CLOUDINARY_API_BASE")
                        .unwrap_or_else(|| DEFAULT_CLOUDINARY_API_BASE.into())
                        .trim_end_matches('/')
                        .to_string(),
                    timeout: Duration::from_secs(timeout_secs),
                    staging_dir: args
                        .staging_dir
                        .or_else(|| env("STAGING_DIR").map(PathBuf::from))
                        .unwrap_or_else(|| PathBuf::from("temp_uploads")),
                })
            }
        };

        let max_upload_bytes = args.max_upload_bytes.unwrap_or(env_max_upload);
        if max_upload_bytes == 0 {
            bail!("max upload size must be greater than zero");
        }

        let cors_allowed_origins = args
            .cors_allowed_origins
            .or_else(|| env("CORS_ALLOWED_ORIGINS"))
            .map(|raw| split_origins(&raw))
            .unwrap_or_default();

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage,
            max_upload_bytes,
            cors_allowed_origins,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        None => Ok(None),
    }
}

fn required(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    match env(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => bail!("{} must be set when the cloudinary backend is selected", key),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn args(flags: &[&str]) -> Args {
        let mut argv = vec!["haifriends-gateway"];
        argv.extend_from_slice(flags);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_to_local_backend_on_port_8800() {
        let cfg = AppConfig::resolve(args(&[]), env_from(&[])).unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:8800");
        assert_eq!(cfg.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(cfg.cors_allowed_origins.is_empty());
        match cfg.storage {
            StorageConfig::Local(local) => {
                assert_eq!(local.upload_dir, PathBuf::from("uploads/posts"));
                assert!(local.public_base_url.is_none());
            }
            other => panic!("unexpected storage config: {:?}", other),
        }
    }

    #[test]
    fn cli_flags_override_environment() {
        let cfg = AppConfig::resolve(
            args(&["--port", "9100", "--upload-dir", "/srv/media"]),
            env_from(&[("PORT", "9000"), ("UPLOAD_DIR", "/tmp/ignored")]),
        )
        .unwrap();
        assert_eq!(cfg.port, 9100);
        match cfg.storage {
            StorageConfig::Local(local) => assert_eq!(local.upload_dir, PathBuf::from("/srv/media")),
            other => panic!("unexpected storage config: {:?}", other),
        }
    }

    #[test]
    fn invalid_port_is_reported_with_context() {
        let err = AppConfig::resolve(args(&[]), env_from(&[("PORT", "eighty")])).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing PORT value `eighty`"));
    }

    #[test]
    fn cloudinary_requires_credentials() {
        let err = AppConfig::resolve(
            args(&[]),
            env_from(&[
                ("STORAGE_BACKEND", "cloudinary"),
                ("CLOUDINARY_CLOUD_NAME", "demo"),
            ]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("CLOUDINARY_API_KEY"));
    }

    #[test]
    fn cloudinary_config_is_resolved_and_secret_redacted() {
        let cfg = AppConfig::resolve(
            args(&[]),
            env_from(&[
                ("STORAGE_BACKEND", "Cloudinary"),
                ("CLOUDINARY_CLOUD_NAME", "demo"),
                ("CLOUDINARY_API_KEY", "1234"),
                ("CLOUDINARY_API_SECRET", "s3cr3t"),
                ("CLOUDINARY_API_BASE", "http://127.0.0.1:9999/"),
            ]),
        )
        .unwrap();
        let StorageConfig::Cloudinary(cloud) = &cfg.storage else {
            panic!("expected cloudinary config");
        };
        assert_eq!(cloud.folder, "haifriends");
        assert_eq!(cloud.api_base, "http://127.0.0.1:9999");
        assert_eq!(cloud.staging_dir, PathBuf::from("temp_uploads"));
        assert_eq!(cloud.timeout, Duration::from_secs(60));

        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = AppConfig::resolve(args(&[]), env_from(&[("STORAGE_BACKEND", "s3")])).unwrap_err();
        assert!(err.to_string().contains("STORAGE_BACKEND"));
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let cfg = AppConfig::resolve(
            args(&[]),
            env_from(&[(
                "CORS_ALLOWED_ORIGINS",
                "https://haifriends.app/, http://localhost:3000 ,,",
            )]),
        )
        .unwrap();
        assert_eq!(
            cfg.cors_allowed_origins,
            vec!["https://haifriends.app", "http://localhost:3000"]
        );
    }

    #[test]
    fn zero_upload_limit_is_rejected() {
        assert!(AppConfig::resolve(args(&["--max-upload-bytes", "0"]), env_from(&[])).is_err());
    }
}

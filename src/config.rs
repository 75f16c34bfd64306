use crate::store::drive::DriveCredentials;
use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::{env, fmt, str::FromStr, time::Duration};

const ENV_PREFIX: &str = "EDITION_DESK_";

/// Where edition and post blobs are kept.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    /// Google Drive folder, files shared as public-read links
    Drive,
    /// Sharded files under `storage_dir`, served by this process
    Local,
    /// Process-local map, lost on exit
    Memory,
}

/// Drive folder plus the OAuth client used to write into it.
#[derive(Clone, Debug)]
pub struct DriveConfig {
    pub folder_id: String,
    pub credentials: DriveCredentials,
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub store_backend: StoreBackend,
    pub storage_dir: String,
    /// Origin used to build `/files` links for the local backend.
    pub public_base_url: String,
    pub drive: Option<DriveConfig>,
    pub jwt_secret: String,
    pub remote_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("store_backend", &self.store_backend)
            .field("storage_dir", &self.storage_dir)
            .field("public_base_url", &self.public_base_url)
            .field("drive", &self.drive)
            .field("remote_timeout", &self.remote_timeout)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish_non_exhaustive()
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Daily newspaper edition publishing API")]
pub struct Args {
    /// Host to bind to (overrides EDITION_DESK_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides EDITION_DESK_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides EDITION_DESK_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Blob store backend (overrides EDITION_DESK_STORE)
    #[arg(long, value_enum)]
    pub store: Option<StoreBackend>,

    /// Directory for the local backend (overrides EDITION_DESK_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Public origin of this service (overrides EDITION_DESK_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Drive folder receiving uploads (overrides EDITION_DESK_DRIVE_FOLDER_ID)
    #[arg(long)]
    pub drive_folder_id: Option<String>,

    /// Seconds before a store call is abandoned (overrides EDITION_DESK_REMOTE_TIMEOUT_SECS)
    #[arg(long)]
    pub remote_timeout_secs: Option<u64>,

    /// Largest accepted request body in MiB (overrides EDITION_DESK_MAX_UPLOAD_MB)
    #[arg(long)]
    pub max_upload_mb: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::resolve(args, |key| env::var(key).ok())?;
        Ok((cfg, migrate))
    }

    /// Merge `args` over the `EDITION_DESK_*` values returned by `lookup`.
    ///
    /// Secrets (JWT secret, Drive client secret and refresh token) are only
    /// read from the environment.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}")).filter(|value| !value.trim().is_empty())
        };

        let host = args
            .host
            .or_else(|| var("HOST"))
            .unwrap_or_else(|| "0.0.0.0".into());
        let port = match args.port {
            Some(port) => port,
            None => parse_var(&var, "PORT")?.unwrap_or(3000),
        };
        let database_url = args
            .database_url
            .or_else(|| var("DATABASE_URL"))
            .unwrap_or_else(|| "sqlite://./data/meta/edition_desk.db".into());

        let store_backend = match args.store {
            Some(backend) => backend,
            None => match var("STORE") {
                Some(raw) => <StoreBackend as ValueEnum>::from_str(&raw, true)
                    .map_err(|err| anyhow::anyhow!("parsing {ENV_PREFIX}STORE value `{raw}`: {err}"))?,
                None => StoreBackend::Local,
            },
        };
        let storage_dir = args
            .storage_dir
            .or_else(|| var("STORAGE_DIR"))
            .unwrap_or_else(|| "./data/blobs".into());
        let public_base_url = args
            .public_base_url
            .or_else(|| var("PUBLIC_BASE_URL"))
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        let drive = match store_backend {
            StoreBackend::Drive => {
                let required = |name: &str| {
                    var(name).with_context(|| {
                        format!("{ENV_PREFIX}{name} is required for the drive store")
                    })
                };
                Some(DriveConfig {
                    folder_id: match args.drive_folder_id {
                        Some(folder) => folder,
                        None => required("DRIVE_FOLDER_ID")?,
                    },
                    credentials: DriveCredentials {
                        client_id: required("DRIVE_CLIENT_ID")?,
                        client_secret: required("DRIVE_CLIENT_SECRET")?,
                        refresh_token: required("DRIVE_REFRESH_TOKEN")?,
                    },
                })
            }
            StoreBackend::Local | StoreBackend::Memory => None,
        };

        let jwt_secret = var("JWT_SECRET")
            .with_context(|| format!("{ENV_PREFIX}JWT_SECRET is required"))?;

        let remote_timeout_secs = match args.remote_timeout_secs {
            Some(secs) => secs,
            None => parse_var(&var, "REMOTE_TIMEOUT_SECS")?.unwrap_or(30),
        };
        if remote_timeout_secs == 0 {
            bail!("remote timeout must be at least one second");
        }
        let max_upload_mb: usize = match args.max_upload_mb {
            Some(mb) => mb,
            None => parse_var(&var, "MAX_UPLOAD_MB")?.unwrap_or(50),
        };

        Ok(Self {
            host,
            port,
            database_url,
            store_backend,
            storage_dir,
            public_base_url,
            drive,
            jwt_secret,
            remote_timeout: Duration::from_secs(remote_timeout_secs),
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(name)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("parsing {ENV_PREFIX}{name} value `{value}`"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (format!("{ENV_PREFIX}{k}"), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_the_secret_is_set() {
        let cfg = AppConfig::resolve(Args::default(), env_of(&[("JWT_SECRET", "s")])).unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:3000");
        assert_eq!(cfg.store_backend, StoreBackend::Local);
        assert_eq!(cfg.public_base_url, "http://localhost:3000");
        assert_eq!(cfg.remote_timeout, Duration::from_secs(30));
        assert_eq!(cfg.max_upload_bytes, 50 * 1024 * 1024);
        assert!(cfg.drive.is_none());
    }

    #[test]
    fn args_override_environment() {
        let args = Args {
            port: Some(8080),
            store: Some(StoreBackend::Memory),
            ..Args::default()
        };
        let env = env_of(&[("JWT_SECRET", "s"), ("PORT", "9000"), ("STORE", "drive")]);
        let cfg = AppConfig::resolve(args, env).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.store_backend, StoreBackend::Memory);
    }

    #[test]
    fn missing_secret_or_bad_port_is_an_error() {
        assert!(AppConfig::resolve(Args::default(), env_of(&[])).is_err());
        let env = env_of(&[("JWT_SECRET", "s"), ("PORT", "not-a-port")]);
        let err = AppConfig::resolve(Args::default(), env).unwrap_err();
        assert!(err.to_string().contains("EDITION_DESK_PORT"));
    }

    #[test]
    fn drive_backend_requires_credentials() {
        let partial = env_of(&[
            ("JWT_SECRET", "s"),
            ("STORE", "drive"),
            ("DRIVE_FOLDER_ID", "folder"),
        ]);
        let err = AppConfig::resolve(Args::default(), partial).unwrap_err();
        assert!(err.to_string().contains("DRIVE_CLIENT_ID"));

        let full = env_of(&[
            ("JWT_SECRET", "s"),
            ("STORE", "Drive"),
            ("DRIVE_FOLDER_ID", "folder"),
            ("DRIVE_CLIENT_ID", "id"),
            ("DRIVE_CLIENT_SECRET", "secret"),
            ("DRIVE_REFRESH_TOKEN", "refresh"),
        ]);
        let cfg = AppConfig::resolve(Args::default(), full).unwrap();
        let drive = cfg.drive.unwrap();
        assert_eq!(drive.folder_id, "folder");
        assert_eq!(drive.credentials.refresh_token, "refresh");
        assert!(!format!("{:?}", drive.credentials).contains("secret"));
    }
}

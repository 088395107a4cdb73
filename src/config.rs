//! Engine configuration.
//!
//! A [`Context`] is built once by the host application and handed to
//! [`LicenseEngine::new`](crate::client::engine::LicenseEngine::new). For
//! deployments that need to retarget the licensing service without a
//! rebuild (staging servers, on-prem installs), [`Context::with_local_overrides`]
//! applies values from an optional `config.toml` and from environment
//! variables, env taking precedence.

use std::env;
use std::path::PathBuf;

use config::Config;

/// Validation timing policy, in whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationThresholds {
    /// Within this many days of the last server validation, online
    /// revalidation is not even attempted.
    pub allowed_days_without_validation: i64,
    /// Past the allowed window we do try to validate; upon failure the
    /// license stays usable until this many days have passed.
    pub grace_period_days: i64,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            allowed_days_without_validation: 2,
            grace_period_days: 30,
        }
    }
}

/// Immutable configuration for a [`LicenseEngine`](crate::client::engine::LicenseEngine).
#[derive(Debug, Clone)]
pub struct Context {
    /// Product id as registered with the licensing service, e.g. "my-plugin".
    pub product_id: String,
    /// Base URL of the licensing service, e.g. `https://licenses.example.com`.
    pub api_endpoint_base: String,
    /// PEM-encoded RSA or EC public key of the licensing authority.
    pub public_key: String,
    /// Directory the license token is stored in.
    pub license_dir: PathBuf,
    pub thresholds: ValidationThresholds,
}

impl Context {
    pub fn new(
        product_id: impl Into<String>,
        api_endpoint_base: impl Into<String>,
        public_key: impl Into<String>,
        license_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            api_endpoint_base: api_endpoint_base.into(),
            public_key: public_key.into(),
            license_dir: license_dir.into(),
            thresholds: ValidationThresholds::default(),
        }
    }

    pub fn thresholds(mut self, thresholds: ValidationThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Apply local overrides from `config.toml` and the environment.
    ///
    /// Precedence: `PORTCULLIS_API_ENDPOINT` env var, then the
    /// `api_endpoint_base` key of `config.toml`, then the constructed value.
    /// The thresholds keys `allowed_days_without_validation` and
    /// `grace_period_days` are file-only. Loading is forgiving: a missing
    /// or unreadable file leaves the context unchanged.
    pub fn with_local_overrides(mut self) -> Self {
        let file = load_config_file();

        if let Ok(url) = env::var("PORTCULLIS_API_ENDPOINT") {
            self.api_endpoint_base = url;
        } else if let Some(url) = file.api_endpoint_base {
            self.api_endpoint_base = url;
        }

        if let Some(days) = file.allowed_days_without_validation {
            self.thresholds.allowed_days_without_validation = days;
        }
        if let Some(days) = file.grace_period_days {
            self.thresholds.grace_period_days = days;
        }

        self
    }
}

/// Values we care about from `config.toml`, all optional.
#[derive(Debug, Default)]
struct FileOverrides {
    api_endpoint_base: Option<String>,
    allowed_days_without_validation: Option<i64>,
    grace_period_days: Option<i64>,
}

fn load_config_file() -> FileOverrides {
    let builder = Config::builder().add_source(
        config::File::with_name("config").required(false), // absent file is fine
    );

    let built = match builder.build() {
        Ok(cfg) => cfg,
        Err(_) => return FileOverrides::default(),
    };

    FileOverrides {
        api_endpoint_base: built.get_string("api_endpoint_base").ok(),
        allowed_days_without_validation: built.get_int("allowed_days_without_validation").ok(),
        grace_period_days: built.get_int("grace_period_days").ok(),
    }
}

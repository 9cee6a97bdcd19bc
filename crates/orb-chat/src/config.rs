use std::env;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

use orb_chat_core::DEFAULT_REQUEST_TIMEOUT;
use orb_chat_http_backend::{BackendConfig, BackendConfigBuilder};

/// Environment variable overriding the backend base URL.
pub const API_URL_VAR: &str = "ORB_CHAT_API_URL";

/// Environment variable overriding the request timeout, in seconds.
pub const TIMEOUT_SECS_VAR: &str = "ORB_CHAT_TIMEOUT_SECS";

/// Environment variable overriding where conversations are stored.
pub const DATA_DIR_VAR: &str = "ORB_CHAT_DATA_DIR";

/// Error returned when an environment variable holds an unusable value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigError {
    var: &'static str,
    value: String,
}

impl ConfigError {
    /// Returns the offending variable.
    #[inline]
    pub fn var(&self) -> &str {
        self.var
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value for {}: {:?}", self.var, self.value)
    }
}

impl StdError for ConfigError {}

/// Everything needed to assemble a session against a real backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// How to reach the backend.
    pub backend: BackendConfig,
    /// Upper bound for one submission, enforced by the session.
    pub request_timeout: Duration,
    /// Directory conversations are stored in. `None` keeps them in memory.
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            data_dir: default_data_dir(),
        }
    }
}

impl ClientConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, which resolves a variable
    /// name to its value. Unset or empty variables take their defaults.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |var: &str| {
            lookup(var).filter(|value| !value.trim().is_empty())
        };

        let request_timeout = match lookup(TIMEOUT_SECS_VAR) {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError {
                        var: TIMEOUT_SECS_VAR,
                        value,
                    });
                }
            },
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let mut backend =
            BackendConfigBuilder::new().with_timeout(request_timeout);
        if let Some(base_url) = lookup(API_URL_VAR) {
            backend = backend.with_base_url(base_url);
        }

        let data_dir = lookup(DATA_DIR_VAR)
            .map(PathBuf::from)
            .or_else(default_data_dir);

        Ok(Self {
            backend: backend.build(),
            request_timeout,
            data_dir,
        })
    }
}

/// Returns `<platform data dir>/orb-chat`, if the platform has one.
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("orb-chat"))
}

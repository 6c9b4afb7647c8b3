use url::Url;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Immutable input describing one session the controller may run.
///
/// Supplied by the caller and never mutated by the controller. The
/// credential endpoint is injected explicitly rather than resolved from
/// any ambient origin.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Endpoint that issues short-lived connection credentials.
    pub credential_endpoint: Url,
    /// Identifier of the sandbox the session belongs to.
    pub sandbox_id: String,
    /// Name of the agent to dispatch into the room, if any.
    pub agent_name: Option<String>,
    /// Whether capture should buffer audio recorded before the agent joins.
    pub pre_connect_buffer: bool,
    /// Capture device to enable. `None` selects the platform default.
    pub capture_device_id: Option<String>,
}

impl SessionConfig {
    /// Creates a config for the given endpoint and sandbox with all
    /// optional fields unset.
    pub fn new(credential_endpoint: Url, sandbox_id: impl Into<String>) -> Self {
        Self {
            credential_endpoint,
            sandbox_id: sandbox_id.into(),
            agent_name: None,
            pre_connect_buffer: false,
            capture_device_id: None,
        }
    }

    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let endpoint_str = std::env::var("PARLEY_CREDENTIAL_ENDPOINT")
            .map_err(|_| ConfigError::MissingVar("PARLEY_CREDENTIAL_ENDPOINT".to_string()))?;
        let credential_endpoint = endpoint_str.parse::<Url>().map_err(|e| {
            ConfigError::InvalidValue("PARLEY_CREDENTIAL_ENDPOINT".to_string(), e.to_string())
        })?;

        let sandbox_id = std::env::var("PARLEY_SANDBOX_ID")
            .map_err(|_| ConfigError::MissingVar("PARLEY_SANDBOX_ID".to_string()))?;

        let agent_name = std::env::var("PARLEY_AGENT_NAME").ok().filter(|s| !s.is_empty());

        let pre_connect_buffer = match std::env::var("PARLEY_PRE_CONNECT_BUFFER") {
            Ok(raw) => raw.parse::<bool>().map_err(|_| {
                ConfigError::InvalidValue(
                    "PARLEY_PRE_CONNECT_BUFFER".to_string(),
                    format!("'{}' is not a boolean", raw),
                )
            })?,
            Err(_) => false,
        };

        let capture_device_id = std::env::var("PARLEY_CAPTURE_DEVICE")
            .ok()
            .filter(|s| !s.is_empty());

        Ok(Self {
            credential_endpoint,
            sandbox_id,
            agent_name,
            pre_connect_buffer,
            capture_device_id,
        })
    }
}

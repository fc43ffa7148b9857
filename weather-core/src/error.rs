use thiserror::Error;

use crate::provider::ProviderId;

/// Malformed construction of a unit value type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("conflicting units specified for {kind}: only one of {units} may be given")]
    ConflictingUnits {
        kind: &'static str,
        units: &'static str,
    },

    #[error("percentage must be between 0 and 100, got {0}")]
    PercentageOutOfRange(f64),
}

/// Failures reported by a weather or geocoding API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The provider answered with a structured error payload.
    #[error("upstream API error: {0}")]
    Upstream(String),

    /// Name resolution returned nothing, or the geocoder reported an error.
    #[error("geocoding failed: {0}")]
    Geocode(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("unknown backend '{name}'. Supported backends: {}", .valid.join(", "))]
    UnknownBackend {
        name: String,
        valid: Vec<&'static str>,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{what} is not supported by {provider}")]
    NotSupported {
        provider: &'static str,
        what: &'static str,
    },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("invalid JSON in response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed response from {provider}: {message}")]
    MalformedResponse {
        provider: &'static str,
        message: String,
    },

    #[error("no API key configured for provider '{0}'")]
    MissingApiKey(ProviderId),

    #[error("invalid timezone '{0}' in response")]
    InvalidTimezone(String),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl Error {
    pub fn not_supported(provider: &'static str, what: &'static str) -> Self {
        Self::NotSupported { provider, what }
    }

    pub fn malformed<S: Into<String>>(provider: &'static str, message: S) -> Self {
        Self::MalformedResponse {
            provider,
            message: message.into(),
        }
    }

    /// `true` for failures the provider itself reported (the `ApiError` branch).
    pub fn is_api_error(&self) -> bool {
        matches!(self, Self::Api(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

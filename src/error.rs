use http::StatusCode;
use thiserror::Error;

/// Boxed error of a body transport
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Retrieval failure: request parameters could not be materialized
#[derive(Error, Debug)]
pub enum ParamError {
    #[error("Malformed query string: {0}")]
    MalformedQuery(String),
    #[error("Unable to read parameters from body: {0}")]
    MalformedBody(String),
}

/// Conversion failure: the request body could not be decoded in the
/// requested type
#[derive(Error, Debug)]
pub enum BodyError {
    /// No reader handles the declared content type
    #[error("No body reader for content type {content_type}")]
    NoReader { content_type: String },
    #[error("Unsupported charset {0}")]
    UnsupportedCharset(String),
    #[error("Body is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[cfg(feature = "json")]
    #[cfg_attr(docsrs, doc(cfg(feature = "json")))]
    #[error("Unable to deserialize json body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unable to deserialize form body: {0}")]
    Form(#[from] serde_urlencoded::de::Error),
    #[error("Failed to read body: {0}")]
    Read(BoxError),
    #[error("Body exceeds the limit of {limit} bytes")]
    TooLarge { limit: usize },
}

impl BodyError {
    pub(crate) fn read<E: Into<BoxError>>(e: E) -> Self {
        BodyError::Read(e.into())
    }
}

/// Failure to coerce a parameter or header value
#[derive(Error, Debug)]
pub enum MutantError {
    #[error("Required value '{name}' is not present")]
    Missing { name: String },
    #[error("Unable to convert '{name}' = '{value}' to {ty}: {reason}")]
    Invalid {
        name: String,
        value: String,
        ty: &'static str,
        reason: String,
    },
}

/// Error type throughout the grenat stack
#[derive(Error, Debug)]
pub enum GrenatError {
    /// A decorator was built without a target request
    #[error("A HTTP request is required")]
    MissingRequest,
    #[error("Invalid route pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error(transparent)]
    Body(#[from] BodyError),
    #[error(transparent)]
    Mutant(#[from] MutantError),
    #[error(transparent)]
    Http(#[from] http::Error),
}

impl ParamError {
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

impl BodyError {
    pub fn status(&self) -> StatusCode {
        match self {
            BodyError::NoReader { .. } | BodyError::UnsupportedCharset(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            BodyError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl MutantError {
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

impl GrenatError {
    /// Status a server should answer with when this error reaches it
    pub fn status(&self) -> StatusCode {
        match self {
            GrenatError::Param(e) => {
                debug!("Unable to read request parameters: {}", e);
                e.status()
            }
            GrenatError::Body(e) => {
                debug!("Unable to decode request body: {}", e);
                e.status()
            }
            GrenatError::Mutant(e) => {
                debug!("Unable to convert request value: {}", e);
                e.status()
            }
            e => {
                warn!("Grenat encountered an internal error: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

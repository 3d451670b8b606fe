//! Feature service client error types.

use std::fmt;

use super::convert::ConversionError;

/// Errors from talking to an ArcGIS feature service.
#[derive(Debug)]
pub enum FeatureServiceError {
    /// Request never produced a response (network error, timeout, etc.)
    Http(reqwest::Error),

    /// Service answered with a non-success HTTP status
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// Response body was not valid JSON
    Decode {
        url: String,
        message: String,
        body: String,
    },

    /// Service returned an error envelope under a successful status
    Service {
        url: String,
        code: i64,
        message: String,
        details: Vec<String>,
    },

    /// A field could not be coerced to the type its name implies
    Field {
        url: String,
        field: String,
        message: String,
    },

    /// Decoded JSON did not have the expected shape
    Conversion {
        url: String,
        source: ConversionError,
    },

    /// Service root or path could not form a valid URL
    InvalidUrl(String),
}

impl FeatureServiceError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Only transport failures qualify. A service error, decode failure or
    /// bad field means the request or the data is at fault.
    pub fn is_retryable(&self) -> bool {
        match self {
            FeatureServiceError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            FeatureServiceError::Status { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// The service error code, if this is an error envelope.
    pub fn service_code(&self) -> Option<i64> {
        match self {
            FeatureServiceError::Service { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for FeatureServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureServiceError::Http(e) => write!(f, "HTTP error: {e}"),
            FeatureServiceError::Status { url, status, body } => {
                write!(f, "HTTP status {status} from {url}")?;
                if !body.is_empty() {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            FeatureServiceError::Decode { url, message, body } => {
                write!(f, "error parsing response from {url}: {message}\n{body}")
            }
            FeatureServiceError::Service {
                url,
                code,
                message,
                details,
            } => {
                write!(f, "service error {code} from {url}: {message}")?;
                if !details.is_empty() {
                    write!(f, " ({})", details.join("; "))?;
                }
                Ok(())
            }
            FeatureServiceError::Field {
                url,
                field,
                message,
            } => write!(f, "invalid value for field {field} from {url}: {message}"),
            FeatureServiceError::Conversion { url, source } => {
                write!(f, "unexpected response from {url}: {source}")
            }
            FeatureServiceError::InvalidUrl(msg) => write!(f, "invalid URL: {msg}"),
        }
    }
}

impl std::error::Error for FeatureServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeatureServiceError::Http(e) => Some(e),
            FeatureServiceError::Conversion { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FeatureServiceError {
    fn from(err: reqwest::Error) -> Self {
        FeatureServiceError::Http(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FeatureServiceError::Service {
            url: "http://svc/0/1?f=json".into(),
            code: 400,
            message: "bad request".into(),
            details: vec![],
        };
        assert_eq!(
            err.to_string(),
            "service error 400 from http://svc/0/1?f=json: bad request"
        );

        let err = FeatureServiceError::Service {
            url: "u".into(),
            code: 400,
            message: "Unable to complete operation.".into(),
            details: vec!["Invalid where clause".into(), "Field missing".into()],
        };
        assert!(err.to_string().ends_with("(Invalid where clause; Field missing)"));

        let err = FeatureServiceError::Decode {
            url: "http://svc/2/query".into(),
            message: "expected value at line 1 column 1".into(),
            body: "<html>".into(),
        };
        let text = err.to_string();
        assert!(text.contains("http://svc/2/query"));
        assert!(text.contains("<html>"));

        let err = FeatureServiceError::Field {
            url: "u".into(),
            field: "RecordCreateDate".into(),
            message: "not a date".into(),
        };
        assert!(err.to_string().contains("RecordCreateDate"));
    }

    #[test]
    fn only_transport_failures_retry() {
        let gateway = FeatureServiceError::Status {
            url: "u".into(),
            status: 503,
            body: String::new(),
        };
        assert!(gateway.is_retryable());

        let not_found = FeatureServiceError::Status {
            url: "u".into(),
            status: 404,
            body: String::new(),
        };
        assert!(!not_found.is_retryable());

        let service = FeatureServiceError::Service {
            url: "u".into(),
            code: 503,
            message: "busy".into(),
            details: vec![],
        };
        assert!(!service.is_retryable());
        assert_eq!(service.service_code(), Some(503));

        let decode = FeatureServiceError::Decode {
            url: "u".into(),
            message: "m".into(),
            body: String::new(),
        };
        assert!(!decode.is_retryable());
        assert_eq!(decode.service_code(), None);
    }
}

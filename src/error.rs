//! Error taxonomy for fetching, parsing, persistence and whole runs.
//!
//! Every error that ends up in the `scrape_errors` table is reduced to an
//! [`ErrorCategory`], which is the string stored in `error_type`.

use std::fmt;
use thiserror::Error;

/// Category label persisted alongside each recorded scrape error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Network,
    Timeout,
    HttpStatus,
    RenderFailure,
    ListingUnavailable,
    DetailUnavailable,
    SaveError,
    ConnectionFailure,
    RunAborted,
    Cancelled,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network_error",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::HttpStatus => "http_status",
            ErrorCategory::RenderFailure => "render_failure",
            ErrorCategory::ListingUnavailable => "listing_unavailable",
            ErrorCategory::DetailUnavailable => "detail_unavailable",
            ErrorCategory::SaveError => "save_error",
            ErrorCategory::ConnectionFailure => "connection_failure",
            ErrorCategory::RunAborted => "run_aborted",
            ErrorCategory::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to retrieve markup for a URL.
///
/// Static fetches are retried on `Network`, `Timeout` and retryable
/// `HttpStatus` values before one of these is returned to the caller.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("timed out fetching {url} after {attempts} attempt(s)")]
    Timeout { url: String, attempts: u32 },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("browser render failed for {url}: {message}")]
    RenderFailure { url: String, message: String },
}

impl FetchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FetchError::Network { .. } => ErrorCategory::Network,
            FetchError::Timeout { .. } => ErrorCategory::Timeout,
            FetchError::HttpStatus { .. } => ErrorCategory::HttpStatus,
            FetchError::RenderFailure { .. } => ErrorCategory::RenderFailure,
        }
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Client errors are final except `429 Too Many Requests`.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network { .. } | FetchError::Timeout { .. } => true,
            FetchError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            FetchError::RenderFailure { .. } => false,
        }
    }

    /// Stamp the total attempt count onto a timeout.
    pub fn with_attempts(self, attempts: u32) -> Self {
        match self {
            FetchError::Timeout { url, .. } => FetchError::Timeout { url, attempts },
            other => other,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::Network { url, .. }
            | FetchError::Timeout { url, .. }
            | FetchError::HttpStatus { url, .. }
            | FetchError::RenderFailure { url, .. } => url,
        }
    }
}

/// Failure to locate the expected structure in fetched markup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The listing container is missing entirely; the page is skipped.
    #[error("listing container not found on page {page}: {reason}")]
    ListingUnavailable { page: u32, reason: String },

    /// No article body was found; the article is kept as metadata only.
    #[error("article content not found at {url}")]
    DetailUnavailable { url: String },
}

impl ParseError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ParseError::ListingUnavailable { .. } => ErrorCategory::ListingUnavailable,
            ParseError::DetailUnavailable { .. } => ErrorCategory::DetailUnavailable,
        }
    }
}

/// Failure reported by the persistence gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write (duplicate article URL).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// The pool or the connection underneath it is unusable.
    #[error("database connection failure: {0}")]
    ConnectionFailure(String),

    #[error("database error: {0}")]
    Query(#[source] sqlx::Error),

    #[error("news source '{0}' not found")]
    SourceNotFound(String),
}

impl StoreError {
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, StoreError::ConnectionFailure(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::ConstraintViolation(db_err.message().to_string())
            }
            sqlx::Error::PoolClosed
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::WorkerCrashed => StoreError::ConnectionFailure(err.to_string()),
            _ => StoreError::Query(err),
        }
    }
}

/// Reasons a source run stops before finishing its pagination loop.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Cumulative page failures went past the configured budget.
    #[error("aborted after {failures} failed page(s) (budget {budget})")]
    BudgetExceeded { failures: u32, budget: u32 },

    #[error("run cancelled")]
    Cancelled,

    #[error("run deadline reached")]
    TimedOut,

    #[error("invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl RunError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RunError::Store(e) if e.is_connection_failure() => ErrorCategory::ConnectionFailure,
            RunError::Store(_) => ErrorCategory::SaveError,
            RunError::BudgetExceeded { .. } | RunError::InvalidBaseUrl { .. } => {
                ErrorCategory::RunAborted
            }
            RunError::Cancelled | RunError::TimedOut => ErrorCategory::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_not_retryable() {
        let not_found = FetchError::HttpStatus {
            url: "https://apa.az/x".into(),
            status: 404,
        };
        let throttled = FetchError::HttpStatus {
            url: "https://apa.az/x".into(),
            status: 429,
        };
        let unavailable = FetchError::HttpStatus {
            url: "https://apa.az/x".into(),
            status: 503,
        };
        assert!(!not_found.is_retryable());
        assert!(throttled.is_retryable());
        assert!(unavailable.is_retryable());
    }

    #[test]
    fn test_category_strings() {
        let err = ParseError::ListingUnavailable {
            page: 2,
            reason: "no cards".into(),
        };
        assert_eq!(err.category().as_str(), "listing_unavailable");
        assert_eq!(
            RunError::BudgetExceeded { failures: 4, budget: 3 }.category(),
            ErrorCategory::RunAborted
        );
        assert_eq!(RunError::Cancelled.category().to_string(), "cancelled");
    }

    #[test]
    fn test_pool_closed_is_connection_failure() {
        let err = StoreError::from(sqlx::Error::PoolClosed);
        assert!(err.is_connection_failure());
        assert_eq!(
            RunError::from(err).category(),
            ErrorCategory::ConnectionFailure
        );
    }
}

use std::num::ParseFloatError;
use std::time::Duration;

/// Failure to build or execute a request against the Splunk management API.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be built or handed to the client.
    #[error("Request error: {0}")]
    Request(String),

    /// An underlying HTTP transport error from `reqwest`.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// A non-empty response body that does not parse in the expected wire format.
///
/// Empty bodies never produce this error; decoders report them as "no content".
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Failed to unmarshal XML response: {0}")]
    Xml(#[from] quick_xml::de::DeError),

    #[error("Failed to unmarshal JSON response: {0}")]
    Json(#[from] serde_json::Error),

    /// The body is not structured text of any kind (e.g. an HTML error page
    /// where XML was expected).
    #[error("Response body is not {expected}: {snippet}")]
    Malformed {
        expected: &'static str,
        snippet: String,
    },
}

/// Errors that can occur while running a single scrape task.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use oxsplunk_scraper::error::ScrapeError;
///
/// let err = ScrapeError::MaxSearchWaitTimeExceeded {
///     waited: Duration::from_secs(62),
///     limit: Duration::from_secs(60),
/// };
/// assert!(err.is_timeout());
/// assert!(err.to_string().contains("Maximum search wait time exceeded"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Splunk answered with a status the task cannot interpret.
    #[error("Splunk API HTTP error: status={status}, body={body}")]
    Http { status: u16, body: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The search job did not finish within the configured maximum wait.
    #[error("Maximum search wait time exceeded for metric: waited {waited:?}, limit {limit:?}")]
    MaxSearchWaitTimeExceeded { waited: Duration, limit: Duration },

    /// A 2xx search response arrived without a search id to poll.
    #[error("Search response carried no search id: status={status}")]
    MissingJobId { status: u16 },

    /// A recognized result field held a value that is not a finite number.
    /// `source` is `None` when the value parsed but is NaN or infinite.
    #[error("Failed to convert field {field}={value:?} to a finite number")]
    FieldConversion {
        field: String,
        value: String,
        #[source]
        source: Option<ParseFloatError>,
    },

    /// The surrounding cycle was cancelled while the task was in flight.
    #[error("Scrape cancelled")]
    Cancelled,
}

impl ScrapeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ScrapeError::MaxSearchWaitTimeExceeded { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScrapeError::Cancelled)
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, ScrapeError::Decode(_))
    }
}

/// Convenience type alias so callers can write `error::Result<T>`.
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// One failure attributed to the task that produced it.
#[derive(Debug)]
pub struct TaskFailure {
    pub task: &'static str,
    pub error: ScrapeError,
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.task, self.error)
    }
}

/// Failures collected over one scrape cycle.
///
/// Tasks add to it independently; nothing in here stops a sibling task from
/// running. [`ScrapeErrors::combine`] folds it into a single result at the end
/// of the cycle.
#[derive(Debug, Default)]
pub struct ScrapeErrors {
    failures: Vec<TaskFailure>,
}

impl ScrapeErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, task: &'static str, error: ScrapeError) {
        tracing::warn!(task, error = %error, "Scrape task failed");
        self.failures.push(TaskFailure { task, error });
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskFailure> {
        self.failures.iter()
    }

    /// `Ok(())` when nothing failed, otherwise every failure in the order it
    /// was reported.
    pub fn combine(self) -> std::result::Result<(), PartialScrapeError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(PartialScrapeError {
                failures: self.failures,
            })
        }
    }
}

/// One or more scrape tasks failed during a cycle. The snapshot returned
/// alongside it still holds whatever the other tasks recorded.
#[derive(Debug)]
pub struct PartialScrapeError {
    failures: Vec<TaskFailure>,
}

impl PartialScrapeError {
    pub fn failures(&self) -> &[TaskFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl std::fmt::Display for PartialScrapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} scrape task(s) failed", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for PartialScrapeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_errors_combine_to_ok() {
        assert!(ScrapeErrors::new().combine().is_ok());
    }

    #[test]
    fn test_combined_error_lists_every_failure_in_order() {
        let mut errs = ScrapeErrors::new();
        errs.add("license_index_usage", ScrapeError::Cancelled);
        errs.add(
            "indexer_throughput",
            ScrapeError::Http {
                status: 401,
                body: "unauthorized".to_string(),
            },
        );
        assert_eq!(errs.len(), 2);

        let combined = errs.combine().unwrap_err();
        assert_eq!(combined.len(), 2);
        assert_eq!(combined.failures()[0].task, "license_index_usage");
        assert_eq!(
            combined.to_string(),
            "2 scrape task(s) failed: license_index_usage: Scrape cancelled; \
             indexer_throughput: Splunk API HTTP error: status=401, body=unauthorized"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert!(ScrapeError::Cancelled.is_cancelled());
        assert!(!ScrapeError::Cancelled.is_timeout());

        let decode: ScrapeError = DecodeError::Malformed {
            expected: "XML",
            snippet: "oops".to_string(),
        }
        .into();
        assert!(decode.is_decode());
    }
}

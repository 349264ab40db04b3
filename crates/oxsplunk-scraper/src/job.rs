//! Search job state machine and the poller that drives it.

use crate::client::{send_cancellable, sleep_cancellable, RawResponse, SplunkRequest, SplunkTransport};
use crate::decode::{decode_search_response, FieldValue};
use crate::error::{Result, ScrapeError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Fixed delay between polls of a job whose results are not ready yet.
pub const SEARCH_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Lifecycle of one search job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Nothing sent yet.
    Unsubmitted,
    /// Splunk accepted the query and handed back a search id.
    Submitted,
    /// Splunk answered 204: results are not available yet.
    AwaitingResult,
    /// Results are attached to the latest response.
    Ready,
    /// Results have been mapped into datapoints.
    Parsed,
    TimedOut,
    Failed,
}

impl JobState {
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::Unsubmitted | Self::Submitted | Self::AwaitingResult,
                Self::Submitted | Self::AwaitingResult | Self::Ready | Self::Failed
            ) | (Self::Submitted | Self::AwaitingResult, Self::TimedOut)
                | (Self::Ready, Self::Parsed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Parsed | Self::TimedOut | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unsubmitted => "unsubmitted",
            Self::Submitted => "submitted",
            Self::AwaitingResult => "awaiting_result",
            Self::Ready => "ready",
            Self::Parsed => "parsed",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scratch state for one search, created per task invocation.
///
/// `job_id` is only ever set from the first response that carries a search
/// id; `status_code` always reflects the latest response.
#[derive(Debug)]
pub struct SearchJob {
    pub query: String,
    pub job_id: Option<String>,
    pub status_code: u16,
    pub fields: Vec<FieldValue>,
    state: JobState,
}

impl SearchJob {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            job_id: None,
            status_code: 0,
            fields: Vec::new(),
            state: JobState::Unsubmitted,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Submission until a search id is known, polling afterwards.
    pub fn next_request(&self) -> SplunkRequest {
        match &self.job_id {
            None => SplunkRequest::SubmitSearch {
                query: self.query.clone(),
            },
            Some(job_id) => SplunkRequest::SearchResults {
                job_id: job_id.clone(),
            },
        }
    }

    fn transition(&mut self, next: JobState) -> JobState {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid search job transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(
            job_id = self.job_id.as_deref().unwrap_or("-"),
            from = %self.state,
            to = %next,
            "Search job transition"
        );
        self.state = next;
        next
    }

    fn fail(&mut self, err: ScrapeError) -> ScrapeError {
        if !self.state.is_terminal() {
            self.transition(JobState::Failed);
        }
        err
    }

    /// Folds one response into the job and returns the new state.
    ///
    /// The response is consumed here so its body is dropped on every path.
    ///
    /// # Errors
    ///
    /// Moves the job to [`JobState::Failed`] and returns the cause when the
    /// body does not decode, the status is not one a search can answer with,
    /// or a 2xx answer leaves the job without a search id.
    pub fn apply_response(&mut self, response: RawResponse) -> Result<JobState> {
        self.status_code = response.status;

        if !matches!(response.status, 200 | 201 | 204) {
            let err = response.into_http_error();
            return Err(self.fail(err));
        }

        let payload = match decode_search_response(&response.body) {
            Ok(payload) => payload,
            Err(e) => return Err(self.fail(e.into())),
        };
        drop(response);

        if self.status_code == 204 {
            return Ok(self.transition(JobState::AwaitingResult));
        }

        let payload = payload.unwrap_or_default();
        let newly_submitted = self.job_id.is_none() && payload.job_id.is_some();
        if self.job_id.is_none() {
            self.job_id = payload.job_id;
        }

        match (self.status_code, self.job_id.is_some()) {
            (200, true) => {
                self.fields = payload.fields;
                Ok(self.transition(JobState::Ready))
            }
            (_, true) if newly_submitted => Ok(self.transition(JobState::Submitted)),
            (_, true) => Ok(self.transition(JobState::AwaitingResult)),
            (status, false) => Err(self.fail(ScrapeError::MissingJobId { status })),
        }
    }

    /// Marks the job as exhausted.
    pub(crate) fn time_out(&mut self, waited: Duration, limit: Duration) -> ScrapeError {
        self.transition(JobState::TimedOut);
        ScrapeError::MaxSearchWaitTimeExceeded { waited, limit }
    }

    /// Hands the result fields to `f` and marks the job as parsed.
    pub fn parse<F>(&mut self, f: F)
    where
        F: FnOnce(&[FieldValue]),
    {
        debug_assert_eq!(self.state, JobState::Ready);
        f(&self.fields);
        self.transition(JobState::Parsed);
    }
}

/// Drives a [`SearchJob`] from submission until its results are ready.
///
/// Timing uses `tokio::time`, so tests can run it under a paused clock.
pub struct SearchPoller<'a> {
    transport: &'a dyn SplunkTransport,
    max_wait: Duration,
    poll_interval: Duration,
}

impl<'a> SearchPoller<'a> {
    pub fn new(transport: &'a dyn SplunkTransport, max_wait: Duration) -> Self {
        Self {
            transport,
            max_wait,
            poll_interval: SEARCH_POLL_INTERVAL,
        }
    }

    /// Polls until the job is [`JobState::Ready`].
    ///
    /// The wait budget is measured from the first submission, regardless of
    /// how many polls happened. A timed-out job is abandoned as-is; no cancel
    /// request is sent for it.
    ///
    /// # Errors
    ///
    /// Returns the first transport, HTTP or decode failure,
    /// [`ScrapeError::MaxSearchWaitTimeExceeded`] once the budget is spent, or
    /// [`ScrapeError::Cancelled`] if `cancel` fires.
    pub async fn run(&self, job: &mut SearchJob, cancel: &CancellationToken) -> Result<()> {
        let started = Instant::now();

        loop {
            let response = match send_cancellable(self.transport, job.next_request(), cancel).await {
                Ok(response) => response,
                Err(e) => return Err(job.fail(e)),
            };

            match job.apply_response(response)? {
                JobState::Ready => return Ok(()),
                JobState::AwaitingResult => {
                    if let Err(e) = sleep_cancellable(self.poll_interval, cancel).await {
                        return Err(job.fail(e));
                    }
                }
                _ => {}
            }

            let waited = started.elapsed();
            if waited > self.max_wait {
                return Err(job.time_out(waited, self.max_wait));
            }
        }
    }
}

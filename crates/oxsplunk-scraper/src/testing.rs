use crate::client::{RawResponse, SplunkRequest, SplunkTransport};
use crate::error::TransportError;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Scripted transport that records every request it receives.
///
/// Search requests (submit and poll) consume `search` responses in order; the
/// last one keeps being returned once the script runs out. API requests are
/// answered by path.
#[derive(Default)]
pub struct MockTransport {
    search: Mutex<VecDeque<RawResponse>>,
    last_search: Mutex<Option<RawResponse>>,
    api: HashMap<String, RawResponse>,
    fail_api: HashMap<String, String>,
    requests: Mutex<Vec<SplunkRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(self, responses: Vec<RawResponse>) -> Self {
        *self.search.lock().unwrap() = responses.into();
        self
    }

    pub fn with_api(mut self, path: &str, response: RawResponse) -> Self {
        self.api.insert(path.to_string(), response);
        self
    }

    pub fn with_api_failure(mut self, path: &str, message: &str) -> Self {
        self.fail_api.insert(path.to_string(), message.to_string());
        self
    }

    pub fn requests(&self) -> Vec<SplunkRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl SplunkTransport for MockTransport {
    async fn send(&self, request: SplunkRequest) -> Result<RawResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        match request {
            SplunkRequest::Api { path } => {
                if let Some(message) = self.fail_api.get(&path) {
                    return Err(TransportError::Request(message.clone()));
                }
                self.api
                    .get(&path)
                    .cloned()
                    .ok_or_else(|| TransportError::Request(format!("no response scripted for {path}")))
            }
            _ => {
                let next = self.search.lock().unwrap().pop_front();
                let mut last = self.last_search.lock().unwrap();
                match next {
                    Some(response) => {
                        *last = Some(response.clone());
                        Ok(response)
                    }
                    None => last
                        .clone()
                        .ok_or_else(|| TransportError::Request("no search response scripted".to_string())),
                }
            }
        }
    }
}

pub fn submitted(sid: &str) -> RawResponse {
    RawResponse::new(201, format!("<response><sid>{sid}</sid></response>"))
}

pub fn pending() -> RawResponse {
    RawResponse::empty(204)
}

/// A ready results body. Each row is a list of `(k, text)` pairs.
pub fn results(sid: Option<&str>, rows: &[&[(&str, &str)]]) -> RawResponse {
    let mut body = String::from("<results preview='0'>");
    if let Some(sid) = sid {
        body.push_str(&format!("<sid>{sid}</sid>"));
    }
    for (offset, row) in rows.iter().enumerate() {
        body.push_str(&format!("<result offset='{offset}'>"));
        for (k, v) in row.iter() {
            body.push_str(&format!("<field k='{k}'><value><text>{v}</text></value></field>"));
        }
        body.push_str("</result>");
    }
    body.push_str("</results>");
    RawResponse::new(200, body)
}

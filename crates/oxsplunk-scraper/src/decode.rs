//! Response body decoders.
//!
//! Search job responses are XML, plain endpoints are requested with
//! `output_mode=json`. Both decoders treat an empty (or whitespace-only) body
//! as "no content yet" and return `Ok(None)`; anything else that fails to
//! parse is a [`DecodeError`].

use crate::error::DecodeError;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// One `k`/value pair from a search result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub name: String,
    pub value: String,
}

impl FieldValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Decoded search job response. Submission responses carry only the search
/// id; result responses carry the rows, flattened in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPayload {
    pub job_id: Option<String>,
    pub fields: Vec<FieldValue>,
}

#[derive(Debug, Deserialize)]
struct XmlSearchResponse {
    #[serde(default)]
    sid: Option<String>,
    #[serde(rename = "result", default)]
    results: Vec<XmlResult>,
}

#[derive(Debug, Deserialize)]
struct XmlResult {
    #[serde(rename = "field", default)]
    fields: Vec<XmlField>,
}

#[derive(Debug, Deserialize)]
struct XmlField {
    #[serde(rename = "@k")]
    name: String,
    /// Multivalue fields repeat `<value>`; only the first is kept.
    #[serde(rename = "value", default)]
    values: Vec<XmlValue>,
}

#[derive(Debug, Deserialize)]
struct XmlValue {
    #[serde(default)]
    text: Vec<String>,
}

fn is_blank(body: &[u8]) -> bool {
    body.iter().all(u8::is_ascii_whitespace)
}

fn snippet(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    trimmed.chars().take(64).collect()
}

/// Decode a search submission or results body.
///
/// # Errors
///
/// Returns [`DecodeError`] if a non-empty body is not well-formed XML.
pub fn decode_search_response(body: &[u8]) -> Result<Option<SearchPayload>, DecodeError> {
    if is_blank(body) {
        return Ok(None);
    }

    let text = std::str::from_utf8(body).map_err(|_| DecodeError::Malformed {
        expected: "UTF-8 XML",
        snippet: snippet(body),
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if !text.trim_start().starts_with('<') {
        return Err(DecodeError::Malformed {
            expected: "XML",
            snippet: snippet(body),
        });
    }

    let raw: XmlSearchResponse = quick_xml::de::from_str(text)?;

    let fields = raw
        .results
        .into_iter()
        .flat_map(|row| row.fields)
        .map(|f| FieldValue {
            name: f.name,
            value: f
                .values
                .into_iter()
                .next()
                .and_then(|v| v.text.into_iter().next())
                .unwrap_or_default(),
        })
        .collect();

    Ok(Some(SearchPayload {
        job_id: raw.sid.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        fields,
    }))
}

/// Decode a JSON body into `T`.
///
/// # Errors
///
/// Returns [`DecodeError::Json`] if a non-empty body does not match `T`.
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, DecodeError> {
    if is_blank(body) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(body)?))
}

/// A plain endpoint response reduced to `(value, dimension)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointRecord {
    pub entries: Vec<EndpointEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndpointEntry {
    pub metric_value: f64,
    pub dimension: String,
}

/// `/services/server/introspection/indexer?output_mode=json`
#[derive(Debug, Deserialize)]
pub struct IndexerThroughputResponse {
    #[serde(rename = "entry", default)]
    pub entries: Vec<IndexerThroughputEntry>,
}

#[derive(Debug, Deserialize)]
pub struct IndexerThroughputEntry {
    pub content: IndexerThroughputContent,
}

#[derive(Debug, Deserialize)]
pub struct IndexerThroughputContent {
    #[serde(default)]
    pub status: String,
    #[serde(rename = "average_KBps")]
    pub average_kbps: f64,
}

impl From<IndexerThroughputResponse> for EndpointRecord {
    fn from(res: IndexerThroughputResponse) -> Self {
        Self {
            entries: res
                .entries
                .into_iter()
                .map(|e| EndpointEntry {
                    metric_value: e.content.average_kbps,
                    dimension: e.content.status,
                })
                .collect(),
        }
    }
}

/// Decode the indexer introspection endpoint.
///
/// # Errors
///
/// Returns [`DecodeError::Json`] if a non-empty body is not the expected shape.
pub fn decode_indexer_throughput(body: &[u8]) -> Result<Option<EndpointRecord>, DecodeError> {
    Ok(decode_json::<IndexerThroughputResponse>(body)?.map(EndpointRecord::from))
}

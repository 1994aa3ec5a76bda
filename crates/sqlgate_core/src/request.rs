use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestItem {
    pub query: Option<String>,
    pub statement: Option<String>,
    pub values: Option<Value>,
    #[serde(rename = "valuesBatch")]
    pub values_batch: Option<Vec<Value>>,
    #[serde(rename = "noFail", default)]
    pub no_fail: bool,
}

impl RequestItem {
    /// The SQL text the client sent, whichever of `query`/`statement` it
    /// used to carry it.
    pub fn sql(&self) -> Option<&str> {
        self.query.as_deref().or(self.statement.as_deref())
    }

    pub fn is_query(&self) -> bool {
        self.query.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(rename = "resultFormat")]
    pub result_format: Option<String>,
    pub credentials: Option<Credentials>,
    pub transaction: Vec<RequestItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    Map,
    List,
}

impl ResultFormat {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.to_ascii_lowercase()).as_deref() {
            Some("list") => Self::List,
            _ => Self::Map,
        }
    }
}

/// One slot of `results[]`, serialized with only the fields its shape uses.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultItem {
    pub success: bool,
    #[serde(rename = "rowsUpdated", skip_serializing_if = "Option::is_none")]
    pub rows_updated: Option<u64>,
    #[serde(rename = "rowsUpdatedBatch", skip_serializing_if = "Option::is_none")]
    pub rows_updated_batch: Option<Vec<u64>>,
    #[serde(rename = "resultHeaders", skip_serializing_if = "Option::is_none")]
    pub result_headers: Option<Vec<String>>,
    #[serde(rename = "resultSet", skip_serializing_if = "Option::is_none")]
    pub result_set: Option<Vec<Map<String, Value>>>,
    #[serde(rename = "resultSetList", skip_serializing_if = "Option::is_none")]
    pub result_set_list: Option<Vec<Vec<Value>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultItem {
    pub fn exec(rows_updated: u64) -> Self {
        Self {
            success: true,
            rows_updated: Some(rows_updated),
            ..Default::default()
        }
    }

    pub fn exec_batch(rows_updated_batch: Vec<u64>) -> Self {
        Self {
            success: true,
            rows_updated_batch: Some(rows_updated_batch),
            ..Default::default()
        }
    }

    pub fn query_map(headers: Vec<String>, rows: Vec<Map<String, Value>>) -> Self {
        Self {
            success: true,
            result_headers: Some(headers),
            result_set: Some(rows),
            ..Default::default()
        }
    }

    pub fn query_list(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            success: true,
            result_headers: Some(headers),
            result_set_list: Some(rows),
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub results: Vec<ResultItem>,
}

/// Top-level failure shape for request-level (not per-item) errors.
#[derive(Debug, Clone, Serialize)]
pub struct TopLevelError {
    #[serde(rename = "reqIdx", skip_serializing_if = "Option::is_none")]
    pub req_idx: Option<usize>,
    pub error: String,
}

//! Decoding of LeakOsint responses.
//!
//! The body is classified exactly once into [`ApiResponse`]; nothing
//! downstream inspects raw JSON keys again.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One matched record: field name to value, in API order
pub type Record = Map<String, Value>;

/// Keys signalling a remote failure. Both conventions are seen in the wild.
const ERROR_KEYS: [&str; 2] = ["error", "Error code"];
/// Key of the results container
const RESULTS_KEY: &str = "List";

/// A named group of matched records, usually one leaked database
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseSection {
    /// Database name as reported by the API
    pub name: String,
    /// Optional description of the leak
    pub info: Option<String>,
    /// Matched records
    pub records: Vec<Record>,
    /// Number of results the API claims for this section
    pub result_count: Option<u64>,
}

/// Top-level counters returned alongside the sections
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchSummary {
    /// Number of databases with matches
    #[serde(rename = "NumOfDatabase")]
    pub databases: Option<u64>,
    /// Total number of matched records
    #[serde(rename = "NumOfResults")]
    pub results: Option<u64>,
    /// Remaining free requests for the credential
    pub free_requests_left: Option<i64>,
    /// Price charged for the request
    pub price: Option<f64>,
    /// Server-side search time in seconds
    #[serde(rename = "search time")]
    pub search_time: Option<f64>,
}

/// Successful search payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    /// Sections in the order returned by the API
    pub sections: Vec<DatabaseSection>,
    /// Response counters
    pub summary: SearchSummary,
}

/// Classified response body
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// Well-formed body with a results container
    Success(SearchResults),
    /// Well-formed body carrying an error indicator
    ApiError(String),
    /// Well-formed body without a results container
    MissingResults,
    /// Body that is not a JSON object
    Malformed(String),
}

#[derive(Deserialize)]
struct LenientSection {
    #[serde(rename = "InfoLeak")]
    info: Option<Value>,
    #[serde(rename = "Data")]
    data: Option<Vec<Value>>,
    #[serde(rename = "NumOfResults")]
    count: Option<u64>,
}

impl ApiResponse {
    /// Classifies a raw response body.
    ///
    /// # Examples
    ///
    /// ```
    /// use osint_lookup_bot::api::ApiResponse;
    ///
    /// assert!(matches!(ApiResponse::decode("<html>"), ApiResponse::Malformed(_)));
    /// assert!(matches!(
    ///     ApiResponse::decode(r#"{"error": "bad token"}"#),
    ///     ApiResponse::ApiError(_)
    /// ));
    /// ```
    #[must_use]
    pub fn decode(body: &str) -> Self {
        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(e) => return Self::Malformed(format!("invalid JSON: {e}")),
        };
        let Value::Object(mut object) = value else {
            return Self::Malformed("response is not a JSON object".to_string());
        };

        if let Some(error) = ERROR_KEYS.iter().find_map(|key| object.get(*key)) {
            return Self::ApiError(value_text(error));
        }

        let Some(list) = object.remove(RESULTS_KEY) else {
            return Self::MissingResults;
        };
        let Value::Object(list) = list else {
            return Self::Malformed(format!("\"{RESULTS_KEY}\" is not an object"));
        };

        let sections = list
            .into_iter()
            .map(|(name, section)| DatabaseSection::from_value(name, section))
            .collect();
        let summary = serde_json::from_value(Value::Object(object)).unwrap_or_default();

        Self::Success(SearchResults { sections, summary })
    }
}

impl DatabaseSection {
    fn from_value(name: String, value: Value) -> Self {
        match serde_json::from_value::<LenientSection>(value.clone()) {
            Ok(section) if value.is_object() => Self {
                name,
                info: section.info.as_ref().map(value_text),
                records: section
                    .data
                    .unwrap_or_default()
                    .into_iter()
                    .map(into_record)
                    .collect(),
                result_count: section.count,
            },
            // Unexpected shape: keep the section visible with its raw content
            _ => Self {
                name,
                info: Some(value_text(&value)),
                ..Self::default()
            },
        }
    }
}

fn into_record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

/// Text shown for a JSON value: strings unquoted, everything else as JSON.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// Query-string construction for filtered listings.
//
// A filter key is only sent when it has a value and that value is not the
// empty string. Order of insertion is preserved on the wire.

use std::fmt::Display;

/// Ordered list of query parameters that skips blank values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `key=value` unless the value is absent or renders empty.
    pub fn push<V: Display>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            let rendered = value.to_string();
            if !rendered.is_empty() {
                self.pairs.push((key.to_owned(), rendered));
            }
        }
        self
    }

    /// Builder-style [`push`](Self::push).
    pub fn with<V: Display>(mut self, key: &str, value: Option<V>) -> Self {
        self.push(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// URL-encoded form, without the leading `?`.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

/// Filters accepted by `/api/logs` and `/api/logs/export`.
///
/// `None` and `Some("")` both mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub ip: Option<String>,
    pub severity: Option<String>,
    /// Event type (`signature`, `anomaly`, ...); sent as `type`.
    pub event_type: Option<String>,
    /// Inclusive lower bound (date or timestamp); sent as `from`.
    pub from: Option<String>,
    /// Inclusive upper bound; sent as `to`.
    pub to: Option<String>,
    pub limit: Option<u32>,
}

impl LogFilter {
    pub fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .with("ip", self.ip.as_deref())
            .with("severity", self.severity.as_deref())
            .with("type", self.event_type.as_deref())
            .with("from", self.from.as_deref())
            .with("to", self.to.as_deref())
            .with("limit", self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_null_and_empty_filters() {
        let filter = LogFilter {
            ip: Some(String::new()),
            severity: Some("high".into()),
            event_type: None,
            limit: Some(50),
            ..LogFilter::default()
        };
        assert_eq!(filter.to_query().to_query_string(), "severity=high&limit=50");
    }

    #[test]
    fn empty_filter_yields_empty_query() {
        let query = LogFilter::default().to_query();
        assert!(query.is_empty());
        assert_eq!(query.to_query_string(), "");
    }

    #[test]
    fn values_are_encoded() {
        let query = QueryParams::new()
            .with("from", Some("2025-01-01 00:00"))
            .with("ip", Some("10.0.0.1"));
        assert_eq!(query.to_query_string(), "from=2025-01-01+00%3A00&ip=10.0.0.1");
    }
}

//! Query parameter encoding for remote URLs.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters escaped in query keys and values.
///
/// Everything except the unreserved marks, matching the JavaScript
/// `encodeURIComponent` set the remote API was built against.
const QUERY_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// A string value, rendered as-is (then percent-encoded).
    Text(String),
    /// A numeric value. Non-finite numbers render as an empty value.
    Number(f64),
    /// A boolean, rendered `true`/`false`.
    Bool(bool),
    /// An explicit null, rendered as an empty value.
    Null,
    /// A list: the key is repeated once per element.
    List(Vec<QueryValue>),
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        QueryValue::Text(v.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        QueryValue::Text(v)
    }
}

impl From<f64> for QueryValue {
    fn from(v: f64) -> Self {
        QueryValue::Number(v)
    }
}

impl From<i64> for QueryValue {
    fn from(v: i64) -> Self {
        QueryValue::Number(v as f64)
    }
}

impl From<u64> for QueryValue {
    fn from(v: u64) -> Self {
        QueryValue::Number(v as f64)
    }
}

impl From<bool> for QueryValue {
    fn from(v: bool) -> Self {
        QueryValue::Bool(v)
    }
}

impl<V: Into<QueryValue>> From<Vec<V>> for QueryValue {
    fn from(values: Vec<V>) -> Self {
        QueryValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// An ordered set of query parameters.
///
/// Order is preserved so produced query strings are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(Vec<(String, QueryValue)>);

impl QueryParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter, builder-style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    /// Returns true if no parameters are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builds the query string for these parameters.
    ///
    /// Keys and values are percent-encoded; list values repeat the key
    /// once per element. The result carries no leading `?`.
    #[must_use]
    pub fn build(&self) -> String {
        let mut parts = Vec::new();
        for (key, value) in &self.0 {
            let encoded_key = encode(key);
            match value {
                QueryValue::List(items) => {
                    for item in items {
                        parts.push(format!("{}={}", encoded_key, encode(&stringify(item))));
                    }
                }
                scalar => parts.push(format!("{}={}", encoded_key, encode(&stringify(scalar)))),
            }
        }
        parts.join("&")
    }
}

/// Builds a query string from an optional parameter set.
///
/// An absent set yields an empty string.
#[must_use]
pub fn build_query(params: Option<&QueryParams>) -> String {
    params.map(QueryParams::build).unwrap_or_default()
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, QUERY_SET).to_string()
}

fn stringify(value: &QueryValue) -> String {
    match value {
        QueryValue::Text(s) => s.clone(),
        QueryValue::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        QueryValue::Number(n) if n.is_finite() => n.to_string(),
        // Non-finite numbers, nulls, and nested lists have no scalar
        // rendering; the key stays present with an empty value.
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_params_build_empty_string() {
        assert_eq!(build_query(None), "");
        assert_eq!(build_query(Some(&QueryParams::new())), "");
    }

    #[test]
    fn scalar_params() {
        let q = QueryParams::new()
            .with("name", "smith")
            .with("page", 3i64)
            .with("active", true);
        assert_eq!(q.build(), "name=smith&page=3&active=true");
    }

    #[test]
    fn values_are_percent_encoded() {
        let q = QueryParams::new().with("q", "a b&c");
        assert_eq!(q.build(), "q=a%20b%26c");
    }

    #[test]
    fn unreserved_marks_pass_through() {
        let q = QueryParams::new().with("k", "a-b_c.d!e~f*g'h(i)j");
        assert_eq!(q.build(), "k=a-b_c.d!e~f*g'h(i)j");
    }

    #[test]
    fn list_repeats_key() {
        let q = QueryParams::new().with("id", vec![1i64, 2, 3]);
        assert_eq!(q.build(), "id=1&id=2&id=3");
    }

    #[test]
    fn non_finite_numbers_render_empty() {
        let q = QueryParams::new()
            .with("a", f64::NAN)
            .with("b", f64::INFINITY)
            .with("c", f64::NEG_INFINITY);
        assert_eq!(q.build(), "a=&b=&c=");
    }

    #[test]
    fn null_renders_empty_value() {
        let q = QueryParams::new().with("missing", QueryValue::Null);
        assert_eq!(q.build(), "missing=");
    }

    #[test]
    fn integral_floats_render_without_fraction() {
        let q = QueryParams::new().with("n", 10.0).with("m", 1.5);
        assert_eq!(q.build(), "n=10&m=1.5");
    }
}

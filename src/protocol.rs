//! Wire-level types shared by the shard, the query engine and the write path
//!
//! A `Series` is one batch of reconstructed rows: a name, a column list and
//! points whose values line up with the columns. A `Response` is what flows
//! through a batch stream: either data or the end-of-stream marker.

use serde::{Deserialize, Serialize};

/// A single typed column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Double(f64),
    /// Boolean
    Bool(bool),
    /// UTF-8 string
    String(String),
}

/// One row of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Microseconds since the Unix epoch
    pub timestamp: i64,
    /// Disambiguates points sharing a timestamp
    pub sequence_number: u64,
    /// One entry per series column; `None` where the row has no value
    pub values: Vec<Option<FieldValue>>,
}

impl Point {
    /// Create a point
    pub fn new(timestamp: i64, sequence_number: u64, values: Vec<Option<FieldValue>>) -> Self {
        Self {
            timestamp,
            sequence_number,
            values,
        }
    }
}

/// A named batch of points sharing one column list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Series name
    pub name: String,
    /// Column names, in value order
    pub fields: Vec<String>,
    /// Rows
    pub points: Vec<Point>,
}

impl Series {
    /// Create an empty series with the given columns
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fields,
            points: Vec::new(),
        }
    }

    /// Create a series with points
    pub fn with_points(name: impl Into<String>, fields: Vec<String>, points: Vec<Point>) -> Self {
        Self {
            name: name.into(),
            fields,
            points,
        }
    }

    /// Number of rows
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Whether two batches can be merged without reshaping rows
    pub fn same_shape(&self, other: &Series) -> bool {
        self.name == other.name && self.fields == other.fields
    }
}

/// One element of a batch stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// A data batch
    Series(Series),
    /// No further batches follow
    EndStream,
}

impl Response {
    /// Whether this is the end-of-stream marker
    pub fn is_end_stream(&self) -> bool {
        matches!(self, Response::EndStream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_json_is_tagged() {
        let json = serde_json::to_string(&FieldValue::Int(3)).unwrap();
        assert_eq!(json, r#"{"int":3}"#);

        let parsed: FieldValue = serde_json::from_str(r#"{"double":3.0}"#).unwrap();
        assert_eq!(parsed, FieldValue::Double(3.0));
    }

    #[test]
    fn test_same_shape() {
        let a = Series::new("cpu", vec!["value".into()]);
        let b = Series::new("cpu", vec!["value".into()]);
        let c = Series::new("cpu", vec!["value".into(), "host".into()]);
        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&c));
    }

    #[test]
    fn test_end_stream_marker() {
        assert!(Response::EndStream.is_end_stream());
        assert!(!Response::Series(Series::new("x", vec![])).is_end_stream());
    }
}

//! Parsed query representation

use std::fmt;

/// Which columns a query selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Columns {
    /// `*`
    All,
    /// An explicit column list, in query order
    Named(Vec<String>),
}

/// Time order of returned points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Oldest first
    Ascending,
    /// Newest first
    #[default]
    Descending,
}

/// A `select ... from <series>` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Selected columns
    pub columns: Columns,
    /// Series the query reads
    pub series: String,
    /// Point order
    pub order: Order,
    /// Maximum number of points, if bounded
    pub limit: Option<usize>,
}

impl Query {
    /// Every column of every point of `series`, newest first.
    pub fn full_scan(series: impl Into<String>) -> Self {
        Self {
            columns: Columns::All,
            series: series.into(),
            order: Order::Descending,
            limit: None,
        }
    }

    /// Whether the query returns every row and column unchanged
    pub fn is_full_scan(&self) -> bool {
        self.columns == Columns::All && self.limit.is_none()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "select ")?;
        match &self.columns {
            Columns::All => write!(f, "*")?,
            Columns::Named(names) => write!(f, "{}", names.join(", "))?,
        }
        write!(f, " from \"{}\"", self.series.replace('\\', "\\\\").replace('"', "\\\""))?;
        if self.order == Order::Ascending {
            write!(f, " order asc")?;
        }
        if let Some(limit) = self.limit {
            write!(f, " limit {}", limit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_scan_defaults() {
        let query = Query::full_scan("cpu");
        assert!(query.is_full_scan());
        assert_eq!(query.order, Order::Descending);
        assert_eq!(query.to_string(), r#"select * from "cpu""#);
    }

    #[test]
    fn test_display_escapes_quotes() {
        let query = Query {
            columns: Columns::Named(vec!["a".into(), "b".into()]),
            series: "we\"ird".into(),
            order: Order::Ascending,
            limit: Some(5),
        };
        assert_eq!(
            query.to_string(),
            r#"select a, b from "we\"ird" order asc limit 5"#
        );
        assert!(!query.is_full_scan());
    }
}

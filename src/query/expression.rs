//! Introspectable description of a composed query.

use std::fmt;

/// One operator in a query chain, in the order it was composed.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStep {
    /// The root: the backing store of the set.
    Source { element_type: &'static str },
    Filter,
    Map { output_type: &'static str },
    OrderBy { key_type: &'static str, descending: bool },
    Skip(usize),
    Take(usize),
}

impl QueryStep {
    /// Operator name as it appears in [`fmt::Display`].
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Source { .. } => "source",
            Self::Filter => "filter",
            Self::Map { .. } => "map",
            Self::OrderBy {
                descending: false, ..
            } => "order_by",
            Self::OrderBy {
                descending: true, ..
            } => "order_by_descending",
            Self::Skip(_) => "skip",
            Self::Take(_) => "take",
        }
    }
}

impl fmt::Display for QueryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source { element_type } => write!(f, "source<{element_type}>"),
            Self::Map { output_type } => write!(f, "map<{output_type}>"),
            Self::OrderBy { key_type, .. } => write!(f, "{}<{key_type}>", self.name()),
            Self::Skip(n) | Self::Take(n) => write!(f, "{}({n})", self.name()),
            Self::Filter => write!(f, "{}", self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(QueryStep::Take(3).to_string(), "take(3)");
        assert_eq!(QueryStep::Filter.to_string(), "filter");
        assert_eq!(
            QueryStep::OrderBy {
                key_type: "i32",
                descending: true
            }
            .to_string(),
            "order_by_descending<i32>"
        );
        assert_eq!(
            QueryStep::Source { element_type: "Person" }.to_string(),
            "source<Person>"
        );
    }
}

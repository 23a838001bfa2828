//! Query construction for the DORA search index.
//!
//! Turns a free-text search term into the repository's weighted Solr-style
//! query, and provides the path and filter encodings the repository expects.

use chrono::NaiveDate;

use crate::errors::{DoraError, Result};

/// Query that matches every publication in the repository.
pub const MATCH_ALL_QUERY: &str = "*:*";

/// Index field holding the issue date used by year and date-range filters.
pub const DATE_ISSUED_FIELD: &str = "mods_originInfo_encoding_w3cdtf_keyDate_yes_dateIssued_dt";

/// One searchable index field and its boost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldWeight {
    /// Name of the field in the repository index.
    pub field: &'static str,
    /// Boost applied to matches in this field.
    pub weight: u32,
}

/// The fields searched for a free-text term, in canonical order.
pub const DEFAULT_FIELD_WEIGHTS: [FieldWeight; 7] = [
    // title
    FieldWeight {
        field: "mods_titleInfo_title_mt",
        weight: 5,
    },
    // abstract
    FieldWeight {
        field: "mods_abstract_ms",
        weight: 2,
    },
    // creator
    FieldWeight {
        field: "dc.creator",
        weight: 2,
    },
    // original author list
    FieldWeight {
        field: "mods_extension_originalAuthorList_mt",
        weight: 2,
    },
    // contributor
    FieldWeight {
        field: "dc.contributor",
        weight: 1,
    },
    // type
    FieldWeight {
        field: "dc.type",
        weight: 1,
    },
    // catch-all
    FieldWeight {
        field: "catch_all_MODS_mt",
        weight: 1,
    },
];

/// Builds weighted OR queries over a fixed field table.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    weights: &'a [FieldWeight],
}

impl Default for QueryBuilder<'static> {
    fn default() -> Self {
        Self::new(&DEFAULT_FIELD_WEIGHTS)
    }
}

impl<'a> QueryBuilder<'a> {
    /// Creates a builder over the given field table.
    pub fn new(weights: &'a [FieldWeight]) -> Self {
        Self { weights }
    }

    /// Returns the field table this builder emits clauses for.
    pub fn weights(&self) -> &'a [FieldWeight] {
        self.weights
    }

    /// Builds the unencoded weighted query for `term`.
    ///
    /// Emits one `field:(term)^weight` clause per table entry, in table order,
    /// joined with ` OR `. Fails with `InvalidArgument` when the term is blank.
    pub fn build(&self, term: &str) -> Result<String> {
        let term = term.trim();
        if term.is_empty() {
            return Err(DoraError::invalid_argument(
                "search term must not be empty",
            ));
        }

        let clauses: Vec<String> = self
            .weights
            .iter()
            .map(|fw| format!("{}:({})^{}", fw.field, term, fw.weight))
            .collect();

        Ok(clauses.join(" OR "))
    }
}

/// Builds the weighted query for `term` using [`DEFAULT_FIELD_WEIGHTS`].
pub fn build_query(term: &str) -> Result<String> {
    QueryBuilder::default().build(term)
}

/// Percent-encodes a query for use as a URL path segment.
///
/// Everything outside the unreserved set is escaped, including `*` and `:`.
pub fn encode_query(query: &str) -> String {
    urlencoding::encode(query).into_owned()
}

/// Percent-encodes a filter value for a `f[n]` query parameter.
///
/// Same as [`encode_query`] except that `:` is left literal; the repository
/// does not match field filters whose separator is escaped.
pub fn encode_filter(filter: &str) -> String {
    filter
        .split(':')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join(":")
}

/// Decodes a percent-encoded component back to text.
pub fn decode_component(encoded: &str) -> Result<String> {
    urlencoding::decode(encoded)
        .map(|s| s.into_owned())
        .map_err(|e| DoraError::invalid_argument(format!("invalid percent-encoding: {}", e)))
}

/// Filter restricting results to publications issued within `year`.
pub fn year_filter(year: i32) -> String {
    date_issued_filter(
        &format!("{year:04}-01-01T00:00:00Z"),
        &format!("{year:04}-12-31T23:59:59Z"),
    )
}

/// Filter restricting results to publications issued between two dates, inclusive.
pub fn date_range_filter(start: NaiveDate, end: NaiveDate) -> String {
    date_issued_filter(
        &format!("{}T00:00:00Z", start.format("%Y-%m-%d")),
        &format!("{}T23:59:59Z", end.format("%Y-%m-%d")),
    )
}

fn date_issued_filter(from: &str, to: &str) -> String {
    format!("{DATE_ISSUED_FIELD}:[{from} TO {to}]")
}

//! MCP tool definitions and typed argument parsing.
//!
//! The registry is a fixed catalog built once at startup. A `tools/call`
//! request is resolved against it and its arguments are validated into a
//! [`ToolCall`] before any repository request is made.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::Result;
use crate::query::{date_range_filter, year_filter, MATCH_ALL_QUERY};
use crate::repository::{PublicationRepository, SearchResult};

/// Earliest and latest year accepted by `search_by_year`.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1000..=9999;

/// A tool definition exposed by the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// The catalog of tools served by `tools/list`, in declaration order.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(get_tool_definitions())
    }
}

impl ToolRegistry {
    /// Creates a registry over an explicit list of definitions.
    pub fn new(tools: Vec<ToolDefinition>) -> Self {
        Self { tools }
    }

    /// Returns every tool, in declaration order.
    pub fn list_tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Looks up a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }
}

/// Returns the definitions of all DORA search tools.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "search_publications".to_string(),
            description: "Search the DORA (Digital Object Repository for Academia) database for scientific publications. Searches across titles, abstracts, authors, and other metadata fields. Returns a list of publications matching the search criteria.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "search_string": {
                        "type": "string",
                        "description": "The search term to query. Can be an author name, title keyword, or any search term. Example: 'manfred heuberger'"
                    }
                },
                "required": ["search_string"]
            }),
        },
        ToolDefinition {
            name: "search_by_year".to_string(),
            description: "Search for DORA publications issued in a specific year.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "year": {
                        "type": "integer",
                        "description": "Year to search for (e.g., 2018)"
                    }
                },
                "required": ["year"]
            }),
        },
        ToolDefinition {
            name: "search_by_date_range".to_string(),
            description: "Search for DORA publications issued within a date range (inclusive).".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "start_date": {
                        "type": "string",
                        "description": "Start date in ISO format (e.g., '2018-01-01')"
                    },
                    "end_date": {
                        "type": "string",
                        "description": "End date in ISO format (e.g., '2018-12-31')"
                    }
                },
                "required": ["start_date", "end_date"]
            }),
        },
        ToolDefinition {
            name: "search_with_filters".to_string(),
            description: "Run a raw DORA repository query with optional filter strings. No field weighting is applied.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Repository query (default: '*:*' for all publications)",
                        "default": MATCH_ALL_QUERY
                    },
                    "filters": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Optional list of filter strings, e.g. 'dc.type:Journal Article'"
                    }
                }
            }),
        },
    ]
}

/// Why a `tools/call` request could not be turned into a [`ToolCall`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCallError {
    /// No tool with this name is registered.
    UnknownTool(String),
    /// The arguments do not satisfy the tool's schema.
    InvalidArguments { tool: String, message: String },
}

impl std::fmt::Display for ToolCallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTool(name) => write!(f, "unknown tool: {}", name),
            Self::InvalidArguments { tool, message } => {
                write!(f, "invalid arguments for {}: {}", tool, message)
            }
        }
    }
}

#[derive(Deserialize)]
struct SearchPublicationsArgs {
    search_string: String,
}

#[derive(Deserialize)]
struct SearchByYearArgs {
    year: i32,
}

#[derive(Deserialize)]
struct SearchByDateRangeArgs {
    start_date: String,
    end_date: String,
}

#[derive(Deserialize)]
struct SearchWithFiltersArgs {
    #[serde(default = "default_query")]
    query: String,
    #[serde(default)]
    filters: Vec<String>,
}

fn default_query() -> String {
    MATCH_ALL_QUERY.to_string()
}

/// A validated tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    SearchPublications { search_string: String },
    SearchByYear { year: i32 },
    SearchByDateRange { start: NaiveDate, end: NaiveDate },
    SearchWithFilters { query: String, filters: Vec<String> },
}

impl ToolCall {
    /// Resolves `name` against the registry and validates `arguments`.
    pub fn parse(
        registry: &ToolRegistry,
        name: &str,
        arguments: Value,
    ) -> std::result::Result<Self, ToolCallError> {
        if registry.get(name).is_none() {
            return Err(ToolCallError::UnknownTool(name.to_string()));
        }

        let invalid = |message: String| ToolCallError::InvalidArguments {
            tool: name.to_string(),
            message,
        };

        match name {
            "search_publications" => {
                let args: SearchPublicationsArgs =
                    serde_json::from_value(arguments).map_err(|e| invalid(e.to_string()))?;
                if args.search_string.trim().is_empty() {
                    return Err(invalid("search_string must not be empty".to_string()));
                }
                Ok(Self::SearchPublications {
                    search_string: args.search_string,
                })
            }
            "search_by_year" => {
                let args: SearchByYearArgs =
                    serde_json::from_value(arguments).map_err(|e| invalid(e.to_string()))?;
                if !YEAR_RANGE.contains(&args.year) {
                    return Err(invalid(format!(
                        "year must be between {} and {}",
                        YEAR_RANGE.start(),
                        YEAR_RANGE.end()
                    )));
                }
                Ok(Self::SearchByYear { year: args.year })
            }
            "search_by_date_range" => {
                let args: SearchByDateRangeArgs =
                    serde_json::from_value(arguments).map_err(|e| invalid(e.to_string()))?;
                let start = parse_date("start_date", &args.start_date).map_err(invalid)?;
                let end = parse_date("end_date", &args.end_date).map_err(invalid)?;
                if start > end {
                    return Err(invalid("start_date must not be after end_date".to_string()));
                }
                Ok(Self::SearchByDateRange { start, end })
            }
            "search_with_filters" => {
                let args: SearchWithFiltersArgs =
                    serde_json::from_value(arguments).map_err(|e| invalid(e.to_string()))?;
                if args.query.trim().is_empty() {
                    return Err(invalid("query must not be empty".to_string()));
                }
                Ok(Self::SearchWithFilters {
                    query: args.query,
                    filters: args.filters,
                })
            }
            // Registered but without a handler.
            _ => Err(ToolCallError::UnknownTool(name.to_string())),
        }
    }

    /// Short human-readable description of what is being searched.
    pub fn describe(&self) -> String {
        match self {
            Self::SearchPublications { search_string } => format!("'{}'", search_string.trim()),
            Self::SearchByYear { year } => format!("year {}", year),
            Self::SearchByDateRange { start, end } => format!("{} to {}", start, end),
            Self::SearchWithFilters { query, filters } if filters.is_empty() => {
                format!("query '{}'", query)
            }
            Self::SearchWithFilters { query, filters } => {
                format!("query '{}' with filters [{}]", query, filters.join(", "))
            }
        }
    }

    /// Runs the search against the repository.
    pub async fn execute(&self, repository: &dyn PublicationRepository) -> Result<SearchResult> {
        match self {
            Self::SearchPublications { search_string } => repository.search(search_string).await,
            Self::SearchByYear { year } => {
                repository
                    .search_by_filter(MATCH_ALL_QUERY, &[year_filter(*year)])
                    .await
            }
            Self::SearchByDateRange { start, end } => {
                repository
                    .search_by_filter(MATCH_ALL_QUERY, &[date_range_filter(*start, *end)])
                    .await
            }
            Self::SearchWithFilters { query, filters } => {
                repository.search_by_filter(query, filters).await
            }
        }
    }
}

fn parse_date(field: &str, value: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| format!("{} '{}' is not a YYYY-MM-DD date: {}", field, value, e))
}

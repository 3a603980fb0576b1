use crate::error::SearchError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;
pub const MAX_ID_FILTER: usize = 50;

/// Field names of the archive index.
pub mod fields {
    pub const RAW_TEXT: &str = "suchtext";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const PHOTOGRAPHER: &str = "fotografen";
    pub const DATE: &str = "datum";
    pub const WIDTH: &str = "breite";
    pub const HEIGHT: &str = "hoehe";
    pub const DATABASE: &str = "db";
    pub const MEDIA_ID: &str = "bildnummer";
    pub const SCORE: &str = "_score";
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Relevance,
    Date,
    Id,
    Width,
    Height,
}

impl SortField {
    pub const ALL: [SortField; 5] = [
        SortField::Relevance,
        SortField::Date,
        SortField::Id,
        SortField::Width,
        SortField::Height,
    ];

    pub fn index_field(self) -> &'static str {
        match self {
            SortField::Relevance => fields::SCORE,
            SortField::Date => fields::DATE,
            SortField::Id => fields::MEDIA_ID,
            SortField::Width => fields::WIDTH,
            SortField::Height => fields::HEIGHT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Relevance => "relevance",
            SortField::Date => "date",
            SortField::Id => "id",
            SortField::Width => "width",
            SortField::Height => "height",
        }
    }
}

impl FromStr for SortField {
    type Err = SearchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SortField::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| SearchError::Validation(format!("unknown sort field `{value}`")))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = SearchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(SearchError::Validation(format!("unknown sort order `{other}`"))),
        }
    }
}

/// Archive partition a picture belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    St,
    Sp,
}

impl DatabaseType {
    pub const ALL: [DatabaseType; 2] = [DatabaseType::St, DatabaseType::Sp];

    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseType::St => "st",
            DatabaseType::Sp => "sp",
        }
    }
}

impl FromStr for DatabaseType {
    type Err = SearchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        DatabaseType::ALL
            .into_iter()
            .find(|db| db.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| SearchError::Validation(format!("unknown database `{value}`")))
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub photographer: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_height: Option<u32>,
    pub database: Option<DatabaseType>,
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: Option<String>,
    pub offset: usize,
    pub limit: usize,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub filters: SearchFilters,
    pub highlight: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: None,
            offset: 0,
            limit: DEFAULT_LIMIT,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            filters: SearchFilters::default(),
            highlight: false,
        }
    }
}

impl SearchRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            query: Some(text.into()),
            ..Self::default()
        }
    }

    /// Checks the documented request bounds. The orchestrator assumes a
    /// request that passed this check.
    pub fn validate(&self) -> Result<(), SearchError> {
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(SearchError::Validation(format!(
                "limit must be between 1 and {MAX_LIMIT}, got {}",
                self.limit
            )));
        }

        let filters = &self.filters;
        check_range("width", filters.min_width, filters.max_width)?;
        check_range("height", filters.min_height, filters.max_height)?;
        if let (Some(from), Some(to)) = (filters.date_from, filters.date_to) {
            if from > to {
                return Err(SearchError::Validation(format!(
                    "dateFrom {from} is after dateTo {to}"
                )));
            }
        }

        if filters.ids.len() > MAX_ID_FILTER {
            return Err(SearchError::Validation(format!(
                "at most {MAX_ID_FILTER} ids may be requested, got {}",
                filters.ids.len()
            )));
        }
        if let Some(bad) = filters
            .ids
            .iter()
            .find(|id| id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(SearchError::Validation(format!("id `{bad}` is not numeric")));
        }

        Ok(())
    }
}

fn check_range(name: &str, min: Option<u32>, max: Option<u32>) -> Result<(), SearchError> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(SearchError::Validation(format!(
            "min {name} {min} exceeds max {name} {max}"
        ))),
        _ => Ok(()),
    }
}

/// A document as the engine returned it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawHit {
    pub id: String,
    pub score: Option<f64>,
    pub source: Map<String, Value>,
    pub highlight: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineSearchResult {
    pub total: u64,
    pub took_ms: u64,
    pub hits: Vec<RawHit>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
    Square,
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    De,
    En,
    Mixed,
    Unknown,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultItem {
    pub id: String,
    pub media_id: u64,
    pub title: String,
    pub description: String,
    pub original_text: String,
    pub cleaned_text: String,
    pub photographer: Option<String>,
    pub date: Option<String>,
    pub width: u32,
    pub height: u32,
    pub database: String,
    pub image_url: String,
    pub thumbnail_url: String,
    pub score: f64,
    pub aspect_ratio: Option<f64>,
    pub orientation: Orientation,
    pub language: Language,
    pub highlights: Option<HashMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub total: u64,
    pub returned: usize,
    pub offset: usize,
    pub limit: usize,
    pub took_ms: u64,
    pub has_more: bool,
    pub page: usize,
    pub total_pages: u64,
}

impl ResponseMetadata {
    pub fn new(total: u64, returned: usize, offset: usize, limit: usize, took_ms: u64) -> Self {
        let page_size = limit.max(1);
        Self {
            total,
            returned,
            offset,
            limit,
            took_ms,
            has_more: ((offset + returned) as u64) < total,
            page: offset / page_size + 1,
            total_pages: total.div_ceil(page_size as u64),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FacetValue {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Facet {
    pub name: String,
    pub values: Vec<FacetValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DimensionStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub earliest: String,
    pub latest: String,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub width: Option<DimensionStats>,
    pub height: Option<DimensionStats>,
    pub date_range: Option<DateRange>,
}

impl Stats {
    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.date_range.is_none()
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub success: bool,
    pub results: Vec<ResultItem>,
    pub metadata: ResponseMetadata,
    pub facets: Option<Vec<Facet>>,
    pub stats: Option<Stats>,
    pub suggestions: Option<Vec<String>>,
    pub warnings: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldsResponse {
    pub sort_fields: Vec<String>,
    pub sort_orders: Vec<String>,
    pub filter_fields: Vec<String>,
    pub databases: Vec<String>,
}

/// Outcome handed to the transport boundary, dispatched on `type`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum GatewayResponse {
    Search(SearchResponse),
    Item(ResultItem),
    Fields(FieldsResponse),
}

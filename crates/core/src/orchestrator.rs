use crate::aggregations::{plan_facets, render_facets, render_stats, AggregationSpec};
use crate::models::{
    fields, DatabaseType, FieldsResponse, RawHit, ResponseMetadata, ResultItem, SearchRequest,
    SearchResponse, SortField, SortOrder,
};
use crate::query;
use crate::text::{NO_DESCRIPTION, UNTITLED};
use crate::traits::SearchEngine;
use crate::transform::ResultTransformer;
use crate::SearchError;
use std::time::Instant;
use tracing::{debug, error, info_span, warn, Instrument};
use uuid::Uuid;

const SUGGESTION_THRESHOLD: u64 = 10;
const MAX_SUGGESTIONS: usize = 3;
const FALLBACK_SUGGESTIONS: usize = 5;

pub const SUGGESTION_VOCABULARY: &[&str] = &[
    "landscape",
    "portrait",
    "nature",
    "architecture",
    "street",
    "wildlife",
    "sunset",
    "mountain",
    "city",
    "people",
    "travel",
    "black and white",
    "sports",
    "night",
    "macro",
];

/// Entry point for searches and single-picture lookups against one engine.
pub struct SearchService<E>
where
    E: SearchEngine,
{
    engine: E,
    transformer: ResultTransformer,
    aggregations: AggregationSpec,
}

impl<E> SearchService<E>
where
    E: SearchEngine + Send + Sync,
{
    pub fn new(engine: E, transformer: ResultTransformer) -> Self {
        Self {
            engine,
            transformer,
            aggregations: plan_facets(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Runs one search. The request is expected to have passed
    /// [`SearchRequest::validate`].
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let span = info_span!(
            "search",
            request_id = %Uuid::new_v4(),
            query = request.query.as_deref().unwrap_or(""),
            offset = request.offset,
            limit = request.limit,
        );
        self.run_search(request).instrument(span).await
    }

    async fn run_search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let started = Instant::now();
        let query = query::build(request);
        debug!(body = %query.search_body(), "engine query built");

        let (hits, aggregations) = tokio::join!(
            self.engine.search(&query),
            self.engine.aggregate(&query, &self.aggregations)
        );

        let hits = hits.map_err(|error| {
            log_failure("search", &error);
            error
        })?;
        let aggregations = match aggregations {
            Ok(aggregations) => Some(aggregations),
            Err(error) => {
                warn!(%error, "aggregations unavailable, facets and stats omitted");
                None
            }
        };

        let results = self.transform_hits(&hits.hits, request.highlight);
        let took_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let metadata = ResponseMetadata::new(
            hits.total,
            results.len(),
            request.offset,
            request.limit,
            took_ms,
        );
        debug!(
            total = hits.total,
            returned = results.len(),
            engine_took_ms = hits.took_ms,
            took_ms,
            "search completed"
        );

        let facets = aggregations
            .as_ref()
            .map(render_facets)
            .filter(|facets| !facets.is_empty());
        let stats = aggregations
            .as_ref()
            .map(render_stats)
            .filter(|stats| !stats.is_empty());

        Ok(SearchResponse {
            success: true,
            suggestions: suggestions(request.query.as_deref(), hits.total),
            warnings: quality_warnings(&results),
            results,
            metadata,
            facets,
            stats,
        })
    }

    /// `Ok(None)` when the engine has no picture with this id.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<ResultItem>, SearchError> {
        let hit = self.engine.get(id).await.map_err(|error| {
            log_failure("get", &error);
            error
        })?;

        let Some(hit) = hit else {
            debug!(id, "picture not found");
            return Ok(None);
        };

        self.transformer
            .transform(&hit, false)
            .map(Some)
            .map_err(|error| {
                error!(id, %error, "stored picture is malformed");
                SearchError::Internal(error.to_string())
            })
    }

    /// Describes which fields callers may sort and filter on.
    pub fn available_fields(&self) -> FieldsResponse {
        FieldsResponse {
            sort_fields: SortField::ALL
                .iter()
                .map(|field| field.as_str().to_string())
                .collect(),
            sort_orders: [SortOrder::Asc, SortOrder::Desc]
                .iter()
                .map(|order| order.as_str().to_string())
                .collect(),
            filter_fields: [
                fields::PHOTOGRAPHER,
                fields::DATE,
                fields::WIDTH,
                fields::HEIGHT,
                fields::DATABASE,
                fields::MEDIA_ID,
            ]
            .iter()
            .map(|field| field.to_string())
            .collect(),
            databases: DatabaseType::ALL
                .iter()
                .map(|db| db.as_str().to_string())
                .collect(),
        }
    }

    /// Malformed hits are logged and dropped; the rest keep engine order.
    fn transform_hits(&self, hits: &[RawHit], include_highlights: bool) -> Vec<ResultItem> {
        hits.iter()
            .filter_map(|hit| match self.transformer.transform(hit, include_highlights) {
                Ok(item) => Some(item),
                Err(error) => {
                    warn!(hit_id = %hit.id, %error, "skipping malformed hit");
                    None
                }
            })
            .collect()
    }
}

fn log_failure(operation: &str, failure: &SearchError) {
    match failure {
        SearchError::InvalidQuery { reason } => {
            error!(operation, reason = %reason, "engine rejected generated query")
        }
        SearchError::Validation(_) => debug!(operation, error = %failure, "invalid request"),
        _ => error!(operation, error = %failure, kind = failure.kind(), "engine call failed"),
    }
}

/// Vocabulary hints for near-empty result sets; an empty list once the
/// result set is large enough.
pub fn suggestions(query: Option<&str>, total: u64) -> Option<Vec<String>> {
    if total > SUGGESTION_THRESHOLD {
        return Some(Vec::new());
    }

    let query = query.map(|text| text.trim().to_lowercase()).unwrap_or_default();
    let matching = if query.is_empty() {
        Vec::new()
    } else {
        SUGGESTION_VOCABULARY
            .iter()
            .filter(|term| term.contains(query.as_str()) || query.contains(*term))
            .take(MAX_SUGGESTIONS)
            .map(|term| term.to_string())
            .collect::<Vec<_>>()
    };

    if matching.is_empty() {
        Some(
            SUGGESTION_VOCABULARY
                .iter()
                .take(FALLBACK_SUGGESTIONS)
                .map(|term| term.to_string())
                .collect(),
        )
    } else {
        Some(matching)
    }
}

/// Data-quality notes, `None` when every result is clean.
pub fn quality_warnings(results: &[ResultItem]) -> Option<Vec<String>> {
    let total = results.len();
    let untitled = results.iter().filter(|item| item.title == UNTITLED).count();
    let encoding = results
        .iter()
        .filter(|item| item.cleaned_text != item.original_text || item.original_text.contains('?'))
        .count();
    let undescribed = results
        .iter()
        .filter(|item| item.description == NO_DESCRIPTION)
        .count();

    let warnings = [
        (untitled, "have generated titles"),
        (encoding, "had encoding issues fixed"),
        (undescribed, "have no description"),
    ]
    .into_iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, issue)| format!("{count} of {total} results {issue}"))
    .collect::<Vec<_>>();

    (!warnings.is_empty()).then_some(warnings)
}

use crate::models::{fields, SearchFilters, SearchRequest, SortField};
use crate::text::sanitize_query_text;
use serde_json::{json, Map, Value};

pub const HIGHLIGHT_PRE_TAG: &str = "<mark>";
pub const HIGHLIGHT_POST_TAG: &str = "</mark>";

/// Weighted fields for free-text matching, as `field^boost`.
pub const TEXT_FIELDS: [&str; 4] = ["suchtext^3", "title^2", "description^1.5", "fotografen^1"];

/// Engine query built fresh for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineQuery {
    pub must: Vec<Value>,
    pub filter: Vec<Value>,
    pub sort: Vec<Value>,
    pub highlight: Option<Value>,
    pub from: usize,
    pub size: usize,
}

impl EngineQuery {
    pub fn bool_query(&self) -> Value {
        json!({
            "bool": {
                "must": self.must,
                "filter": self.filter,
            }
        })
    }

    /// Body for the hit-returning search call.
    pub fn search_body(&self) -> Value {
        let mut body = json!({
            "from": self.from,
            "size": self.size,
            "track_total_hits": true,
            "query": self.bool_query(),
            "sort": self.sort,
        });
        if let (Some(highlight), Some(object)) = (&self.highlight, body.as_object_mut()) {
            object.insert("highlight".to_string(), highlight.clone());
        }
        body
    }

    /// Body for the aggregation-only call over the same result set.
    pub fn aggregation_body(&self, aggregations: Value) -> Value {
        json!({
            "size": 0,
            "track_total_hits": true,
            "query": self.bool_query(),
            "aggs": aggregations,
        })
    }

    pub fn is_match_all(&self) -> bool {
        self.must.len() == 1 && self.must[0].get("match_all").is_some()
    }
}

pub fn build(request: &SearchRequest) -> EngineQuery {
    EngineQuery {
        must: vec![text_clause(request.query.as_deref())],
        filter: build_filters(&request.filters),
        sort: build_sort(request),
        highlight: request.highlight.then(highlight_spec),
        from: request.offset,
        size: request.limit,
    }
}

fn text_clause(query: Option<&str>) -> Value {
    let text = query.map(sanitize_query_text).unwrap_or_default();
    if text.is_empty() {
        return json!({"match_all": {}});
    }

    json!({
        "multi_match": {
            "query": text,
            "fields": TEXT_FIELDS,
            "fuzziness": "AUTO",
            "operator": "and",
            "minimum_should_match": "75%",
        }
    })
}

fn build_filters(filters: &SearchFilters) -> Vec<Value> {
    let mut predicates = Vec::new();

    if let Some(photographer) = filters.photographer.as_deref().filter(|p| !p.trim().is_empty()) {
        predicates.push(json!({"term": {fields::PHOTOGRAPHER: photographer.trim()}}));
    }
    if let Some(range) = range_clause(
        filters.date_from.map(|date| date.format("%Y-%m-%d").to_string()),
        filters.date_to.map(|date| date.format("%Y-%m-%d").to_string()),
    ) {
        predicates.push(json!({"range": {fields::DATE: range}}));
    }
    if let Some(range) = range_clause(filters.min_width, filters.max_width) {
        predicates.push(json!({"range": {fields::WIDTH: range}}));
    }
    if let Some(range) = range_clause(filters.min_height, filters.max_height) {
        predicates.push(json!({"range": {fields::HEIGHT: range}}));
    }
    if let Some(database) = filters.database {
        predicates.push(json!({"term": {fields::DATABASE: database.as_str()}}));
    }
    if !filters.ids.is_empty() {
        predicates.push(json!({"terms": {fields::MEDIA_ID: filters.ids}}));
    }

    predicates
}

/// `gte`/`lte` bounds for the values that are present, `None` when neither is.
fn range_clause<T: Into<Value>>(lower: Option<T>, upper: Option<T>) -> Option<Value> {
    let mut bounds = Map::new();
    if let Some(lower) = lower {
        bounds.insert("gte".to_string(), lower.into());
    }
    if let Some(upper) = upper {
        bounds.insert("lte".to_string(), upper.into());
    }
    (!bounds.is_empty()).then_some(Value::Object(bounds))
}

fn build_sort(request: &SearchRequest) -> Vec<Value> {
    let mut sort = vec![json!({
        request.sort_by.index_field(): {"order": request.sort_order.as_str()}
    })];
    if request.sort_by != SortField::Id {
        sort.push(json!({fields::MEDIA_ID: {"order": "asc"}}));
    }
    sort
}

fn highlight_spec() -> Value {
    json!({
        "pre_tags": [HIGHLIGHT_PRE_TAG],
        "post_tags": [HIGHLIGHT_POST_TAG],
        "fields": {
            fields::RAW_TEXT: {"fragment_size": 150, "number_of_fragments": 3},
            fields::DESCRIPTION: {"fragment_size": 150, "number_of_fragments": 2},
            fields::TITLE: {"fragment_size": 50, "number_of_fragments": 1},
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DatabaseType, SortOrder};
    use chrono::NaiveDate;

    #[test]
    fn empty_request_is_match_all_with_id_tie_break() {
        let query = build(&SearchRequest::default());
        assert!(query.is_match_all());
        assert!(query.filter.is_empty());
        assert_eq!(
            query.sort,
            vec![
                json!({"_score": {"order": "desc"}}),
                json!({"bildnummer": {"order": "asc"}}),
            ]
        );
        assert!(query.highlight.is_none());
    }

    #[test]
    fn blank_or_structural_only_text_is_match_all() {
        assert!(build(&SearchRequest::text("   ")).is_match_all());
        assert!(build(&SearchRequest::text("<>()")).is_match_all());
    }

    #[test]
    fn text_query_uses_weighted_fuzzy_match() {
        let query = build(&SearchRequest::text("berlin (wall)"));
        let clause = &query.must[0]["multi_match"];
        assert_eq!(clause["query"], "berlin wall");
        assert_eq!(
            clause["fields"],
            json!(["suchtext^3", "title^2", "description^1.5", "fotografen^1"])
        );
        assert_eq!(clause["fuzziness"], "AUTO");
        assert_eq!(clause["operator"], "and");
        assert_eq!(clause["minimum_should_match"], "75%");
    }

    #[test]
    fn id_sort_gets_no_tie_break() {
        let request = SearchRequest {
            sort_by: SortField::Id,
            sort_order: SortOrder::Asc,
            ..SearchRequest::default()
        };
        assert_eq!(
            build(&request).sort,
            vec![json!({"bildnummer": {"order": "asc"}})]
        );
    }

    #[test]
    fn date_sort_maps_to_index_field() {
        let request = SearchRequest {
            sort_by: SortField::Date,
            ..SearchRequest::default()
        };
        let sort = build(&request).sort;
        assert_eq!(sort[0], json!({"datum": {"order": "desc"}}));
        assert_eq!(sort.len(), 2);
    }

    #[test]
    fn filters_only_emit_present_bounds() {
        let mut request = SearchRequest::default();
        request.filters.min_width = Some(1024);
        request.filters.max_height = Some(800);
        request.filters.date_to = NaiveDate::from_ymd_opt(1999, 12, 31);

        let filter = build(&request).filter;
        assert_eq!(
            filter,
            vec![
                json!({"range": {"datum": {"lte": "1999-12-31"}}}),
                json!({"range": {"breite": {"gte": 1024}}}),
                json!({"range": {"hoehe": {"lte": 800}}}),
            ]
        );
    }

    #[test]
    fn exact_match_filters() {
        let mut request = SearchRequest::default();
        request.filters.photographer = Some("Hans Muster".into());
        request.filters.database = Some(DatabaseType::Sp);
        request.filters.ids = vec!["12".into(), "34".into()];
        request.filters.date_from = NaiveDate::from_ymd_opt(2001, 5, 1);
        request.filters.date_to = NaiveDate::from_ymd_opt(2001, 6, 1);

        let filter = build(&request).filter;
        assert_eq!(filter[0], json!({"term": {"fotografen": "Hans Muster"}}));
        assert_eq!(
            filter[1],
            json!({"range": {"datum": {"gte": "2001-05-01", "lte": "2001-06-01"}}})
        );
        assert_eq!(filter[2], json!({"term": {"db": "sp"}}));
        assert_eq!(filter[3], json!({"terms": {"bildnummer": ["12", "34"]}}));
    }

    #[test]
    fn highlight_only_when_requested() {
        let request = SearchRequest {
            highlight: true,
            ..SearchRequest::text("harbour")
        };
        let query = build(&request);
        let highlight = query.highlight.clone().expect("highlight requested");
        assert_eq!(highlight["pre_tags"], json!(["<mark>"]));
        assert_eq!(highlight["fields"]["title"]["number_of_fragments"], 1);
        assert_eq!(query.search_body()["highlight"], highlight);

        let plain = build(&SearchRequest::text("harbour")).search_body();
        assert!(plain.get("highlight").is_none());
    }

    #[test]
    fn search_body_carries_paging() {
        let request = SearchRequest {
            offset: 40,
            limit: 20,
            ..SearchRequest::default()
        };
        let body = build(&request).search_body();
        assert_eq!(body["from"], 40);
        assert_eq!(body["size"], 20);
        assert_eq!(body["track_total_hits"], true);
    }
}

use crate::models::{fields, DateRange, DimensionStats, Facet, FacetValue, Stats};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

pub const PHOTOGRAPHERS: &str = "photographers";
pub const DATABASES: &str = "databases";
pub const WIDTH_STATS: &str = "width_stats";
pub const HEIGHT_STATS: &str = "height_stats";
pub const DATE_HISTOGRAM: &str = "date_histogram";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationKind {
    Terms { size: usize },
    Stats,
    YearlyHistogram,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationRequest {
    pub name: &'static str,
    pub field: &'static str,
    pub kind: AggregationKind,
}

/// The fixed set of aggregations requested next to every search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationSpec {
    pub requests: Vec<AggregationRequest>,
}

impl Default for AggregationSpec {
    fn default() -> Self {
        plan_facets()
    }
}

pub fn plan_facets() -> AggregationSpec {
    AggregationSpec {
        requests: vec![
            AggregationRequest {
                name: PHOTOGRAPHERS,
                field: fields::PHOTOGRAPHER,
                kind: AggregationKind::Terms { size: 20 },
            },
            AggregationRequest {
                name: DATABASES,
                field: fields::DATABASE,
                kind: AggregationKind::Terms { size: 10 },
            },
            AggregationRequest {
                name: WIDTH_STATS,
                field: fields::WIDTH,
                kind: AggregationKind::Stats,
            },
            AggregationRequest {
                name: HEIGHT_STATS,
                field: fields::HEIGHT,
                kind: AggregationKind::Stats,
            },
            AggregationRequest {
                name: DATE_HISTOGRAM,
                field: fields::DATE,
                kind: AggregationKind::YearlyHistogram,
            },
        ],
    }
}

impl AggregationSpec {
    pub fn to_json(&self) -> Value {
        let mut aggs = Map::new();
        for request in &self.requests {
            let body = match request.kind {
                AggregationKind::Terms { size } => {
                    json!({"terms": {"field": request.field, "size": size}})
                }
                AggregationKind::Stats => json!({"stats": {"field": request.field}}),
                AggregationKind::YearlyHistogram => json!({
                    "date_histogram": {
                        "field": request.field,
                        "calendar_interval": "year",
                        "format": "yyyy",
                        "min_doc_count": 1,
                    }
                }),
            };
            aggs.insert(request.name.to_string(), body);
        }
        Value::Object(aggs)
    }

    /// Decodes the engine's `aggregations` object. Entries that are missing
    /// or do not have the requested shape are left out.
    pub fn decode(&self, raw: &Value) -> Aggregations {
        let mut results = HashMap::new();
        for request in &self.requests {
            let Some(entry) = raw.get(request.name) else {
                continue;
            };
            let decoded = match request.kind {
                AggregationKind::Terms { .. } => decode_terms(entry),
                AggregationKind::Stats => decode_stats(entry),
                AggregationKind::YearlyHistogram => decode_histogram(entry),
            };
            if let Some(decoded) = decoded {
                results.insert(request.name.to_string(), decoded);
            }
        }
        Aggregations { results }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TermsBucket {
    pub key: String,
    pub doc_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBucket {
    pub key: String,
    pub doc_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationResult {
    Terms(Vec<TermsBucket>),
    Stats {
        count: u64,
        min: Option<f64>,
        max: Option<f64>,
        avg: Option<f64>,
    },
    DateHistogram(Vec<HistogramBucket>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregations {
    pub results: HashMap<String, AggregationResult>,
}

impl Aggregations {
    pub fn get(&self, name: &str) -> Option<&AggregationResult> {
        self.results.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

fn decode_terms(entry: &Value) -> Option<AggregationResult> {
    let buckets = entry.get("buckets")?.as_array()?;
    Some(AggregationResult::Terms(
        buckets
            .iter()
            .filter_map(|bucket| {
                Some(TermsBucket {
                    key: key_string(bucket.get("key")?)?,
                    doc_count: bucket.get("doc_count")?.as_u64()?,
                })
            })
            .collect(),
    ))
}

fn decode_stats(entry: &Value) -> Option<AggregationResult> {
    let count = entry.get("count")?.as_u64()?;
    Some(AggregationResult::Stats {
        count,
        min: entry.get("min").and_then(Value::as_f64),
        max: entry.get("max").and_then(Value::as_f64),
        avg: entry.get("avg").and_then(Value::as_f64),
    })
}

fn decode_histogram(entry: &Value) -> Option<AggregationResult> {
    let buckets = entry.get("buckets")?.as_array()?;
    Some(AggregationResult::DateHistogram(
        buckets
            .iter()
            .filter_map(|bucket| {
                let key = bucket
                    .get("key_as_string")
                    .and_then(key_string)
                    .or_else(|| bucket.get("key").and_then(key_string))?;
                Some(HistogramBucket {
                    key,
                    doc_count: bucket.get("doc_count")?.as_u64()?,
                })
            })
            .collect(),
    ))
}

fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Facets shown to callers: photographers and databases.
pub fn render_facets(aggregations: &Aggregations) -> Vec<Facet> {
    [PHOTOGRAPHERS, DATABASES]
        .into_iter()
        .filter_map(|name| match aggregations.get(name)? {
            AggregationResult::Terms(buckets) if !buckets.is_empty() => Some(Facet {
                name: name.to_string(),
                values: buckets
                    .iter()
                    .map(|bucket| FacetValue {
                        value: bucket.key.clone(),
                        count: bucket.doc_count,
                    })
                    .collect(),
            }),
            _ => None,
        })
        .collect()
}

pub fn render_stats(aggregations: &Aggregations) -> Stats {
    Stats {
        width: dimension(aggregations.get(WIDTH_STATS)),
        height: dimension(aggregations.get(HEIGHT_STATS)),
        date_range: date_range(aggregations.get(DATE_HISTOGRAM)),
    }
}

fn dimension(result: Option<&AggregationResult>) -> Option<DimensionStats> {
    match result? {
        AggregationResult::Stats {
            count,
            min: Some(min),
            max: Some(max),
            avg: Some(avg),
        } if *count > 0 => Some(DimensionStats {
            min: *min,
            max: *max,
            avg: *avg,
        }),
        _ => None,
    }
}

fn date_range(result: Option<&AggregationResult>) -> Option<DateRange> {
    let AggregationResult::DateHistogram(buckets) = result? else {
        return None;
    };
    let mut populated = buckets.iter().filter(|bucket| bucket.doc_count > 0);
    let first = populated.next()?;
    let last = populated.last().unwrap_or(first);
    Some(DateRange {
        earliest: first.key.clone(),
        latest: last.key.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> Value {
        json!({
            "photographers": {
                "buckets": [
                    {"key": "Anna Berg", "doc_count": 12},
                    {"key": "Jon Lund", "doc_count": 3}
                ]
            },
            "databases": {
                "buckets": [{"key": "st", "doc_count": 10}, {"key": "sp", "doc_count": 5}]
            },
            "width_stats": {"count": 15, "min": 640.0, "max": 4000.0, "avg": 1800.5},
            "height_stats": {"count": 0, "min": null, "max": null, "avg": null},
            "date_histogram": {
                "buckets": [
                    {"key_as_string": "1987", "key": 536457600000i64, "doc_count": 4},
                    {"key_as_string": "1990", "key": 631152000000i64, "doc_count": 0},
                    {"key_as_string": "2004", "key": 1072915200000i64, "doc_count": 11}
                ]
            }
        })
    }

    #[test]
    fn plan_has_fixed_shape() {
        let aggs = plan_facets().to_json();
        assert_eq!(aggs["photographers"]["terms"]["size"], 20);
        assert_eq!(aggs["databases"]["terms"]["size"], 10);
        assert_eq!(aggs["width_stats"]["stats"]["field"], "breite");
        assert_eq!(aggs["height_stats"]["stats"]["field"], "hoehe");
        assert_eq!(
            aggs["date_histogram"]["date_histogram"]["calendar_interval"],
            "year"
        );
    }

    #[test]
    fn renders_term_facets_in_bucket_order() {
        let aggregations = plan_facets().decode(&sample_response());
        let facets = render_facets(&aggregations);
        assert_eq!(facets.len(), 2);
        assert_eq!(facets[0].name, "photographers");
        assert_eq!(facets[0].values[0].value, "Anna Berg");
        assert_eq!(facets[0].values[0].count, 12);
        assert_eq!(facets[1].name, "databases");
        assert_eq!(facets[1].values[1].value, "sp");
    }

    #[test]
    fn renders_stats_skipping_empty_dimensions() {
        let stats = render_stats(&plan_facets().decode(&sample_response()));
        let width = stats.width.expect("width stats");
        assert_eq!(width.min, 640.0);
        assert_eq!(width.max, 4000.0);
        assert!(stats.height.is_none());
        assert_eq!(
            stats.date_range,
            Some(DateRange {
                earliest: "1987".into(),
                latest: "2004".into()
            })
        );
    }

    #[test]
    fn malformed_entries_are_treated_as_absent() {
        let raw = json!({
            "photographers": {"buckets": "not-a-list"},
            "databases": {"buckets": [{"key": "st"}, {"key": "sp", "doc_count": 2}]},
            "width_stats": {"min": 1.0},
            "date_histogram": {"buckets": []}
        });
        let aggregations = plan_facets().decode(&raw);
        assert!(aggregations.get(PHOTOGRAPHERS).is_none());
        assert!(aggregations.get(WIDTH_STATS).is_none());

        let facets = render_facets(&aggregations);
        assert_eq!(facets.len(), 1);
        assert_eq!(facets[0].values.len(), 1);
        assert!(render_stats(&aggregations).is_empty());
    }

    #[test]
    fn missing_aggregations_render_nothing() {
        let aggregations = plan_facets().decode(&Value::Null);
        assert!(aggregations.is_empty());
        assert!(render_facets(&aggregations).is_empty());
        assert!(render_stats(&aggregations).is_empty());
    }

    #[test]
    fn numeric_term_keys_become_strings() {
        let raw = json!({"databases": {"buckets": [{"key": 7, "doc_count": 1}]}});
        let facets = render_facets(&plan_facets().decode(&raw));
        assert_eq!(facets[0].values[0].value, "7");
    }
}

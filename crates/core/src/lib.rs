pub mod aggregations;
pub mod config;
pub mod error;
pub mod health;
pub mod models;
pub mod orchestrator;
pub mod query;
pub mod stores;
pub mod text;
pub mod traits;
pub mod transform;
pub mod url_check;

pub use aggregations::{
    plan_facets, render_facets, render_stats, AggregationResult, AggregationSpec, Aggregations,
};
pub use config::{EngineConfig, FeatureConfig, GatewayConfig, ImageConfig, PaginationConfig};
pub use error::{ConfigError, SearchError, TransformError};
pub use health::HealthMonitor;
pub use models::{
    DatabaseType, EngineSearchResult, Facet, FacetValue, FieldsResponse, GatewayResponse,
    Language, Orientation, RawHit, ResponseMetadata, ResultItem, SearchFilters, SearchRequest,
    SearchResponse, SortField, SortOrder, Stats,
};
pub use orchestrator::SearchService;
pub use query::EngineQuery;
pub use stores::ElasticsearchClient;
pub use traits::{ClusterHealth, EngineInfo, HealthStatus, SearchEngine};
pub use transform::{build_image_url, ResultTransformer, TransformOptions};
pub use url_check::{ImageUrlChecker, UrlCheck};

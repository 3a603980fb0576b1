use crate::aggregations::{AggregationSpec, Aggregations};
use crate::models::{EngineSearchResult, RawHit};
use crate::query::EngineQuery;
use crate::SearchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterHealth {
    pub cluster_name: String,
    pub status: HealthStatus,
    pub number_of_nodes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineInfo {
    pub cluster_name: String,
    pub version: String,
}

/// Backing search engine. Implementations classify their own failures into
/// [`SearchError`]; callers never see transport-specific errors.
#[async_trait]
pub trait SearchEngine {
    async fn search(&self, query: &EngineQuery) -> Result<EngineSearchResult, SearchError>;

    /// `Ok(None)` when no document has this id.
    async fn get(&self, id: &str) -> Result<Option<RawHit>, SearchError>;

    async fn aggregate(
        &self,
        query: &EngineQuery,
        spec: &AggregationSpec,
    ) -> Result<Aggregations, SearchError>;

    async fn ping(&self) -> Result<ClusterHealth, SearchError>;

    async fn info(&self) -> Result<EngineInfo, SearchError>;
}

#[async_trait]
impl<E> SearchEngine for Arc<E>
where
    E: SearchEngine + Send + Sync + ?Sized,
{
    async fn search(&self, query: &EngineQuery) -> Result<EngineSearchResult, SearchError> {
        (**self).search(query).await
    }

    async fn get(&self, id: &str) -> Result<Option<RawHit>, SearchError> {
        (**self).get(id).await
    }

    async fn aggregate(
        &self,
        query: &EngineQuery,
        spec: &AggregationSpec,
    ) -> Result<Aggregations, SearchError> {
        (**self).aggregate(query, spec).await
    }

    async fn ping(&self) -> Result<ClusterHealth, SearchError> {
        (**self).ping().await
    }

    async fn info(&self) -> Result<EngineInfo, SearchError> {
        (**self).info().await
    }
}

pub mod elasticsearch;

pub use elasticsearch::ElasticsearchClient;

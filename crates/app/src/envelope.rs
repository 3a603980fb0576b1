use chrono::Utc;
use photo_search_core::{GatewayResponse, SearchError};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub status: u16,
    pub message: String,
}

/// Wraps a gateway outcome, dispatching on its variant.
pub fn wrap(response: GatewayResponse) -> serde_json::Result<Envelope> {
    let (data, metadata) = match response {
        GatewayResponse::Search(search) => {
            let metadata = json!({
                "pagination": serde_json::to_value(&search.metadata)?,
                "facets": serde_json::to_value(&search.facets)?,
                "stats": serde_json::to_value(&search.stats)?,
                "suggestions": serde_json::to_value(&search.suggestions)?,
                "warnings": serde_json::to_value(&search.warnings)?,
            });
            (serde_json::to_value(&search.results)?, Some(metadata))
        }
        GatewayResponse::Item(item) => (serde_json::to_value(&item)?, None),
        GatewayResponse::Fields(fields) => (serde_json::to_value(&fields)?, None),
    };

    Ok(Envelope {
        success: true,
        data: Some(data),
        metadata,
        error: None,
        timestamp: Utc::now().to_rfc3339(),
    })
}

pub fn failure(error: &SearchError) -> Envelope {
    Envelope {
        success: false,
        data: None,
        metadata: None,
        error: Some(ErrorBody {
            kind: error.kind().to_string(),
            status: error.status_code(),
            message: error.to_string(),
        }),
        timestamp: Utc::now().to_rfc3339(),
    }
}

pub fn not_found(id: &str) -> Envelope {
    Envelope {
        success: false,
        data: None,
        metadata: None,
        error: Some(ErrorBody {
            kind: "not_found".to_string(),
            status: 404,
            message: format!("no picture with id {id}"),
        }),
        timestamp: Utc::now().to_rfc3339(),
    }
}

/// Process exit code for a transport status.
pub fn exit_code(status: u16) -> i32 {
    match status {
        400 => 2,
        404 => 4,
        503 => 3,
        504 => 5,
        _ => 1,
    }
}

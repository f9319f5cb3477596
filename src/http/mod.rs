use std::collections::HashMap;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::query::QueryArguments;
use crate::registry::SourceRegistry;

pub(crate) fn router(registry: SourceRegistry) -> Router {
    Router::new()
        .route("/", get(list_sources))
        .route("/{loc}/info", get(get_info))
        .route("/{loc}/get", get(get_data))
        .with_state(registry)
}

pub(crate) async fn serve(registry: SourceRegistry, port: u16) -> Result<()> {
    let listener = TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    info!(target: "http", port, "listening");
    axum::serve(listener, router(registry)).await?;
    Ok(())
}

async fn list_sources(State(registry): State<SourceRegistry>) -> Json<Value> {
    Json(registry.list().await)
}

async fn get_info(
    State(registry): State<SourceRegistry>,
    Path(loc): Path<String>,
) -> Json<Value> {
    debug!(target: "http", %loc, "info request");
    Json(registry.info(&loc).await)
}

async fn get_data(
    State(registry): State<SourceRegistry>,
    Path(loc): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let args = QueryArguments::from_params(&params);
    debug!(target: "http", %loc, ?args, "data request");
    Json(registry.query(&loc, args).await)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::Result;
    use axum::extract::{Path, Query, State};
    use serde_json::json;

    use crate::config::PollingConfig;
    use crate::fetch::TripleFetcher;
    use crate::registry::SourceRegistry;
    use crate::testing::{StaticSource, namespaces};

    use super::{get_data, get_info, list_sources};

    fn registry() -> SourceRegistry {
        let fetcher = TripleFetcher::new(
            Arc::new(StaticSource::default()),
            Arc::new(namespaces()),
            Duration::from_secs(1),
        );
        SourceRegistry::new(fetcher, PollingConfig::default())
    }

    #[tokio::test]
    async fn invalid_locations_answer_with_a_warning() -> Result<()> {
        let registry = registry();
        let mut params = HashMap::new();
        params.insert("start".to_string(), "12".to_string());
        let data = get_data(
            State(registry.clone()),
            Path("not base64!".to_string()),
            Query(params),
        )
        .await;
        assert!(data.0["@warning"]["InvalidLocation"].is_string());

        let info = get_info(State(registry.clone()), Path("not base64!".to_string())).await;
        assert!(info.0["@warning"]["InvalidLocation"].is_string());

        assert_eq!(list_sources(State(registry)).await.0, json!([]));
        Ok(())
    }
}

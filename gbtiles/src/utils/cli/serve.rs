use std::error::Error;
use std::sync::Arc;

use axum::extract::{Path as AxumPath, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use serde_json::json;
use tokio::task;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::AppContext;
use crate::utils::cli::ConfigArgs;

pub const TILE_CACHE_CONTROL: &str = "max-age=86400, public";

#[derive(Clone, Debug, Parser, PartialEq)]
#[command(
    name = "serve",
    about = "Serves tile data over HTTP.",
    long_about = None,
)]
pub struct ServeArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Port to listen on. Overrides `server.port` of the config.
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Address to listen on. Overrides `server.bind` of the config.
    #[arg(long)]
    pub bind: Option<String>,
}

pub fn serve(args: ServeArgs) -> Result<(), Box<dyn Error>> {
    let context = Arc::new(args.config.load()?);
    let bind = args
        .bind
        .unwrap_or_else(|| context.config.server.bind.clone());
    let port = args.port.unwrap_or(context.config.server.port);
    let addr = format!("{}:{}", bind, port);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("Listening on http://{}", addr);
        axum::serve(listener, app(context)).await?;
        Ok::<(), Box<dyn Error>>(())
    })
}

pub fn app(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/browser/data/:version/:spec", get(bulk_data))
        .route("/browser/config", get(browser_config))
        .route("/browser/api/:version", get(api_config))
        .route("/browser/locale/:id", get(locale))
        .route("/browser/example_objects", get(example_objects))
        .route("/browser/get_object_info/:id", get(object_info))
        .with_state(context)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn supported_version(context: &AppContext, version: &str) -> Result<u32, StatusCode> {
    match version.parse::<u32>() {
        Ok(version) if context.config.supports_version(version) => Ok(version),
        _ => {
            debug!("Unsupported API version {}", version);
            Err(StatusCode::NOT_FOUND)
        }
    }
}

async fn bulk_data(
    State(context): State<Arc<AppContext>>,
    AxumPath((version, spec)): AxumPath<(String, String)>,
) -> Result<Response, StatusCode> {
    supported_version(&context, &version)?;
    debug!("Tile request (version {}): {}", version, spec);
    let tiles = task::spawn_blocking(move || context.bulk_data(&spec))
        .await
        .map_err(|e| {
            warn!("Tile request failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    let mut resp = Json(tiles).into_response();
    resp.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(TILE_CACHE_CONTROL),
    );
    Ok(resp)
}

async fn browser_config(State(context): State<Arc<AppContext>>) -> impl IntoResponse {
    Json(context.browser_config())
}

async fn api_config(
    State(context): State<Arc<AppContext>>,
    AxumPath(version): AxumPath<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let version = supported_version(&context, &version)?;
    context
        .api_config(version)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn locale(
    State(context): State<Arc<AppContext>>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    match context.locale(&id) {
        Some(locale) => Ok(Json(json!(locale))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

async fn example_objects(State(context): State<Arc<AppContext>>) -> impl IntoResponse {
    Json(context.example_objects().to_vec())
}

async fn object_info(
    State(context): State<Arc<AppContext>>,
    AxumPath(id): AxumPath<String>,
) -> impl IntoResponse {
    match context.object_info(&id) {
        Some(info) => Json(json!(info)),
        None => Json(json!({"error": "Object Not Found"})),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use bigtools::BedEntry;
    use tower::ServiceExt;

    use crate::config::BrowserConfig;
    use crate::model::{Species, Stick, Universe};
    use crate::seqcache::NoFetch;
    use crate::source::{MemoryStore, CONTIGS_SECTION};

    const CONFIG: &str = r#"
        data_path = "/data"
        example_objects = ["GRCh38:ENSG00000139618"]

        [tracks.contig]
        wire = "ct"

        [endpoints.contig-normal]
        endpoint = "contignormal"
        bytecode = "contig"

        [bytecodes]
        contig = "draw-contigs"

        [choice.contig._default._default]
        AZ = "contig-normal"

        [api.3]
        data_url = "/browser/data/3"

        [objects."GRCh38:ENSG00000139618"]
        stick = "GRCh38:13"
        start = 32315086
        end = 32400268
        label = "BRCA2"
    "#;

    fn test_app() -> Router {
        let config: BrowserConfig = toml::from_str(CONFIG).unwrap();
        let species = Species::new("homo_sapiens", "GRCh38");
        let stick = Stick::new(&species, "13", 1_000_000, None);
        let mut store = MemoryStore::new();
        store.add_entries(
            stick.file_path(Path::new("/data"), CONTIGS_SECTION, "contigs.bb"),
            "13",
            vec![BedEntry {
                start: 100,
                end: 200,
                rest: "ctg1\t0\t+".to_string(),
            }],
        );
        let mut universe = Universe::new();
        universe.add_stick(stick);
        universe.add_species(species);
        let context = AppContext::new(config, universe, Arc::new(store), Box::new(NoFetch));
        app(Arc::new(context))
    }

    async fn get(uri: &str) -> (StatusCode, Option<String>, serde_json::Value) {
        let resp = test_app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let cache = resp
            .headers()
            .get(header::CACHE_CONTROL)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, cache, value)
    }

    #[tokio::test]
    async fn test_bulk_data() {
        let (status, cache, body) = get("/browser/data/3/GRCh38:13:ct=N0;zz=N0").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some(TILE_CACHE_CONTROL));
        assert_eq!(
            body,
            json!([
                ["GRCh38:13", "N0", "ct", "contig", [[100], [100], [true]]],
                ["GRCh38:13", "N0", "zz", "", []],
            ])
        );
    }

    #[tokio::test]
    async fn test_unsupported_version() {
        let (status, _, _) = get("/browser/data/2/GRCh38:13:ct=N0").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _, _) = get("/browser/data/x/GRCh38:13:ct=N0").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _, _) = get("/browser/api/2").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_api_and_browser_config() {
        let (status, _, body) = get("/browser/api/3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bytecodes"]["contig"], "draw-contigs");
        assert_eq!(body["data_url"], "/browser/data/3");

        let (status, cache, body) = get("/browser/config").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache, None);
        assert_eq!(body["sticks"]["GRCh38:13"], 1_000_000);
    }

    #[tokio::test]
    async fn test_objects_and_locales() {
        let (status, _, body) = get("/browser/example_objects").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["GRCh38:ENSG00000139618"]));

        let (_, _, body) = get("/browser/get_object_info/GRCh38:ENSG00000139618").await;
        assert_eq!(body["label"], "BRCA2");
        let (_, _, body) = get("/browser/get_object_info/GRCh38:nothing").await;
        assert_eq!(body, json!({"error": "Object Not Found"}));

        let (status, _, body) = get("/browser/locale/GRCh38:ENSG00000139618").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"stick": "GRCh38:13", "start": 32315086, "end": 32400268})
        );
        let (_, _, body) = get("/browser/locale/GRCh38:region:13:100-200").await;
        assert_eq!(body, json!({"stick": "GRCh38:13", "start": 100, "end": 200}));
        let (status, _, _) = get("/browser/locale/GRCh38:nothing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors() {
        let resp = test_app()
            .oneshot(
                Request::builder()
                    .uri("/browser/config")
                    .header(header::ORIGIN, "http://example.org")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .map(|v| v.to_str().unwrap()),
            Some("*")
        );
    }
}

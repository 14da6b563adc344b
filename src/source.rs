use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::catalog::Catalog;
use crate::config::Endpoints;
use crate::types::{TodoTrick, Video};

/// Text shown to the visitor whenever loading fails, whatever the cause.
pub const BANNER_MESSAGE: &str = "Something went wrong. Please refresh the page.";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Data loading failed: could not fetch {resource}: {message}")]
    Fetch { resource: String, message: String },
    #[error("Data loading failed: {resource} returned status {status}")]
    Status { resource: String, status: u16 },
    #[error("Data loading failed: Invalid data format received ({resource})")]
    InvalidFormat { resource: String },
    #[error("Data loading failed: malformed record in {resource}: {source}")]
    Parse { resource: String, #[source] source: serde_json::Error },
    #[error("Data loading failed: refusing path {resource}")]
    UnsafePath { resource: String },
}

/// Where the catalog JSON comes from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self, resource: &str) -> Result<Vec<u8>, LoadError>;
}

/// Reads resources from a local web root.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }
}

#[async_trait]
impl CatalogSource for DirSource {
    async fn fetch(&self, resource: &str) -> Result<Vec<u8>, LoadError> {
        let rel = safe_relative(resource).ok_or_else(|| LoadError::UnsafePath { resource: resource.to_string() })?;
        let path = self.root.join(rel);
        tokio::fs::read(&path).await.map_err(|e| LoadError::Fetch { resource: resource.to_string(), message: e.to_string() })
    }
}

/// Fetches resources over HTTP relative to a base URL.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base: Url,
}

impl HttpSource {
    pub fn new(base: Url) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().user_agent("skatelist/0.1").build()?;
        Ok(Self { client, base: with_trailing_slash(base) })
    }
}

#[async_trait]
impl CatalogSource for HttpSource {
    async fn fetch(&self, resource: &str) -> Result<Vec<u8>, LoadError> {
        let fetch_err = |message: String| LoadError::Fetch { resource: resource.to_string(), message };
        let url = self.base.join(resource).map_err(|e| fetch_err(e.to_string()))?;
        let resp = self.client.get(url).send().await.map_err(|e| fetch_err(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LoadError::Status { resource: resource.to_string(), status: status.as_u16() });
        }
        let bytes = resp.bytes().await.map_err(|e| fetch_err(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Fetch every configured resource concurrently and build the catalog.
/// Any single failure fails the whole load.
pub async fn load_catalog(source: &dyn CatalogSource, endpoints: &Endpoints) -> Result<Catalog, LoadError> {
    let (videos, todo, grinds, other) = futures::try_join!(
        fetch_array::<Video>(source, &endpoints.videos),
        fetch_array::<TodoTrick>(source, &endpoints.todo),
        fetch_optional::<Video>(source, endpoints.grinds.as_deref()),
        fetch_optional::<Video>(source, endpoints.other.as_deref()),
    )?;
    tracing::debug!(videos = videos.len(), todo = todo.len(), "catalog loaded");
    Ok(Catalog::new(videos, todo, grinds, other))
}

async fn fetch_optional<T: DeserializeOwned>(source: &dyn CatalogSource, resource: Option<&str>) -> Result<Option<Vec<T>>, LoadError> {
    match resource {
        Some(r) => fetch_array(source, r).await.map(Some),
        None => Ok(None),
    }
}

async fn fetch_array<T: DeserializeOwned>(source: &dyn CatalogSource, resource: &str) -> Result<Vec<T>, LoadError> {
    let bytes = source.fetch(resource).await?;
    parse_array(resource, &bytes)
}

pub(crate) fn parse_array<T: DeserializeOwned>(resource: &str, bytes: &[u8]) -> Result<Vec<T>, LoadError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|source| LoadError::Parse { resource: resource.to_string(), source })?;
    if !value.is_array() {
        return Err(LoadError::InvalidFormat { resource: resource.to_string() });
    }
    serde_json::from_value(value).map_err(|source| LoadError::Parse { resource: resource.to_string(), source })
}

/// Normalise a resource to a relative path that cannot escape its root.
pub(crate) fn safe_relative(resource: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for comp in Path::new(resource.trim_start_matches('/')).components() {
        match comp {
            Component::Normal(c) => out.push(c),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}

fn with_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let p = format!("{}/", base.path());
        base.set_path(&p);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MemSource(HashMap<&'static str, &'static str>);

    #[async_trait]
    impl CatalogSource for MemSource {
        async fn fetch(&self, resource: &str) -> Result<Vec<u8>, LoadError> {
            self.0.get(resource).map(|s| s.as_bytes().to_vec()).ok_or_else(|| LoadError::Status { resource: resource.to_string(), status: 404 })
        }
    }

    fn full_source() -> MemSource {
        MemSource(HashMap::from([
            ("json/videos.json", r#"[{"title":"Kickflip","path":"k1","types":["NORMAL","FLIPTRICK"]}]"#),
            ("json/todo.json", r#"[{"name":"Hardflip"}]"#),
            ("json/grinds.json", r#"[{"title":"50-50","path":"","types":["GRIND"]}]"#),
            ("json/other.json", "[]"),
        ]))
    }

    #[tokio::test]
    async fn loads_all_four_resources() {
        let cat = load_catalog(&full_source(), &Endpoints::default()).await.unwrap();
        assert_eq!(cat.videos().len(), 1);
        assert_eq!(cat.todo_tricks()[0].name, "Hardflip");
        assert_eq!(cat.combined().count(), 2);
    }

    #[tokio::test]
    async fn one_missing_resource_fails_the_load() {
        let mut src = full_source();
        src.0.remove("json/other.json");
        let err = load_catalog(&src, &Endpoints::default()).await.unwrap_err();
        assert!(matches!(err, LoadError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn optional_resources_are_skipped_when_unconfigured() {
        let src = MemSource(HashMap::from([
            ("json/videos.json", r#"[{"title":"5-0","path":"g","types":["GRIND"]}]"#),
            ("json/todo.json", "[]"),
        ]));
        let endpoints = Endpoints { grinds: None, other: None, ..Endpoints::default() };
        let cat = load_catalog(&src, &endpoints).await.unwrap();
        assert_eq!(cat.categorize().grinds.len(), 1);
    }

    #[test]
    fn non_array_payload_is_invalid_format() {
        let err = parse_array::<Video>("json/videos.json", br#"{"title":"x"}"#).unwrap_err();
        assert!(matches!(err, LoadError::InvalidFormat { .. }));
        assert!(err.to_string().contains("Invalid data format received"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = parse_array::<Video>("json/videos.json", b"[{").unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
        let err = parse_array::<Video>("json/videos.json", br#"[{"path":"x"}]"#).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }

    #[test]
    fn safe_relative_rejects_escapes() {
        assert_eq!(safe_relative("/json/videos.json"), Some(PathBuf::from("json/videos.json")));
        assert_eq!(safe_relative("./a/./b.css"), Some(PathBuf::from("a/b.css")));
        assert!(safe_relative("../etc/passwd").is_none());
        assert!(safe_relative("json/../../x").is_none());
        assert!(safe_relative("/").is_none());
    }

    #[tokio::test]
    async fn dir_source_reads_under_root() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("json")).unwrap();
        std::fs::write(tmp.path().join("json/todo.json"), "[]").unwrap();
        let src = DirSource::new(tmp.path());
        assert_eq!(src.fetch("json/todo.json").await.unwrap(), b"[]");
        assert!(matches!(src.fetch("json/missing.json").await, Err(LoadError::Fetch { .. })));
        assert!(matches!(src.fetch("../x").await, Err(LoadError::UnsafePath { .. })));
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let u = with_trailing_slash(Url::parse("http://localhost:3000/site").unwrap());
        assert_eq!(u.join("json/videos.json").unwrap().as_str(), "http://localhost:3000/site/json/videos.json");
    }

    async fn spawn_site() -> Url {
        use axum::routing::get;
        let app = axum::Router::new()
            .route("/site/json/videos.json", get(|| async { r#"[{"title":"Kickflip","path":"k1","types":["NORMAL","FLIPTRICK"]}]"# }))
            .route("/site/json/todo.json", get(|| async { r#"[{"name":"Hardflip"}]"# }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        Url::parse(&format!("http://{addr}/site")).unwrap()
    }

    #[tokio::test]
    async fn http_source_loads_from_a_site() {
        let src = HttpSource::new(spawn_site().await).unwrap();
        let endpoints = Endpoints { grinds: None, other: None, ..Endpoints::default() };
        let cat = load_catalog(&src, &endpoints).await.unwrap();
        assert_eq!(cat.videos()[0].title, "Kickflip");
        assert_eq!(cat.todo_tricks()[0].name, "Hardflip");
    }

    #[tokio::test]
    async fn http_source_maps_error_status() {
        let src = HttpSource::new(spawn_site().await).unwrap();
        let err = load_catalog(&src, &Endpoints::default()).await.unwrap_err();
        assert!(matches!(err, LoadError::Status { status: 404, .. }), "{err}");
        assert!(err.to_string().starts_with("Data loading failed:"));
    }
}

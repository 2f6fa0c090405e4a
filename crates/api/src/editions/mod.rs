//! Digital-edition content API under `/digitaledition`.
//!
//! Each configured project has its own database and file tree. The
//! `semantic_data` entry of `digital_editions.yml` is not a project; it backs
//! the person and place lookups.

pub mod handlers;
pub mod query;
pub mod store;
pub mod text;
pub mod toc;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use common::ServiceError;
use tracing::info;

pub use store::{EditionStore, SemanticStore, SqlEditionStore};
pub use text::{TextRenderer, XsltProc};

use crate::config::{EditionsConfig, ProjectConfig, SEMANTIC_DATA};
use crate::db;
use crate::error::ApiResult;
use crate::server::middleware;

/// A configured edition project.
pub struct Project {
    pub settings: ProjectConfig,
    pub file_root: PathBuf,
    pub store: Arc<dyn EditionStore>,
}

impl Project {
    pub fn new(name: &str, settings: ProjectConfig, store: Arc<dyn EditionStore>) -> Self {
        let file_root = settings
            .file_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{name}-required")));
        Self {
            settings,
            file_root,
            store,
        }
    }

    pub fn xml_path(&self, kind: &str, file: &str) -> PathBuf {
        self.file_root.join("xml").join(kind).join(file)
    }

    pub fn cache_path(&self, kind: &str, file: &str) -> PathBuf {
        self.file_root.join("cache").join(kind).join(file)
    }
}

#[derive(Clone)]
pub struct EditionsState {
    projects: Arc<HashMap<String, Arc<Project>>>,
    semantic: Option<Arc<dyn SemanticStore>>,
    renderer: Arc<dyn TextRenderer>,
    xslt_dir: Arc<Path>,
}

impl EditionsState {
    pub fn new(
        projects: HashMap<String, Project>,
        semantic: Option<Arc<dyn SemanticStore>>,
        renderer: Arc<dyn TextRenderer>,
        xslt_dir: &Path,
    ) -> Self {
        Self {
            projects: Arc::new(
                projects
                    .into_iter()
                    .map(|(name, p)| (name, Arc::new(p)))
                    .collect(),
            ),
            semantic,
            renderer,
            xslt_dir: Arc::from(xslt_dir),
        }
    }

    /// Open a pool per project and wire up the xsltproc renderer.
    ///
    /// # Errors
    ///
    /// Returns an error if a project's database URL is invalid.
    pub async fn connect(cfg: &EditionsConfig) -> Result<Self> {
        let mut projects = HashMap::new();
        let mut semantic: Option<Arc<dyn SemanticStore>> = None;

        for (name, settings) in &cfg.projects {
            let store = Arc::new(SqlEditionStore::new(
                db::connect(name, &settings.database).await?,
            ));
            if name == SEMANTIC_DATA {
                semantic = Some(store as Arc<dyn SemanticStore>);
                continue;
            }
            let project = Project::new(name, settings.clone(), store);
            info!(
                project = %name,
                file_root = %project.file_root.display(),
                publish_level = settings.publish_level(),
                "digital edition project configured"
            );
            projects.insert(name.clone(), project);
        }

        Ok(Self::new(
            projects,
            semantic,
            Arc::new(XsltProc::new(&cfg.xsltproc)),
            &cfg.xslt_dir,
        ))
    }

    pub fn project(&self, name: &str) -> ApiResult<Arc<Project>> {
        self.projects
            .get(name)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("unknown project: {name}")).into())
    }

    pub fn semantic(&self) -> ApiResult<&dyn SemanticStore> {
        self.semantic
            .as_deref()
            .ok_or_else(|| ServiceError::NotFound("semantic data is not configured".into()).into())
    }

    pub fn has_semantic_data(&self) -> bool {
        self.semantic.is_some()
    }

    pub fn stylesheet(&self, name: &str) -> PathBuf {
        self.xslt_dir.join(name)
    }

    pub fn renderer(&self) -> &dyn TextRenderer {
        self.renderer.as_ref()
    }
}

/// Routes under `/digitaledition`. Semantic-data routes are mounted only when
/// a `semantic_data` database is configured.
pub fn router(state: EditionsState) -> Router {
    let mut routes = Router::new()
        .route("/:project/html/:filename", get(handlers::html))
        .route("/:project/manuscript/:publication_id", get(handlers::manuscripts))
        .route("/:project/publication/:publication_id", get(handlers::publications))
        .route("/:project/table-of-contents/editions", get(handlers::toc_editions))
        .route(
            "/:project/table-of-contents/edition/:edition_id",
            get(handlers::toc_tree),
        )
        .route(
            "/:project/table-of-contents/edition/:edition_id/root",
            get(handlers::toc_root),
        )
        .route(
            "/:project/table-of-contents/edition/:edition_id/group/:group_id",
            get(handlers::toc_group),
        )
        .route(
            "/:project/table-of-contents/edition/:edition_id/prevnext/:link_id",
            get(handlers::toc_prev_next),
        )
        .route(
            "/:project/table-of-contents/edition/:edition_id/first",
            get(handlers::toc_first),
        )
        .route("/:project/text/est/:text_id", get(handlers::reading_text))
        .route("/:project/text/com/:text_id/:note_id", get(handlers::commentary))
        .route("/:project/text/inl/:edition_id", get(handlers::introduction))
        .route(
            "/:project/text/inl/:edition_id/:lang",
            get(handlers::introduction_in),
        );

    if state.has_semantic_data() {
        routes = routes
            .route(
                "/semantic_data/persons/tooltip/:person_id",
                get(handlers::person_tooltip),
            )
            .route(
                "/semantic_data/persons/list/:data_source_id",
                get(handlers::persons),
            )
            .route(
                "/semantic_data/places/tooltip/:place_id",
                get(handlers::place_tooltip),
            )
            .route("/semantic_data/places/list", get(handlers::places));
    }

    Router::new().nest(
        "/digitaledition",
        routes
            .layer(middleware::public_read_cors())
            .with_state(state),
    )
}

//! Handlers for the `/digitaledition` routes.

use std::io::ErrorKind;

use axum::{
    extract::{Path, State},
    Json,
};
use common::protocol::{HtmlContent, TextContent};
use common::ServiceError;
use sea_orm::JsonValue;
use serde::Serialize;
use tracing::{debug, error};

use super::query::Direction;
use super::text::{self, TextSource};
use super::toc::{self, TocSection};
use super::{EditionsState, Project};
use crate::error::ApiResult;

/// Reject values that would escape the directory they are joined onto.
fn file_segment(value: &str) -> ApiResult<&str> {
    if value.is_empty() || value.contains(['/', '\\']) || value.contains("..") {
        return Err(ServiceError::BadRequest(format!("invalid file name: {value:?}")).into());
    }
    Ok(value)
}

/// `GET /:project/html/:filename`
pub async fn html(
    State(state): State<EditionsState>,
    Path((project, filename)): Path<(String, String)>,
) -> ApiResult<Json<HtmlContent>> {
    let project = state.project(&project)?;
    file_segment(&filename)?;
    let path = project.file_root.join("html").join(format!("{filename}.html"));

    match tokio::fs::read_to_string(&path).await {
        Ok(contents) => Ok(Json(HtmlContent { filename, contents })),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "html file missing");
            Err(ServiceError::NotFound(format!("no html file named {filename:?}")).into())
        }
        Err(e) => {
            error!(error = %e, path = %path.display(), "failed to read html file");
            Err(ServiceError::Internal("could not read html file".into()).into())
        }
    }
}

/// `GET /:project/manuscript/:publication_id`
pub async fn manuscripts(
    State(state): State<EditionsState>,
    Path((project, publication_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<JsonValue>>> {
    let project = state.project(&project)?;
    Ok(Json(project.store.manuscripts(&publication_id).await?))
}

/// `GET /:project/publication/:publication_id`
pub async fn publications(
    State(state): State<EditionsState>,
    Path((project, publication_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<JsonValue>>> {
    let project = state.project(&project)?;
    Ok(Json(project.store.publications(&publication_id).await?))
}

/// `GET /:project/table-of-contents/editions`
///
/// Editions at or above the project's publish level, minus the ones listed in
/// `disabled_publications`.
pub async fn toc_editions(
    State(state): State<EditionsState>,
    Path(project): Path<String>,
) -> ApiResult<Json<Vec<JsonValue>>> {
    let project = state.project(&project)?;
    let disabled = &project.settings.disabled_publications;
    let editions = project
        .store
        .editions(project.settings.publish_level())
        .await?
        .into_iter()
        .filter(|row| {
            row.get("id")
                .and_then(JsonValue::as_i64)
                .map_or(true, |id| !disabled.contains(&id))
        })
        .collect();
    Ok(Json(editions))
}

/// `GET /:project/table-of-contents/edition/:edition_id`
pub async fn toc_tree(
    State(state): State<EditionsState>,
    Path((project, edition_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<TocSection>>> {
    let project = state.project(&project)?;
    let rows = project.store.toc_tree(&edition_id).await?;
    Ok(Json(toc::build(&rows)))
}

/// `GET /:project/table-of-contents/edition/:edition_id/root`
pub async fn toc_root(
    State(state): State<EditionsState>,
    Path((project, edition_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<JsonValue>>> {
    let project = state.project(&project)?;
    Ok(Json(project.store.toc_root(&edition_id).await?))
}

/// `GET /:project/table-of-contents/edition/:edition_id/group/:group_id`
pub async fn toc_group(
    State(state): State<EditionsState>,
    Path((project, edition_id, group_id)): Path<(String, String, String)>,
) -> ApiResult<Json<Vec<JsonValue>>> {
    let project = state.project(&project)?;
    Ok(Json(project.store.toc_group(&edition_id, &group_id).await?))
}

#[derive(Debug, Serialize)]
pub struct PrevNext {
    pub prev: Option<JsonValue>,
    pub next: Option<JsonValue>,
}

/// `GET /:project/table-of-contents/edition/:edition_id/prevnext/:link_id`
///
/// In editions split into several files, neighbours are looked up within the
/// link's own TOC group.
pub async fn toc_prev_next(
    State(state): State<EditionsState>,
    Path((project, edition_id, link_id)): Path<(String, String, String)>,
) -> ApiResult<Json<PrevNext>> {
    let project = state.project(&project)?;
    let store = &project.store;
    let edition = store
        .edition_status(&edition_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(text::NOT_FOUND.into()))?;
    let same_group = edition.is_split();

    let prev = store
        .toc_neighbour(&edition_id, &link_id, same_group, Direction::Prev)
        .await?;
    let next = store
        .toc_neighbour(&edition_id, &link_id, same_group, Direction::Next)
        .await?;
    Ok(Json(PrevNext { prev, next }))
}

/// `GET /:project/table-of-contents/edition/:edition_id/first`
pub async fn toc_first(
    State(state): State<EditionsState>,
    Path((project, edition_id)): Path<(String, String)>,
) -> ApiResult<Json<Option<JsonValue>>> {
    let project = state.project(&project)?;
    Ok(Json(project.store.toc_first(&edition_id).await?))
}

/// Id of the source file a text id refers to: the id without its type suffix,
/// up to the first `;`.
fn source_id<'a>(text_id: &'a str, suffix: &str) -> &'a str {
    let head = text_id.split(';').next().unwrap_or(text_id);
    head.strip_suffix(suffix).unwrap_or(head)
}

/// Apply the publication gate for `edition`, then load the text.
async fn gated(
    state: &EditionsState,
    project: &Project,
    edition: &str,
    source: impl FnOnce() -> TextSource,
) -> ApiResult<String> {
    let status = project.store.edition_status(edition).await?;
    if let Some(message) = text::gate(status.as_ref(), &project.settings) {
        debug!(edition, reason = message, "text withheld");
        return Ok(message.to_owned());
    }
    Ok(text::load(state.renderer(), &source()).await)
}

/// `GET /:project/text/est/:text_id`: reading text.
pub async fn reading_text(
    State(state): State<EditionsState>,
    Path((project, text_id)): Path<(String, String)>,
) -> ApiResult<Json<TextContent>> {
    let project = state.project(&project)?;
    let id = file_segment(source_id(&text_id, "_est"))?;

    let content = gated(&state, &project, text::edition_of(&text_id), || TextSource {
        document: project.xml_path("est", &format!("{id}_est.xml")),
        stylesheet: state.stylesheet("est.xsl"),
        cache: project.cache_path("est", &format!("{id}_est.html")),
        params: Vec::new(),
    })
    .await?;

    Ok(Json(TextContent {
        content: content.replace("id=", "data-id="),
        id: text_id,
    }))
}

/// `GET /:project/text/com/:text_id/:note_id`: one commentary note.
pub async fn commentary(
    State(state): State<EditionsState>,
    Path((project, text_id, note_id)): Path<(String, String, String)>,
) -> ApiResult<Json<TextContent>> {
    let project = state.project(&project)?;
    let id = file_segment(source_id(&text_id, "_com"))?;
    let note = file_segment(&note_id)?;

    let content = gated(&state, &project, text::edition_of(&text_id), || {
        let est = project.xml_path("est", &format!("{id}_est.xml"));
        let est = std::path::absolute(&est).unwrap_or(est);
        TextSource {
            document: project.xml_path("com", &format!("{id}_com.xml")),
            stylesheet: state.stylesheet("notes.xsl"),
            cache: project.cache_path("com", &format!("note_{id}_com_{note}.html")),
            params: vec![
                ("noteId".into(), note.to_owned()),
                ("estDocument".into(), format!("file://{}", est.display())),
            ],
        }
    })
    .await?;

    Ok(Json(TextContent {
        id: text_id,
        content,
    }))
}

/// `GET /:project/text/inl/:edition_id`: introduction in Swedish.
pub async fn introduction(
    State(state): State<EditionsState>,
    Path((project, edition_id)): Path<(String, String)>,
) -> ApiResult<Json<TextContent>> {
    introduction_text(state, project, edition_id, None).await
}

/// `GET /:project/text/inl/:edition_id/:lang`
pub async fn introduction_in(
    State(state): State<EditionsState>,
    Path((project, edition_id, lang)): Path<(String, String, String)>,
) -> ApiResult<Json<TextContent>> {
    introduction_text(state, project, edition_id, Some(lang)).await
}

async fn introduction_text(
    state: EditionsState,
    project: String,
    edition_id: String,
    lang: Option<String>,
) -> ApiResult<Json<TextContent>> {
    let project = state.project(&project)?;
    let id = file_segment(&edition_id)?;
    let lang = if lang.as_deref() == Some("fi") { "fin" } else { "swe" };
    let version = if project.settings.show_internally_published {
        "int"
    } else {
        "ext"
    };
    let stem = format!("{id}_inl_{lang}_{version}");

    let content = gated(&state, &project, text::edition_of(id), || TextSource {
        document: project.xml_path("inl", &format!("{stem}.xml")),
        stylesheet: state.stylesheet("est.xsl"),
        cache: project.cache_path("inl", &format!("{stem}.html")),
        params: Vec::new(),
    })
    .await?;

    Ok(Json(TextContent {
        id: edition_id,
        content,
    }))
}

/// `GET /semantic_data/persons/tooltip/:person_id`: the person, or `""`.
pub async fn person_tooltip(
    State(state): State<EditionsState>,
    Path(person_id): Path<String>,
) -> ApiResult<Json<JsonValue>> {
    let person = state.semantic()?.person_tooltip(&person_id).await?;
    Ok(Json(person.unwrap_or_else(|| JsonValue::String(String::new()))))
}

/// `GET /semantic_data/persons/list/:data_source_id`
pub async fn persons(
    State(state): State<EditionsState>,
    Path(data_source_id): Path<String>,
) -> ApiResult<Json<Vec<JsonValue>>> {
    Ok(Json(state.semantic()?.persons(&data_source_id).await?))
}

/// `GET /semantic_data/places/tooltip/:place_id`
///
/// Place ids may carry a `pl` or `PlId` prefix.
pub async fn place_tooltip(
    State(state): State<EditionsState>,
    Path(place_id): Path<String>,
) -> ApiResult<Json<JsonValue>> {
    let id = place_id.replace("pl", "").replace("PlId", "");
    state
        .semantic()?
        .place_tooltip(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound(format!("no place with id {id:?}")).into())
}

/// `GET /semantic_data/places/list`
pub async fn places(State(state): State<EditionsState>) -> ApiResult<Json<Vec<JsonValue>>> {
    Ok(Json(state.semantic()?.places().await?))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path as FsPath;
    use std::sync::Arc;

    use axum::http::{header, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use mockall::predicate::eq;
    use serde_json::json;

    use super::*;
    use crate::config::ProjectConfig;
    use crate::db::StoreError;
    use crate::editions::store::{EditionStatus, MockEditionStore, MockSemanticStore};
    use crate::editions::text::MockTextRenderer;
    use crate::editions::toc::TocRow;
    use crate::editions::{router, SemanticStore};

    fn settings(file_root: &FsPath, extra: &str) -> ProjectConfig {
        let yaml = format!(
            "address: db\nusername: u\npassword: p\ndatabase: d\nfile_root: {}\n{extra}",
            file_root.display()
        );
        serde_yaml::from_str(&yaml).unwrap()
    }

    struct Fixture {
        store: MockEditionStore,
        semantic: Option<MockSemanticStore>,
        renderer: MockTextRenderer,
        extra: &'static str,
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MockEditionStore::new(),
                semantic: None,
                renderer: MockTextRenderer::new(),
                extra: "",
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn published(mut self, edition: &'static str, lansering: i64) -> Self {
            self.store
                .expect_edition_status()
                .with(eq(edition))
                .returning(move |_| {
                    Ok(Some(EditionStatus {
                        id: 1,
                        lansering: Some(lansering),
                        multiple_files: Some("0".into()),
                    }))
                });
            self
        }

        fn server(self) -> (TestServer, tempfile::TempDir) {
            let project = Project::new(
                "topelius",
                settings(self.dir.path(), self.extra),
                Arc::new(self.store),
            );
            let semantic = self
                .semantic
                .map(|s| Arc::new(s) as Arc<dyn SemanticStore>);
            let state = EditionsState::new(
                HashMap::from([("topelius".to_owned(), project)]),
                semantic,
                Arc::new(self.renderer),
                FsPath::new("/srv/xslt"),
            );
            (TestServer::new(router(state)).unwrap(), self.dir)
        }
    }

    fn write(root: &FsPath, rel: &str, text: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn source_id_strips_suffix_and_section() {
        assert_eq!(source_id("15_2036_est", "_est"), "15_2036");
        assert_eq!(source_id("15_2036;ch3", "_est"), "15_2036");
        assert_eq!(source_id("15_2036_com", "_com"), "15_2036");
        assert_eq!(source_id("15_2036", "_com"), "15_2036");
    }

    #[tokio::test]
    async fn unknown_project_is_404() {
        let (server, _dir) = Fixture::new().server();
        let resp = server.get("/digitaledition/nosuch/manuscript/1").await;
        resp.assert_status_not_found();
        let body: common::protocol::ErrorResponse = resp.json();
        assert_eq!(body.message, "unknown project: nosuch");
    }

    #[tokio::test]
    async fn html_file_is_returned_as_json() {
        let fixture = Fixture::new();
        write(fixture.dir.path(), "html/about.html", "<h1>Om</h1>");
        let (server, _dir) = fixture.server();

        let resp = server.get("/digitaledition/topelius/html/about").await;
        resp.assert_status_ok();
        resp.assert_json(&json!({"filename": "about", "contents": "<h1>Om</h1>"}));
    }

    #[tokio::test]
    async fn html_rejects_traversal_and_reports_missing() {
        let (server, _dir) = Fixture::new().server();
        server
            .get("/digitaledition/topelius/html/..%2Fsecret")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .get("/digitaledition/topelius/html/missing")
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn editions_respect_level_and_disabled_list() {
        let mut fixture = Fixture::new();
        fixture.extra = "show_internally_published: true\ndisabled_publications: [7]\n";
        fixture
            .store
            .expect_editions()
            .with(eq(1))
            .returning(|_| {
                Ok(vec![
                    json!({"id": 3, "title": "Dikter", "divchapters": 0}),
                    json!({"id": 7, "title": "Brev", "divchapters": 1}),
                ])
            });
        let (server, _dir) = fixture.server();

        let resp = server.get("/digitaledition/topelius/table-of-contents/editions").await;
        resp.assert_status_ok();
        resp.assert_json(&json!([{"id": 3, "title": "Dikter", "divchapters": 0}]));
    }

    #[tokio::test]
    async fn toc_tree_is_built_from_rows() {
        let mut fixture = Fixture::new();
        fixture.store.expect_toc_tree().returning(|_| {
            Ok(vec![
                TocRow {
                    toc_id: 1,
                    title: Some("Dikter".into()),
                    title_level: Some(1),
                    ..Default::default()
                },
                TocRow {
                    toc_id: 2,
                    title: Some("Vinterqväll".into()),
                    group_id: Some(1),
                    link_type: Some(1),
                    edition_id: Some(4),
                    link_id: Some("88".into()),
                    sort_order: Some(1),
                    ..Default::default()
                },
            ])
        });
        let (server, _dir) = fixture.server();

        let resp = server.get("/digitaledition/topelius/table-of-contents/edition/4").await;
        resp.assert_status_ok();
        let body: JsonValue = resp.json();
        assert_eq!(body[0]["titleLevel"], 1);
        assert_eq!(body[0]["items"][0]["link"], "4_88");
    }

    #[tokio::test]
    async fn prev_next_uses_group_only_for_split_editions() {
        let mut fixture = Fixture::new();
        fixture.store.expect_edition_status().returning(|_| {
            Ok(Some(EditionStatus {
                id: 4,
                lansering: Some(2),
                multiple_files: Some("1".into()),
            }))
        });
        fixture
            .store
            .expect_toc_neighbour()
            .withf(|_, link, grouped, dir| {
                link.to_string() == "4_88" && *grouped && *dir == Direction::Prev
            })
            .returning(|_, _, _, _| Ok(Some(json!({"title": "a", "edition_id": 4, "link_id": "4_87"}))));
        fixture
            .store
            .expect_toc_neighbour()
            .withf(|_, _, grouped, dir| *grouped && *dir == Direction::Next)
            .returning(|_, _, _, _| Ok(None));
        let (server, _dir) = fixture.server();

        let resp = server
            .get("/digitaledition/topelius/table-of-contents/edition/4/prevnext/4_88")
            .await;
        resp.assert_status_ok();
        resp.assert_json(&json!({
            "prev": {"title": "a", "edition_id": 4, "link_id": "4_87"},
            "next": null
        }));
    }

    #[tokio::test]
    async fn first_entry_may_be_null() {
        let mut fixture = Fixture::new();
        fixture.store.expect_toc_first().returning(|_| Ok(None));
        let (server, _dir) = fixture.server();
        let resp = server
            .get("/digitaledition/topelius/table-of-contents/edition/4/first")
            .await;
        resp.assert_status_ok();
        assert_eq!(resp.text(), "null");
    }

    #[tokio::test]
    async fn reading_text_is_rendered_and_ids_rewritten() {
        let mut fixture = Fixture::new().published("15", 2);
        write(fixture.dir.path(), "xml/est/15_2036_est.xml", "<TEI/>");
        fixture
            .renderer
            .expect_render()
            .withf(|xsl, doc, params| {
                xsl == FsPath::new("/srv/xslt/est.xsl")
                    && doc.ends_with("xml/est/15_2036_est.xml")
                    && params.is_empty()
            })
            .returning(|_, _, _| Ok("<div id=\"p1\">Text</div>".into()));
        let (server, dir) = fixture.server();

        let resp = server.get("/digitaledition/topelius/text/est/15_2036_est").await;
        resp.assert_status_ok();
        resp.assert_json(&json!({
            "id": "15_2036_est",
            "content": "<div data-id=\"p1\">Text</div>"
        }));
        assert!(dir.path().join("cache/est/15_2036_est.html").exists());
    }

    #[tokio::test]
    async fn unpublished_text_is_withheld() {
        let mut fixture = Fixture::new().published("15", 1);
        fixture.renderer.expect_render().never();
        let (server, _dir) = fixture.server();

        let resp = server.get("/digitaledition/topelius/text/est/15_2036").await;
        resp.assert_status_ok();
        let body: TextContent = resp.json();
        assert_eq!(body.content, text::NOT_EXTERNALLY_PUBLISHED);
    }

    #[tokio::test]
    async fn missing_edition_is_reported_in_content() {
        let mut fixture = Fixture::new();
        fixture.store.expect_edition_status().returning(|_| Ok(None));
        let (server, _dir) = fixture.server();

        let body: TextContent = server
            .get("/digitaledition/topelius/text/est/99_1")
            .await
            .json();
        assert_eq!(body.content, text::NOT_FOUND);
    }

    #[tokio::test]
    async fn commentary_passes_note_and_reading_text() {
        let mut fixture = Fixture::new().published("15", 2);
        write(fixture.dir.path(), "xml/com/15_2036_com.xml", "<TEI/>");
        fixture
            .renderer
            .expect_render()
            .withf(|xsl, _, params| {
                xsl.ends_with("notes.xsl")
                    && params[0] == ("noteId".to_owned(), "en12".to_owned())
                    && params[1].0 == "estDocument"
                    && params[1].1.starts_with("file:///")
                    && params[1].1.ends_with("xml/est/15_2036_est.xml")
            })
            .returning(|_, _, _| Ok("<p id=\"n\">note</p>".into()));
        let (server, dir) = fixture.server();

        let resp = server.get("/digitaledition/topelius/text/com/15_2036_com/en12").await;
        let body: TextContent = resp.json();
        assert_eq!(body.content, "<p id=\"n\">note</p>");
        assert!(dir.path().join("cache/com/note_15_2036_com_en12.html").exists());
    }

    #[tokio::test]
    async fn introduction_file_name_follows_language_and_version() {
        let mut fixture = Fixture::new().published("3", 2);
        write(fixture.dir.path(), "xml/inl/3_inl_fin_ext.xml", "<TEI/>");
        fixture
            .renderer
            .expect_render()
            .withf(|_, doc, _| doc.ends_with("xml/inl/3_inl_fin_ext.xml"))
            .returning(|_, _, _| Ok("johdanto".into()));
        let (server, _dir) = fixture.server();

        let body: TextContent = server
            .get("/digitaledition/topelius/text/inl/3/fi")
            .await
            .json();
        assert_eq!(body.id, "3");
        assert_eq!(body.content, "johdanto");

        let body: TextContent = server.get("/digitaledition/topelius/text/inl/3").await.json();
        assert_eq!(body.content, text::FILE_NOT_FOUND);
    }

    #[tokio::test]
    async fn database_failure_is_500() {
        let mut fixture = Fixture::new();
        fixture
            .store
            .expect_publications()
            .returning(|_| Err(StoreError::Query("syntax".into())));
        let (server, _dir) = fixture.server();
        server
            .get("/digitaledition/topelius/publication/1")
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn responses_allow_any_origin() {
        let mut fixture = Fixture::new();
        fixture.store.expect_manuscripts().returning(|_| Ok(vec![]));
        let (server, _dir) = fixture.server();
        let resp = server
            .get("/digitaledition/topelius/manuscript/1")
            .add_header(header::ORIGIN, HeaderValue::from_static("https://example.org"))
            .await;
        resp.assert_status_ok();
        assert_eq!(resp.header(header::ACCESS_CONTROL_ALLOW_ORIGIN), "*");
    }

    #[tokio::test]
    async fn semantic_routes_need_semantic_database() {
        let (server, _dir) = Fixture::new().server();
        server
            .get("/digitaledition/semantic_data/places/list")
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn person_tooltip_falls_back_to_empty_string() {
        let mut semantic = MockSemanticStore::new();
        semantic
            .expect_person_tooltip()
            .with(eq("12"))
            .returning(|_| Ok(None));
        let mut fixture = Fixture::new();
        fixture.semantic = Some(semantic);
        let (server, _dir) = fixture.server();

        let resp = server.get("/digitaledition/semantic_data/persons/tooltip/12").await;
        resp.assert_status_ok();
        assert_eq!(resp.text(), "\"\"");
    }

    #[tokio::test]
    async fn place_tooltip_strips_prefixes() {
        let mut semantic = MockSemanticStore::new();
        semantic
            .expect_place_tooltip()
            .with(eq("42"))
            .returning(|_| Ok(Some(json!({"title": "Borgå", "content": "stad"}))));
        semantic
            .expect_place_tooltip()
            .with(eq("43"))
            .returning(|_| Ok(None));
        let mut fixture = Fixture::new();
        fixture.semantic = Some(semantic);
        let (server, _dir) = fixture.server();

        let resp = server.get("/digitaledition/semantic_data/places/tooltip/pl42").await;
        resp.assert_json(&json!({"title": "Borgå", "content": "stad"}));
        server
            .get("/digitaledition/semantic_data/places/tooltip/PlId43")
            .await
            .assert_status_not_found();
    }
}

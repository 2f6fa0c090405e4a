//! OpenAPI 3 description of the mounted routes, served at `GET /apidocs`.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use openapiv3::{
    Info, OpenAPI, Operation, Parameter, PathItem, ReferenceOr, Response, Responses, StatusCode,
    Tag,
};
use serde_json::json;

#[derive(Clone, Copy)]
enum Method {
    Get,
    Post,
    Any,
}

struct RouteDoc {
    method: Method,
    path: &'static str,
    summary: &'static str,
}

const fn route(method: Method, path: &'static str, summary: &'static str) -> RouteDoc {
    RouteDoc {
        method,
        path,
        summary,
    }
}

/// Documented route groups, keyed by integration name.
const SECTIONS: &[(&str, &str, &[RouteDoc])] = &[
    (
        "oai",
        "OAI-PMH 2.0 metadata harvesting",
        &[route(Method::Get, "/oai", "OAI-PMH verbs selected by the `verb` query argument")],
    ),
    (
        "accessfiles",
        "Access files from the Swift object store",
        &[route(
            Method::Get,
            "/accessfiles/{file_path}",
            "Stream an allow-listed access file",
        )],
    ),
    (
        "filemaker",
        "FileMaker Server Data API proxy",
        &[route(
            Method::Any,
            "/filemaker/{path}",
            "Forward the request to FileMaker Server",
        )],
    ),
    (
        "digitaledition",
        "Digital editions content",
        &[
            route(Method::Get, "/digitaledition/{project}/html/{filename}", "Static HTML page"),
            route(
                Method::Get,
                "/digitaledition/{project}/manuscript/{publication_id}",
                "Manuscripts of a publication",
            ),
            route(
                Method::Get,
                "/digitaledition/{project}/publication/{publication_id}",
                "Publication metadata",
            ),
            route(
                Method::Get,
                "/digitaledition/{project}/table-of-contents/editions",
                "Published editions",
            ),
            route(
                Method::Get,
                "/digitaledition/{project}/table-of-contents/edition/{edition_id}",
                "Full table of contents of an edition",
            ),
            route(
                Method::Get,
                "/digitaledition/{project}/table-of-contents/edition/{edition_id}/root",
                "Top-level table of contents entries",
            ),
            route(
                Method::Get,
                "/digitaledition/{project}/table-of-contents/edition/{edition_id}/group/{group_id}",
                "Table of contents entries of a group",
            ),
            route(
                Method::Get,
                "/digitaledition/{project}/table-of-contents/edition/{edition_id}/prevnext/{link_id}",
                "Previous and next entries around a text",
            ),
            route(
                Method::Get,
                "/digitaledition/{project}/table-of-contents/edition/{edition_id}/first",
                "First entry of an edition",
            ),
            route(
                Method::Get,
                "/digitaledition/{project}/text/est/{text_id}",
                "Reading text as HTML",
            ),
            route(
                Method::Get,
                "/digitaledition/{project}/text/com/{text_id}/{note_id}",
                "Commentary note as HTML",
            ),
            route(
                Method::Get,
                "/digitaledition/{project}/text/inl/{edition_id}",
                "Edition introduction in Swedish",
            ),
            route(
                Method::Get,
                "/digitaledition/{project}/text/inl/{edition_id}/{lang}",
                "Edition introduction in the given language",
            ),
        ],
    ),
    (
        "semantic_data",
        "Persons and places shared by all editions",
        &[
            route(
                Method::Get,
                "/digitaledition/semantic_data/persons/tooltip/{person_id}",
                "Tooltip text for a person",
            ),
            route(
                Method::Get,
                "/digitaledition/semantic_data/persons/list/{data_source_id}",
                "Persons of a data source",
            ),
            route(
                Method::Get,
                "/digitaledition/semantic_data/places/tooltip/{place_id}",
                "Tooltip for a place",
            ),
            route(
                Method::Get,
                "/digitaledition/semantic_data/places/list",
                "All places",
            ),
        ],
    ),
    (
        "auth",
        "Account registration and JWT tokens",
        &[
            route(Method::Post, "/auth/register", "Create an account and log in"),
            route(Method::Post, "/auth/login", "Exchange credentials for tokens"),
            route(
                Method::Post,
                "/auth/refresh",
                "Exchange a refresh token for a new access token",
            ),
            route(
                Method::Get,
                "/auth/identity",
                "Identity carried by an access token",
            ),
        ],
    ),
    (
        "service",
        "Service status and documentation",
        &[
            route(Method::Get, "/health", "Service health and enabled integrations"),
            route(Method::Get, "/apidocs", "This document"),
        ],
    ),
];

/// Build the document for the given integration names. The `service` section
/// is always included.
pub fn document<S: AsRef<str>>(sections: &[S]) -> OpenAPI {
    let mut api = OpenAPI {
        openapi: "3.0.3".into(),
        info: Info {
            title: "SLS API".into(),
            description: Some(
                "OAI-PMH metadata, access files, FileMaker proxy and digital editions".into(),
            ),
            version: env!("CARGO_PKG_VERSION").into(),
            ..Default::default()
        },
        ..Default::default()
    };

    let included = SECTIONS.iter().filter(|(name, _, _)| {
        *name == "service" || sections.iter().any(|s| s.as_ref() == *name)
    });
    for (name, description, routes) in included {
        api.tags.push(Tag {
            name: (*name).into(),
            description: Some((*description).into()),
            external_docs: None,
            extensions: Default::default(),
        });
        for doc in routes.iter() {
            let item = match api
                .paths
                .paths
                .entry(doc.path.to_owned())
                .or_insert_with(|| ReferenceOr::Item(PathItem::default()))
            {
                ReferenceOr::Item(item) => item,
                ReferenceOr::Reference { .. } => continue,
            };
            let op = operation(name, doc);
            match doc.method {
                Method::Get => item.get = Some(op),
                Method::Post => item.post = Some(op),
                Method::Any => {
                    item.get = Some(op.clone());
                    item.post = Some(op.clone());
                    item.put = Some(op.clone());
                    item.delete = Some(op);
                }
            }
        }
    }
    api
}

fn operation(tag: &str, doc: &RouteDoc) -> Operation {
    let mut responses = Responses::default();
    responses.responses.insert(
        StatusCode::Code(200),
        ReferenceOr::Item(Response {
            description: "OK".into(),
            ..Default::default()
        }),
    );
    Operation {
        tags: vec![tag.to_owned()],
        summary: Some(doc.summary.into()),
        parameters: path_parameters(doc.path)
            .into_iter()
            .map(ReferenceOr::Item)
            .collect(),
        responses,
        ..Default::default()
    }
}

/// One required string parameter per `{name}` segment of `path`.
fn path_parameters(path: &str) -> Vec<Parameter> {
    path.split('/')
        .filter_map(|seg| seg.strip_prefix('{')?.strip_suffix('}'))
        .filter_map(|name| {
            serde_json::from_value(json!({
                "name": name,
                "in": "path",
                "required": true,
                "schema": {"type": "string"},
            }))
            .ok()
        })
        .collect()
}

pub fn router(doc: OpenAPI) -> Router {
    Router::new()
        .route("/apidocs", get(serve))
        .with_state(Arc::new(doc))
}

/// `GET /apidocs`
async fn serve(State(doc): State<Arc<OpenAPI>>) -> Json<serde_json::Value> {
    Json(serde_json::to_value(doc.as_ref()).unwrap_or_default())
}

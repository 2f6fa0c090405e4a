use axum::{
    extract::{OriginalUri, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{debug, error};

use super::error::OaiError;
use super::render::{Envelope, Payload};
use super::request::{MetadataPrefix, OaiRequest, Verb};
use super::store::MetadataStore;
use super::OaiState;

const CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// `GET /oai`: answer an OAI-PMH request.
///
/// Every outcome, including validation and database failures, is an OAI XML
/// document; only the status code differs.
pub async fn handle(
    State(state): State<OaiState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let base_url = base_url(&headers, uri.path(), state.scheme);
    let envelope = Envelope {
        base_url: &base_url,
        response_date: Utc::now(),
        repository: &state.repository,
    };

    let (status, document) = match OaiRequest::from_pairs(&pairs) {
        Err(rejection) => {
            debug!(code = rejection.error.code(), "rejected OAI request");
            (
                rejection.error.status(),
                envelope.error(rejection.verb, &rejection.error),
            )
        }
        Ok(req) => match resolve(state.store.as_ref(), &req).await {
            Ok(payload) => (StatusCode::OK, envelope.response(&req, &payload)),
            Err(e) => (e.status(), envelope.error(Some(req.verb), &e)),
        },
    };

    match document.to_document() {
        Ok(body) => (status, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to serialise OAI response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Resolve a validated request to the data its response needs.
pub async fn resolve(store: &dyn MetadataStore, req: &OaiRequest) -> Result<Payload, OaiError> {
    match req.verb {
        Verb::Identify => Ok(Payload::Identify {
            earliest_datestamp: store.earliest_datestamp().await?,
        }),
        Verb::ListSets => Ok(Payload::ListSets),
        Verb::ListMetadataFormats => {
            if let Some(id) = &req.identifier {
                let exists = store.get_item(id).await?.is_some()
                    || store.get_collection(id).await?.is_some();
                if !exists {
                    return Err(OaiError::IdDoesNotExist);
                }
            }
            Ok(Payload::ListMetadataFormats)
        }
        Verb::ListIdentifiers | Verb::ListRecords | Verb::GetRecord => records(store, req).await,
    }
}

async fn records(store: &dyn MetadataStore, req: &OaiRequest) -> Result<Payload, OaiError> {
    let empty = if req.verb == Verb::GetRecord {
        OaiError::IdDoesNotExist
    } else {
        OaiError::NoRecordsMatch
    };
    let identifier = req.identifier.as_deref().unwrap_or_default();

    if req.metadata_prefix != Some(MetadataPrefix::Ead) {
        let items = match req.verb {
            Verb::GetRecord => store.get_item(identifier).await?.into_iter().collect(),
            _ => store.list_items(&req.filter).await?,
        };
        if items.is_empty() {
            return Err(empty);
        }
        return Ok(Payload::Items(items));
    }

    let collections = match req.verb {
        Verb::GetRecord => store.get_collection(identifier).await?.into_iter().collect(),
        _ => store.list_collections(&req.filter).await?,
    };
    if collections.is_empty() {
        return Err(empty);
    }

    let mut out = Vec::with_capacity(collections.len());
    for collection in collections {
        let wants_items = req.verb.includes_metadata()
            && collection.status.as_deref() != Some("deleted");
        let items = match (&collection.nummer, wants_items) {
            (Some(nummer), true) => store.collection_items(nummer).await?,
            _ => Vec::new(),
        };
        out.push((collection, items));
    }
    Ok(Payload::Collections(out))
}

/// Reconstruct the public request URL without its query string.
fn base_url(headers: &HeaderMap, path: &str, default_scheme: &str) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or(default_scheme);
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{scheme}://{host}{path}")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{HeaderValue, StatusCode};
    use axum_test::TestServer;

    use super::*;
    use crate::oai::request::OaiSet;
    use crate::db::StoreError;
    use crate::oai::store::{CollectionRecord, ItemRecord, MockMetadataStore};
    use crate::oai::{router, Repository};

    fn server(store: MockMetadataStore) -> TestServer {
        let repository = Repository {
            name: "SLS/Arkiva".into(),
            admin_email: "is@sls.fi".into(),
            accessfile_base_url: "http://api.sls.fi/accessfiles/".into(),
        };
        let state = OaiState::new(Arc::new(store), repository, false);
        TestServer::new(router(state)).unwrap()
    }

    fn item(id: &str) -> ItemRecord {
        ItemRecord {
            identifier: Some(id.into()),
            datestamp: Some("2018-01-01".into()),
            dc_title: Some("Titel".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn identify_returns_xml() {
        let mut store = MockMetadataStore::new();
        store
            .expect_earliest_datestamp()
            .returning(|| Ok(Some("2015-06-01".into())));

        let resp = server(store)
            .get("/oai")
            .add_query_param("verb", "Identify")
            .await;
        resp.assert_status(StatusCode::OK);
        assert_eq!(
            resp.header(header::CONTENT_TYPE),
            HeaderValue::from_static(CONTENT_TYPE)
        );
        let body = resp.text();
        assert!(body.contains("<earliestDatestamp>2015-06-01</earliestDatestamp>"));
        assert!(body.contains("<baseURL>http://"));
        assert!(body.contains("/oai</baseURL>"));
    }

    #[tokio::test]
    async fn bad_verb_is_400_xml() {
        let resp = server(MockMetadataStore::new())
            .get("/oai/")
            .add_query_param("verb", "Nope")
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        assert!(resp.text().contains("<error code=\"badVerb\">Bad OAI verb</error>"));
    }

    #[tokio::test]
    async fn unknown_identifier_is_404() {
        let mut store = MockMetadataStore::new();
        store.expect_get_item().returning(|_| Ok(None));
        store.expect_get_collection().returning(|_| Ok(None));

        let resp = server(store)
            .get("/oai")
            .add_query_param("verb", "ListMetadataFormats")
            .add_query_param("identifier", "missing")
            .await;
        resp.assert_status(StatusCode::NOT_FOUND);
        let body = resp.text();
        assert!(body.contains("code=\"idDoesNotExist\""));
        assert!(body.contains("verb=\"ListMetadataFormats\""));
    }

    #[tokio::test]
    async fn list_records_passes_filter_to_store() {
        let mut store = MockMetadataStore::new();
        store
            .expect_list_items()
            .withf(|f| f.set == Some(OaiSet::Finna) && f.from.is_some())
            .returning(|_| Ok(vec![item("sls-1"), item("sls-2")]));

        let resp = server(store)
            .get("/oai")
            .add_query_param("verb", "ListRecords")
            .add_query_param("metadataPrefix", "oai_dc")
            .add_query_param("set", "SLSfinna")
            .add_query_param("from", "2017-01-01")
            .await;
        resp.assert_status(StatusCode::OK);
        assert_eq!(resp.text().matches("<record>").count(), 2);
    }

    #[tokio::test]
    async fn empty_list_is_no_records_match() {
        let mut store = MockMetadataStore::new();
        store.expect_list_items().returning(|_| Ok(vec![]));

        let resp = server(store)
            .get("/oai")
            .add_query_param("verb", "ListIdentifiers")
            .add_query_param("metadataPrefix", "europeana")
            .await;
        resp.assert_status(StatusCode::NOT_FOUND);
        assert!(resp.text().contains("code=\"noRecordsMatch\""));
    }

    #[tokio::test]
    async fn database_failures_are_500() {
        let mut store = MockMetadataStore::new();
        store
            .expect_get_item()
            .returning(|_| Err(StoreError::Query("boom".into())));

        let resp = server(store)
            .get("/oai")
            .add_query_param("verb", "GetRecord")
            .add_query_param("metadataPrefix", "oai_dc")
            .add_query_param("identifier", "sls-1")
            .await;
        resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.text().contains("code=\"databaseError\""));
    }

    #[tokio::test]
    async fn ead_records_load_collection_items() {
        let mut store = MockMetadataStore::new();
        store.expect_list_collections().returning(|_| {
            Ok(vec![
                CollectionRecord {
                    nummer: Some("1".into()),
                    c_signum: Some("SLSA 1".into()),
                    ..Default::default()
                },
                CollectionRecord {
                    nummer: Some("2".into()),
                    c_signum: Some("SLSA 2".into()),
                    status: Some("deleted".into()),
                    ..Default::default()
                },
            ])
        });
        store
            .expect_collection_items()
            .withf(|n| n.to_string() == "1")
            .times(1)
            .returning(|_| Ok(vec![]));

        let resp = server(store)
            .get("/oai")
            .add_query_param("verb", "ListRecords")
            .add_query_param("metadataPrefix", "ead")
            .await;
        resp.assert_status(StatusCode::OK);
        let body = resp.text();
        assert!(body.contains("<ead:eadid>SLSA 1</ead:eadid>"));
        assert!(body.contains("<header status=\"deleted\">"));
    }

    #[tokio::test]
    async fn ead_identifiers_skip_item_lookup() {
        let mut store = MockMetadataStore::new();
        store.expect_list_collections().returning(|_| {
            Ok(vec![CollectionRecord {
                nummer: Some("1".into()),
                c_signum: Some("SLSA 1".into()),
                ..Default::default()
            }])
        });
        store.expect_collection_items().never();

        let req = OaiRequest::from_pairs(&[
            ("verb".into(), "ListIdentifiers".into()),
            ("metadataPrefix".into(), "ead".into()),
        ])
        .unwrap();
        let payload = resolve(&store, &req).await.unwrap();
        assert!(matches!(payload, Payload::Collections(c) if c.len() == 1 && c[0].1.is_empty()));
    }

    #[test]
    fn base_url_honours_forwarded_proto() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("api.sls.fi"));
        assert_eq!(base_url(&headers, "/oai", "http"), "http://api.sls.fi/oai");
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(base_url(&headers, "/oai", "http"), "https://api.sls.fi/oai");
    }
}

//! Metadata access for the OAI endpoint.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, FromQueryResult, Value};
use tracing::error;

use super::error::OaiError;
use super::query;
use super::request::RecordFilter;
use crate::db::{self, StoreError};

impl From<StoreError> for OaiError {
    fn from(e: StoreError) -> Self {
        error!(error = %e, "OAI metadata lookup failed");
        match e {
            StoreError::Unreachable(_) => OaiError::Internal,
            StoreError::Query(_) => OaiError::Database,
        }
    }
}

/// One digital object joined to its entity and collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromQueryResult)]
pub struct ItemRecord {
    pub identifier: Option<String>,
    pub datestamp: Option<String>,
    pub to_europeana: Option<String>,
    pub to_ndb: Option<String>,
    pub status: Option<String>,
    pub dc_title: Option<String>,
    pub dc_type2: Option<String>,
    pub dc2_type: Option<String>,
    pub entity_label: Option<String>,
    pub dc_type2_eng: Option<String>,
    pub dc_subject: Option<String>,
    pub dc_description: Option<String>,
    pub dc_source: Option<String>,
    pub arkivets_namn: Option<String>,
    pub c_signum: Option<String>,
    pub dcterms_spatial: Option<String>,
    pub dcterms_spatial2: Option<String>,
    pub dcterms_spatial3: Option<String>,
    pub dcterms_spatial4: Option<String>,
    pub dcterms_created: Option<String>,
    pub dcterms_is_referenced_by: Option<String>,
    pub dc_identifier: Option<String>,
    pub dc_source_dimensions: Option<String>,
    pub duration: Option<String>,
    pub dc_source2: Option<String>,
    pub filetype_mime: Option<String>,
    pub dc_creator: Option<String>,
    pub dc_publisher: Option<String>,
    pub dc_publisher2: Option<String>,
    pub dc_rights: Option<String>,
    pub dcterms_issued: Option<String>,
    pub dc_language: Option<String>,
    pub derivate_filepath: Option<String>,
    pub ese_type: Option<String>,
    pub europeana_rights: Option<String>,
    pub referenced_by_url: Option<String>,
}

/// A collection (`samlingar` row) with the latest datestamp of its contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromQueryResult)]
pub struct CollectionRecord {
    pub nummer: Option<String>,
    pub c_signum: Option<String>,
    pub datestamp: Option<String>,
    pub to_europeana: Option<String>,
    pub to_ndb: Option<String>,
    pub status: Option<String>,
    pub arkivets_typ: Option<String>,
    pub arkivets_namn: Option<String>,
    pub tid_innehall: Option<String>,
    pub tid_innehall_maskin: Option<String>,
    pub tid_insamlat: Option<String>,
    pub tid_insamlat_maskin: Option<String>,
    pub tid_inlamnat: Option<String>,
    pub tid_inlamnat_maskin: Option<String>,
    pub projekt: Option<String>,
    pub omfattning_hyllmeter: Option<String>,
    pub omfattning_arkivenheter: Option<String>,
    pub omfattning_sidor: Option<String>,
    pub omfattning_filmer: Option<String>,
    pub omfattning_fotografier: Option<String>,
    pub omfattning_ljudband: Option<String>,
    pub omfattning_skisser: Option<String>,
    pub omfattning_kartor: Option<String>,
    pub sprak: Option<String>,
    pub sls_arkiv: Option<String>,
    pub arkivets_placering: Option<String>,
    pub personer_roll: Option<String>,
    pub amnesord: Option<String>,
    pub platser: Option<String>,
    pub platser_fin: Option<String>,
    pub om_arkivbildaren: Option<String>,
    pub arkivets_innehall: Option<String>,
    pub anmarkningar_externa: Option<String>,
    pub anmarkningar_referens: Option<String>,
    pub nyttjanderatt: Option<String>,
}

/// An intellectual entity row belonging to a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromQueryResult)]
pub struct EntityRow {
    pub nummer: Option<String>,
    pub c_title: Option<String>,
    pub dcterms_created: Option<String>,
    pub finna_unitid: Option<String>,
    pub dc_source_dimensions: Option<String>,
    pub dc_source2: Option<String>,
    pub dc_language: Option<String>,
    pub referenced_by_url: Option<String>,
    pub dc_description: Option<String>,
    pub dcterms_is_referenced_by: Option<String>,
    pub dc_rights: Option<String>,
    pub rights_fin: Option<String>,
    pub rights_eng: Option<String>,
    pub dc_type: Option<String>,
    pub dc_type2: Option<String>,
    pub dc_creator: Option<String>,
    pub dc_subject: Option<String>,
    pub dcterms_spatial_full: Option<String>,
    pub dcterms_spatial_fin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct UrnRow {
    pub entity: Option<String>,
    pub urn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct ObjectRow {
    pub nummer: Option<String>,
    pub entity: Option<String>,
    pub entity_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct DerivateRow {
    pub object: Option<String>,
    pub role_title: Option<String>,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivateFile {
    pub role_title: Option<String>,
    pub file_path: Option<String>,
}

/// A digital object with its derivate files, in `entity_order`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigitalObject {
    pub label: Option<String>,
    pub files: Vec<DerivateFile>,
}

/// An entity of a collection with everything the EAD `dsc` needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionItem {
    pub entity: EntityRow,
    pub urns: Vec<String>,
    pub objects: Vec<DigitalObject>,
}

/// Group flat URN, object and derivate rows under their entities.
pub fn assemble_items(
    entities: Vec<EntityRow>,
    urns: Vec<UrnRow>,
    objects: Vec<ObjectRow>,
    derivates: Vec<DerivateRow>,
) -> Vec<CollectionItem> {
    let mut files: HashMap<String, Vec<DerivateFile>> = HashMap::new();
    for d in derivates {
        if let Some(object) = d.object {
            files.entry(object).or_default().push(DerivateFile {
                role_title: d.role_title,
                file_path: d.file_path,
            });
        }
    }

    let mut by_entity: HashMap<String, Vec<DigitalObject>> = HashMap::new();
    for o in objects {
        let (Some(nummer), Some(entity)) = (o.nummer, o.entity) else {
            continue;
        };
        by_entity.entry(entity).or_default().push(DigitalObject {
            label: o.entity_label,
            files: files.remove(&nummer).unwrap_or_default(),
        });
    }

    let mut urns_by_entity: HashMap<String, Vec<String>> = HashMap::new();
    for u in urns {
        if let (Some(entity), Some(urn)) = (u.entity, u.urn) {
            urns_by_entity.entry(entity).or_default().push(urn);
        }
    }

    entities
        .into_iter()
        .map(|entity| {
            let key = entity.nummer.clone().unwrap_or_default();
            CollectionItem {
                urns: urns_by_entity.remove(&key).unwrap_or_default(),
                objects: by_entity.remove(&key).unwrap_or_default(),
                entity,
            }
        })
        .collect()
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Earliest datestamp over all records, formatted `YYYY-MM-DD`.
    async fn earliest_datestamp(&self) -> Result<Option<String>, StoreError>;

    async fn list_items(&self, filter: &RecordFilter) -> Result<Vec<ItemRecord>, StoreError>;

    async fn get_item(&self, identifier: &str) -> Result<Option<ItemRecord>, StoreError>;

    async fn list_collections(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<CollectionRecord>, StoreError>;

    async fn get_collection(&self, signum: &str) -> Result<Option<CollectionRecord>, StoreError>;

    /// Entities of the collection with primary key `collection`.
    async fn collection_items(&self, collection: &str) -> Result<Vec<CollectionItem>, StoreError>;
}

/// [`MetadataStore`] backed by the Arkiva MySQL database.
pub struct SqlMetadataStore {
    conn: DatabaseConnection,
}

impl SqlMetadataStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    async fn all<T: FromQueryResult>(
        &self,
        (sql, values): (String, Vec<Value>),
    ) -> Result<Vec<T>, StoreError> {
        Ok(T::find_by_statement(db::statement(sql, values))
            .all(&self.conn)
            .await?)
    }

    async fn one<T: FromQueryResult>(
        &self,
        (sql, values): (String, Vec<Value>),
    ) -> Result<Option<T>, StoreError> {
        Ok(T::find_by_statement(db::statement(sql, values))
            .one(&self.conn)
            .await?)
    }
}

#[derive(FromQueryResult)]
struct DatestampRow {
    datestamp: Option<String>,
}

#[async_trait]
impl MetadataStore for SqlMetadataStore {
    async fn earliest_datestamp(&self) -> Result<Option<String>, StoreError> {
        let row: Option<DatestampRow> = self.one(query::earliest_datestamp()).await?;
        Ok(row.and_then(|r| r.datestamp))
    }

    async fn list_items(&self, filter: &RecordFilter) -> Result<Vec<ItemRecord>, StoreError> {
        self.all(query::list_items(filter)).await
    }

    async fn get_item(&self, identifier: &str) -> Result<Option<ItemRecord>, StoreError> {
        self.one(query::get_item(identifier)).await
    }

    async fn list_collections(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<CollectionRecord>, StoreError> {
        self.all(query::list_collections(filter)).await
    }

    async fn get_collection(&self, signum: &str) -> Result<Option<CollectionRecord>, StoreError> {
        self.one(query::get_collection(signum)).await
    }

    async fn collection_items(&self, collection: &str) -> Result<Vec<CollectionItem>, StoreError> {
        let entities = self.all(query::collection_entities(collection)).await?;
        let urns = self.all(query::collection_urns(collection)).await?;
        let objects = self.all(query::collection_objects(collection)).await?;
        let derivates = self.all(query::collection_derivates(collection)).await?;
        Ok(assemble_items(entities, urns, objects, derivates))
    }
}

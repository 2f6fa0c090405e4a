//! Database access for project and semantic-data databases.

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, FromQueryResult, JsonValue, Value};

use super::query::{self, Direction};
use super::toc::TocRow;
use crate::db::{self, StoreError};

/// Publication state of an edition.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromQueryResult)]
pub struct EditionStatus {
    pub id: i64,
    /// `ed_lansering`: 0 unpublished, 1 internally published, 2 published.
    pub lansering: Option<i64>,
    /// `ed_filediv`; `"0"` when the edition is a single file.
    pub multiple_files: Option<String>,
}

impl EditionStatus {
    pub fn is_split(&self) -> bool {
        self.multiple_files.as_deref().map(str::trim) != Some("0")
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EditionStore: Send + Sync {
    async fn manuscripts(&self, publication_id: &str) -> Result<Vec<JsonValue>, StoreError>;

    async fn publications(&self, publication_id: &str) -> Result<Vec<JsonValue>, StoreError>;

    /// Editions with `ed_lansering >= level`.
    async fn editions(&self, level: i64) -> Result<Vec<JsonValue>, StoreError>;

    async fn edition_status(&self, edition_id: &str) -> Result<Option<EditionStatus>, StoreError>;

    async fn toc_root(&self, edition_id: &str) -> Result<Vec<JsonValue>, StoreError>;

    async fn toc_group(&self, edition_id: &str, group_id: &str)
        -> Result<Vec<JsonValue>, StoreError>;

    async fn toc_tree(&self, edition_id: &str) -> Result<Vec<TocRow>, StoreError>;

    async fn toc_neighbour(
        &self,
        edition_id: &str,
        link_id: &str,
        same_group: bool,
        direction: Direction,
    ) -> Result<Option<JsonValue>, StoreError>;

    async fn toc_first(&self, edition_id: &str) -> Result<Option<JsonValue>, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SemanticStore: Send + Sync {
    async fn person_tooltip(&self, person_id: &str) -> Result<Option<JsonValue>, StoreError>;

    async fn persons(&self, data_source_id: &str) -> Result<Vec<JsonValue>, StoreError>;

    async fn place_tooltip(&self, place_id: &str) -> Result<Option<JsonValue>, StoreError>;

    async fn places(&self) -> Result<Vec<JsonValue>, StoreError>;
}

/// Both store traits over one MySQL pool.
pub struct SqlEditionStore {
    conn: DatabaseConnection,
}

impl SqlEditionStore {
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

#[async_trait]
impl EditionStore for SqlEditionStore {
    async fn manuscripts(&self, publication_id: &str) -> Result<Vec<JsonValue>, StoreError> {
        self.all(query::manuscripts(publication_id)).await
    }

    async fn publications(&self, publication_id: &str) -> Result<Vec<JsonValue>, StoreError> {
        self.all(query::publications(publication_id)).await
    }

    async fn editions(&self, level: i64) -> Result<Vec<JsonValue>, StoreError> {
        self.all(query::editions(level)).await
    }

    async fn edition_status(&self, edition_id: &str) -> Result<Option<EditionStatus>, StoreError> {
        self.one(query::edition_status(edition_id)).await
    }

    async fn toc_root(&self, edition_id: &str) -> Result<Vec<JsonValue>, StoreError> {
        self.all(query::toc_root(edition_id)).await
    }

    async fn toc_group(
        &self,
        edition_id: &str,
        group_id: &str,
    ) -> Result<Vec<JsonValue>, StoreError> {
        self.all(query::toc_group(edition_id, group_id)).await
    }

    async fn toc_tree(&self, edition_id: &str) -> Result<Vec<TocRow>, StoreError> {
        self.all(query::toc_tree(edition_id)).await
    }

    async fn toc_neighbour(
        &self,
        edition_id: &str,
        link_id: &str,
        same_group: bool,
        direction: Direction,
    ) -> Result<Option<JsonValue>, StoreError> {
        self.one(query::toc_neighbour(edition_id, link_id, same_group, direction))
            .await
    }

    async fn toc_first(&self, edition_id: &str) -> Result<Option<JsonValue>, StoreError> {
        self.one(query::toc_first(edition_id)).await
    }
}

#[async_trait]
impl SemanticStore for SqlEditionStore {
    async fn person_tooltip(&self, person_id: &str) -> Result<Option<JsonValue>, StoreError> {
        self.one(query::person_tooltip(person_id)).await
    }

    async fn persons(&self, data_source_id: &str) -> Result<Vec<JsonValue>, StoreError> {
        self.all(query::persons(data_source_id)).await
    }

    async fn place_tooltip(&self, place_id: &str) -> Result<Option<JsonValue>, StoreError> {
        self.one(query::place_tooltip(place_id)).await
    }

    async fn places(&self) -> Result<Vec<JsonValue>, StoreError> {
        self.all(query::places()).await
    }
}

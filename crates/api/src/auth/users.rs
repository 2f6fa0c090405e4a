//! The `users` table.

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, FromQueryResult};

use super::jwt::Identity;
use crate::db::{self, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct User {
    pub ident: i64,
    pub email: String,
    /// PHC-format password hash.
    pub password: String,
    /// Comma-separated project names the user may edit.
    pub projects: Option<String>,
}

impl User {
    pub fn projects(&self) -> Option<Vec<String>> {
        let projects: Vec<String> = self
            .projects
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_owned)
            .collect();
        (!projects.is_empty()).then_some(projects)
    }

    pub fn identity(&self) -> Identity {
        Identity {
            email: self.email.clone(),
            projects: self.projects(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Insert a user without project rights.
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;
}

pub struct SqlUserStore {
    conn: DatabaseConnection,
}

impl SqlUserStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl UserStore for SqlUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let stmt = db::statement(
            "SELECT CAST(ident AS SIGNED) AS ident, email, password, projects \
             FROM users WHERE email = ? LIMIT 1",
            vec![email.into()],
        );
        Ok(User::find_by_statement(stmt).one(&self.conn).await?)
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let stmt = db::statement(
            "INSERT INTO users (email, password) VALUES (?, ?)",
            vec![email.into(), password_hash.into()],
        );
        let result = self.conn.execute(stmt).await?;
        Ok(User {
            ident: i64::try_from(result.last_insert_id()).unwrap_or(i64::MAX),
            email: email.to_owned(),
            password: password_hash.to_owned(),
            projects: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(projects: Option<&str>) -> User {
        User {
            ident: 1,
            email: "a@sls.fi".into(),
            password: "$argon2id$...".into(),
            projects: projects.map(str::to_owned),
        }
    }

    #[test]
    fn projects_are_split_on_commas() {
        assert_eq!(
            user(Some("topelius, parland")).projects(),
            Some(vec!["topelius".to_owned(), "parland".to_owned()])
        );
    }

    #[test]
    fn no_projects_is_none() {
        assert_eq!(user(None).projects(), None);
        assert_eq!(user(Some("")).projects(), None);
        assert_eq!(user(Some(" , ")).projects(), None);
    }

    #[test]
    fn identity_carries_email_and_projects() {
        let id = user(Some("topelius")).identity();
        assert_eq!(id.email, "a@sls.fi");
        assert_eq!(id.projects, Some(vec!["topelius".to_owned()]));
    }
}

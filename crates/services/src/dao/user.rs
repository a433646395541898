use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use lumdash_db::models::{User, UserRole};

use super::base::{BaseDao, DaoError, DaoResult};

pub struct UserDao {
    pub base: BaseDao<User>,
}

impl UserDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, User::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        email: String,
        username: String,
        display_name: String,
        password_hash: String,
        role: UserRole,
    ) -> DaoResult<User> {
        let now = DateTime::now();
        let user = User {
            id: None,
            email: email.trim().to_lowercase(),
            username,
            display_name,
            password_hash: Some(password_hash),
            role,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&user).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> DaoResult<User> {
        self.base
            .find_one(doc! { "email": email.trim().to_lowercase() })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find_by_username(&self, username: &str) -> DaoResult<User> {
        self.base
            .find_one(doc! { "username": username })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn list(&self) -> DaoResult<Vec<User>> {
        self.base
            .find_many(doc! {}, Some(doc! { "display_name": 1 }))
            .await
    }

    pub async fn delete(&self, user_id: ObjectId) -> DaoResult<()> {
        let deleted = self.base.hard_delete(doc! { "_id": user_id }).await?;
        if deleted == 0 {
            return Err(DaoError::NotFound);
        }
        Ok(())
    }
}

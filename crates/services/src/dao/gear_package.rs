use bson::{doc, oid::ObjectId, DateTime, Document};
use lumdash_db::models::{GearPackage, PackageCategory};
use mongodb::Database;

use super::base::{BaseDao, DaoError, DaoResult};

pub struct GearPackageDao {
    pub base: BaseDao<GearPackage>,
}

impl GearPackageDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, GearPackage::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        user_id: ObjectId,
        name: String,
        description: Option<String>,
        categories: Vec<PackageCategory>,
    ) -> DaoResult<GearPackage> {
        let now = DateTime::now();
        let package = GearPackage {
            id: None,
            user_id,
            name: package_name(&name)?,
            description,
            categories,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&package).await?;
        self.base.find_by_id(id).await
    }

    pub async fn list_for_user(&self, user_id: ObjectId) -> DaoResult<Vec<GearPackage>> {
        self.base
            .find_many(doc! { "user_id": user_id }, Some(doc! { "name": 1 }))
            .await
    }

    /// Packages of other users read as missing.
    pub async fn find_owned(&self, id: ObjectId, user_id: ObjectId) -> DaoResult<GearPackage> {
        self.base
            .find_one(doc! { "_id": id, "user_id": user_id })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn update(
        &self,
        id: ObjectId,
        user_id: ObjectId,
        name: Option<String>,
        description: Option<String>,
        categories: Option<Vec<PackageCategory>>,
    ) -> DaoResult<GearPackage> {
        let mut set = Document::new();
        if let Some(name) = name {
            set.insert("name", package_name(&name)?);
        }
        if let Some(description) = description {
            set.insert("description", description);
        }
        if let Some(categories) = categories {
            set.insert("categories", bson::to_bson(&categories)?);
        }

        // Make sure the caller owns it before touching anything.
        self.find_owned(id, user_id).await?;

        if !set.is_empty() {
            self.base
                .update_one(doc! { "_id": id, "user_id": user_id }, doc! { "$set": set })
                .await
                .map_err(map_duplicate)?;
        }

        self.find_owned(id, user_id).await
    }

    pub async fn delete(&self, id: ObjectId, user_id: ObjectId) -> DaoResult<()> {
        let deleted = self
            .base
            .hard_delete(doc! { "_id": id, "user_id": user_id })
            .await?;
        if deleted == 0 {
            return Err(DaoError::NotFound);
        }
        Ok(())
    }
}

fn package_name(name: &str) -> DaoResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DaoError::invalid(&["name"], "name is required"));
    }
    Ok(name.to_string())
}

/// Renaming onto an existing package name hits the unique index.
fn map_duplicate(err: DaoError) -> DaoError {
    if let DaoError::Mongo(ref e) = err {
        if let mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(
            ref write_error,
        )) = *e.kind
        {
            if write_error.code == 11000 {
                return DaoError::DuplicateKey(write_error.message.clone());
            }
        }
    }
    err
}

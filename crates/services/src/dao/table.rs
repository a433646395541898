use bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use lumdash_db::models::{EventGeneral, GearConfig, Table};
use mongodb::Database;
use serde::Serialize;

use super::base::{BaseDao, DaoError, DaoResult};

pub struct TableDao {
    pub base: BaseDao<Table>,
}

/// Array fields of an event that are read and replaced wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSection {
    Schedule,
    Crew,
    Tasks,
    Travel,
    CardLog,
    Shotlists,
}

impl TableSection {
    pub fn field(self) -> &'static str {
        match self {
            TableSection::Schedule => "program_schedule",
            TableSection::Crew => "rows",
            TableSection::Tasks => "tasks",
            TableSection::Travel => "travel",
            TableSection::CardLog => "card_log",
            TableSection::Shotlists => "shotlists",
        }
    }
}

impl TableDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Table::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        owner_id: ObjectId,
        title: String,
        general: EventGeneral,
    ) -> DaoResult<Table> {
        let now = DateTime::now();
        let table = Table {
            id: None,
            title: title.trim().to_string(),
            owners: vec![owner_id],
            shared_with: Vec::new(),
            general,
            program_schedule: Vec::new(),
            rows: Vec::new(),
            tasks: Vec::new(),
            travel: Vec::new(),
            gear: GearConfig::default(),
            card_log: Vec::new(),
            shotlists: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&table).await?;
        self.base.find_by_id(id).await
    }

    /// Events the user owns or was shared on; admins see everything.
    pub async fn list_for_user(&self, user_id: ObjectId, is_admin: bool) -> DaoResult<Vec<Table>> {
        let filter = if is_admin {
            doc! {}
        } else {
            doc! { "$or": [ { "owners": user_id }, { "shared_with": user_id } ] }
        };
        self.base
            .find_many(filter, Some(doc! { "created_at": -1 }))
            .await
    }

    /// Loads an event the user may read.
    pub async fn find_accessible(
        &self,
        id: ObjectId,
        user_id: ObjectId,
        is_admin: bool,
    ) -> DaoResult<Table> {
        let table = self.base.find_by_id(id).await?;
        if !is_admin && !table.can_access(user_id) {
            return Err(DaoError::Forbidden("No access to this event".to_string()));
        }
        Ok(table)
    }

    pub async fn update_general(
        &self,
        id: ObjectId,
        title: Option<String>,
        general: Option<EventGeneral>,
    ) -> DaoResult<Table> {
        let mut set = Document::new();
        if let Some(title) = title {
            set.insert("title", title.trim().to_string());
        }
        if let Some(general) = general {
            set.insert("general", bson::to_bson(&general)?);
        }
        if !set.is_empty() {
            self.base.update_by_id(id, doc! { "$set": set }).await?;
        }
        self.base.find_by_id(id).await
    }

    pub async fn set_shared_with(&self, id: ObjectId, user_ids: Vec<ObjectId>) -> DaoResult<Table> {
        let ids: Vec<Bson> = user_ids.into_iter().map(Bson::ObjectId).collect();
        self.base
            .update_by_id(id, doc! { "$set": { "shared_with": ids } })
            .await?;
        self.base.find_by_id(id).await
    }

    pub async fn replace_section<T: Serialize>(
        &self,
        id: ObjectId,
        section: TableSection,
        items: &[T],
    ) -> DaoResult<()> {
        let value = bson::to_bson(items)?;
        let mut set = Document::new();
        set.insert(section.field(), value);
        self.base.update_by_id(id, doc! { "$set": set }).await?;
        Ok(())
    }

    pub async fn set_gear(&self, id: ObjectId, gear: &GearConfig) -> DaoResult<Table> {
        self.base
            .update_by_id(id, doc! { "$set": { "gear": bson::to_bson(gear)? } })
            .await?;
        self.base.find_by_id(id).await
    }

    pub async fn delete(&self, id: ObjectId) -> DaoResult<()> {
        let deleted = self.base.hard_delete(doc! { "_id": id }).await?;
        if deleted == 0 {
            return Err(DaoError::NotFound);
        }
        Ok(())
    }

    pub async fn all(&self) -> DaoResult<Vec<Table>> {
        self.base.find_many(doc! {}, None).await
    }
}

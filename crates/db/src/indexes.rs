use futures::TryStreamExt;
use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::{info, warn};

use crate::models::{
    GearInventoryItem, GearPackage, ManualReservation, ReservedGearItem, Table, User,
};

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Serial numbers may be shared by untracked items, so an older unique
    // index must not survive a deploy.
    drop_unique_serial_index(db).await?;
    backfill_inventory_versions(db).await?;

    // Users
    create_indexes(
        db,
        User::COLLECTION,
        vec![
            index_unique(bson::doc! { "email": 1 }),
            index_unique(bson::doc! { "username": 1 }),
        ],
    )
    .await?;

    // Tables (events)
    create_indexes(
        db,
        Table::COLLECTION,
        vec![
            index(bson::doc! { "owners": 1, "created_at": -1 }),
            index(bson::doc! { "shared_with": 1 }),
        ],
    )
    .await?;

    // Gear inventory
    create_indexes(
        db,
        GearInventoryItem::COLLECTION,
        vec![
            index(bson::doc! { "category": 1, "label": 1 }),
            index(bson::doc! { "serial": 1 }),
            index(bson::doc! { "reservations.event_id": 1 }),
            index(bson::doc! { "reservations.reservation_id": 1 }),
        ],
    )
    .await?;

    // Reserved gear items
    create_indexes(
        db,
        ReservedGearItem::COLLECTION,
        vec![
            index(bson::doc! { "event_id": 1, "user_id": 1, "list_name": 1 }),
            index(bson::doc! { "user_id": 1, "created_at": -1 }),
            index(bson::doc! { "inventory_id": 1 }),
        ],
    )
    .await?;

    // Manual reservations
    create_indexes(
        db,
        ManualReservation::COLLECTION,
        vec![
            index(bson::doc! { "inventory_id": 1, "start_date": 1 }),
            index(bson::doc! { "start_date": -1 }),
        ],
    )
    .await?;

    // Gear packages
    create_indexes(
        db,
        GearPackage::COLLECTION,
        vec![index_unique(bson::doc! { "user_id": 1, "name": 1 })],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

async fn drop_unique_serial_index(db: &Database) -> Result<(), mongodb::error::Error> {
    let collection = db.collection::<bson::Document>(GearInventoryItem::COLLECTION);

    // Listing indexes on a collection that does not exist yet fails with
    // NamespaceNotFound; there is nothing to drop in that case.
    let indexes: Vec<IndexModel> = match collection.list_indexes().await {
        Ok(cursor) => cursor.try_collect().await?,
        Err(e) => {
            warn!(%e, "Could not list gear inventory indexes");
            return Ok(());
        }
    };

    for model in indexes {
        let is_serial_key = model.keys.len() == 1 && model.keys.contains_key("serial");
        let options = model.options.unwrap_or_default();
        if is_serial_key && options.unique == Some(true) {
            if let Some(name) = options.name {
                collection.drop_index(name.clone()).await?;
                info!(index = %name, "Dropped unique serial index");
            }
        }
    }

    Ok(())
}

/// Items written before reservations were version-guarded carry no
/// `version` field; start them at zero.
async fn backfill_inventory_versions(db: &Database) -> Result<(), mongodb::error::Error> {
    let result = db
        .collection::<bson::Document>(GearInventoryItem::COLLECTION)
        .update_many(
            bson::doc! { "version": { "$exists": false } },
            bson::doc! { "$set": { "version": 0_i64 } },
        )
        .await?;
    if result.modified_count > 0 {
        info!(items = result.modified_count, "Backfilled inventory versions");
    }
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}

use lumdash_services::dao::table::TableSection;
use serde::Serialize;
use serde_json::Value;

/// Change notifications pushed to connected clients as `{type, data}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ChangeEvent {
    UsersChanged { user_id: String },
    TableUpdated { table_id: String, title: String },
    TableDeleted { table_id: String },
    ScheduleChanged { table_id: String, items: Value },
    CrewChanged { table_id: String, items: Value },
    TasksChanged { table_id: String, items: Value },
    TravelChanged { table_id: String, items: Value },
    CardLogChanged { table_id: String, items: Value },
    ShotlistsChanged { table_id: String, items: Value },
    GearChanged { table_id: String, gear: Value },
    ReservedGearChanged { table_id: String, item_id: String, inventory_id: String },
    InventoryChanged { inventory_id: Option<String> },
}

impl ChangeEvent {
    pub fn section(section: TableSection, table_id: String, items: Value) -> Self {
        match section {
            TableSection::Schedule => ChangeEvent::ScheduleChanged { table_id, items },
            TableSection::Crew => ChangeEvent::CrewChanged { table_id, items },
            TableSection::Tasks => ChangeEvent::TasksChanged { table_id, items },
            TableSection::Travel => ChangeEvent::TravelChanged { table_id, items },
            TableSection::CardLog => ChangeEvent::CardLogChanged { table_id, items },
            TableSection::Shotlists => ChangeEvent::ShotlistsChanged { table_id, items },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::UsersChanged { .. } => "usersChanged",
            ChangeEvent::TableUpdated { .. } => "tableUpdated",
            ChangeEvent::TableDeleted { .. } => "tableDeleted",
            ChangeEvent::ScheduleChanged { .. } => "scheduleChanged",
            ChangeEvent::CrewChanged { .. } => "crewChanged",
            ChangeEvent::TasksChanged { .. } => "tasksChanged",
            ChangeEvent::TravelChanged { .. } => "travelChanged",
            ChangeEvent::CardLogChanged { .. } => "cardLogChanged",
            ChangeEvent::ShotlistsChanged { .. } => "shotlistsChanged",
            ChangeEvent::GearChanged { .. } => "gearChanged",
            ChangeEvent::ReservedGearChanged { .. } => "reservedGearChanged",
            ChangeEvent::InventoryChanged { .. } => "inventoryChanged",
        }
    }
}

use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// One production event. The collection keeps its historical name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub owners: Vec<ObjectId>,
    #[serde(default)]
    pub shared_with: Vec<ObjectId>,
    #[serde(default)]
    pub general: EventGeneral,
    #[serde(default)]
    pub program_schedule: Vec<ProgramDay>,
    #[serde(default)]
    pub rows: Vec<CrewRow>,
    #[serde(default)]
    pub tasks: Vec<EventTask>,
    #[serde(default)]
    pub travel: Vec<TravelEntry>,
    #[serde(default)]
    pub gear: GearConfig,
    #[serde(default)]
    pub card_log: Vec<CardLogEntry>,
    #[serde(default)]
    pub shotlists: Vec<Shotlist>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventGeneral {
    pub client: Option<String>,
    pub location: Option<String>,
    /// `YYYY-MM-DD`
    pub start: Option<String>,
    /// `YYYY-MM-DD`
    pub end: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProgramDay {
    pub date: String,
    #[serde(default)]
    pub programs: Vec<Program>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Program {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,
    pub photographer: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CrewRow {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub role: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventTask {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub deadline: Option<String>,
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TravelEntry {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub date: Option<String>,
    pub time: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub carrier: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// Gear window of the event. Every inventory reservation tied to the event
/// carries these dates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GearConfig {
    pub check_out_date: Option<DateTime>,
    pub check_in_date: Option<DateTime>,
    #[serde(default)]
    pub lists: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CardLogEntry {
    #[serde(default)]
    pub id: String,
    pub date: Option<String>,
    pub camera: Option<String>,
    pub card1: Option<String>,
    pub card2: Option<String>,
    pub user: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Shotlist {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<ShotItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShotItem {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub done: bool,
}

impl Table {
    pub const COLLECTION: &'static str = "tables";

    pub fn is_owner(&self, user_id: ObjectId) -> bool {
        self.owners.contains(&user_id)
    }

    pub fn can_access(&self, user_id: ObjectId) -> bool {
        self.is_owner(user_id) || self.shared_with.contains(&user_id)
    }

    /// Owners first, then shared users, without duplicates.
    pub fn audience(&self) -> Vec<ObjectId> {
        let mut ids = self.owners.clone();
        for id in &self.shared_with {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }
}

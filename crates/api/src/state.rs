use mongodb::Database;
use lumdash_config::Settings;
use lumdash_services::{
    AssistantService, AuthService,
    chat::ContextLimits,
    dao::{
        gear_inventory::GearInventoryDao, gear_package::GearPackageDao,
        manual_reservation::ManualReservationDao, reserved_gear::ReservedGearDao,
        table::TableDao, user::UserDao,
    },
};
use std::sync::Arc;

use crate::ws::storage::WsStorage;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserDao>,
    pub tables: Arc<TableDao>,
    pub inventory: Arc<GearInventoryDao>,
    pub reserved_gear: Arc<ReservedGearDao>,
    pub manual_reservations: Arc<ManualReservationDao>,
    pub gear_packages: Arc<GearPackageDao>,
    pub ws_storage: Arc<WsStorage>,
    pub assistant: AssistantService,
}

impl AppState {
    pub fn new(db: Database, settings: Settings) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let users = Arc::new(UserDao::new(&db));
        let tables = Arc::new(TableDao::new(&db));
        let inventory = Arc::new(GearInventoryDao::new(
            &db,
            settings.reservation.max_update_retries,
        ));
        let reserved_gear = Arc::new(ReservedGearDao::new(&db));
        let manual_reservations = Arc::new(ManualReservationDao::new(&db));
        let gear_packages = Arc::new(GearPackageDao::new(&db));
        let ws_storage = Arc::new(WsStorage::new());
        let assistant = AssistantService::new(
            settings.claude.api_key.clone(),
            settings.claude.model.clone(),
            settings.claude.max_tokens,
        );

        Self {
            db,
            settings,
            auth,
            users,
            tables,
            inventory,
            reserved_gear,
            manual_reservations,
            gear_packages,
            ws_storage,
            assistant,
        }
    }

    pub fn context_limits(&self) -> ContextLimits {
        ContextLimits {
            max_schedule_items: self.settings.chat.max_schedule_items,
            max_section_items: self.settings.chat.max_section_items,
        }
    }

    /// Whether `email` is configured to receive the admin role.
    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim();
        self.settings
            .auth
            .admin_emails
            .iter()
            .any(|admin| admin.trim().eq_ignore_ascii_case(email))
    }
}

pub mod auth;
pub mod chat;
pub mod dao;
pub mod reservation;

pub use auth::AuthService;
pub use chat::AssistantService;
pub use dao::*;

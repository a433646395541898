pub mod base;
pub mod gear_inventory;
pub mod gear_package;
pub mod manual_reservation;
pub mod reserved_gear;
pub mod table;
pub mod user;

pub use base::BaseDao;

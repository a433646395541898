mod gear_inventory;
mod gear_package;
mod manual_reservation;
mod reserved_gear_item;
mod table;
mod user;

pub use gear_inventory::*;
pub use gear_package::*;
pub use manual_reservation::*;
pub use reserved_gear_item::*;
pub use table::*;
pub use user::*;

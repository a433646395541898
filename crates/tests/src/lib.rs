pub mod fixtures;

#[cfg(test)]
mod manual_reservation_tests;
#[cfg(test)]
mod reserved_gear_tests;
#[cfg(test)]
mod table_tests;

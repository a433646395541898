//! Interval and quantity bookkeeping for gear reservations.
//!
//! Everything here is pure: the DAOs load an inventory item, ask this
//! module what the reservation list should look like, and write the result
//! back under a version guard.

pub mod dates;
pub mod ledger;
pub mod reconcile;

pub use dates::{DayRange, ReservationError, day_of, day_start, event_window, format_day, parse_day};
pub use ledger::{
    Availability, ReleaseTarget, Shortfall, availability, check_capacity, check_event_move,
    peak_usage, release_from,
};
pub use reconcile::{LiveReferences, ReconcileOutcome, ReconcileReport, reconcile_entries};

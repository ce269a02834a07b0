//! Driver schedule records.
//!
//! A schedule arrives as stops (route, sequence, location, arrival). Legs
//! are derived by pairing consecutive stops of each route and widening the
//! driving window by the configured preload and drop offsets, which gives
//! the interval a trailer is tied to the movement.
//!
//! Reading the source spreadsheet is left to the caller; this module starts
//! from already parsed records.

mod config;
mod normalize;
mod types;

pub use config::ScheduleConfig;
pub use normalize::legs_from_stops;
pub use types::{Leg, Stop, ARRIVAL_FORMAT};

//! Stop records to leg records.
//!
//! Consecutive stops of a route are paired into legs; the last stop of each
//! route has no onward movement and produces no leg.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use tracing::debug;

use super::config::ScheduleConfig;
use super::types::{Leg, Stop};
use crate::error::SolveError;

/// Converts stops into legs ordered by `(route, sequence)`.
///
/// `ready = arrival - preload_offset` at the origin stop and
/// `release = next arrival + drop_offset` at the destination stop.
///
/// # Errors
///
/// [`SolveError::MalformedInput`] for an invalid config, a blank route or
/// location, a duplicate `(route, sequence)` pair, or a stop without arrival.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use u_trailerflow::schedule::{legs_from_stops, ScheduleConfig, Stop};
///
/// let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let stops = vec![
///     Stop::new("1", 1, "A", day.and_hms_opt(8, 0, 0).unwrap()),
///     Stop::new("1", 2, "B", day.and_hms_opt(12, 0, 0).unwrap()),
///     Stop::new("1", 3, "C", day.and_hms_opt(18, 0, 0).unwrap()),
/// ];
/// let legs = legs_from_stops(&stops, &ScheduleConfig::default()).unwrap();
/// assert_eq!(legs.len(), 2);
/// assert_eq!(legs[1].origin, "B");
/// assert_eq!(legs[1].destination, "C");
/// ```
pub fn legs_from_stops(stops: &[Stop], config: &ScheduleConfig) -> Result<Vec<Leg>, SolveError> {
    config.validate().map_err(SolveError::MalformedInput)?;

    let mut routes: BTreeMap<&str, Vec<&Stop>> = BTreeMap::new();
    for stop in stops {
        if stop.route.trim().is_empty() {
            return Err(SolveError::MalformedInput(format!(
                "stop {} has an empty route id",
                stop.sequence
            )));
        }
        if stop.location.trim().is_empty() {
            return Err(SolveError::MalformedInput(format!(
                "route {} stop {} has an empty location",
                stop.route, stop.sequence
            )));
        }
        routes.entry(stop.route.as_str()).or_default().push(stop);
    }

    let mut legs = Vec::with_capacity(stops.len().saturating_sub(routes.len()));
    for (route, mut route_stops) in routes {
        route_stops.sort_by_key(|s| s.sequence);
        for pair in route_stops.windows(2) {
            let (here, next) = (pair[0], pair[1]);
            if here.sequence == next.sequence {
                return Err(SolveError::MalformedInput(format!(
                    "route {route} has duplicate stop sequence {}",
                    here.sequence
                )));
            }
            legs.push(Leg {
                route: route.to_string(),
                sequence: here.sequence,
                origin: here.location.clone(),
                destination: next.location.clone(),
                ready: arrival_of(here)? - config.preload_offset,
                release: arrival_of(next)? + config.drop_offset,
            });
        }
        // A single-stop route yields no leg but still needs a valid arrival.
        if let [only] = route_stops.as_slice() {
            arrival_of(only)?;
        }
    }

    debug!(stops = stops.len(), legs = legs.len(), "normalized schedule");
    Ok(legs)
}

fn arrival_of(stop: &Stop) -> Result<NaiveDateTime, SolveError> {
    stop.arrival.ok_or_else(|| {
        SolveError::MalformedInput(format!(
            "route {} stop {} has no arrival time",
            stop.route, stop.sequence
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeDelta};

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_pairs_consecutive_stops_and_drops_last() {
        let stops = vec![
            Stop::new("1", 10, "A", at(8)),
            Stop::new("1", 20, "B", at(12)),
            Stop::new("1", 30, "C", at(18)),
        ];
        let legs = legs_from_stops(&stops, &ScheduleConfig::default()).unwrap();
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].key(), ("1", 10));
        assert_eq!((legs[0].origin.as_str(), legs[0].destination.as_str()), ("A", "B"));
        assert_eq!(legs[1].key(), ("1", 20));
        assert_eq!((legs[1].origin.as_str(), legs[1].destination.as_str()), ("B", "C"));
    }

    #[test]
    fn test_applies_offsets() {
        let stops = vec![Stop::new("1", 1, "A", at(8)), Stop::new("1", 2, "B", at(12))];
        let config = ScheduleConfig::default()
            .with_preload_offset(TimeDelta::hours(2))
            .with_drop_offset(TimeDelta::hours(3));
        let legs = legs_from_stops(&stops, &config).unwrap();
        assert_eq!(legs[0].ready, at(6));
        assert_eq!(legs[0].release, at(15));
    }

    #[test]
    fn test_unsorted_input_is_ordered() {
        let stops = vec![
            Stop::new("2", 2, "D", at(10)),
            Stop::new("1", 2, "B", at(12)),
            Stop::new("2", 1, "C", at(9)),
            Stop::new("1", 1, "A", at(8)),
        ];
        let legs = legs_from_stops(&stops, &ScheduleConfig::default()).unwrap();
        let keys: Vec<_> = legs.iter().map(|l| l.key()).collect();
        assert_eq!(keys, vec![("1", 1), ("2", 1)]);
        assert_eq!(legs[1].origin, "C");
        assert_eq!(legs[1].destination, "D");
    }

    #[test]
    fn test_single_stop_route_has_no_legs() {
        let stops = vec![Stop::new("9", 1, "A", at(8))];
        let legs = legs_from_stops(&stops, &ScheduleConfig::default()).unwrap();
        assert!(legs.is_empty());
    }

    #[test]
    fn test_duplicate_sequence_rejected() {
        let stops = vec![Stop::new("1", 1, "A", at(8)), Stop::new("1", 1, "B", at(9))];
        let err = legs_from_stops(&stops, &ScheduleConfig::default()).unwrap_err();
        assert!(matches!(err, SolveError::MalformedInput(_)));
    }

    #[test]
    fn test_missing_arrival_rejected() {
        let mut last = Stop::new("1", 2, "B", at(12));
        last.arrival = None;
        let stops = vec![Stop::new("1", 1, "A", at(8)), last];
        let err = legs_from_stops(&stops, &ScheduleConfig::default()).unwrap_err();
        assert!(matches!(err, SolveError::MalformedInput(msg) if msg.contains("no arrival")));
    }

    #[test]
    fn test_empty_location_rejected() {
        let stops = vec![Stop::new("1", 1, "", at(8)), Stop::new("1", 2, "B", at(12))];
        assert!(legs_from_stops(&stops, &ScheduleConfig::default()).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let stops = vec![Stop::new("1", 1, "A", at(8)), Stop::new("1", 2, "B", at(12))];
        let config = ScheduleConfig::default().with_drop_offset(TimeDelta::hours(-1));
        assert!(legs_from_stops(&stops, &config).is_err());
    }
}

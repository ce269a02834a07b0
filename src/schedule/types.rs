//! Stop and leg records.

use chrono::NaiveDateTime;

use crate::error::SolveError;

/// Date and time layout of the schedule export, concatenated without a
/// separator (`2024-03-0108:30:00`).
pub const ARRIVAL_FORMAT: &str = "%Y-%m-%d%H:%M:%S";

/// One scheduled arrival of a driver route at a location.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stop {
    /// Route identifier.
    pub route: String,
    /// Position of this stop within its route.
    pub sequence: u32,
    /// Location code (postal code in the source schedules).
    pub location: String,
    /// Arrival timestamp. `None` when the export left it blank.
    pub arrival: Option<NaiveDateTime>,
}

impl Stop {
    /// Creates a stop with a known arrival time.
    pub fn new(
        route: impl Into<String>,
        sequence: u32,
        location: impl Into<String>,
        arrival: NaiveDateTime,
    ) -> Self {
        Self {
            route: route.into(),
            sequence,
            location: location.into(),
            arrival: Some(arrival),
        }
    }

    /// Builds a stop from raw date and time columns.
    ///
    /// Blank date or time yields a stop without arrival (rejected later,
    /// during normalization); any other unparseable value fails here.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_trailerflow::schedule::Stop;
    ///
    /// let stop = Stop::from_fields("7", 1, "30301", "2024-03-01", "08:30:00").unwrap();
    /// assert!(stop.arrival.is_some());
    /// assert!(Stop::from_fields("7", 1, "30301", "2024-03-01", "8h30").is_err());
    /// ```
    pub fn from_fields(
        route: impl Into<String>,
        sequence: u32,
        location: impl Into<String>,
        date: &str,
        time: &str,
    ) -> Result<Self, SolveError> {
        let route = route.into();
        let (date, time) = (date.trim(), time.trim());
        let arrival = if date.is_empty() || time.is_empty() {
            None
        } else {
            let raw = format!("{date}{time}");
            let parsed = NaiveDateTime::parse_from_str(&raw, ARRIVAL_FORMAT).map_err(|e| {
                SolveError::MalformedInput(format!(
                    "route {route} stop {sequence}: cannot parse arrival '{date} {time}': {e}"
                ))
            })?;
            Some(parsed)
        };
        Ok(Self {
            route,
            sequence,
            location: location.into(),
            arrival,
        })
    }
}

/// One trailer movement between two consecutive stops of a route.
///
/// `ready` is when the trailer must be available at `origin`; `release` is
/// when it becomes free again at `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Leg {
    pub route: String,
    pub sequence: u32,
    pub origin: String,
    pub destination: String,
    pub ready: NaiveDateTime,
    pub release: NaiveDateTime,
}

impl Leg {
    pub fn new(
        route: impl Into<String>,
        sequence: u32,
        origin: impl Into<String>,
        destination: impl Into<String>,
        ready: NaiveDateTime,
        release: NaiveDateTime,
    ) -> Self {
        Self {
            route: route.into(),
            sequence,
            origin: origin.into(),
            destination: destination.into(),
            ready,
            release,
        }
    }

    /// `(route, sequence)` identity of this leg.
    pub fn key(&self) -> (&str, u32) {
        (self.route.as_str(), self.sequence)
    }

    /// Whether one trailer can serve `self` and then `next` back to back.
    ///
    /// Requires the same hand-over location and a release strictly before
    /// the next ready time.
    pub fn can_precede(&self, next: &Leg) -> bool {
        self.destination == next.origin && self.release < next.ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_from_fields_parses_concatenated_format() {
        let stop = Stop::from_fields("12", 3, "60601", "2024-03-02", "14:00:00").unwrap();
        assert_eq!(stop.arrival, Some(at(2, 14)));
        assert_eq!(stop.route, "12");
        assert_eq!(stop.location, "60601");
    }

    #[test]
    fn test_from_fields_blank_is_missing() {
        let stop = Stop::from_fields("12", 3, "60601", "", "14:00:00").unwrap();
        assert!(stop.arrival.is_none());
    }

    #[test]
    fn test_from_fields_garbage_fails() {
        let err = Stop::from_fields("12", 3, "60601", "03/02/2024", "14:00:00").unwrap_err();
        assert!(matches!(err, SolveError::MalformedInput(_)));
    }

    #[test]
    fn test_can_precede_requires_location_match() {
        let a = Leg::new("1", 0, "A", "B", at(1, 0), at(1, 5));
        let b = Leg::new("2", 0, "B", "C", at(1, 10), at(1, 20));
        let c = Leg::new("3", 0, "C", "D", at(1, 10), at(1, 20));
        assert!(a.can_precede(&b));
        assert!(!a.can_precede(&c));
    }

    #[test]
    fn test_can_precede_is_strict() {
        let a = Leg::new("1", 0, "A", "B", at(1, 0), at(1, 5));
        let b = Leg::new("2", 0, "B", "C", at(1, 5), at(1, 20));
        assert!(!a.can_precede(&b));
    }
}

use chrono::Duration;
use std::fmt::Display;

/// a GTFS service-day clock time in non-negative seconds after midnight.
/// hours may exceed 23 for trips that run past the end of the service day,
/// which is why these are not [`chrono::NaiveTime`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServiceTime {
    seconds: i64,
}

impl ServiceTime {
    pub fn from_hms(hours: i64, minutes: i64, seconds: i64) -> ServiceTime {
        ServiceTime {
            seconds: hours * 3600 + minutes * 60 + seconds,
        }
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// parse an `H:MM:SS` or `HH:MM:SS` time string. hour values of 24 and
    /// above are accepted as-is per the GTFS time field type.
    pub fn parse(text: &str) -> Result<ServiceTime, String> {
        let parts: Vec<&str> = text.split(':').collect();
        let [hours, minutes, seconds] = parts.as_slice() else {
            return Err(format!("invalid GTFS time '{text}'"));
        };
        let h: i64 = hours
            .parse()
            .map_err(|_| format!("invalid hours in GTFS time '{text}'"))?;
        let m: i64 = minutes
            .parse()
            .map_err(|_| format!("invalid minutes in GTFS time '{text}'"))?;
        let s: i64 = seconds
            .parse()
            .map_err(|_| format!("invalid seconds in GTFS time '{text}'"))?;
        if h < 0 || !(0..60).contains(&m) || !(0..60).contains(&s) {
            return Err(format!("GTFS time out of range '{text}'"));
        }
        Ok(ServiceTime::from_hms(h, m, s))
    }

    /// shift this time by a signed duration. times cannot move before the
    /// start of the service day.
    pub fn offset(&self, duration: Duration) -> Result<ServiceTime, String> {
        let shifted = self.seconds + duration.num_seconds();
        if shifted < 0 {
            return Err(format!(
                "time offset of {}s moves {self} before the start of the service day",
                duration.num_seconds()
            ));
        }
        Ok(ServiceTime { seconds: shifted })
    }
}

impl Display for ServiceTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let h = self.seconds / 3600;
        let m = (self.seconds % 3600) / 60;
        let s = self.seconds % 60;
        write!(f, "{h:02}:{m:02}:{s:02}")
    }
}

#[cfg(test)]
mod test {
    use super::ServiceTime;
    use chrono::Duration;

    #[test]
    fn test_parses_and_formats_padded() {
        let t = ServiceTime::parse("8:05:00").expect("should parse");
        assert_eq!(t.to_string(), "08:05:00");
    }

    #[test]
    fn test_accepts_hours_past_midnight() {
        let t = ServiceTime::parse("25:30:00").expect("should parse");
        assert_eq!(t.seconds(), 25 * 3600 + 30 * 60);
        assert_eq!(t.to_string(), "25:30:00");
    }

    #[test]
    fn test_rejects_malformed_times() {
        assert!(ServiceTime::parse("8:05").is_err());
        assert!(ServiceTime::parse("eight:00:00").is_err());
        assert!(ServiceTime::parse("08:61:00").is_err());
    }

    #[test]
    fn test_offset_adds_minutes() {
        let t = ServiceTime::parse("08:05:00").expect("should parse");
        let shifted = t.offset(Duration::minutes(5)).expect("should shift");
        assert_eq!(shifted.to_string(), "08:10:00");
    }

    #[test]
    fn test_offset_cannot_precede_service_day() {
        let t = ServiceTime::parse("00:10:00").expect("should parse");
        assert!(t.offset(Duration::minutes(-11)).is_err());
    }
}

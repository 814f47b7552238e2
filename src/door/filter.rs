//! Beamline and date-window selection of DOOR sessions.
//!
//! Used for proposals such as commissioning that collect sessions from
//! every year, where only one beamline and period should be synchronised.

use chrono::NaiveDate;

use crate::door::models::Session;
use crate::error::TransformError;

pub const FILTER_DATE_FORMAT: &str = "%Y-%m-%d";

/// Restricts a proposal's sessions to one beamline and a date window.
///
/// Commissioning proposals collect sessions from every beamline and year,
/// so syncing one of them needs both bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFilter {
    pub beamline: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SessionFilter {
    pub fn new(beamline: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            beamline: beamline.into(),
            start,
            end,
        }
    }

    /// Parse `YYYY-MM-DD` bounds.
    pub fn parse(beamline: &str, start: &str, end: &str) -> Result<Self, TransformError> {
        Ok(Self::new(beamline, parse_date(start)?, parse_date(end)?))
    }

    /// Beamline matches case-insensitively and the whole session, by
    /// calendar date, lies inside the inclusive window.
    pub fn matches(&self, session: &Session) -> bool {
        session.beamline_name.eq_ignore_ascii_case(&self.beamline)
            && session.start_date.date() >= self.start
            && session.end_date.date() <= self.end
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, TransformError> {
    NaiveDate::parse_from_str(value.trim(), FILTER_DATE_FORMAT).map_err(|_| {
        TransformError::InvalidDate {
            value: value.to_string(),
            format: FILTER_DATE_FORMAT,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(beamline: &str, start: &str, end: &str) -> Session {
        serde_json::from_value(json!({
            "expSessionPk": 1,
            "beamlineName": beamline,
            "startDate": start,
            "endDate": end,
        }))
        .unwrap()
    }

    #[test]
    fn test_window_excludes_session_ending_after_range() {
        let filter = SessionFilter::parse("P11", "2022-01-01", "2022-12-31").unwrap();
        let first = session("P11", "2022-01-01 08:00:00", "2022-06-01 08:00:00");
        let second = session("P11", "2022-07-01 08:00:00", "2023-01-01 08:00:00");

        assert!(filter.matches(&first));
        assert!(!filter.matches(&second));
    }

    #[test]
    fn test_bounds_are_inclusive_and_ignore_time_of_day() {
        let filter = SessionFilter::parse("P11", "2022-03-01", "2022-03-02").unwrap();
        let late = session("P11", "2022-03-01 23:59:59", "2022-03-02 23:59:59");
        assert!(filter.matches(&late));
    }

    #[test]
    fn test_beamline_is_case_insensitive() {
        let filter = SessionFilter::parse("p11", "2022-01-01", "2022-12-31").unwrap();
        assert!(filter.matches(&session("P11", "2022-02-01 08:00:00", "2022-02-02 08:00:00")));
        assert!(!filter.matches(&session("P13", "2022-02-01 08:00:00", "2022-02-02 08:00:00")));
    }

    #[test]
    fn test_invalid_bound() {
        let err = SessionFilter::parse("P11", "2022/01/01", "2022-12-31").unwrap_err();
        assert!(matches!(err, TransformError::InvalidDate { .. }));
    }
}

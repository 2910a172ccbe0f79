//! Weekday numbering bridge.
//!
//! Forms and calendar widgets number days Sunday=0..Saturday=6. The API
//! persists Monday=0..Sunday=6. Every recurrence crossing that boundary goes
//! through `frontend_to_backend` / `backend_to_frontend`; the two newtypes
//! keep the conventions from being mixed up anywhere else.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("weekday {0} out of range (expected 0..=6)")]
pub struct WeekdayError(pub u8);

/// Convert a Sunday-first day number to the Monday-first one.
pub fn frontend_to_backend(day: u8) -> Result<u8, WeekdayError> {
    if day > 6 {
        return Err(WeekdayError(day));
    }
    Ok((day + 6) % 7)
}

/// Convert a Monday-first day number to the Sunday-first one.
pub fn backend_to_frontend(day: u8) -> Result<u8, WeekdayError> {
    if day > 6 {
        return Err(WeekdayError(day));
    }
    Ok((day + 1) % 7)
}

/// Day number in the form convention (Sunday = 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SundayFirst(u8);

/// Day number in the persisted convention (Monday = 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct MondayFirst(u8);

impl SundayFirst {
    pub fn new(day: u8) -> Result<Self, WeekdayError> {
        if day > 6 {
            return Err(WeekdayError(day));
        }
        Ok(SundayFirst(day))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn to_backend(self) -> MondayFirst {
        // in range by construction
        MondayFirst(frontend_to_backend(self.0).unwrap_or_default())
    }

    /// Parse a day name (`mon`, `Tuesday`) or a Sunday-first number.
    pub fn parse(s: &str) -> Option<SundayFirst> {
        let s = s.trim().to_lowercase();
        if let Ok(n) = s.parse::<u8>() {
            return SundayFirst::new(n).ok();
        }
        const NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];
        let short: String = s.chars().take(3).collect();
        NAMES
            .iter()
            .position(|n| *n == short)
            .map(|i| SundayFirst(i as u8))
    }

    pub fn short_name(self) -> &'static str {
        ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"][self.0 as usize]
    }
}

impl MondayFirst {
    pub fn new(day: u8) -> Result<Self, WeekdayError> {
        if day > 6 {
            return Err(WeekdayError(day));
        }
        Ok(MondayFirst(day))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn to_frontend(self) -> SundayFirst {
        SundayFirst(backend_to_frontend(self.0).unwrap_or_default())
    }
}

impl TryFrom<u8> for MondayFirst {
    type Error = WeekdayError;

    fn try_from(day: u8) -> Result<Self, Self::Error> {
        MondayFirst::new(day)
    }
}

impl From<MondayFirst> for u8 {
    fn from(day: MondayFirst) -> u8 {
        day.0
    }
}

impl From<chrono::Weekday> for SundayFirst {
    fn from(day: chrono::Weekday) -> Self {
        SundayFirst(day.num_days_from_sunday() as u8)
    }
}

impl From<chrono::Weekday> for MondayFirst {
    fn from(day: chrono::Weekday) -> Self {
        MondayFirst(day.num_days_from_monday() as u8)
    }
}

/// Convert a set of form days for persistence: sorted, de-duplicated.
pub fn days_to_backend(days: &[SundayFirst]) -> Vec<MondayFirst> {
    let mut out: Vec<MondayFirst> = days.iter().map(|d| d.to_backend()).collect();
    out.sort();
    out.dedup();
    out
}

/// Convert persisted days for display in a form: sorted Sunday-first.
pub fn days_to_frontend(days: &[MondayFirst]) -> Vec<SundayFirst> {
    let mut out: Vec<SundayFirst> = days.iter().map(|d| d.to_frontend()).collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_pairs() {
        // Sunday
        assert_eq!(frontend_to_backend(0), Ok(6));
        // Monday
        assert_eq!(frontend_to_backend(1), Ok(0));
        // Saturday
        assert_eq!(frontend_to_backend(6), Ok(5));
        assert_eq!(backend_to_frontend(6), Ok(0));
        assert_eq!(backend_to_frontend(0), Ok(1));
    }

    #[test]
    fn test_newtypes_share_the_conversion() {
        for day in 0..7u8 {
            let form = SundayFirst::new(day).unwrap();
            assert_eq!(form.to_backend().get(), frontend_to_backend(day).unwrap());
            let stored = MondayFirst::new(day).unwrap();
            assert_eq!(stored.to_frontend().get(), backend_to_frontend(day).unwrap());
        }
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert_eq!(frontend_to_backend(7), Err(WeekdayError(7)));
        assert_eq!(backend_to_frontend(200), Err(WeekdayError(200)));
        assert!(MondayFirst::try_from(7).is_err());
    }

    #[test]
    fn test_mon_wed_fri_round_trip() {
        let form: Vec<SundayFirst> = [1, 3, 5]
            .into_iter()
            .map(|d| SundayFirst::new(d).unwrap())
            .collect();
        let stored = days_to_backend(&form);
        let raw: Vec<u8> = stored.iter().map(|d| d.get()).collect();
        assert_eq!(raw, vec![0, 2, 4]);

        let back: Vec<u8> = days_to_frontend(&stored).iter().map(|d| d.get()).collect();
        assert_eq!(back, vec![1, 3, 5]);
    }

    #[test]
    fn test_sunday_sorts_last_in_backend() {
        let form = vec![SundayFirst::new(0).unwrap(), SundayFirst::new(1).unwrap()];
        let stored: Vec<u8> = days_to_backend(&form).iter().map(|d| d.get()).collect();
        assert_eq!(stored, vec![0, 6]);
    }

    #[test]
    fn test_parse_day_names() {
        assert_eq!(SundayFirst::parse("mon").map(|d| d.get()), Some(1));
        assert_eq!(SundayFirst::parse("Saturday").map(|d| d.get()), Some(6));
        assert_eq!(SundayFirst::parse("0").map(|d| d.get()), Some(0));
        assert_eq!(SundayFirst::parse("funday"), None);
        assert_eq!(SundayFirst::parse("9"), None);
    }

    #[test]
    fn test_chrono_weekday_agrees() {
        for day in [
            chrono::Weekday::Mon,
            chrono::Weekday::Thu,
            chrono::Weekday::Sun,
        ] {
            assert_eq!(SundayFirst::from(day).to_backend(), MondayFirst::from(day));
        }
    }

    #[test]
    fn test_monday_first_serializes_as_number() {
        let days = vec![MondayFirst::new(0).unwrap(), MondayFirst::new(4).unwrap()];
        assert_eq!(serde_json::to_string(&days).unwrap(), "[0,4]");
        let bad: Result<Vec<MondayFirst>, _> = serde_json::from_str("[3,9]");
        assert!(bad.is_err());
    }

    proptest! {
        #[test]
        fn prop_backend_round_trip(d in 0u8..7) {
            let f = backend_to_frontend(d).unwrap();
            prop_assert_eq!(frontend_to_backend(f).unwrap(), d);
        }

        #[test]
        fn prop_frontend_round_trip(d in 0u8..7) {
            let b = frontend_to_backend(d).unwrap();
            prop_assert_eq!(backend_to_frontend(b).unwrap(), d);
        }

        #[test]
        fn prop_conversion_is_bijection(a in 0u8..7, b in 0u8..7) {
            prop_assume!(a != b);
            prop_assert_ne!(frontend_to_backend(a).unwrap(), frontend_to_backend(b).unwrap());
        }
    }
}

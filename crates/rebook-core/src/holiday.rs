//! Holiday predicates consumed by occurrence generation.

use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Answers whether a civil date is a holiday. Sourcing the data is up to the caller.
pub trait HolidayCalendar: Send + Sync {
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

/// A calendar with no holidays.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHolidays;

impl HolidayCalendar for NoHolidays {
    fn is_holiday(&self, _date: NaiveDate) -> bool {
        false
    }
}

/// A fixed set of holiday dates, typically loaded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidaySet {
    dates: BTreeSet<NaiveDate>,
}

impl HolidaySet {
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

impl HolidayCalendar for HolidaySet {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }
}

impl<F> HolidayCalendar for F
where
    F: Fn(NaiveDate) -> bool + Send + Sync,
{
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holiday_set() {
        let christmas = NaiveDate::from_ymd_opt(2025, 12, 25).unwrap();
        let set = HolidaySet::new([christmas, christmas]);
        assert_eq!(set.len(), 1);
        assert!(set.is_holiday(christmas));
        assert!(!set.is_holiday(christmas.succ_opt().unwrap()));
    }

    #[test]
    fn test_closure_calendar() {
        let first_of_month = |date: NaiveDate| chrono::Datelike::day(&date) == 1;
        assert!(first_of_month.is_holiday(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()));
        assert!(!NoHolidays.is_holiday(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()));
    }
}

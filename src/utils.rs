use chrono::{Months, NaiveDate};

/// Round to two decimal places, the precision used by every report column.
/// Halves go to the even digit, so published reports keep their values.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Round to one decimal place, halves to even
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// Lookback window for price history requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    OneYear,
    ThreeYears,
}

impl Lookback {
    pub fn years(&self) -> u32 {
        match self {
            Lookback::OneYear => 1,
            Lookback::ThreeYears => 3,
        }
    }

    /// First date of the window ending on `end`
    pub fn start_date(&self, end: NaiveDate) -> NaiveDate {
        end.checked_sub_months(Months::new(12 * self.years()))
            .unwrap_or(NaiveDate::MIN)
    }
}

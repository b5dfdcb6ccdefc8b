use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: i128 = 86_400;
/// Average Gregorian month (365.2425 days / 12) in seconds.
const AVG_SECONDS_PER_MONTH: i128 = 2_629_746;
const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Calendar-aware duration: months and days are kept apart from the exact
/// seconds part because their length depends on the date they are applied to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct DurationValue {
    months: i64,
    days: i64,
    seconds: i64,
    nanos: i32,
}

impl DurationValue {
    /// Builds a duration, carrying whole seconds out of `nanos`.
    pub fn new(months: i64, days: i64, seconds: i64, nanos: i64) -> Self {
        let carry = nanos.div_euclid(1_000_000_000);
        let nanos = nanos.rem_euclid(1_000_000_000) as i32;
        Self {
            months,
            days,
            seconds: seconds.saturating_add(carry),
            nanos,
        }
    }

    /// Duration of whole months.
    pub fn months(months: i64) -> Self {
        Self::new(months, 0, 0, 0)
    }

    /// Duration of whole days.
    pub fn days(days: i64) -> Self {
        Self::new(0, days, 0, 0)
    }

    /// Duration of whole seconds.
    pub fn seconds(seconds: i64) -> Self {
        Self::new(0, 0, seconds, 0)
    }

    /// Month component.
    pub fn month_part(&self) -> i64 {
        self.months
    }

    /// Day component.
    pub fn day_part(&self) -> i64 {
        self.days
    }

    /// Seconds component.
    pub fn second_part(&self) -> i64 {
        self.seconds
    }

    /// Sub-second component, always in `0..1_000_000_000`.
    pub fn nano_part(&self) -> i32 {
        self.nanos
    }

    fn approximate_nanos(&self) -> i128 {
        let seconds = self.months as i128 * AVG_SECONDS_PER_MONTH
            + self.days as i128 * SECONDS_PER_DAY
            + self.seconds as i128;
        seconds * NANOS_PER_SECOND + self.nanos as i128
    }

    /// Orders by approximate length, breaking ties component-wise so that
    /// only identical durations compare equal.
    pub fn compare(&self, other: &DurationValue) -> Ordering {
        self.approximate_nanos()
            .cmp(&other.approximate_nanos())
            .then(self.months.cmp(&other.months))
            .then(self.days.cmp(&other.days))
            .then(self.seconds.cmp(&other.seconds))
            .then(self.nanos.cmp(&other.nanos))
    }
}

impl fmt::Display for DurationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P{}M{}DT{}.{:09}S",
            self.months, self.days, self.seconds, self.nanos
        )
    }
}

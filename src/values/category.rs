use serde::{Deserialize, Serialize};

/// Coarse grouping of values that compare with each other.
///
/// Declaration order is the cross-category order of the global value
/// comparator: arrays sort before scalars and [`ValueCategory::NoValue`] sorts
/// last.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub enum ValueCategory {
    /// Arrays of spatial points.
    GeometryArray,
    /// Arrays of zoned date-times.
    ZonedDateTimeArray,
    /// Arrays of local date-times.
    LocalDateTimeArray,
    /// Arrays of dates.
    DateArray,
    /// Arrays of local times.
    LocalTimeArray,
    /// Arrays of durations.
    DurationArray,
    /// Arrays of text.
    TextArray,
    /// Arrays of booleans.
    BooleanArray,
    /// Arrays of integral or floating numbers.
    NumberArray,
    /// Spatial points.
    Geometry,
    /// Date-times with an offset.
    ZonedDateTime,
    /// Date-times without an offset.
    LocalDateTime,
    /// Calendar dates.
    Date,
    /// Times of day without an offset.
    LocalTime,
    /// Durations.
    Duration,
    /// Text.
    Text,
    /// Booleans.
    Boolean,
    /// Integral or floating numbers.
    Number,
    /// Absence of a value.
    NoValue,
}

impl ValueCategory {
    /// Returns `true` for array categories.
    pub fn is_array(self) -> bool {
        self < ValueCategory::Geometry
    }

    /// Returns `true` for date, time, date-time and duration categories.
    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            ValueCategory::ZonedDateTime
                | ValueCategory::LocalDateTime
                | ValueCategory::Date
                | ValueCategory::LocalTime
                | ValueCategory::Duration
        )
    }

    /// Array category holding elements of this scalar category.
    pub fn array_of(self) -> Option<ValueCategory> {
        Some(match self {
            ValueCategory::Geometry => ValueCategory::GeometryArray,
            ValueCategory::ZonedDateTime => ValueCategory::ZonedDateTimeArray,
            ValueCategory::LocalDateTime => ValueCategory::LocalDateTimeArray,
            ValueCategory::Date => ValueCategory::DateArray,
            ValueCategory::LocalTime => ValueCategory::LocalTimeArray,
            ValueCategory::Duration => ValueCategory::DurationArray,
            ValueCategory::Text => ValueCategory::TextArray,
            ValueCategory::Boolean => ValueCategory::BooleanArray,
            ValueCategory::Number => ValueCategory::NumberArray,
            _ => return None,
        })
    }

    /// Element category of an array category.
    pub fn element(self) -> Option<ValueCategory> {
        Some(match self {
            ValueCategory::GeometryArray => ValueCategory::Geometry,
            ValueCategory::ZonedDateTimeArray => ValueCategory::ZonedDateTime,
            ValueCategory::LocalDateTimeArray => ValueCategory::LocalDateTime,
            ValueCategory::DateArray => ValueCategory::Date,
            ValueCategory::LocalTimeArray => ValueCategory::LocalTime,
            ValueCategory::DurationArray => ValueCategory::Duration,
            ValueCategory::TextArray => ValueCategory::Text,
            ValueCategory::BooleanArray => ValueCategory::Boolean,
            ValueCategory::NumberArray => ValueCategory::Number,
            _ => return None,
        })
    }
}

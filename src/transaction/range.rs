//! Inclusive date ranges for bounding which transactions a rule is run over.

use serde::Serialize;
use time::Date;

use crate::Error;

/// An inclusive range of dates where `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    /// Create a date range covering `start` to `end`, both inclusive.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidDateRange] if `start` is after `end`.
    pub fn new(start: Date, end: Date) -> Result<Self, Error> {
        if start > end {
            return Err(Error::InvalidDateRange(format!(
                "the start date {start} is after the end date {end}"
            )));
        }

        Ok(Self { start, end })
    }

    /// Build an optional range from optional bounds, e.g. from query parameters.
    ///
    /// Returns `None` when neither bound is given.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidDateRange] if only one bound is given or if
    /// `start` is after `end`.
    pub fn from_bounds(start: Option<Date>, end: Option<Date>) -> Result<Option<Self>, Error> {
        match (start, end) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => Self::new(start, end).map(Some),
            (Some(_), None) => Err(Error::InvalidDateRange(
                "a start date was given without an end date".to_owned(),
            )),
            (None, Some(_)) => Err(Error::InvalidDateRange(
                "an end date was given without a start date".to_owned(),
            )),
        }
    }

    /// The first day in the range.
    pub fn start(&self) -> Date {
        self.start
    }

    /// The last day in the range.
    pub fn end(&self) -> Date {
        self.end
    }

    /// Whether `date` falls inside the range.
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

#![forbid(unsafe_code)]

//! Reversible date setters.
//!
//! A date is a single point in time, but its setters address interacting
//! components: setting the month can roll the day over into the next month.
//! Capturing only the field being set is therefore not enough to undo; every
//! setter captures the full component tuple ([`DateParts`]) and undo replays
//! the full-year setter and then the hours setter with the captured values.
//! The setters work in whole milliseconds; any finer precision the date
//! carried is captured alongside and put back after the replay.
//!
//! Months are zero-based and every component may be out of range, in which
//! case it overflows into the next larger unit:
//!
//! ```text
//! 2020-01-31, set month 1 (February)  ->  2020-03-02
//! 2020-01-01, set hours 25            ->  2020-01-02 01:00
//! ```

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use tracing::trace;

use crate::action::{Action, CallbackAction, Operation, SetViaFunction};
use crate::error::{ActionError, ActionResult};
use crate::value::{DateRef, Value};

/// Every getter-observable component of a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParts {
    pub year: i64,
    /// Zero-based month.
    pub month: i64,
    /// One-based day of month.
    pub day: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub milliseconds: i64,
    /// Nanoseconds below the millisecond.
    pub sub_millis: i64,
}

impl DateParts {
    /// Components of `at`.
    #[must_use]
    pub fn of(at: &NaiveDateTime) -> Self {
        // Leap seconds report 1_000_000_000 and up.
        let nanos = at.nanosecond().min(999_999_999);
        Self {
            year: i64::from(at.year()),
            month: i64::from(at.month0()),
            day: i64::from(at.day()),
            hours: i64::from(at.hour()),
            minutes: i64::from(at.minute()),
            seconds: i64::from(at.second()),
            milliseconds: i64::from(nanos / 1_000_000),
            sub_millis: i64::from(nanos % 1_000_000),
        }
    }

    /// Assign whole milliseconds, dropping the finer part. `None` keeps both.
    fn set_milliseconds(&mut self, milliseconds: Option<i64>) {
        if let Some(milliseconds) = milliseconds {
            self.milliseconds = milliseconds;
            self.sub_millis = 0;
        }
    }

    /// Point in time for these components, with overflow rollover.
    ///
    /// Returns `None` when the result is not representable.
    #[must_use]
    pub fn compose(&self) -> Option<NaiveDateTime> {
        let year = self.year.checked_add(self.month.div_euclid(12))?;
        let month = u32::try_from(self.month.rem_euclid(12)).ok()? + 1;
        let first = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, 1)?;
        let days = TimeDelta::try_days(self.day.checked_sub(1)?)?;
        let millis = self
            .hours
            .checked_mul(3_600_000)?
            .checked_add(self.minutes.checked_mul(60_000)?)?
            .checked_add(self.seconds.checked_mul(1_000)?)?
            .checked_add(self.milliseconds)?;
        first
            .and_hms_opt(0, 0, 0)?
            .checked_add_signed(days)?
            .checked_add_signed(TimeDelta::try_milliseconds(millis)?)?
            .checked_add_signed(TimeDelta::nanoseconds(self.sub_millis))
    }
}

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn epoch_millis(at: &NaiveDateTime) -> i64 {
    at.and_utc().timestamp_millis()
}

/// Point in time `millis` after the Unix epoch, if representable.
#[must_use]
pub fn from_epoch_millis(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|at| at.naive_utc())
}

/// A date setter call. Optional trailing components keep their current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMutation {
    FullYear {
        year: i64,
        month: Option<i64>,
        day: Option<i64>,
    },
    Month {
        month: i64,
        day: Option<i64>,
    },
    Day(i64),
    Hours {
        hours: i64,
        minutes: Option<i64>,
        seconds: Option<i64>,
        milliseconds: Option<i64>,
    },
    Minutes {
        minutes: i64,
        seconds: Option<i64>,
        milliseconds: Option<i64>,
    },
    Seconds {
        seconds: i64,
        milliseconds: Option<i64>,
    },
    Milliseconds(i64),
    /// Replace the whole point in time with epoch milliseconds.
    Time(i64),
}

impl DateMutation {
    /// Setter name, as used in descriptions and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FullYear { .. } => "set_full_year",
            Self::Month { .. } => "set_month",
            Self::Day(_) => "set_date",
            Self::Hours { .. } => "set_hours",
            Self::Minutes { .. } => "set_minutes",
            Self::Seconds { .. } => "set_seconds",
            Self::Milliseconds(_) => "set_milliseconds",
            Self::Time(_) => "set_time",
        }
    }

    /// Point in time after applying this setter to `at`.
    pub fn resolve(&self, at: &NaiveDateTime) -> ActionResult<NaiveDateTime> {
        let mut parts = DateParts::of(at);
        let resolved = match *self {
            Self::Time(millis) => from_epoch_millis(millis),
            Self::FullYear { year, month, day } => {
                parts.year = year;
                parts.month = month.unwrap_or(parts.month);
                parts.day = day.unwrap_or(parts.day);
                parts.compose()
            }
            Self::Month { month, day } => {
                parts.month = month;
                parts.day = day.unwrap_or(parts.day);
                parts.compose()
            }
            Self::Day(day) => {
                parts.day = day;
                parts.compose()
            }
            Self::Hours {
                hours,
                minutes,
                seconds,
                milliseconds,
            } => {
                parts.hours = hours;
                parts.minutes = minutes.unwrap_or(parts.minutes);
                parts.seconds = seconds.unwrap_or(parts.seconds);
                parts.set_milliseconds(milliseconds);
                parts.compose()
            }
            Self::Minutes {
                minutes,
                seconds,
                milliseconds,
            } => {
                parts.minutes = minutes;
                parts.seconds = seconds.unwrap_or(parts.seconds);
                parts.set_milliseconds(milliseconds);
                parts.compose()
            }
            Self::Seconds {
                seconds,
                milliseconds,
            } => {
                parts.seconds = seconds;
                parts.set_milliseconds(milliseconds);
                parts.compose()
            }
            Self::Milliseconds(milliseconds) => {
                parts.set_milliseconds(Some(milliseconds));
                parts.compose()
            }
        };
        resolved.ok_or(ActionError::DateOutOfRange {
            setter: self.name(),
        })
    }

    /// Apply the setter to `target`; returns the new epoch milliseconds.
    ///
    /// The date is left untouched when the result is out of range.
    pub fn perform(&self, target: &DateRef) -> ActionResult<Value> {
        let next = self.resolve(&target.borrow())?;
        *target.borrow_mut() = next;
        Ok(Value::from(epoch_millis(&next)))
    }

    #[must_use]
    pub fn into_action(self, target: &DateRef) -> Box<dyn Action> {
        Box::new(date_field_action(target, self))
    }
}

/// Replay the full-year and hours setters with `parts`.
fn restore_parts(target: &DateRef, parts: &DateParts) -> ActionResult {
    DateMutation::FullYear {
        year: parts.year,
        month: Some(parts.month),
        day: Some(parts.day),
    }
    .perform(target)?;
    DateMutation::Hours {
        hours: parts.hours,
        minutes: Some(parts.minutes),
        seconds: Some(parts.seconds),
        milliseconds: Some(parts.milliseconds),
    }
    .perform(target)?;
    if parts.sub_millis != 0 {
        let mut at = target.borrow_mut();
        *at = at
            .checked_add_signed(TimeDelta::nanoseconds(parts.sub_millis))
            .ok_or(ActionError::DateOutOfRange { setter: "set_hours" })?;
        trace!(nanos = parts.sub_millis, "restored sub-millisecond precision");
    }
    Ok(())
}

/// Reversible action for one date setter call.
#[must_use]
pub fn date_field_action(
    target: &DateRef,
    mutation: DateMutation,
) -> CallbackAction<SetViaFunction<DateParts>> {
    let (get, set, restore) = (target.clone(), target.clone(), target.clone());
    SetViaFunction::new(
        mutation.name(),
        move || DateParts::of(&get.borrow()),
        move || mutation.perform(&set),
        move |parts: &DateParts| restore_parts(&restore, parts),
    )
    .into_action()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32, ms: u32) -> DateRef {
        let naive = NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_milli_opt(h, mi, s, ms))
            .expect("valid date");
        DateRef::new(naive)
    }

    fn text(date: &DateRef) -> String {
        crate::value::format_date(&date.borrow())
    }

    #[test]
    fn test_month_rollover_and_undo() {
        let date = at(2020, 1, 31, 10, 30, 0, 0);
        let mut action = date_field_action(&date, DateMutation::Month { month: 1, day: None });
        action.apply().unwrap();
        assert_eq!(text(&date), "2020-03-02T10:30:00.000Z");
        action.undo().unwrap();
        assert_eq!(text(&date), "2020-01-31T10:30:00.000Z");
        assert_eq!(action.description(), "set_month");
    }

    #[test]
    fn test_hours_overflow_into_next_day() {
        let date = at(2020, 1, 1, 0, 0, 0, 0);
        let mut action = DateMutation::Hours {
            hours: 25,
            minutes: None,
            seconds: None,
            milliseconds: None,
        }
        .into_action(&date);
        action.apply().unwrap();
        assert_eq!(text(&date), "2020-01-02T01:00:00.000Z");
        action.undo().unwrap();
        assert_eq!(text(&date), "2020-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_negative_components_borrow() {
        let date = at(2020, 3, 1, 0, 0, 0, 0);
        DateMutation::Day(0).perform(&date).unwrap();
        assert_eq!(text(&date), "2020-02-29T00:00:00.000Z");
        DateMutation::Month { month: -1, day: None }.perform(&date).unwrap();
        assert_eq!(text(&date), "2019-12-29T00:00:00.000Z");
    }

    #[test]
    fn test_set_time_returns_epoch_millis() {
        let date = at(2000, 1, 1, 0, 0, 0, 0);
        let mut action = DateMutation::Time(86_400_000).into_action(&date);
        assert_eq!(action.apply().unwrap(), Value::from(86_400_000i64));
        assert_eq!(text(&date), "1970-01-02T00:00:00.000Z");
        action.undo().unwrap();
        action.redo().unwrap();
        assert_eq!(text(&date), "1970-01-02T00:00:00.000Z");
    }

    #[test]
    fn test_milliseconds_and_seconds() {
        let date = at(2021, 6, 15, 12, 0, 59, 500);
        let mut action = DateMutation::Milliseconds(1500).into_action(&date);
        action.apply().unwrap();
        assert_eq!(text(&date), "2021-06-15T12:01:00.500Z");
        action.undo().unwrap();
        assert_eq!(text(&date), "2021-06-15T12:00:59.500Z");
    }

    #[test]
    fn test_out_of_range_leaves_date_untouched() {
        let date = at(2020, 1, 1, 0, 0, 0, 0);
        let mut action = DateMutation::FullYear {
            year: i64::MAX,
            month: None,
            day: None,
        }
        .into_action(&date);
        let err = action.apply().unwrap_err();
        assert_eq!(
            err,
            ActionError::DateOutOfRange {
                setter: "set_full_year"
            }
        );
        assert_eq!(text(&date), "2020-01-01T00:00:00.000Z");
        // Never applied, so undo must not replay anything.
        action.undo().unwrap();
        assert_eq!(text(&date), "2020-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_undo_keeps_sub_millisecond_precision() {
        let original = NaiveDate::from_ymd_opt(2020, 1, 31)
            .and_then(|date| date.and_hms_nano_opt(10, 30, 0, 123_456_789))
            .expect("valid date");
        let date = DateRef::new(original);
        let mut action = DateMutation::Month { month: 1, day: None }.into_action(&date);
        action.apply().unwrap();
        assert_eq!(date.borrow().nanosecond(), 123_456_789);
        action.undo().unwrap();
        assert_eq!(*date.borrow(), original);
        action.redo().unwrap();
        action.undo().unwrap();
        assert_eq!(*date.borrow(), original);
    }

    #[test]
    fn test_millisecond_setter_drops_finer_precision() {
        let original = NaiveDate::from_ymd_opt(2020, 1, 1)
            .and_then(|date| date.and_hms_nano_opt(0, 0, 0, 7_654_321))
            .expect("valid date");
        let date = DateRef::new(original);
        let mut action = DateMutation::Milliseconds(5).into_action(&date);
        action.apply().unwrap();
        assert_eq!(date.borrow().nanosecond(), 5_000_000);
        action.undo().unwrap();
        assert_eq!(*date.borrow(), original);
    }

    #[test]
    fn test_parts_roundtrip() {
        let date = at(1999, 12, 31, 23, 59, 58, 999);
        let parts = DateParts::of(&date.borrow());
        assert_eq!(parts.month, 11);
        assert_eq!(parts.compose(), Some(*date.borrow()));
    }
}

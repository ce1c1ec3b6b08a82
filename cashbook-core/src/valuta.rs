use std::ops::{Add, Sub};

use chrono::{Duration, NaiveDate};

use crate::error::LedgerError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// The accounting period, a closed range of calendar dates.
///
/// All value dates of a run are expressed relative to the period start;
/// the period is the only place that knows how to go back and forth
/// between a `Valuta` and a calendar date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Period, LedgerError> {
        if end < start {
            return Err(LedgerError::InvalidPeriod {
                start: start.format(DATE_FORMAT).to_string(),
                end: end.format(DATE_FORMAT).to_string(),
            });
        }
        Ok(Period { start, end })
    }

    /// Builds a period from two `yyyy-MM-dd` strings.
    pub fn from_dates(start: &str, end: &str) -> Result<Period, LedgerError> {
        Period::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> Valuta {
        Valuta(0)
    }

    pub fn end(&self) -> Valuta {
        self.valuta(self.end)
    }

    /// Number of days in the closed period.
    pub fn day_count(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn valuta(&self, date: NaiveDate) -> Valuta {
        Valuta((date - self.start).num_days())
    }

    /// Parses a `yyyy-MM-dd` string into a value date.
    ///
    /// The result may lie outside the period; only indexing a day
    /// container checks the bounds.
    pub fn parse_valuta(&self, s: &str) -> Result<Valuta, LedgerError> {
        Ok(self.valuta(parse_date(s)?))
    }

    pub fn date(&self, valuta: Valuta) -> NaiveDate {
        self.start + Duration::days(valuta.0)
    }

    pub fn format(&self, valuta: Valuta) -> String {
        self.date(valuta).format(DATE_FORMAT).to_string()
    }

    pub fn contains(&self, valuta: Valuta) -> bool {
        valuta.0 >= 0 && valuta <= self.end()
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, LedgerError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| LedgerError::InvalidDate(s.to_string()))
}

/// A value date: days after the period start.
///
/// Value dates are period-scoped; two `Valuta` values may only be compared
/// when they were produced by the same [`Period`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Valuta(i64);

impl Valuta {
    pub fn offset(&self) -> i64 {
        self.0
    }
}

impl Add<i64> for Valuta {
    type Output = Valuta;

    fn add(self, days: i64) -> Valuta {
        Valuta(self.0 + days)
    }
}

impl Sub<i64> for Valuta {
    type Output = Valuta;

    fn sub(self, days: i64) -> Valuta {
        Valuta(self.0 - days)
    }
}

impl Sub for Valuta {
    type Output = i64;

    /// Difference in days.
    fn sub(self, other: Valuta) -> i64 {
        self.0 - other.0
    }
}

/// A day-indexed container over the accounting period.
///
/// One fixed-size slot per calendar day; slots are created lazily on first
/// access and kept for the rest of the run.  Indexing with a date outside
/// the period is an error, not a panic.
#[derive(Debug)]
pub struct Days<T> {
    period: Period,
    slots: Vec<Option<T>>,
}

impl<T> Days<T> {
    pub fn new(period: Period) -> Days<T> {
        let mut slots = Vec::new();
        slots.resize_with(period.day_count(), || None);
        Days { period, slots }
    }

    fn index(&self, valuta: Valuta) -> Result<usize, LedgerError> {
        if valuta.0 < 0 {
            return Err(LedgerError::BeforePeriod {
                date: self.period.format(valuta),
                days: -valuta.0,
            });
        }
        let index = valuta.0 as usize;
        if index >= self.slots.len() {
            return Err(LedgerError::AfterPeriod {
                date: self.period.format(valuta),
                days: (index - self.slots.len()) as i64 + 1,
            });
        }
        Ok(index)
    }

    pub fn get(&self, valuta: Valuta) -> Result<Option<&T>, LedgerError> {
        let index = self.index(valuta)?;
        Ok(self.slots[index].as_ref())
    }

    pub fn get_mut(&mut self, valuta: Valuta) -> Result<Option<&mut T>, LedgerError> {
        let index = self.index(valuta)?;
        Ok(self.slots[index].as_mut())
    }

    /// Get-or-create: idempotent per day.
    pub fn get_or_create_with<F>(&mut self, valuta: Valuta, create: F) -> Result<&mut T, LedgerError>
    where
        F: FnOnce(Valuta) -> T,
    {
        let index = self.index(valuta)?;
        Ok(self.slots[index].get_or_insert_with(|| create(valuta)))
    }

    /// All created days in calendar order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter_map(|slot| slot.as_mut())
    }
}

//! Utilitaires calendaires : symboles de jours, fenêtres de dates, normalisation UTC.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("invalid window: start {start} is after end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },
    #[error("unknown day symbol: {0}")]
    UnknownDay(String),
    #[error("invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),
    #[error("invalid date/time (expected RFC3339 or YYYY-MM-DDTHH:MM[:SS]): {0}")]
    InvalidInstant(String),
    #[error("date out of supported range")]
    OutOfRange,
}

/// Symboles à deux lettres, indexés depuis dimanche (Su = 0).
const SYMBOLS: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];

/// Index 0..=6 d'un jour, dimanche = 0.
pub fn day_index(day: Weekday) -> u8 {
    day.num_days_from_sunday() as u8
}

pub fn day_symbol(day: Weekday) -> &'static str {
    SYMBOLS[usize::from(day_index(day))]
}

pub fn day_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

/// Accepte `Mo`, `mon`, `monday` (insensible à la casse).
pub fn parse_day_symbol(raw: &str) -> Option<Weekday> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "su" | "sun" | "sunday" => Some(Weekday::Sun),
        "mo" | "mon" | "monday" => Some(Weekday::Mon),
        "tu" | "tue" | "tuesday" => Some(Weekday::Tue),
        "we" | "wed" | "wednesday" => Some(Weekday::Wed),
        "th" | "thu" | "thursday" => Some(Weekday::Thu),
        "fr" | "fri" | "friday" => Some(Weekday::Fri),
        "sa" | "sat" | "saturday" => Some(Weekday::Sat),
        _ => None,
    }
}

/// Ensemble de jours de la semaine (bitset 7 bits, bit 0 = dimanche).
///
/// Un ensemble vide décrit un créneau ponctuel (non récurrent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    const MASK: u8 = 0b111_1111;

    pub const fn new() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(Self::MASK)
    }

    pub fn from_symbols<I, S>(symbols: I) -> Result<Self, CalendarError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for symbol in symbols {
            let symbol = symbol.as_ref();
            let day = parse_day_symbol(symbol)
                .ok_or_else(|| CalendarError::UnknownDay(symbol.to_string()))?;
            set.insert(day);
        }
        Ok(set)
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1u8 << day_index(day);
    }

    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !(1u8 << day_index(day));
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1u8 << day_index(day)) != 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Jours présents, dimanche en premier.
    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        (0..7u8)
            .filter(move |i| self.0 & (1u8 << *i) != 0)
            .filter_map(day_from_index)
    }

    pub fn symbols(self) -> Vec<&'static str> {
        self.iter().map(day_symbol).collect()
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<T: IntoIterator<Item = Weekday>>(iter: T) -> Self {
        let mut set = Self::new();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

/// Format `Mo,We,Fr` ; séparateurs `,` `;` ou espaces.
impl FromStr for WeekdaySet {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_symbols(
            s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                .filter(|chunk| !chunk.is_empty()),
        )
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbols().join(","))
    }
}

impl From<WeekdaySet> for Vec<String> {
    fn from(set: WeekdaySet) -> Self {
        set.iter().map(|d| day_symbol(d).to_string()).collect()
    }
}

impl TryFrom<Vec<String>> for WeekdaySet {
    type Error = CalendarError;

    fn try_from(symbols: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_symbols(symbols)
    }
}

/// Fenêtre de dates inclusive `[start, end]`, toujours `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawWindow> for DateWindow {
    type Error = CalendarError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CalendarError> {
        if start > end {
            return Err(CalendarError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Fenêtre d'un seul jour.
    pub fn single(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Nombre de jours, bornes incluses.
    pub fn len_days(&self) -> i64 {
        self.end.signed_duration_since(self.start).num_days() + 1
    }

    /// Parcourt chaque jour de la fenêtre, bornes incluses.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        std::iter::successors(Some(self.start), move |d| d.succ_opt().filter(|next| *next <= end))
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Date calendaire UTC d'un instant, quelle que soit sa zone d'origine.
pub fn normalize<Tz: TimeZone>(instant: &DateTime<Tz>) -> NaiveDate {
    instant.with_timezone(&Utc).date_naive()
}

/// Minuit UTC du jour donné.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    combine(date, NaiveTime::MIN)
}

/// Combine le jour de `date` et l'heure de `time`, interprétés en UTC.
pub fn combine(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&NaiveDateTime::new(date, time))
}

/// Jours de la semaine présents dans la fenêtre (les sept dès 7 jours).
pub fn enumerate_weekdays(window: &DateWindow) -> WeekdaySet {
    window.days().take(7).map(|d| d.weekday()).collect()
}

/// Semaine ISO (lundi..dimanche) contenant `date`.
pub fn week_range(date: NaiveDate) -> Result<DateWindow, CalendarError> {
    let back = u64::from(date.weekday().num_days_from_monday());
    let monday = date
        .checked_sub_days(Days::new(back))
        .ok_or(CalendarError::OutOfRange)?;
    let sunday = monday
        .checked_add_days(Days::new(6))
        .ok_or(CalendarError::OutOfRange)?;
    DateWindow::new(monday, sunday)
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, CalendarError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| CalendarError::InvalidDate(raw.to_string()))
}

/// RFC3339 (converti en UTC) ou date/heure sans zone, lue comme UTC.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, CalendarError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| CalendarError::InvalidInstant(raw.to_string()))
}

pub fn parse_time(raw: &str) -> Result<NaiveTime, CalendarError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| CalendarError::InvalidInstant(raw.to_string()))
}

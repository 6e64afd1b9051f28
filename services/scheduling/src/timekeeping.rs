//! Time quantization for billable hours
//!
//! Raw clock events arrive as either bare `HH:MM` strings or RFC 3339
//! timestamps. Clock-ins are rounded down and clock-outs rounded up to the
//! nearest quarter hour before hours are computed, so a worker is never
//! shortchanged on start time and totals land on clean shift boundaries.
//!
//! Every function here is total: bad input degrades to a placeholder or is
//! passed through unchanged. These functions sit directly under display
//! paths, where one malformed record must not take down a whole timesheet.
//! Callers that need strict validation must validate before calling.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, Timelike};
use serde::Serialize;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Which way a clock time snaps onto the quarter-hour grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingDirection {
    /// Round down, used for clock-ins
    Down,
    /// Round up, used for clock-outs
    Up,
}

/// A parsed clock value, keeping track of the shape it arrived in
#[derive(Debug, Clone, Copy)]
enum ClockValue {
    /// Bare `HH:MM` time with no date context
    Bare(NaiveTime),
    /// Full RFC 3339 timestamp with offset
    Stamped(DateTime<FixedOffset>),
}

impl ClockValue {
    fn parse(raw: &str) -> Option<Self> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ClockValue::Stamped(ts));
        }
        if let Ok(t) = NaiveTime::parse_from_str(raw, "%H:%M") {
            return Some(ClockValue::Bare(t));
        }
        None
    }

    /// Time-of-day component, used when no full date context is available.
    fn time_of_day(&self) -> NaiveTime {
        match self {
            ClockValue::Bare(t) => *t,
            ClockValue::Stamped(ts) => ts.time(),
        }
    }
}

/// One clock-in/clock-out string pair, as handed over by callers
#[derive(Debug, Clone, Default)]
pub struct ClockPair {
    pub clock_in: Option<String>,
    pub clock_out: Option<String>,
}

/// Everything the UI needs to render one time entry
///
/// The rounded times, their 12-hour display forms, and the hours total are
/// all derived from a single rounding pass, so what is shown always matches
/// what is paid.
#[derive(Debug, Clone, Serialize)]
pub struct TimeEntryDisplay {
    pub clock_in: Option<String>,
    pub clock_out: Option<String>,
    pub rounded_clock_in: Option<String>,
    pub rounded_clock_out: Option<String>,
    pub display_clock_in: String,
    pub display_clock_out: String,
    pub total_hours: f64,
}

/// Render a clock value as a 12-hour time with AM/PM marker
///
/// Empty input yields `"-"`; input that parses as neither a bare time nor a
/// timestamp is returned unchanged.
pub fn format_to_12_hour(raw: &str) -> String {
    if raw.trim().is_empty() {
        return "-".to_string();
    }
    match ClockValue::parse(raw) {
        Some(value) => value.time_of_day().format("%-I:%M %p").to_string(),
        None => raw.to_string(),
    }
}

/// Snap a clock value onto the quarter-hour grid
///
/// A value already on a boundary is returned unchanged for both directions.
/// Otherwise `Down` subtracts the remainder and `Up` adds the complement,
/// carrying into the hour. Bare times wrap within the 24-hour clock
/// (`23:52` rounded up becomes `00:00`); full timestamps roll the calendar
/// date forward instead. The output mirrors the input shape, and empty or
/// unparseable input degrades to empty string or passthrough.
pub fn round_to_quarter_hour(raw: &str, direction: RoundingDirection) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }
    match ClockValue::parse(raw) {
        None => raw.to_string(),
        Some(ClockValue::Bare(t)) => {
            if t.minute() % 15 == 0 {
                return raw.to_string();
            }
            let rounded = round_minute_of_day(t, direction);
            format!("{:02}:{:02}", rounded / 60, rounded % 60)
        }
        Some(ClockValue::Stamped(ts)) => {
            if ts.minute() % 15 == 0 {
                return raw.to_string();
            }
            round_stamped(ts, direction).to_rfc3339_opts(SecondsFormat::Secs, false)
        }
    }
}

/// Billable hours for one clock-in/clock-out pair
///
/// The clock-in is rounded down and the clock-out up, then the difference
/// is taken in hours. A pair with either side missing or unparseable
/// contributes zero. When both sides carry full timestamps the difference
/// is exact (and never negative); otherwise the pair is reduced to
/// time-of-day, and an end before the start is treated as an overnight
/// shift crossing midnight.
pub fn calculate_rounded_hours(clock_in: Option<&str>, clock_out: Option<&str>) -> f64 {
    let (Some(raw_in), Some(raw_out)) = (clock_in, clock_out) else {
        return 0.0;
    };
    let (Some(start), Some(end)) = (ClockValue::parse(raw_in), ClockValue::parse(raw_out)) else {
        return 0.0;
    };

    let minutes = match (start, end) {
        (ClockValue::Stamped(start), ClockValue::Stamped(end)) => {
            let rounded_in = round_stamped(start, RoundingDirection::Down);
            let rounded_out = round_stamped(end, RoundingDirection::Up);
            (rounded_out - rounded_in).num_minutes().max(0)
        }
        _ => {
            let rounded_in = round_minute_of_day(start.time_of_day(), RoundingDirection::Down);
            let rounded_out = round_minute_of_day(end.time_of_day(), RoundingDirection::Up);
            // No date context: an end before the start means the shift
            // crossed midnight.
            (i64::from(rounded_out) - i64::from(rounded_in)).rem_euclid(MINUTES_PER_DAY)
        }
    };

    minutes as f64 / 60.0
}

/// Total billable hours over a set of entries, formatted to two decimals
///
/// Returned as a display-ready string so floating point artifacts never
/// reach a timesheet.
pub fn calculate_total_rounded_hours(pairs: &[ClockPair]) -> String {
    let total: f64 = pairs
        .iter()
        .map(|pair| calculate_rounded_hours(pair.clock_in.as_deref(), pair.clock_out.as_deref()))
        .sum();
    format!("{:.2}", total)
}

/// Render a date-like value as `MM/DD/YYYY`
///
/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates. Empty input
/// yields `"-"`; anything else unparseable is returned unchanged.
pub fn format_date(raw: &str) -> String {
    if raw.trim().is_empty() {
        return "-".to_string();
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.date_naive().format("%m/%d/%Y").to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%m/%d/%Y").to_string();
    }
    raw.to_string()
}

/// Build the full display record for one time entry
///
/// The hours total is computed from the already-rounded values (rounding is
/// idempotent on boundaries), so the displayed times and the paid hours can
/// never drift apart.
pub fn time_entry_display(clock_in: Option<&str>, clock_out: Option<&str>) -> TimeEntryDisplay {
    let rounded_clock_in =
        clock_in.map(|raw| round_to_quarter_hour(raw, RoundingDirection::Down));
    let rounded_clock_out =
        clock_out.map(|raw| round_to_quarter_hour(raw, RoundingDirection::Up));

    let display_clock_in = rounded_clock_in
        .as_deref()
        .map(format_to_12_hour)
        .unwrap_or_else(|| "-".to_string());
    let display_clock_out = rounded_clock_out
        .as_deref()
        .map(format_to_12_hour)
        .unwrap_or_else(|| "-".to_string());

    let total_hours =
        calculate_rounded_hours(rounded_clock_in.as_deref(), rounded_clock_out.as_deref());

    TimeEntryDisplay {
        clock_in: clock_in.map(str::to_string),
        clock_out: clock_out.map(str::to_string),
        rounded_clock_in,
        rounded_clock_out,
        display_clock_in,
        display_clock_out,
        total_hours,
    }
}

/// Round a bare time to a minute-of-day on the quarter-hour grid,
/// wrapping at midnight.
fn round_minute_of_day(t: NaiveTime, direction: RoundingDirection) -> u32 {
    let minute_of_day = t.hour() * 60 + t.minute();
    let remainder = t.minute() % 15;
    if remainder == 0 {
        return minute_of_day;
    }
    match direction {
        RoundingDirection::Down => minute_of_day - remainder,
        RoundingDirection::Up => (minute_of_day + (15 - remainder)) % MINUTES_PER_DAY as u32,
    }
}

/// Round a full timestamp to the quarter-hour grid.
///
/// Seconds are truncated first so rounded spans are whole minutes; minute
/// arithmetic carries through hours and calendar dates.
fn round_stamped(ts: DateTime<FixedOffset>, direction: RoundingDirection) -> DateTime<FixedOffset> {
    let truncated = ts
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts);
    let remainder = i64::from(truncated.minute() % 15);
    if remainder == 0 {
        return truncated;
    }
    match direction {
        RoundingDirection::Down => truncated - Duration::minutes(remainder),
        RoundingDirection::Up => truncated + Duration::minutes(15 - remainder),
    }
}

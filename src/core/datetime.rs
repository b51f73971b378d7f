//! Proleptic calendar decomposition and cached per-second snapshots
//!
//! Timestamps are folded into 4-year groups of {365, 365, 366, 365} days
//! anchored at 1970, which resolves year/month/day without a timezone
//! database. The only external input is the process's local UTC offset,
//! captured once on first use. Negative timestamps (before the epoch) are
//! handled exactly; an off-by-one at a day or second boundary is a bug.

use crate::core::buffer;
use std::sync::OnceLock;

const MIN_SECS: i64 = 60;
const HOUR_SECS: i64 = 3600;
const DAY_SECS: i64 = 3600 * 24;

const FIRST_YEAR_DAYS: i64 = 365;
const SECOND_YEAR_DAYS: i64 = 365 + 365;
const THIRD_YEAR_DAYS: i64 = 365 + 365 + 366;
const FOUR_YEAR_DAYS: i64 = 365 + 365 + 366 + 365;

const COMMON_MONTHS: [i64; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
const LEAP_MONTHS: [i64; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

static LOCAL_OFFSET: OnceLock<i64> = OnceLock::new();

/// Local UTC offset in seconds, captured once for the process lifetime.
pub fn local_offset() -> i64 {
    *LOCAL_OFFSET.get_or_init(|| i64::from(chrono::Local::now().offset().local_minus_utc()))
}

/// Current unix time in whole seconds (UTC).
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Calendar fields of a decomposed local-time second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub min: u32,
    pub sec: u32,
    /// Day of year, 1-based.
    pub yday: u32,
    /// Seconds elapsed since local midnight.
    pub day_second: u32,
}

/// Decompose local-time unix seconds into calendar fields.
pub fn date_clock(local_secs: i64) -> ClockTime {
    let mut remain: i64;
    let day_second: i64;
    let mut year: i64;

    if local_secs < 0 {
        let before = -local_secs;
        let days = before / DAY_SECS;
        day_second = (DAY_SECS - (before - days * DAY_SECS)) % DAY_SECS;
        let groups = days / FOUR_YEAR_DAYS + 1;
        remain = groups * FOUR_YEAR_DAYS - days;
        if day_second == 0 {
            // Exact-midnight timestamps land on the following day.
            remain += 1;
        }
        year = 1970 - groups * 4;
    } else {
        let days = local_secs / DAY_SECS;
        day_second = local_secs - days * DAY_SECS;
        let groups = days / FOUR_YEAR_DAYS;
        remain = days - groups * FOUR_YEAR_DAYS + 1;
        year = 1970 + groups * 4;
    }

    // Position within the 4-year group: the leap year sits third.
    let mut months: &[i64; 12] = &COMMON_MONTHS;
    if remain <= FIRST_YEAR_DAYS {
    } else if remain <= SECOND_YEAR_DAYS {
        year += 1;
        remain -= FIRST_YEAR_DAYS;
    } else if remain <= THIRD_YEAR_DAYS {
        year += 2;
        remain -= SECOND_YEAR_DAYS;
        months = &LEAP_MONTHS;
    } else if remain <= FOUR_YEAR_DAYS {
        year += 3;
        remain -= THIRD_YEAR_DAYS;
    } else {
        year += 4;
        remain -= FOUR_YEAR_DAYS;
    }
    let yday = remain;

    let mut month = 0i64;
    let mut day = 0i64;
    for (i, &len) in months.iter().enumerate() {
        let rest = remain - len;
        if rest < 1 {
            month = i as i64 + 1;
            day = if rest == 0 { len } else { remain };
            break;
        }
        remain = rest;
    }

    let hour = day_second / HOUR_SECS;
    let in_hour = day_second - hour * HOUR_SECS;
    let min = in_hour / MIN_SECS;
    let sec = in_hour - min * MIN_SECS;

    ClockTime {
        year: year as i32,
        month: month as u32,
        day: day as u32,
        hour: hour as u32,
        min: min as u32,
        sec: sec as u32,
        yday: yday as u32,
        day_second: day_second as u32,
    }
}

/// Cached calendar snapshot keyed on the last unix second it was derived
/// from. Within a burst of entries in the same second the decomposition runs
/// once. Each sink owns its own snapshot; instances are never shared.
pub struct DateTime {
    unix: i64,
    clock: ClockTime,
}

impl DateTime {
    pub fn new() -> Self {
        Self {
            // Sentinel so the first flush always decomposes.
            unix: i64::MIN,
            clock: ClockTime {
                year: 0,
                month: 0,
                day: 0,
                hour: 0,
                min: 0,
                sec: 0,
                yday: 0,
                day_second: 0,
            },
        }
    }

    /// Refresh the snapshot for `unix` (UTC seconds); no work when the
    /// second has not changed.
    pub fn flush_to(&mut self, unix: i64) {
        if unix == self.unix {
            return;
        }
        self.clock = date_clock(unix + local_offset());
        self.unix = unix;
    }

    pub fn year(&self) -> i32 {
        self.clock.year
    }

    pub fn month(&self) -> u32 {
        self.clock.month
    }

    pub fn day(&self) -> u32 {
        self.clock.day
    }

    pub fn hour(&self) -> u32 {
        self.clock.hour
    }

    pub fn min(&self) -> u32 {
        self.clock.min
    }

    pub fn sec(&self) -> u32 {
        self.clock.sec
    }

    pub fn ymd_hms(&self) -> String {
        self.format("%Y/%m/%d %H:%M:%S")
    }

    /// Render `pattern` with the snapshot's fields. Recognized tokens:
    /// `%Y` (4-digit year), `%m` `%d` `%H` `%M` `%S` (2-digit, zero-padded).
    /// Any other `%x` emits `x`; non-`%` bytes pass through; a trailing lone
    /// `%` is dropped.
    pub fn format(&self, pattern: &str) -> String {
        let mut out = buffer::acquire(pattern.len() * 2);
        let bytes = pattern.as_bytes();
        let length = bytes.len();
        let mut i = 0;
        while i < length {
            let c = bytes[i];
            if c == b'%' {
                if i + 1 == length {
                    break;
                }
                match bytes[i + 1] {
                    b'Y' => out.append_uint(self.clock.year.max(0) as u64, 4),
                    b'm' => out.append_uint(u64::from(self.clock.month), 2),
                    b'd' => out.append_uint(u64::from(self.clock.day), 2),
                    b'H' => out.append_uint(u64::from(self.clock.hour), 2),
                    b'M' => out.append_uint(u64::from(self.clock.min), 2),
                    b'S' => out.append_uint(u64::from(self.clock.sec), 2),
                    other => out.append_byte(other),
                }
                i += 2;
            } else {
                out.append_byte(c);
                i += 1;
            }
        }
        String::from_utf8_lossy(out.as_bytes()).into_owned()
    }
}

impl Default for DateTime {
    fn default() -> Self {
        Self::new()
    }
}

//! Wall-clock source used for temporal checks.
//!
//! Rules resolve "today" and "tomorrow" through the clock, so the slot's
//! offset is the one in force on the target day, not the one of the current
//! reading. A fixed clock makes every evaluation reproducible.

use chrono::{
    DateTime, Days, Duration, FixedOffset, Local, LocalResult, NaiveDate, NaiveTime, Offset,
    TimeZone,
};

/// Supplies the current instant and the zone wall times are read in.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    /// `date` at wall time `time` in this clock's zone.
    ///
    /// Defaults to the fixed offset of the current reading.
    fn local_at(&self, date: NaiveDate, time: NaiveTime) -> DateTime<FixedOffset> {
        at_local(date, time, *self.now().offset())
    }
}

/// Local system time, following the system zone's DST rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }

    fn local_at(&self, date: NaiveDate, time: NaiveTime) -> DateTime<FixedOffset> {
        resolve_in(&Local, date, time)
    }
}

/// Always returns the same instant; wall times resolve in its offset.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    /// Parse an RFC 3339 timestamp, e.g. `2026-10-19T13:40:00+02:00`.
    pub fn parse(rfc3339: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(rfc3339).map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// `date` at wall time `time`, expressed in `offset`.
pub fn at_local(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    let utc = date.and_time(time) - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}

/// `date` at wall time `time` in `zone`.
///
/// A repeated wall time (clocks turned back) takes the earlier instant. A
/// skipped one (clocks turned forward) keeps the offset in force before the
/// jump.
pub fn resolve_in<Tz: TimeZone>(
    zone: &Tz,
    date: NaiveDate,
    time: NaiveTime,
) -> DateTime<FixedOffset> {
    let naive = date.and_time(time);
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(at) | LocalResult::Ambiguous(at, _) => at.fixed_offset(),
        LocalResult::None => {
            let before = naive - Duration::days(1);
            at_local(date, time, zone.offset_from_utc_datetime(&before).fix())
        }
    }
}

/// Today at `time`, as `clock` reads it.
pub fn today_at(clock: &dyn Clock, now: DateTime<FixedOffset>, time: NaiveTime) -> DateTime<FixedOffset> {
    clock.local_at(now.date_naive(), time)
}

/// Tomorrow at `time`, as `clock` reads it.
pub fn tomorrow_at(clock: &dyn Clock, now: DateTime<FixedOffset>, time: NaiveTime) -> DateTime<FixedOffset> {
    let today = now.date_naive();
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
    clock.local_at(tomorrow, time)
}

/// Midnight at the start of `now`'s local day.
pub fn start_of_day(clock: &dyn Clock, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    today_at(clock, now, NaiveTime::default())
}


#[cfg(test)]
mod tests {
    use super::testing::CentralEuropeClock;
    use super::*;
    use chrono::Utc;

    fn ten() -> NaiveTime {
        NaiveTime::from_hms_opt(10, 0, 0).unwrap()
    }

    fn fixed(rfc3339: &str) -> FixedClock {
        FixedClock::parse(rfc3339).unwrap()
    }

    #[test]
    fn fixed_clock_is_stable() {
        let clock = fixed("2026-10-19T13:40:00+02:00");
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn today_at_keeps_offset() {
        let clock = fixed("2026-10-19T13:40:00+02:00");
        let slot = today_at(&clock, clock.now(), ten());
        assert_eq!(slot.to_rfc3339(), "2026-10-19T10:00:00+02:00");
    }

    #[test]
    fn tomorrow_at_crosses_month_boundary() {
        let clock = fixed("2026-10-31T23:30:00-05:00");
        let slot = tomorrow_at(&clock, clock.now(), ten());
        assert_eq!(slot.to_rfc3339(), "2026-11-01T10:00:00-05:00");
    }

    #[test]
    fn tomorrow_at_follows_dst_change() {
        let clock = CentralEuropeClock::parse("2026-10-24T13:00:00+02:00");
        let slot = tomorrow_at(&clock, clock.now(), ten());
        assert_eq!(slot.to_rfc3339(), "2026-10-25T10:00:00+01:00");
        assert_eq!(today_at(&clock, clock.now(), ten()).to_rfc3339(), "2026-10-24T10:00:00+02:00");
    }

    #[test]
    fn repeated_wall_time_takes_earlier_instant() {
        let clock = CentralEuropeClock::parse("2026-10-24T13:00:00+02:00");
        let date = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap();
        let slot = clock.local_at(date, NaiveTime::from_hms_opt(2, 30, 0).unwrap());
        assert_eq!(slot.to_rfc3339(), "2026-10-25T02:30:00+02:00");
    }

    #[test]
    fn resolve_in_fixed_zone_matches_at_local() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(resolve_in(&offset, date, ten()), at_local(date, ten(), offset));
        assert_eq!(resolve_in(&Utc, date, ten()).to_rfc3339(), "2026-10-19T10:00:00+00:00");
    }

    #[test]
    fn slots_compare_as_instants() {
        let clock = fixed("2026-10-19T13:40:00+02:00");
        let same_instant_utc = DateTime::parse_from_rfc3339("2026-10-19T08:00:00+00:00").unwrap();
        assert_eq!(today_at(&clock, clock.now(), ten()), same_instant_utc);
    }

    #[test]
    fn start_of_day_is_midnight() {
        let clock = fixed("2026-10-19T13:40:00+02:00");
        assert_eq!(start_of_day(&clock, clock.now()).to_rfc3339(), "2026-10-19T00:00:00+02:00");
    }
}

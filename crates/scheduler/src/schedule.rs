//! Pure schedule arithmetic: slot matching, next-slot lookup, and the
//! catch-up rule for slots missed across a civil date boundary.

use chrono::{DateTime, TimeZone, Timelike};

use crate::descriptor::ScheduleTime;

/// Minutes since civil midnight of the given instant.
pub(crate) fn minute_of_day<Tz: TimeZone>(t: &DateTime<Tz>) -> u32 {
    t.hour() * 60 + t.minute()
}

/// Whether any slot matches the instant's (hour, minute) exactly.
pub(crate) fn matches_now<Tz: TimeZone>(schedule: &[ScheduleTime], now: &DateTime<Tz>) -> bool {
    schedule
        .iter()
        .any(|slot| slot.hour == now.hour() && slot.minute == now.minute())
}

/// The next slot at or after the instant's minute-of-day, wrapping to
/// the earliest slot of the next day once every slot has passed.
///
/// Returns `None` for an empty schedule.
pub(crate) fn next_slot<Tz: TimeZone>(
    schedule: &[ScheduleTime],
    now: &DateTime<Tz>,
) -> Option<ScheduleTime> {
    let now_m = minute_of_day(now);
    let today = schedule
        .iter()
        .filter(|slot| slot.minute_of_day() >= now_m)
        .min_by_key(|slot| slot.minute_of_day());
    match today {
        Some(slot) => Some(*slot),
        None => schedule.iter().min_by_key(|slot| slot.minute_of_day()).copied(),
    }
}

/// The catch-up rule: a descriptor whose reference timestamp (last
/// completion, else last run) dates from an older civil day fires as
/// soon as the wall minute-of-day reaches its next slot.
pub(crate) fn catch_up_due<Tz: TimeZone>(
    schedule: &[ScheduleTime],
    now: &DateTime<Tz>,
    reference: &DateTime<Tz>,
) -> bool {
    if reference.date_naive() >= now.date_naive() {
        return false;
    }
    let Some(slot) = next_slot(schedule, now) else {
        return false;
    };
    minute_of_day(now) >= slot.minute_of_day()
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hydrolog project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Publish schedule gate
//!
//! Computes the next publish boundary and blocks the acquisition loop until
//! the wall clock reaches it. Two policies exist: top-of-hour alignment
//! (regardless of when the process started) and a plain fixed interval.
//!
//! The gate is a coarse sleep-poll at a 1 s grain rather than a precise
//! timer; minute-level precision is plenty for an hourly cadence. Boundary
//! computation is pure over naive local time so tests can pin exact
//! wall-clock values.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeDelta, Timelike};
use tokio::time::sleep;

/// Poll interval while waiting on a boundary.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// When the next reading is taken and published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePolicy {
    /// Publish at the top of every hour, aligned to the wall clock.
    AlignedHourly,
    /// Publish every `interval`, unaligned.
    FixedInterval(Duration),
}

/// Compute the next publish boundary strictly after `now`.
///
/// For [`SchedulePolicy::AlignedHourly`] this is the start of the next hour:
/// add one hour, then truncate minutes, seconds and sub-second to zero. A
/// `now` sitting exactly on a boundary yields the following one, never the
/// current instant.
pub fn next_boundary(policy: &SchedulePolicy, now: NaiveDateTime) -> NaiveDateTime {
    match policy {
        SchedulePolicy::AlignedHourly => {
            let next = now + TimeDelta::hours(1);
            next.date()
                .and_hms_opt(next.hour(), 0, 0)
                .unwrap_or(next)
        }
        SchedulePolicy::FixedInterval(interval) => {
            now + TimeDelta::from_std(*interval).unwrap_or(TimeDelta::zero())
        }
    }
}

/// Block until the local wall clock reaches `target`, or the daemon stops.
///
/// Returns `true` when the boundary was reached, `false` when the running
/// flag cleared mid-wait.
pub async fn wait_until(target: NaiveDateTime, running: &Arc<AtomicBool>) -> bool {
    while Local::now().naive_local() < target {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
    running.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_next_boundary_truncates_to_top_of_hour() {
        let next = next_boundary(&SchedulePolicy::AlignedHourly, at(10, 15, 30));
        assert_eq!(next, at(11, 0, 0));
    }

    #[test]
    fn test_next_boundary_just_before_the_hour() {
        let now = at(10, 59, 59) + TimeDelta::milliseconds(999);
        let next = next_boundary(&SchedulePolicy::AlignedHourly, now);
        assert_eq!(next, at(11, 0, 0));
    }

    #[test]
    fn test_next_boundary_on_boundary_is_strictly_next() {
        let next = next_boundary(&SchedulePolicy::AlignedHourly, at(11, 0, 0));
        assert_eq!(next, at(12, 0, 0));
    }

    #[test]
    fn test_next_boundary_crosses_midnight() {
        let now = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(23, 30, 0)
            .unwrap();
        let next = next_boundary(&SchedulePolicy::AlignedHourly, now);
        assert_eq!(
            next,
            NaiveDate::from_ymd_opt(2023, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_fixed_interval_has_no_alignment() {
        let policy = SchedulePolicy::FixedInterval(Duration::from_secs(300));
        let next = next_boundary(&policy, at(10, 15, 30));
        assert_eq!(next, at(10, 20, 30));
    }

    #[tokio::test]
    async fn test_wait_until_past_target_returns_immediately() {
        let running = Arc::new(AtomicBool::new(true));
        let past = Local::now().naive_local() - TimeDelta::hours(1);
        assert!(wait_until(past, &running).await);
    }

    #[tokio::test]
    async fn test_wait_until_cancelled() {
        let running = Arc::new(AtomicBool::new(false));
        let future = Local::now().naive_local() + TimeDelta::hours(1);
        assert!(!wait_until(future, &running).await);
    }
}

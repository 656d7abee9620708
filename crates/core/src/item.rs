use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// Length of the clock hour that appear/disappear seconds are measured in.
pub const SECONDS_PER_HOUR: u32 = 3600;

/// One unit of scheduled work, as placed on a worker queue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanItem {
    /// 1-based position in the plan. Display only.
    pub step: u32,
    pub location: Coordinate,
    /// Seconds after the top of the hour the target appears.
    pub appear_seconds: u32,
    /// Seconds after the top of the hour the target disappears. 0 together
    /// with `appear_seconds == 0` means the item has no time window.
    pub disappear_seconds: u32,
}

impl ScanItem {
    /// An item with no time constraint.
    pub fn untimed(step: u32, location: Coordinate) -> Self {
        Self {
            step,
            location,
            appear_seconds: 0,
            disappear_seconds: 0,
        }
    }

    /// The validity window, or `None` if the item is always valid.
    pub fn window(&self) -> Option<TimeWindow> {
        if self.disappear_seconds == 0 {
            None
        } else {
            Some(TimeWindow {
                appear: self.appear_seconds,
                disappear: self.disappear_seconds,
            })
        }
    }
}

/// An hourly-recurring window `[appear, disappear]` in seconds-into-hour.
///
/// `appear > disappear` means the window crosses the top of the hour: it is
/// open from `appear` to 3599 and again from 0 to `disappear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub appear: u32,
    pub disappear: u32,
}

impl TimeWindow {
    pub fn wraps(&self) -> bool {
        self.appear > self.disappear
    }

    /// Whether `now` (seconds-into-hour) falls inside the window.
    pub fn contains(&self, now: u32) -> bool {
        if self.wraps() {
            now >= self.appear || now <= self.disappear
        } else {
            now >= self.appear && now <= self.disappear
        }
    }

    /// Seconds to wait from `now` until the window opens; 0 if already open.
    pub fn seconds_until_open(&self, now: u32) -> u32 {
        if self.contains(now) {
            0
        } else {
            (self.appear + SECONDS_PER_HOUR - now % SECONDS_PER_HOUR) % SECONDS_PER_HOUR
        }
    }

    /// Seconds elapsed since the window last closed, if it is closed at `now`.
    pub fn seconds_since_close(&self, now: u32) -> Option<u32> {
        if self.contains(now) {
            return None;
        }
        Some((now % SECONDS_PER_HOUR + SECONDS_PER_HOUR - self.disappear) % SECONDS_PER_HOUR)
    }

    /// Seconds elapsed since the window opened, if it is open at `now`.
    pub fn seconds_since_open(&self, now: u32) -> Option<u32> {
        self.contains(now)
            .then(|| (now + SECONDS_PER_HOUR - self.appear) % SECONDS_PER_HOUR)
    }
}

/// Seconds elapsed since the start of the clock hour containing `at`.
pub fn seconds_into_hour(at: DateTime<Utc>) -> u32 {
    at.minute() * 60 + at.second()
}

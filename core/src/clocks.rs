// Ride Tracker
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Sources of the current time.
//!
//! Ride dates are stamped with the time returned by a `Clock`.  The service uses `SystemClock`
//! while tests inject a `SettableClock` so that stamped dates can be compared exactly.

use time::OffsetDateTime;

/// A source of the current time.
pub trait Clock {
    /// Returns the current time in UTC.
    fn now_utc(&self) -> OffsetDateTime;
}

/// Clock backed by the operating system's wall time.
#[derive(Clone, Default)]
pub struct SystemClock {}

impl Clock for SystemClock {
    /// Returns the current time truncated to microseconds, which is the finest resolution that a
    /// PostgreSQL `TIMESTAMPTZ` column keeps.
    fn now_utc(&self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        let micros = now.nanosecond() / 1000;
        now.replace_microsecond(micros).unwrap_or(now)
    }
}

/// Test utilities.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// A clock frozen at a given instant that only moves when told to.
    pub struct SettableClock {
        /// The instant returned by `now_utc`.
        now: Mutex<OffsetDateTime>,
    }

    impl SettableClock {
        /// Creates a clock frozen at `now`.
        pub fn new(now: OffsetDateTime) -> Self {
            Self { now: Mutex::new(now) }
        }

        /// Moves the clock forward by `delta`.
        pub fn advance(&self, delta: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += delta;
        }
    }

    impl Clock for SettableClock {
        fn now_utc(&self) -> OffsetDateTime {
            *self.now.lock().unwrap()
        }
    }

}

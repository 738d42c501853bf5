//! Wall-clock and business-date source.
//!
//! Business dates are calendar dates in the bank's local timezone, which is a
//! fixed UTC offset (Asia/Seoul by default).

use std::sync::Mutex;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn offset(&self) -> FixedOffset;

    /// Today's business date in the clock's local offset.
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.offset()).date_naive()
    }
}

impl<C> Clock for std::sync::Arc<C>
where
    C: Clock + ?Sized,
{
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn offset(&self) -> FixedOffset {
        (**self).offset()
    }
}

/// Real system clock at a fixed local offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Clock at `hours` east of UTC. Out-of-range offsets fall back to UTC.
    pub fn with_offset_hours(hours: i32) -> Self {
        let offset = FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix());
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

/// Manually driven clock for tests.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
    offset: FixedOffset,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: Mutex::new(now),
            offset,
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|g| *g).unwrap_or_else(|p| *p.into_inner())
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

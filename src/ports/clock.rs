use chrono::{DateTime, NaiveDate, Utc};

/// Source of "now" for every time-sensitive decision.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A pinned date, used for the admin date override and in tests.
///
/// `now()` is midday UTC of the pinned date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    date: NaiveDate,
}

impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.date
            .and_hms_opt(12, 0, 0)
            .map_or_else(Utc::now, |dt| dt.and_utc())
    }

    fn today(&self) -> NaiveDate {
        self.date
    }
}

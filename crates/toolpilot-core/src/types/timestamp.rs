use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn unix_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// Shifts the timestamp forward, saturating on overflow.
    pub fn after(&self, duration: Duration) -> Self {
        let millis = self
            .unix_millis()
            .saturating_add(duration.as_millis().min(i64::MAX as u128) as i64);
        Self::from_unix_millis(millis).unwrap_or(*self)
    }

    pub fn elapsed(&self) -> Duration {
        let now = Utc::now().timestamp_millis();
        let then = self.0.timestamp_millis();
        if now > then {
            Duration::from_millis((now - then) as u64)
        } else {
            Duration::ZERO
        }
    }

    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_after_moves_forward() {
        let now = Timestamp::now();
        let later = now.after(Duration::from_secs(5));
        assert_eq!(later.unix_millis() - now.unix_millis(), 5000);
        assert!(later > now);
    }
}

use thiserror::Error;
use time::Duration;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }

    /// Seconds, rounded up so that no positive duration becomes zero.
    #[must_use]
    pub fn ceil_seconds(&self) -> i64 {
        let seconds = self.0.whole_seconds();
        if self.0.subsec_nanoseconds() > 0 {
            seconds.saturating_add(1)
        } else {
            seconds
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

#[cfg(test)]
mod tests {
    use crate::util::PositiveDuration;
    use time::Duration;

    #[test]
    fn only_positive_durations() {
        assert!(PositiveDuration::new(Duration::seconds(1)).is_some());
        assert!(PositiveDuration::new(Duration::ZERO).is_none());
        assert!(PositiveDuration::try_from(Duration::seconds(-5)).is_err());
    }

    #[test]
    fn seconds_round_up() {
        let ceil = |duration| PositiveDuration::new(duration).unwrap().ceil_seconds();

        assert_eq!(ceil(Duration::nanoseconds(1)), 1);
        assert_eq!(ceil(Duration::milliseconds(1500)), 2);
        assert_eq!(ceil(Duration::seconds(60)), 60);
    }
}

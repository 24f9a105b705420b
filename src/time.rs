//! Departure-clock bookkeeping for time-aware costing.
//!
//! Time-zone resolution is an external collaborator; within the engine a
//! clock is a plain count of seconds since the Unix epoch. Expansion uses
//! the clock as a snapshot; recosting advances it edge by edge.

use crate::request::MatrixLocation;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TimeInfo {
    valid: bool,
    epoch_seconds: u64,
}

impl TimeInfo {
    pub fn from_epoch(epoch_seconds: u64) -> TimeInfo {
        TimeInfo {
            valid: true,
            epoch_seconds,
        }
    }

    /// Clock for a location, invalid when the location carries no
    /// `date_time`.
    pub fn make(location: &MatrixLocation) -> TimeInfo {
        location
            .date_time
            .map(TimeInfo::from_epoch)
            .unwrap_or_default()
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    /// Timestamp handed to the costing, `None` when no clock was set.
    pub fn timestamp(&self) -> Option<u64> {
        self.valid.then_some(self.epoch_seconds)
    }

    /// The clock advanced by `secs` of travel.
    pub fn forward(&self, secs: f32) -> TimeInfo {
        if !self.valid {
            return *self;
        }
        TimeInfo {
            valid: true,
            epoch_seconds: self.epoch_seconds + secs.max(0.0).round() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_clock_stays_invalid() {
        let t = TimeInfo::default();
        assert_eq!(t.timestamp(), None);
        assert_eq!(t.forward(100.0).timestamp(), None);
    }

    #[test]
    fn test_forward_rounds_seconds() {
        let t = TimeInfo::from_epoch(1_000);
        assert_eq!(t.forward(10.4).timestamp(), Some(1_010));
        assert_eq!(t.forward(10.6).timestamp(), Some(1_011));
    }
}

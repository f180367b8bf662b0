//! Symbolic durations: bar timeframes and simulation strides.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Duration of a bar bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    Min1,
    Min5,
    Min15,
    Min30,
    H1,
}

impl Timeframe {
    pub fn duration(self) -> Duration {
        match self {
            Timeframe::Min1 => Duration::minutes(1),
            Timeframe::Min5 => Duration::minutes(5),
            Timeframe::Min15 => Duration::minutes(15),
            Timeframe::Min30 => Duration::minutes(30),
            Timeframe::H1 => Duration::hours(1),
        }
    }
}

/// Stride at which the simulator delivers ticks to a strategy.
///
/// `Tick` delivers every tick; the fixed-duration strides skip ticks until
/// at least the stride duration has elapsed since the last delivery slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimulationPeriod {
    Tick,
    S1,
    S5,
    S10,
    S30,
    Min1,
}

impl SimulationPeriod {
    pub fn duration(self) -> Duration {
        match self {
            SimulationPeriod::Tick => Duration::milliseconds(1),
            SimulationPeriod::S1 => Duration::seconds(1),
            SimulationPeriod::S5 => Duration::seconds(5),
            SimulationPeriod::S10 => Duration::seconds(10),
            SimulationPeriod::S30 => Duration::seconds(30),
            SimulationPeriod::Min1 => Duration::minutes(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_durations() {
        assert_eq!(Timeframe::Min1.duration(), Duration::seconds(60));
        assert_eq!(Timeframe::Min5.duration(), Duration::seconds(300));
        assert_eq!(Timeframe::Min15.duration(), Duration::seconds(900));
        assert_eq!(Timeframe::H1.duration(), Duration::seconds(3600));
    }

    #[test]
    fn period_durations() {
        assert_eq!(SimulationPeriod::Tick.duration(), Duration::milliseconds(1));
        assert_eq!(SimulationPeriod::S1.duration(), Duration::seconds(1));
        assert_eq!(SimulationPeriod::Min1.duration(), Duration::seconds(60));
    }
}

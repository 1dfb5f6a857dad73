//! Turtle strategy parameters.

use std::fmt;
use std::str::FromStr;

use crate::domain::position::Direction;

/// Which breakout system drives entries and exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum System {
    System1,
    #[default]
    System2,
}

impl FromStr for System {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "S1" | "SYSTEM1" | "1" => Ok(System::System1),
            "S2" | "SYSTEM2" | "2" => Ok(System::System2),
            other => Err(format!("unknown system '{}' (expected S1 or S2)", other)),
        }
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            System::System1 => f.write_str("S1"),
            System::System2 => f.write_str("S2"),
        }
    }
}

/// Directions the strategy may trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TradeDirection {
    Long,
    Short,
    #[default]
    Both,
}

impl TradeDirection {
    pub fn allows(self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (TradeDirection::Both, _)
                | (TradeDirection::Long, Direction::Long)
                | (TradeDirection::Short, Direction::Short)
        )
    }
}

impl FromStr for TradeDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" => Ok(TradeDirection::Long),
            "short" => Ok(TradeDirection::Short),
            "both" => Ok(TradeDirection::Both),
            other => Err(format!(
                "unknown direction '{}' (expected long, short or both)",
                other
            )),
        }
    }
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeDirection::Long => f.write_str("long"),
            TradeDirection::Short => f.write_str("short"),
            TradeDirection::Both => f.write_str("both"),
        }
    }
}

/// Entry (breakout) and exit channel lengths for one system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakoutWindows {
    pub entry: usize,
    pub exit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurtleStrategy {
    pub name: String,
    pub system: System,
    pub system1: BreakoutWindows,
    pub system2: BreakoutWindows,
    pub atr_period: usize,
    pub stop_atr_multiple: f64,
    pub pyramid_atr_step: f64,
    pub max_units: usize,
    pub risk_per_unit: f64,
    pub direction: TradeDirection,
    /// System 1 only: skip the next breakout after a winning trade in that direction.
    pub skip_after_winner: bool,
}

impl Default for TurtleStrategy {
    fn default() -> Self {
        TurtleStrategy {
            name: "Turtle".into(),
            system: System::System2,
            system1: BreakoutWindows { entry: 20, exit: 10 },
            system2: BreakoutWindows { entry: 55, exit: 20 },
            atr_period: 20,
            stop_atr_multiple: 2.0,
            pyramid_atr_step: 0.5,
            max_units: 4,
            risk_per_unit: 0.01,
            direction: TradeDirection::Both,
            skip_after_winner: false,
        }
    }
}

impl TurtleStrategy {
    /// Windows of the active system.
    pub fn windows(&self) -> BreakoutWindows {
        match self.system {
            System::System1 => self.system1,
            System::System2 => self.system2,
        }
    }

    pub fn skips_after_winner(&self) -> bool {
        self.skip_after_winner && self.system == System::System1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_rules() {
        let s = TurtleStrategy::default();
        assert_eq!(s.system, System::System2);
        assert_eq!(s.windows(), BreakoutWindows { entry: 55, exit: 20 });
        assert_eq!(s.atr_period, 20);
        assert_eq!(s.stop_atr_multiple, 2.0);
        assert_eq!(s.pyramid_atr_step, 0.5);
        assert_eq!(s.max_units, 4);
        assert_eq!(s.risk_per_unit, 0.01);
        assert_eq!(s.direction, TradeDirection::Both);
    }

    #[test]
    fn system1_windows() {
        let s = TurtleStrategy {
            system: System::System1,
            ..Default::default()
        };
        assert_eq!(s.windows(), BreakoutWindows { entry: 20, exit: 10 });
    }

    #[test]
    fn skip_after_winner_only_applies_to_system1() {
        let s2 = TurtleStrategy {
            skip_after_winner: true,
            ..Default::default()
        };
        assert!(!s2.skips_after_winner());

        let s1 = TurtleStrategy {
            system: System::System1,
            ..s2
        };
        assert!(s1.skips_after_winner());
    }

    #[test]
    fn parse_system() {
        assert_eq!("S1".parse::<System>(), Ok(System::System1));
        assert_eq!("s2".parse::<System>(), Ok(System::System2));
        assert_eq!(" system1 ".parse::<System>(), Ok(System::System1));
        assert!("S3".parse::<System>().is_err());
        assert_eq!(System::System1.to_string(), "S1");
    }

    #[test]
    fn parse_direction() {
        assert_eq!("LONG".parse::<TradeDirection>(), Ok(TradeDirection::Long));
        assert_eq!("both".parse::<TradeDirection>(), Ok(TradeDirection::Both));
        assert!("sideways".parse::<TradeDirection>().is_err());
    }

    #[test]
    fn direction_filter() {
        assert!(TradeDirection::Both.allows(Direction::Short));
        assert!(TradeDirection::Long.allows(Direction::Long));
        assert!(!TradeDirection::Long.allows(Direction::Short));
        assert!(!TradeDirection::Short.allows(Direction::Long));
    }
}

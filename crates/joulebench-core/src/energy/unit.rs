use serde::{Deserialize, Serialize};

pub const JOULES_PER_KWH: f64 = 3.6e6;

/// Native unit of an energy reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyUnit {
    MicroJoule,
    MilliJoule,
    Joule,
    KilowattHour,
}

impl EnergyUnit {
    pub fn to_joules(&self, value: f64) -> f64 {
        match self {
            EnergyUnit::MicroJoule => value / 1e6,
            EnergyUnit::MilliJoule => value / 1e3,
            EnergyUnit::Joule => value,
            EnergyUnit::KilowattHour => value * JOULES_PER_KWH,
        }
    }

    pub fn from_joules(&self, joules: f64) -> f64 {
        match self {
            EnergyUnit::MicroJoule => joules * 1e6,
            EnergyUnit::MilliJoule => joules * 1e3,
            EnergyUnit::Joule => joules,
            EnergyUnit::KilowattHour => joules / JOULES_PER_KWH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_joules() {
        assert_eq!(EnergyUnit::MicroJoule.to_joules(2_000_000.0), 2.0);
        assert_eq!(EnergyUnit::MilliJoule.to_joules(1500.0), 1.5);
        assert_eq!(EnergyUnit::Joule.to_joules(3.0), 3.0);
        assert_eq!(EnergyUnit::KilowattHour.to_joules(0.5), 1.8e6);
    }

    #[test]
    fn test_kwh_from_joules() {
        assert_eq!(EnergyUnit::KilowattHour.from_joules(3.6e6), 1.0);
    }
}

mod backend;
mod report;
mod unit;

pub use backend::EnergyBackend;
pub use report::{EnergyReport, EnergySample};
pub use unit::{EnergyUnit, JOULES_PER_KWH};

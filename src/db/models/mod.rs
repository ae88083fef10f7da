mod appointment;
mod audit_log;
mod doctor;
mod patient;

pub use appointment::*;
pub use audit_log::*;
pub use doctor::*;
pub use patient::*;

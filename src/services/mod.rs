mod appointment_service;
mod audit;

pub use appointment_service::{AppointmentDetails, AppointmentService, DoctorScheduleView};
pub use audit::AuditSink;

pub mod appointments;
pub mod scheduling;

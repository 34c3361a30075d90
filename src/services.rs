pub mod appointment_service;
pub use appointment_service::AppointmentService;
pub mod availability_service;
pub use availability_service::AvailabilityService;
pub mod booking_service;
pub use booking_service::BookingService;
pub mod schedule_service;
pub use schedule_service::ScheduleService;

pub mod availability;
pub mod manager;
pub mod models;
pub mod repository;

pub use availability::{AvailabilityChecker, AvailabilityReport, QuarterOccupancy, SlotAvailability};
pub use manager::{BookingError, BookingManager, ProposeBooking};
pub use models::{BookingRequest, DurationRecord};
pub use repository::{ActiveBooking, DurationRecordStore, StatusUpdate, StoreError};

pub mod models;

pub use models::{
    BookingStatus, DurationCategory, PriceTable, SlotName, SlotPrices, StartPreference,
    SLOT_CAPACITY,
};

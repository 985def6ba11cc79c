pub mod engine;

pub use engine::{PriceQuote, PriceSegment, PricingEngine, PricingError, StartPolicy};

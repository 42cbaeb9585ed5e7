//! Domain services: stateless pricing calculations
pub mod pricing;
pub mod totals;

pub use pricing::{PricingError, PricingSnapshot, Rates};
pub use totals::{Discount, LineInput, OrderQuote, QuoteLine};

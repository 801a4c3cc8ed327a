pub mod calculator;
pub mod models;
pub mod summary;

pub use calculator::{aggregate, MAX_COST_USD};
pub use models::{
    round_currency, CostBreakdown, Currency, LineItem, PriceQuote, PriceSource, PriceUnit,
    QuoteOutcome,
};
pub use summary::FleetSummary;

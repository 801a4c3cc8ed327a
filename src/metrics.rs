use crate::pricing::PriceSource;
use metrics::{counter, describe_counter};

/// Register metric descriptions with whatever recorder is installed
///
/// The calculator does not install an exporter itself; an embedding
/// application may. Safe to call more than once.
pub fn init_metric_descriptions() {
    describe_counter!(
        "pricing_quotes_total",
        "Total number of price quotes fetched, by source and outcome"
    );
    describe_counter!(
        "pricing_fetch_retries_total",
        "Total number of retried upstream pricing requests"
    );
}

/// Record the outcome of one adapter fetch ("available" or an error type name)
pub fn record_quote(source: PriceSource, outcome: &'static str) {
    counter!(
        "pricing_quotes_total",
        "source" => source.as_str(),
        "outcome" => outcome,
    )
    .increment(1);
}

/// Record a retry of a transient failure
pub fn record_retry(source: PriceSource) {
    counter!("pricing_fetch_retries_total", "source" => source.as_str()).increment(1);
}

//! Price sample model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One observed price for one instrument.
///
/// Created on each upstream update and appended to the instrument's bounded
/// history. Doubles as the price-update event the dispatcher consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSample {
    /// Instrument symbol (opaque, externally supplied)
    pub instrument: String,

    /// Observed price, always positive
    pub price: Decimal,

    /// When the sample was recorded
    pub at: DateTime<Utc>,
}

impl PriceSample {
    pub fn new(instrument: impl Into<String>, price: Decimal) -> Self {
        Self {
            instrument: instrument.into(),
            price,
            at: Utc::now(),
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::payment::PaymentMethod;
use crate::util::Timestamp;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "server", derive(bon::Builder))]
pub struct RecordPayment {
    pub booking_id: i64,
    pub amount: f64,
    #[serde(default = "PaymentMethod::default_record")]
    #[cfg_attr(feature = "server", builder(default = PaymentMethod::Cash))]
    pub method: PaymentMethod,
    #[cfg_attr(feature = "server", builder(into))]
    pub notes: Option<String>,
}

impl PaymentMethod {
    // Required by serde
    #[doc(hidden)]
    #[must_use]
    pub fn default_record() -> Self {
        Self::Cash
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CompletePayment {
    pub transaction_ref: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FailPayment {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EarningsRange {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MethodEarnings {
    pub method: PaymentMethod,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EarningsReport {
    pub total: f64,
    pub count: i64,
    pub by_method: Vec<MethodEarnings>,
}

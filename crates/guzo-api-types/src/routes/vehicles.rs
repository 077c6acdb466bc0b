use serde::{Deserialize, Serialize};

use crate::vehicle::VehicleType;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "server", derive(bon::Builder))]
#[cfg_attr(feature = "server", builder(on(String, into)))]
pub struct RegisterVehicle {
    pub plate_number: String,
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub color: Option<String>,
    #[serde(default = "VehicleType::default_registration")]
    #[cfg_attr(feature = "server", builder(default = VehicleType::Sedan))]
    pub vehicle_type: VehicleType,
    pub capacity: i32,
}

impl VehicleType {
    // Required by serde
    #[doc(hidden)]
    #[must_use]
    pub fn default_registration() -> Self {
        Self::Sedan
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UpdateVehicle {
    pub plate_number: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub capacity: Option<i32>,
    pub active: Option<bool>,
}

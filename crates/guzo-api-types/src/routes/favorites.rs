use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "server", derive(bon::Builder))]
#[cfg_attr(feature = "server", builder(on(String, into)))]
pub struct AddFavoriteRoute {
    pub origin: String,
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "server", derive(bon::Builder))]
pub struct AddFavoriteDriver {
    pub driver_id: i64,
    #[cfg_attr(feature = "server", builder(into))]
    pub note: Option<String>,
}

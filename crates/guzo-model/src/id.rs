use serde::{Deserialize, Serialize};

macro_rules! make_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
            sqlx::Type,
        )]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

make_id!(UserId);
make_id!(VehicleId);
make_id!(TripId);
make_id!(BookingId);
make_id!(PaymentId);
make_id!(ReviewId);
make_id!(FavoriteRouteId);
make_id!(FavoriteDriverId);
make_id!(PricingRuleId);
make_id!(SurgeId);
make_id!(VerificationId);

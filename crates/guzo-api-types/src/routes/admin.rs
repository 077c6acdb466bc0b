use serde::{Deserialize, Serialize};

use crate::user::{UserProfile, UserRole};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct AdminStats {
    pub total_users: i64,
    pub total_trips: i64,
    pub total_bookings: i64,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ListUsers {
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserCounts {
    pub all: i64,
    pub drivers: i64,
    pub riders: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UserListing {
    pub users: Vec<UserProfile>,
    pub counts: UserCounts,
}

/// Reporting periods understood by the analytics routes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    Today,
    Week,
    #[default]
    Month,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct AnalyticsPeriod {
    #[serde(default)]
    pub period: ReportPeriod,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DayRevenue {
    /// Calendar day formatted `YYYY-MM-DD`.
    pub day: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RouteRevenue {
    pub route: String,
    pub count: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DriverEarnings {
    pub driver_id: i64,
    pub driver_name: String,
    pub period: ReportPeriod,
    pub total_revenue: f64,
    pub total_trips: i64,
    pub total_bookings: i64,
    pub avg_revenue_per_trip: f64,
    pub avg_rating: f64,
    pub revenue_by_day: Vec<DayRevenue>,
    pub top_routes: Vec<RouteRevenue>,
    pub revenue_change_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlatformStats {
    pub period: ReportPeriod,
    pub total_users: i64,
    pub total_drivers: i64,
    pub total_riders: i64,
    pub new_users: i64,
    pub active_users: i64,
    pub total_trips: i64,
    pub total_bookings: i64,
    pub completed_bookings: i64,
    pub cancelled_bookings: i64,
    pub total_revenue: f64,
    pub avg_booking_value: f64,
    pub booking_completion_rate: f64,
    pub avg_driver_rating: f64,
    pub revenue_by_day: Vec<DayRevenue>,
    pub bookings_by_day: Vec<crate::routes::pricing::DayCount>,
}

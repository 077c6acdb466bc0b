//! Conversions from database rows to wire objects.
use guzo_api_types::booking::Booking as ApiBooking;
use guzo_api_types::favorite::{FavoriteDriver as ApiFavoriteDriver, FavoriteRoute as ApiFavoriteRoute};
use guzo_api_types::payment::Payment as ApiPayment;
use guzo_api_types::pricing::{PricingRule as ApiPricingRule, Surge as ApiSurge};
use guzo_api_types::review::Review as ApiReview;
use guzo_api_types::trip::Trip as ApiTrip;
use guzo_api_types::user::UserProfile;
use guzo_api_types::vehicle::Vehicle as ApiVehicle;
use guzo_api_types::verification::Verification as ApiVerification;
use guzo_model::booking::{Booking, BookingView};
use guzo_model::favorite::{FavoriteDriverView, FavoriteRoute};
use guzo_model::payment::Payment;
use guzo_model::pricing::{PricingRule, SurgeMultiplier};
use guzo_model::review::ReviewView;
use guzo_model::trip::{DriverTrip, TripView};
use guzo_model::vehicle::Vehicle;
use guzo_model::verification::{DriverVerification, VerificationView};
use guzo_model::User;

pub fn user_profile(user: &User) -> UserProfile {
    UserProfile {
        id: user.id.0,
        email: user.email.clone(),
        phone: user.phone.clone(),
        full_name: user.full_name.clone(),
        role: user.role,
        active: user.active,
        verified: user.verified,
        online: user.online,
        rating: user.rating,
        total_ratings: user.total_ratings,
        language: user.language.clone(),
        profile_image: user.profile_image.clone(),
        verification_status: None,
        joined_at: user.created.into(),
    }
}

fn trip_base(trip: &DriverTrip) -> ApiTrip {
    ApiTrip {
        id: trip.id.0,
        driver_id: trip.driver_id.0,
        driver_name: None,
        driver_phone: None,
        driver_rating: None,
        vehicle_id: trip.vehicle_id.map(|v| v.0),
        origin: trip.origin.clone(),
        destination: trip.destination.clone(),
        departure_time: trip.departure_time.into(),
        estimated_arrival: trip.estimated_arrival.map(Into::into),
        available_seats: trip.available_seats,
        booked_seats: trip.booked_seats,
        remaining_seats: trip.remaining_seats(),
        price_per_seat: trip.price_per_seat,
        whole_car_price: trip.whole_car_price,
        status: trip.status,
        notes: trip.notes.clone(),
        waypoints: trip.waypoints.clone(),
        created_at: trip.created.into(),
    }
}

pub fn trip(trip: &DriverTrip) -> ApiTrip {
    trip_base(trip)
}

pub fn trip_view(view: &TripView) -> ApiTrip {
    ApiTrip {
        driver_name: view.driver_name.clone(),
        driver_phone: view.driver_phone.clone(),
        driver_rating: view.driver_rating,
        ..trip_base(&view.trip)
    }
}

fn booking_base(booking: &Booking) -> ApiBooking {
    ApiBooking {
        id: booking.id.0,
        customer_id: booking.customer_id.map(|v| v.0),
        customer_name: booking.customer_name.clone(),
        customer_phone: booking.customer_phone.clone(),
        trip_id: booking.trip_id.map(|v| v.0),
        booking_type: booking.booking_type,
        pickup_location: booking.pickup_location.clone(),
        dropoff_location: booking.dropoff_location.clone(),
        scheduled_time: booking.scheduled_time.into(),
        seats_booked: booking.seats_booked,
        price: booking.price,
        status: booking.status,
        assigned_driver_id: booking.assigned_driver_id.map(|v| v.0),
        driver_name: None,
        driver_phone: None,
        driver_rating: None,
        notes: booking.notes.clone(),
        special_requests: booking.special_requests.clone(),
        customer_review_id: booking.customer_review_id,
        driver_review_id: booking.driver_review_id,
        created_at: booking.created.into(),
        completed_at: booking.completed_at.map(Into::into),
    }
}

pub fn booking(booking: &Booking) -> ApiBooking {
    booking_base(booking)
}

pub fn booking_view(view: &BookingView) -> ApiBooking {
    ApiBooking {
        driver_name: view.driver_name.clone(),
        driver_phone: view.driver_phone.clone(),
        driver_rating: view.driver_rating,
        ..booking_base(&view.booking)
    }
}

pub fn vehicle(vehicle: &Vehicle) -> ApiVehicle {
    ApiVehicle {
        id: vehicle.id.0,
        driver_id: vehicle.driver_id.0,
        plate_number: vehicle.plate_number.clone(),
        make: vehicle.make.clone(),
        model: vehicle.model.clone(),
        year: vehicle.year,
        color: vehicle.color.clone(),
        vehicle_type: vehicle.vehicle_type,
        capacity: vehicle.capacity,
        active: vehicle.active,
        verified: vehicle.verified,
        created_at: vehicle.created.into(),
    }
}

pub fn payment(payment: &Payment) -> ApiPayment {
    ApiPayment {
        id: payment.id.0,
        booking_id: payment.booking_id.0,
        customer_id: payment.customer_id.map(|v| v.0),
        amount: payment.amount,
        currency: payment.currency.clone(),
        method: payment.method,
        status: payment.status,
        transaction_id: payment.transaction_id.clone(),
        transaction_ref: payment.transaction_ref.clone(),
        notes: payment.notes.clone(),
        created_at: payment.created.into(),
        completed_at: payment.completed_at.map(Into::into),
    }
}

pub fn pricing_rule(rule: &PricingRule) -> ApiPricingRule {
    ApiPricingRule {
        id: rule.id.0,
        origin: rule.origin.clone(),
        destination: rule.destination.clone(),
        base_fare: rule.base_fare,
        per_km_rate: rule.per_km_rate,
        estimated_distance_km: rule.estimated_distance_km,
        calculated_price: rule.calculated_price(),
        active: rule.active,
        created_at: rule.created.into(),
    }
}

pub fn surge(surge: &SurgeMultiplier) -> ApiSurge {
    ApiSurge {
        id: surge.id.0,
        route_key: surge.route_key.clone(),
        multiplier: surge.multiplier,
        reason: surge.reason,
        description: surge.description.clone(),
        starts_at: surge.starts_at.into(),
        ends_at: surge.ends_at.into(),
        active: surge.active,
        recurring: surge.recurring,
        created_at: surge.created.into(),
    }
}

pub fn review_view(view: &ReviewView) -> ApiReview {
    ApiReview {
        id: view.review.id.0,
        booking_id: view.review.booking_id.0,
        reviewer_id: view.review.reviewer_id.0,
        reviewee_id: view.review.reviewee_id.0,
        reviewer_role: view.review.reviewer_role,
        reviewer_name: view.reviewer_name.clone(),
        rating: view.review.rating,
        comment: view.review.comment.clone(),
        created_at: view.review.created.into(),
    }
}

pub fn review(review: &guzo_model::Review) -> ApiReview {
    ApiReview {
        id: review.id.0,
        booking_id: review.booking_id.0,
        reviewer_id: review.reviewer_id.0,
        reviewee_id: review.reviewee_id.0,
        reviewer_role: review.reviewer_role,
        reviewer_name: None,
        rating: review.rating,
        comment: review.comment.clone(),
        created_at: review.created.into(),
    }
}

pub fn favorite_route(route: &FavoriteRoute) -> ApiFavoriteRoute {
    ApiFavoriteRoute {
        id: route.id.0,
        user_id: route.user_id.0,
        origin: route.origin.clone(),
        destination: route.destination.clone(),
        use_count: route.use_count,
        last_used: route.last_used.map(Into::into),
        created_at: route.created.into(),
    }
}

pub fn favorite_driver(view: &FavoriteDriverView) -> ApiFavoriteDriver {
    ApiFavoriteDriver {
        id: view.favorite.id.0,
        user_id: view.favorite.user_id.0,
        driver_id: view.favorite.driver_id.0,
        driver_name: view.driver_name.clone(),
        driver_phone: view.driver_phone.clone(),
        driver_rating: view.driver_rating,
        note: view.favorite.note.clone(),
        created_at: view.favorite.created.into(),
    }
}

fn verification_base(verification: &DriverVerification) -> ApiVerification {
    ApiVerification {
        id: verification.id.0,
        driver_id: verification.driver_id.0,
        driver_name: None,
        driver_email: None,
        profile_photo: verification.profile_photo.clone(),
        license_document: verification.license_document.clone(),
        license_number: verification.license_number.clone(),
        license_expiry: verification.license_expiry.map(Into::into),
        vehicle_registration: verification.vehicle_registration.clone(),
        status: verification.status,
        admin_notes: verification.admin_notes.clone(),
        rejection_reason: verification.rejection_reason.clone(),
        submitted_at: verification.submitted_at.into(),
        reviewed_at: verification.reviewed_at.map(Into::into),
    }
}

pub fn verification(verification: &DriverVerification) -> ApiVerification {
    verification_base(verification)
}

pub fn verification_view(view: &VerificationView) -> ApiVerification {
    ApiVerification {
        driver_name: view.driver_name.clone(),
        driver_email: view.driver_email.clone(),
        ..verification_base(&view.verification)
    }
}

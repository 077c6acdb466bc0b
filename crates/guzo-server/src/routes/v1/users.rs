use axum::extract::Query;
use axum::response::{IntoResponse, Response};
use guzo_api_types::routes::admin::AnalyticsPeriod;
use guzo_api_types::routes::users::{
    LoginUser, LoginUserResponse, RegisterUser, RegisterUserResponse, ToggleOnlineResponse,
    UpdateProfile, UpdateSchedule,
};
use guzo_error::ApiError;
use guzo_utils::Sensitive;

use super::morphers;
use crate::extract::{Json, SessionDriver, SessionUser};
use crate::{services, App};

pub async fn register(app: App, Json(form): Json<RegisterUser>) -> Result<Response, ApiError> {
    let request = services::users::Register {
        email: Sensitive::new(&form.email),
        phone: Sensitive::new(&form.phone),
        full_name: &form.full_name,
        password: Sensitive::new(form.password.as_str()),
        role: form.role,
        language: Some(&form.language),
    };

    let response = request.perform(&app).await?;
    let response = Json(RegisterUserResponse {
        user: morphers::user_profile(&response.user),
    });

    Ok(response.into_response())
}

pub async fn login(app: App, Json(form): Json<LoginUser>) -> Result<Response, ApiError> {
    let request = services::users::Login {
        email: Sensitive::new(&form.email),
        password: Sensitive::new(form.password.as_str()),
    };

    let response = request.perform(&app).await?;
    let response = Json(LoginUserResponse {
        token: response.token,
        user: morphers::user_profile(&response.user),
    });

    Ok(response.into_response())
}

pub async fn me(session_user: SessionUser) -> Response {
    Json(morphers::user_profile(&session_user)).into_response()
}

pub async fn update_me(
    app: App,
    session_user: SessionUser,
    Json(form): Json<UpdateProfile>,
) -> Result<Response, ApiError> {
    let request = services::users::UpdateProfile {
        full_name: form.full_name.as_deref(),
        phone: form.phone.as_deref(),
        language: form.language.as_deref(),
        profile_image: form.profile_image.as_deref(),
    };

    let user = request.perform(&app, &session_user).await?;
    Ok(Json(morphers::user_profile(&user)).into_response())
}

pub async fn toggle_online(app: App, driver: SessionDriver) -> Result<Response, ApiError> {
    let user = services::users::ToggleOnline.perform(&app, &driver).await?;
    Ok(Json(ToggleOnlineResponse { online: user.online }).into_response())
}

pub async fn update_schedule(
    app: App,
    driver: SessionDriver,
    Json(form): Json<UpdateSchedule>,
) -> Result<Response, ApiError> {
    let request = services::users::UpdateSchedule {
        schedule: form.schedule,
    };

    let user = request.perform(&app, &driver).await?;
    Ok(Json(morphers::user_profile(&user)).into_response())
}

pub async fn my_earnings(
    app: App,
    driver: SessionDriver,
    Query(query): Query<AnalyticsPeriod>,
) -> Result<Response, ApiError> {
    let report = services::admin::GetDriverEarnings {
        driver_id: driver.id,
        period: query.period,
    }
    .perform(&app)
    .await?;

    Ok(Json(super::admin::earnings_response(report)).into_response())
}

#[cfg(test)]
mod tests {
    use crate::test_utils;
    use serde_json::json;

    mod register {
        use super::*;

        #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
        async fn should_register_rider(pool: sqlx::PgPool) {
            let app = test_utils::build_app(pool);
            let server = test_utils::test_server(&app);

            let response = server
                .post("/api/v1/users/register")
                .json(&json!({
                    "email": "abebe@example.com",
                    "phone": "+251911234567",
                    "full_name": "Abebe Kebede",
                    "password": "selam-addis",
                }))
                .await;

            response.assert_status_ok();
            response.assert_json_contains(&json!({
                "user": {
                    "email": "abebe@example.com",
                    "role": "rider",
                    "rating": 5.0,
                }
            }));
        }

        #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
        async fn should_reject_weak_passwords(pool: sqlx::PgPool) {
            let app = test_utils::build_app(pool);
            let server = test_utils::test_server(&app);

            let response = server
                .post("/api/v1/users/register")
                .json(&json!({
                    "email": "abebe@example.com",
                    "phone": "+251911234567",
                    "full_name": "Abebe Kebede",
                    "password": "abc",
                }))
                .await;

            response.assert_status_bad_request();
            response.assert_json_contains(&json!({
                "code": "register_user_failed",
                "subcode": "invalid_password",
            }));
        }
    }

    mod login {
        use super::*;

        #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
        async fn should_login_and_return_a_token(pool: sqlx::PgPool) {
            let app = test_utils::build_app(pool);
            let server = test_utils::test_server(&app);

            test_utils::users::rider_session(&app, "tigist").await;

            let response = server
                .post("/api/v1/users/login")
                .json(&json!({
                    "email": "tigist@example.com",
                    "password": test_utils::users::TEST_PASSWORD,
                }))
                .await;

            response.assert_status_ok();
            response.assert_json_contains(&json!({
                "user": { "email": "tigist@example.com" },
            }));

            let body: serde_json::Value = response.json();
            assert!(!body["token"].as_str().unwrap().is_empty());
        }

        #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
        async fn should_not_reveal_unknown_accounts(pool: sqlx::PgPool) {
            let app = test_utils::build_app(pool);
            let server = test_utils::test_server(&app);

            let response = server
                .post("/api/v1/users/login")
                .json(&json!({
                    "email": "ghost@example.com",
                    "password": "whatever-floats",
                }))
                .await;

            response.assert_status_forbidden();
            response.assert_json_contains(&json!({
                "code": "login_user_failed",
                "subcode": "invalid_credentials",
            }));
        }
    }

    mod me {
        use super::*;

        #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
        async fn should_get_their_profile(pool: sqlx::PgPool) {
            let app = test_utils::build_app(pool);
            let mut server = test_utils::test_server(&app);

            let rider = test_utils::users::rider_session(&app, "profile-rider").await;
            test_utils::users::authorize(&mut server, &app, &rider);

            let response = server.get("/api/v1/users/@me").await;
            response.assert_status_ok();
            response.assert_json_contains(&json!({
                "id": rider.id.0,
                "email": "profile-rider@example.com",
            }));
        }

        #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
        async fn should_restrict_if_no_auth_is_presented(pool: sqlx::PgPool) {
            let app = test_utils::build_app(pool);
            let server = test_utils::test_server(&app);

            let response = server.get("/api/v1/users/@me").await;
            response.assert_status_unauthorized();
            response.assert_json_contains(&json!({ "code": "access_denied" }));
        }
    }
}

use std::sync::LazyLock;
use validator::ValidateEmail;

use super::App;

// E.164-ish with an optional leading +, the way Ethiopian mobile
// numbers arrive from the clients
static PHONE_REGEX: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^\+?[0-9]{9,15}$").unwrap());

impl App {
    /// Validates an email address.
    #[must_use]
    pub fn validate_email(&self, email: &str) -> bool {
        !email.is_empty() && email.validate_email()
    }

    /// Validates a phone number. Digits only with an optional `+`
    /// prefix, between 9 and 15 digits.
    #[must_use]
    pub fn validate_phone(&self, phone: &str) -> bool {
        PHONE_REGEX.is_match(phone)
    }

    /// Validates a display name: 2 to 100 characters of visible text.
    #[must_use]
    pub fn validate_full_name(&self, name: &str) -> bool {
        let trimmed = name.trim();
        (2..=100).contains(&trimmed.chars().count())
    }

    /// Validates a plaintext password before it gets hashed.
    #[must_use]
    pub fn validate_password(&self, password: &str) -> bool {
        password.len() >= 6
    }
}

#[cfg(test)]
mod tests {
    use crate::App;
    use guzo_db::PgPool;

    fn app_stub() -> App {
        // validators never touch the database
        App::new_for_tests(PgPool::build_for_tests(
            sqlx::postgres::PgPoolOptions::new().connect_lazy("postgres://localhost/unused").unwrap(),
        ))
    }

    #[tokio::test]
    async fn validates_phone_numbers() {
        let app = app_stub();
        assert!(app.validate_phone("+251911234567"));
        assert!(app.validate_phone("0911234567"));
        assert!(!app.validate_phone("call me maybe"));
        assert!(!app.validate_phone("+12"));
    }

    #[tokio::test]
    async fn validates_emails() {
        let app = app_stub();
        assert!(app.validate_email("abebe@example.com"));
        assert!(!app.validate_email(""));
        assert!(!app.validate_email("not-an-email"));
    }
}

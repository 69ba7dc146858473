//! Environment variable handling.

use std::env;

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable as a boolean.
pub fn get_bool(name: &str) -> bool {
    get_var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Environment variable names read by ReportCast.
pub mod vars {
    /// Base directory override (defaults to `~/.reportcast`).
    pub const REPORTCAST_HOME: &str = "REPORTCAST_HOME";

    /// Config file override.
    pub const REPORTCAST_CONFIG: &str = "REPORTCAST_CONFIG";

    /// SMS/LMS gateway API key.
    pub const REPORTCAST_SMS_API_KEY: &str = "REPORTCAST_SMS_API_KEY";

    /// Kakao alimtalk API key.
    pub const REPORTCAST_KAKAO_API_KEY: &str = "REPORTCAST_KAKAO_API_KEY";

    /// SMTP password for the email channel.
    pub const REPORTCAST_SMTP_PASSWORD: &str = "REPORTCAST_SMTP_PASSWORD";

    /// Force gateway test mode regardless of config.
    pub const REPORTCAST_TEST_MODE: &str = "REPORTCAST_TEST_MODE";
}

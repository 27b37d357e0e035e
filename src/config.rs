use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    pub ttl_minutes: i64,
}

/// How the SMTP connection is secured (`SMTP_TLS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTls {
    /// Plain connection, upgraded with STARTTLS when the server offers it.
    Opportunistic,
    /// STARTTLS is mandatory.
    Starttls,
    /// Implicit TLS from the first byte, usually port 465.
    Wrapper,
    None,
}

impl SmtpTls {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(match raw.trim().to_ascii_lowercase().as_str() {
            "" | "opportunistic" => SmtpTls::Opportunistic,
            "starttls" | "required" => SmtpTls::Starttls,
            "wrapper" | "tls" | "ssl" => SmtpTls::Wrapper,
            "none" | "off" => SmtpTls::None,
            other => anyhow::bail!("unknown SMTP_TLS mode {other:?}"),
        })
    }
}

/// SMTP settings. Without a host the OTP mail is only written to the log.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_tls: SmtpTls,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub otp: OtpConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "smartbus".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "smartbus-users".into()),
            ttl: match std::env::var("JWT_EXPIRES_IN") {
                Ok(raw) => parse_duration(&raw)
                    .with_context(|| format!("invalid JWT_EXPIRES_IN: {raw}"))?,
                Err(_) => Duration::from_secs(7 * 24 * 60 * 60),
            },
        };
        let otp = OtpConfig {
            ttl_minutes: std::env::var("OTP_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(15),
        };
        let mail = MailConfig {
            smtp_host: non_empty_var("SMTP_HOST"),
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            smtp_tls: match non_empty_var("SMTP_TLS") {
                Some(raw) => SmtpTls::parse(&raw)?,
                None => SmtpTls::Opportunistic,
            },
            smtp_user: non_empty_var("SMTP_USER"),
            smtp_pass: non_empty_var("SMTP_PASS"),
            from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "SmartBus <no-reply@smartbus.com>".into()),
        };
        Ok(Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(5000),
            jwt,
            otp,
            mail,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Longest accepted token lifetime.
const MAX_LIFETIME_SECS: u64 = 100 * YEAR_SECS;
const YEAR_SECS: u64 = 31_557_600; // 365.25 days

/// Parses lifetimes like `3600`, `90s`, `30m`, `12h`, `7d`, `2w` or `1y`.
/// A bare number is seconds.
pub fn parse_duration(raw: &str) -> anyhow::Result<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => raw.split_at(idx),
        None => (raw, "s"),
    };
    let value: u64 = digits.parse().context("expected a number")?;
    let unit_secs: u64 = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        "w" => 7 * 24 * 60 * 60,
        "y" => YEAR_SECS,
        other => anyhow::bail!("unknown duration unit {other:?}"),
    };
    let secs = value
        .checked_mul(unit_secs)
        .filter(|s| *s <= MAX_LIFETIME_SECS)
        .with_context(|| format!("duration {raw:?} is longer than 100 years"))?;
    Ok(Duration::from_secs(secs))
}

use std::env;
use std::fmt::Write;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One automatic reminder: fire `hours` before the appointment using `template`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderInterval {
    pub hours: i64,
    pub template: String,
}

impl ReminderInterval {
    pub fn new(hours: i64, template: &str) -> Self {
        Self {
            hours,
            template: template.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub reminder_intervals: Vec<ReminderInterval>,
    pub retry_delay_minutes: Vec<i64>,
    pub max_retries: u32,
    pub batch_size: usize,
    pub queue_interval_seconds: u64,
    pub provider_timeout_seconds: u64,
    pub claim_ttl_seconds: i64,
    pub display_date_format: String,
    pub utc_offset_minutes: i32,
    pub email_failure_rate: f64,
    pub sms_failure_rate: f64,
    pub push_failure_rate: f64,
}

pub const DEFAULT_REMINDER_INTERVALS: &str = "24:APPOINTMENT_REMINDER_24H,2:APPOINTMENT_REMINDER_2H";
pub const DEFAULT_RETRY_DELAY_MINUTES: &str = "5,15,60";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3000,
            reminder_intervals: vec![
                ReminderInterval::new(24, "APPOINTMENT_REMINDER_24H"),
                ReminderInterval::new(2, "APPOINTMENT_REMINDER_2H"),
            ],
            retry_delay_minutes: vec![5, 15, 60],
            max_retries: 3,
            batch_size: 50,
            queue_interval_seconds: 300,
            provider_timeout_seconds: 10,
            claim_ttl_seconds: 600,
            display_date_format: "%d/%m/%Y".to_string(),
            utc_offset_minutes: 0,
            email_failure_rate: 0.10,
            sms_failure_rate: 0.15,
            push_failure_rate: 0.05,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let reminder_intervals = match env::var("REMINDER_INTERVALS") {
            Ok(raw) => parse_reminder_intervals(&raw).unwrap_or_else(|| {
                warn!("REMINDER_INTERVALS is malformed ({}), using default", raw);
                defaults.reminder_intervals.clone()
            }),
            Err(_) => {
                warn!("REMINDER_INTERVALS not set, using default {}", DEFAULT_REMINDER_INTERVALS);
                defaults.reminder_intervals.clone()
            }
        };

        let retry_delay_minutes = match env::var("RETRY_DELAY_MINUTES") {
            Ok(raw) => parse_delay_list(&raw).unwrap_or_else(|| {
                warn!("RETRY_DELAY_MINUTES is malformed ({}), using default", raw);
                defaults.retry_delay_minutes.clone()
            }),
            Err(_) => {
                warn!("RETRY_DELAY_MINUTES not set, using default {}", DEFAULT_RETRY_DELAY_MINUTES);
                defaults.retry_delay_minutes.clone()
            }
        };

        let config = Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            reminder_intervals,
            retry_delay_minutes,
            max_retries: env_or("NOTIFICATION_MAX_RETRIES", defaults.max_retries),
            batch_size: env_or("NOTIFICATION_BATCH_SIZE", defaults.batch_size),
            queue_interval_seconds: env_or("QUEUE_INTERVAL_SECONDS", defaults.queue_interval_seconds),
            provider_timeout_seconds: env_or("PROVIDER_TIMEOUT_SECONDS", defaults.provider_timeout_seconds),
            claim_ttl_seconds: env_or("CLAIM_TTL_SECONDS", defaults.claim_ttl_seconds),
            display_date_format: match env::var("DISPLAY_DATE_FORMAT") {
                Ok(raw) if is_valid_date_format(&raw) => raw,
                Ok(raw) => {
                    warn!("DISPLAY_DATE_FORMAT '{}' cannot format a date, using default", raw);
                    defaults.display_date_format.clone()
                }
                Err(_) => {
                    warn!("DISPLAY_DATE_FORMAT not set, using default");
                    defaults.display_date_format.clone()
                }
            },
            utc_offset_minutes: env_or("SCHEDULER_UTC_OFFSET_MINUTES", defaults.utc_offset_minutes),
            email_failure_rate: env_or("EMAIL_FAILURE_RATE", defaults.email_failure_rate),
            sms_failure_rate: env_or("SMS_FAILURE_RATE", defaults.sms_failure_rate),
            push_failure_rate: env_or("PUSH_FAILURE_RATE", defaults.push_failure_rate),
        };

        if !config.is_configured() {
            warn!("Notification scheduling not fully configured - check reminder intervals, retry delays and max retries");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.reminder_intervals.is_empty()
            && !self.retry_delay_minutes.is_empty()
            && self.max_retries > 0
            && self.batch_size > 0
    }

    /// Config with simulated providers that never fail, for tests and local runs.
    pub fn reliable_delivery(mut self) -> Self {
        self.email_failure_rate = 0.0;
        self.sms_failure_rate = 0.0;
        self.push_failure_rate = 0.0;
        self
    }
}

fn env_or<T: FromStr + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {}", key, default);
            default
        }
    }
}

/// Whether `format` renders a calendar date. Malformed specifiers and
/// time-of-day fields such as `%H` make chrono's `Display` fail.
pub fn is_valid_date_format(format: &str) -> bool {
    let Some(sample) = NaiveDate::from_ymd_opt(2030, 1, 10) else {
        return false;
    };
    let mut rendered = String::new();
    write!(rendered, "{}", sample.format(format)).is_ok()
}

/// Parses `24:TEMPLATE_A,2:TEMPLATE_B`.
pub fn parse_reminder_intervals(raw: &str) -> Option<Vec<ReminderInterval>> {
    let mut intervals = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (hours, template) = entry.split_once(':')?;
        let hours: i64 = hours.trim().parse().ok()?;
        let template = template.trim();
        if hours <= 0 || template.is_empty() {
            return None;
        }
        intervals.push(ReminderInterval::new(hours, template));
    }
    if intervals.is_empty() {
        None
    } else {
        Some(intervals)
    }
}

/// Parses `5,15,60`.
pub fn parse_delay_list(raw: &str) -> Option<Vec<i64>> {
    let delays = raw
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(|e| e.parse::<i64>().ok().filter(|d| *d >= 0))
        .collect::<Option<Vec<_>>>()?;
    if delays.is_empty() {
        None
    } else {
        Some(delays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reminder_intervals() {
        let intervals = parse_reminder_intervals("24:APPOINTMENT_REMINDER_24H, 2:APPOINTMENT_REMINDER_2H").unwrap();
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0], ReminderInterval::new(24, "APPOINTMENT_REMINDER_24H"));
        assert_eq!(intervals[1].hours, 2);
    }

    #[test]
    fn rejects_malformed_reminder_intervals() {
        assert!(parse_reminder_intervals("24").is_none());
        assert!(parse_reminder_intervals("x:TEMPLATE").is_none());
        assert!(parse_reminder_intervals("-2:TEMPLATE").is_none());
        assert!(parse_reminder_intervals("").is_none());
    }

    #[test]
    fn parses_delay_list() {
        assert_eq!(parse_delay_list("5,15,60"), Some(vec![5, 15, 60]));
        assert_eq!(parse_delay_list("5,,15"), Some(vec![5, 15]));
        assert!(parse_delay_list("5,abc").is_none());
        assert!(parse_delay_list("-1").is_none());
    }

    #[test]
    fn date_format_must_render_a_date() {
        assert!(is_valid_date_format("%d/%m/%Y"));
        assert!(is_valid_date_format("%Y-%m-%d"));
        assert!(!is_valid_date_format("%d/%m/%Y %H:%M"));
        assert!(!is_valid_date_format("%Q"));
        assert!(is_valid_date_format(&AppConfig::default().display_date_format));
    }

    #[test]
    fn default_config_is_configured() {
        let config = AppConfig::default();
        assert!(config.is_configured());
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.batch_size, 50);

        let reliable = config.reliable_delivery();
        assert_eq!(reliable.email_failure_rate, 0.0);
    }
}

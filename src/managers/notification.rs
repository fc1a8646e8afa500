//! Discord webhook notification manager
//!
//! Sends notifications to Discord via webhooks for backup and restore runs.

use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::{NotificationConfig, NotifyEvent};

/// Longest error text placed in an embed field
const MAX_ERROR_CHARS: usize = 500;

/// Notification collaborator used by the pipeline
pub trait Notifier: Send {
    fn send_notification(&self, notification: &Notification) -> Result<()>;
}

/// Discord embed color codes (decimal)
#[derive(Debug, Clone, Copy)]
pub enum NotificationColor {
    /// Red - for failures
    Failure = 15158332,    // #E74C3C
    /// Orange - for warnings and cancelled runs
    Warning = 15105570,    // #E67E22
    /// Green - for success
    Success = 3066993,     // #2ECC71
}

impl NotificationColor {
    fn as_decimal(&self) -> u32 {
        *self as u32
    }
}

/// Notification payload to send
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub event: NotifyEvent,
    pub message: String,
    pub error: Option<String>,
    pub duration_secs: Option<u64>,
}

impl Notification {
    pub fn success(message: impl Into<String>, duration_secs: u64) -> Self {
        Self {
            event: NotifyEvent::Success,
            message: message.into(),
            error: None,
            duration_secs: Some(duration_secs),
        }
    }

    pub fn failure(message: impl Into<String>, error: impl Into<String>, duration_secs: u64) -> Self {
        Self {
            event: NotifyEvent::Failure,
            message: message.into(),
            error: Some(error.into()),
            duration_secs: Some(duration_secs),
        }
    }

    pub fn warning(message: impl Into<String>, duration_secs: u64) -> Self {
        Self {
            event: NotifyEvent::Warning,
            message: message.into(),
            error: None,
            duration_secs: Some(duration_secs),
        }
    }
}

/// Discord webhook payload
#[derive(Debug, Serialize)]
struct DiscordPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<DiscordField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<DiscordFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

#[derive(Debug, Serialize)]
struct DiscordField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct DiscordFooter {
    text: String,
}

/// Notifier posting embeds to a Discord webhook
pub struct DiscordNotifier {
    config: NotificationConfig,
}

impl DiscordNotifier {
    pub fn new(config: NotificationConfig) -> Self {
        Self { config }
    }

    /// Build a notifier only when a webhook URL is configured
    pub fn from_config(config: &NotificationConfig) -> Option<Self> {
        if config.discord_webhook_url.trim().is_empty() {
            None
        } else {
            Some(Self::new(config.clone()))
        }
    }

    /// Check if notifications are enabled for an event type
    pub fn is_enabled(&self, event: &NotifyEvent) -> bool {
        if self.config.discord_webhook_url.is_empty() {
            return false;
        }
        self.config.notify_on.contains(event)
    }

    /// Build Discord webhook payload
    fn build_payload(&self, notification: &Notification) -> DiscordPayload {
        let (color, emoji) = match notification.event {
            NotifyEvent::Failure => (NotificationColor::Failure, "\u{274C}"), // Red X
            NotifyEvent::Warning => (NotificationColor::Warning, "\u{26A0}\u{FE0F}"), // Warning
            NotifyEvent::Success => (NotificationColor::Success, "\u{2705}"), // Green check
        };

        let title = format!("{} DB Backup Manager: {:?}", emoji, notification.event);

        let mut fields = Vec::new();

        if let Some(duration) = notification.duration_secs {
            fields.push(DiscordField {
                name: "Duration".to_string(),
                value: format_duration(duration),
                inline: true,
            });
        }

        if let Some(ref error) = notification.error {
            fields.push(DiscordField {
                name: "Error".to_string(),
                value: format!("```\n{}\n```", truncate(error, MAX_ERROR_CHARS)),
                inline: false,
            });
        }

        let embed = DiscordEmbed {
            title,
            description: Some(notification.message.clone()),
            color: color.as_decimal(),
            fields,
            footer: Some(DiscordFooter {
                text: "db-backup-manager".to_string(),
            }),
            timestamp: Some(chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        };

        DiscordPayload {
            username: Some("DB Backup Manager".to_string()),
            embeds: vec![embed],
        }
    }

    /// Send webhook to Discord
    fn send_webhook(&self, payload: &DiscordPayload) -> Result<()> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let response = client
            .post(&self.config.discord_webhook_url)
            .json(payload)
            .send()
            .context("Failed to send Discord webhook")?;

        let status = response.status();
        if status.is_success() {
            debug!("Discord webhook sent successfully");
            Ok(())
        } else {
            let body = response.text().unwrap_or_default();
            error!("Discord webhook failed with status {}: {}", status, body);
            anyhow::bail!("Discord webhook failed with status {}: {}", status, body)
        }
    }
}

impl Notifier for DiscordNotifier {
    fn send_notification(&self, notification: &Notification) -> Result<()> {
        if !self.is_enabled(&notification.event) {
            debug!("Notification type {:?} not enabled, skipping", notification.event);
            return Ok(());
        }

        let payload = self.build_payload(notification);
        self.send_webhook(&payload)?;

        info!("Sent {:?} notification", notification.event);
        Ok(())
    }
}

/// Shorten `text` to at most `max` characters, marking the cut
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

/// Format duration in human-readable form
fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        let minutes = seconds / 60;
        let secs = seconds % 60;
        if secs == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}m {}s", minutes, secs)
        }
    } else {
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        if minutes == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, minutes)
        }
    }
}

//! Reminder delivery.
//!
//! The engine hands a fully-rendered [`ReminderNotice`] to a [`Notifier`];
//! the shipped implementation posts it as JSON to a configured webhook
//! endpoint, which is where a mail or push gateway hangs off in deployment.

use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Serialize;
use std::env;
use url::Url;

/// ---------------------------------------------------------------------------
/// Errors
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
  #[error("client {0} has no contact email on file")]
  MissingContact(i64),

  #[error("NOTIFY_WEBHOOK_URL is not set")]
  MissingWebhookUrl,

  #[error("invalid webhook URL: {0}")]
  InvalidUrl(#[from] url::ParseError),

  #[error("webhook request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("webhook returned status {0}")]
  Status(u16),
}

/// ---------------------------------------------------------------------------
/// Notice
/// ---------------------------------------------------------------------------

/// Everything a delivery channel needs to render a reminder.
#[derive(Debug, Clone, Serialize)]
pub struct ReminderNotice {
  pub schedule_id: i64,
  pub recipient_name: String,
  pub recipient_email: String,
  pub workout_name: String,
  pub scheduled_for: NaiveDateTime,
  pub description: Option<String>,
}

impl ReminderNotice {
  pub fn subject(&self) -> String {
    format!("Reminder: Your workout '{}' is coming up", self.workout_name)
  }

  pub fn body(&self) -> String {
    let mut body = format!(
      "Hi {},\n\nYour workout '{}' is scheduled for {}.",
      self.recipient_name,
      self.workout_name,
      self.scheduled_for.format("%A, %B %-d at %-I:%M %p"),
    );
    if let Some(description) = &self.description {
      body.push_str("\n\n");
      body.push_str(description);
    }
    body
  }
}

/// ---------------------------------------------------------------------------
/// Notifier
/// ---------------------------------------------------------------------------

#[allow(async_fn_in_trait)]
pub trait Notifier {
  async fn send(&self, notice: &ReminderNotice) -> Result<(), NotifyError>;
}

/// Posts reminder notices as JSON to a webhook endpoint.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
  client: Client,
  endpoint: Url,
}

impl WebhookNotifier {
  pub fn new(endpoint: &str) -> Result<Self, NotifyError> {
    Ok(Self {
      client: Client::new(),
      endpoint: Url::parse(endpoint)?,
    })
  }

  /// Endpoint from `NOTIFY_WEBHOOK_URL`.
  pub fn from_env() -> Result<Self, NotifyError> {
    let endpoint = env::var("NOTIFY_WEBHOOK_URL").map_err(|_| NotifyError::MissingWebhookUrl)?;
    Self::new(&endpoint)
  }
}

impl Notifier for WebhookNotifier {
  async fn send(&self, notice: &ReminderNotice) -> Result<(), NotifyError> {
    let payload = serde_json::json!({
      "schedule_id": notice.schedule_id,
      "to": notice.recipient_email,
      "subject": notice.subject(),
      "body": notice.body(),
      "scheduled_for": notice.scheduled_for,
    });

    let response = self
      .client
      .post(self.endpoint.clone())
      .json(&payload)
      .send()
      .await?;

    if !response.status().is_success() {
      return Err(NotifyError::Status(response.status().as_u16()));
    }
    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::at;

  fn sample_notice() -> ReminderNotice {
    ReminderNotice {
      schedule_id: 42,
      recipient_name: "Avery".to_string(),
      recipient_email: "avery@example.com".to_string(),
      workout_name: "Push Day".to_string(),
      scheduled_for: at(2025, 3, 12, 17, 0),
      description: Some("Focus on tempo".to_string()),
    }
  }

  #[test]
  fn notice_renders_subject_and_body() {
    let notice = sample_notice();
    assert_eq!(notice.subject(), "Reminder: Your workout 'Push Day' is coming up");
    let body = notice.body();
    assert!(body.contains("Hi Avery"));
    assert!(body.contains("Push Day"));
    assert!(body.contains("Focus on tempo"));
  }

  #[tokio::test]
  async fn webhook_posts_notice_as_json() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/reminders")
      .match_header("content-type", "application/json")
      .match_body(mockito::Matcher::PartialJsonString(
        r#"{"schedule_id": 42, "to": "avery@example.com"}"#.to_string(),
      ))
      .with_status(200)
      .create_async()
      .await;

    let notifier = WebhookNotifier::new(&format!("{}/reminders", server.url())).unwrap();
    notifier.send(&sample_notice()).await.unwrap();

    mock.assert_async().await;
  }

  #[tokio::test]
  async fn webhook_surfaces_error_status() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/reminders")
      .with_status(502)
      .create_async()
      .await;

    let notifier = WebhookNotifier::new(&format!("{}/reminders", server.url())).unwrap();
    let err = notifier.send(&sample_notice()).await.unwrap_err();
    assert!(matches!(err, NotifyError::Status(502)));
  }

  #[test]
  fn rejects_invalid_endpoint() {
    assert!(matches!(
      WebhookNotifier::new("not a url"),
      Err(NotifyError::InvalidUrl(_))
    ));
  }
}

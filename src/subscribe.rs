//! Newsletter subscribe form.

use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::header::ACCEPT;

use crate::analytics::{AnalyticsEvent, AnalyticsSink, track};
use crate::error::{Error, Result};

/// Shown after the endpoint accepted the subscription.
pub const SUCCESS_MESSAGE: &str = "¡Gracias! Revisa tu correo para confirmar.";

/// Shown when the submission failed for any reason.
pub const ERROR_MESSAGE: &str = "Error enviando. Por favor inténtalo de nuevo.";

/// Method reported with the `subscribe` analytics event.
pub const SUBSCRIBE_METHOD: &str = "formspree";

/// What the form shows after a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// Accepted; the form is reset.
    Accepted,
    /// Rejected or unreachable; the fields are kept.
    Failed,
    /// A submission was already in flight; nothing was sent.
    Busy,
}

impl SubscribeOutcome {
    /// Status message for the visitor, if any.
    #[must_use]
    pub const fn message(self) -> Option<&'static str> {
        match self {
            Self::Accepted => Some(SUCCESS_MESSAGE),
            Self::Failed => Some(ERROR_MESSAGE),
            Self::Busy => None,
        }
    }
}

/// Re-enables the submit control when dropped.
struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The subscribe form, posting to its `action` URL.
#[derive(Debug)]
pub struct SubscribeForm {
    client: reqwest::Client,
    action: String,
    submitting: AtomicBool,
}

impl SubscribeForm {
    #[must_use]
    pub fn new(client: reqwest::Client, action: impl Into<String>) -> Self {
        Self {
            client,
            action: action.into(),
            submitting: AtomicBool::new(false),
        }
    }

    /// Whether the submit control is currently disabled.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    /// Posts the form fields and returns the endpoint's JSON reply.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-2xx status, or a reply
    /// that is not JSON.
    pub async fn post(&self, fields: &[(&str, &str)]) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(&self.action)
            .header(ACCEPT, "application/json")
            .form(fields)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Subscribe(format!("endpoint returned {status}")));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Submits the form with the control disabled for the duration.
    ///
    /// A success fires the `subscribe` event. Failures are logged and turned
    /// into [`SubscribeOutcome::Failed`].
    pub async fn submit(
        &self,
        fields: &[(&str, &str)],
        analytics: &dyn AnalyticsSink,
    ) -> SubscribeOutcome {
        if self.submitting.swap(true, Ordering::SeqCst) {
            log::debug!("subscribe already in flight");
            return SubscribeOutcome::Busy;
        }
        let _guard = SubmitGuard(&self.submitting);

        match self.post(fields).await {
            Ok(_) => {
                log::info!("subscription accepted");
                track(
                    analytics,
                    &AnalyticsEvent::Subscribe {
                        method: SUBSCRIBE_METHOD.to_string(),
                    },
                );
                SubscribeOutcome::Accepted
            }
            Err(e) => {
                log::warn!("subscription failed: {e}");
                SubscribeOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::RecordingAnalytics;
    use std::collections::HashMap;

    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;

    async fn spawn_server() -> String {
        let app = Router::new()
            .route(
                "/ok",
                post(|axum::Form(fields): axum::Form<HashMap<String, String>>| async move {
                    axum::Json(serde_json::json!({ "ok": true, "email": fields.get("email") }))
                }),
            )
            .route("/fail", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .route("/html", post(|| async { "<html>thanks</html>" }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn outcome_messages() {
        assert_eq!(SubscribeOutcome::Accepted.message(), Some(SUCCESS_MESSAGE));
        assert_eq!(SubscribeOutcome::Failed.message(), Some(ERROR_MESSAGE));
        assert_eq!(SubscribeOutcome::Busy.message(), None);
    }

    #[tokio::test]
    async fn post_returns_json_reply() {
        let base = spawn_server().await;
        let form = SubscribeForm::new(reqwest::Client::new(), format!("{base}/ok"));
        let reply = form.post(&[("email", "ana@example.com")]).await.unwrap();
        assert_eq!(reply["email"], "ana@example.com");
    }

    #[tokio::test]
    async fn accepted_submission_fires_event() {
        let base = spawn_server().await;
        let form = SubscribeForm::new(reqwest::Client::new(), format!("{base}/ok"));
        let analytics = RecordingAnalytics::new();

        let outcome = form.submit(&[("email", "ana@example.com")], &analytics).await;

        assert_eq!(outcome, SubscribeOutcome::Accepted);
        assert!(!form.is_submitting());
        let events = analytics.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "subscribe");
        assert_eq!(events[0].params["method"], "formspree");
    }

    #[tokio::test]
    async fn server_error_fails_without_event() {
        let base = spawn_server().await;
        let form = SubscribeForm::new(reqwest::Client::new(), format!("{base}/fail"));
        let analytics = RecordingAnalytics::new();

        let outcome = form.submit(&[("email", "ana@example.com")], &analytics).await;

        assert_eq!(outcome, SubscribeOutcome::Failed);
        assert!(analytics.events().is_empty());
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn non_json_reply_fails() {
        let base = spawn_server().await;
        let form = SubscribeForm::new(reqwest::Client::new(), format!("{base}/html"));
        assert!(matches!(
            form.post(&[("email", "ana@example.com")]).await,
            Err(Error::Json(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails() {
        let form = SubscribeForm::new(reqwest::Client::new(), "http://127.0.0.1:9/subscribe");
        let outcome = form.submit(&[], &RecordingAnalytics::new()).await;
        assert_eq!(outcome, SubscribeOutcome::Failed);
    }
}

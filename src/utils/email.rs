use anyhow::{Context, Result};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::config::Config;

/// SMTP notification sender. Built once at startup; `None` when SMTP is
/// not configured, in which case callers log and move on. A stuck relay
/// must never block a check-in, so sends are spawned fire-and-forget.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn from_config(config: &Config) -> Option<Self> {
        let host = config.smtp_host.as_deref()?;

        let transport = match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host) {
            Ok(builder) => builder
                .port(config.smtp_port)
                .credentials(Credentials::new(
                    config.smtp_username.clone(),
                    config.smtp_password.clone(),
                ))
                .build(),
            Err(e) => {
                tracing::error!(error = %e, host, "SMTP relay setup failed, mail disabled");
                return None;
            }
        };

        let from = match format!("Attendance System <{}>", config.from_email).parse() {
            Ok(mb) => mb,
            Err(e) => {
                tracing::error!(error = %e, "FROM_EMAIL is not a valid mailbox, mail disabled");
                return None;
            }
        };

        Some(Self { transport, from })
    }

    async fn send_html(&self, to: &str, subject: &str, html: String) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse().context("invalid recipient address")?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)
            .context("failed to build message")?;

        self.transport
            .send(message)
            .await
            .context("SMTP send failed")?;
        Ok(())
    }

    pub async fn send_check_in(&self, to: &str, name: &str, time: &str, status: &str) -> Result<()> {
        self.send_html(
            to,
            &format!("Check-in Confirmation - {status}"),
            format!(
                "<h1>Check-in Confirmed</h1>\
                 <p>Hi {name},</p>\
                 <p>You have checked in at <strong>{time}</strong>.</p>\
                 <p>Status: <strong>{status}</strong></p>\
                 <p>Have a great shift!</p>"
            ),
        )
        .await
    }

    pub async fn send_check_out(
        &self,
        to: &str,
        name: &str,
        time: &str,
        duration: &str,
    ) -> Result<()> {
        self.send_html(
            to,
            "Check-out Confirmation",
            format!(
                "<h1>Check-out Confirmed</h1>\
                 <p>Hi {name},</p>\
                 <p>You have checked out at <strong>{time}</strong>.</p>\
                 <p>Shift duration: <strong>{duration}</strong></p>\
                 <p>Rest well!</p>"
            ),
        )
        .await
    }

    pub async fn send_welcome(&self, to: &str, name: &str) -> Result<()> {
        self.send_html(
            to,
            "Welcome to the Attendance System",
            format!(
                "<h1>Welcome, {name}!</h1>\
                 <p>Your account has been created. You can now log in with \
                 this address to check in and out of your shifts.</p>"
            ),
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn send_late_request(
        &self,
        to: &str,
        employee: &str,
        shift_date: &str,
        requested_time: &str,
        reason: &str,
        approve_link: &str,
        reject_link: &str,
    ) -> Result<()> {
        self.send_html(
            to,
            &format!("Late Arrival Request - {employee}"),
            format!(
                "<h1>Late Arrival Request</h1>\
                 <p><strong>{employee}</strong> requests a late check-in for \
                 shift <strong>{shift_date}</strong>.</p>\
                 <p>Requested time: <strong>{requested_time}</strong></p>\
                 <p>Reason: {reason}</p>\
                 <p><a href=\"{approve_link}\">Approve</a> | \
                 <a href=\"{reject_link}\">Reject</a></p>"
            ),
        )
        .await
    }

    pub async fn send_late_decision(
        &self,
        to: &str,
        name: &str,
        shift_date: &str,
        decision: &str,
    ) -> Result<()> {
        self.send_html(
            to,
            &format!("Late Arrival Request {decision}"),
            format!(
                "<h1>Request {decision}</h1>\
                 <p>Hi {name},</p>\
                 <p>Your late arrival request for <strong>{shift_date}</strong> \
                 has been <strong>{decision}</strong>.</p>"
            ),
        )
        .await
    }
}

/// Spawns a notification without awaiting it; delivery failures are
/// logged, never surfaced to the request.
pub fn spawn_notification<F>(label: &'static str, fut: F)
where
    F: std::future::Future<Output = Result<()>> + 'static,
{
    actix_web::rt::spawn(async move {
        if let Err(e) = fut.await {
            tracing::error!(error = %e, label, "Email notification failed");
        }
    });
}

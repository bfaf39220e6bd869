//! Best-effort delivery of finished games to the player's mailbox.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::{NotifyConfig, RelayApiConfig, SmtpConfig};

pub const MAIL_SUBJECT: &str = "Game PGN";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Invalid mail address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },
    #[error("Failed to build mail message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("Relay API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Relay API returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// A way of handing a PGN document to an external recipient.
#[async_trait]
pub trait NotifyTransport: Send + Sync {
    /// Deliver `pgn` as the message body.
    async fn deliver(&self, pgn: &str) -> Result<(), NotifyError>;

    /// Short name for log fields.
    fn name(&self) -> &'static str;
}

/// Build the transport selected by `config`.
pub fn build_transport(config: &NotifyConfig) -> Result<Box<dyn NotifyTransport>, NotifyError> {
    Ok(match config {
        NotifyConfig::Smtp(smtp) => Box::new(SmtpTransport::new(smtp)?),
        NotifyConfig::RelayApi(relay) => Box::new(RelayApiTransport::new(relay)),
    })
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse().map_err(|source| NotifyError::Address {
        address: address.to_string(),
        source,
    })
}

/// Splits `host:port`; a bare host keeps the transport's default port.
fn split_host_port(server: &str) -> (&str, Option<u16>) {
    match server.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host, Some(port)),
            Err(_) => (server, None),
        },
        None => (server, None),
    }
}

/// Plain SMTP, or SMTP over implicit TLS when encryption is enabled.
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpTransport {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let (host, port) = split_host_port(&config.server);
        let mut builder = if config.encryption {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };
        if let Some(port) = port {
            builder = builder.port(port);
        }
        if let Some(user) = &config.user {
            let password = config.password.clone().unwrap_or_default();
            builder = builder.credentials(Credentials::new(user.clone(), password));
        }

        Ok(Self {
            mailer: builder.build(),
            from: parse_mailbox(&config.from)?,
            to: parse_mailbox(&config.recipient)?,
        })
    }
}

#[async_trait]
impl NotifyTransport for SmtpTransport {
    async fn deliver(&self, pgn: &str) -> Result<(), NotifyError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(MAIL_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(pgn.to_string())?;
        self.mailer.send(message).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

/// Hosted mail relay reached over HTTPS with a form post and basic auth.
pub struct RelayApiTransport {
    http: reqwest::Client,
    url: String,
    api_key: String,
    from: String,
    to: String,
}

impl RelayApiTransport {
    pub fn new(config: &RelayApiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
            to: config.recipient.clone(),
        }
    }
}

#[async_trait]
impl NotifyTransport for RelayApiTransport {
    async fn deliver(&self, pgn: &str) -> Result<(), NotifyError> {
        let form = [
            ("from", self.from.as_str()),
            ("to", self.to.as_str()),
            ("subject", MAIL_SUBJECT),
            ("text", pgn),
        ];
        let resp = self
            .http
            .post(&self.url)
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(status = %status, "Relay API accepted message");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "relay_api"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::extract::Form;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use tokio::sync::mpsc;

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("smtp.example.org"), ("smtp.example.org", None));
        assert_eq!(split_host_port("smtp.example.org:2525"), ("smtp.example.org", Some(2525)));
        assert_eq!(split_host_port("host:abc"), ("host:abc", None));
    }

    #[test]
    fn test_smtp_rejects_bad_recipient() {
        let config = SmtpConfig {
            server: "localhost:2525".into(),
            user: None,
            password: None,
            encryption: false,
            from: "no-reply@example.org".into(),
            recipient: "not an address".into(),
        };
        assert!(matches!(
            SmtpTransport::new(&config),
            Err(NotifyError::Address { .. })
        ));
    }

    async fn relay_server(status: StatusCode) -> (String, mpsc::UnboundedReceiver<(HeaderMap, HashMap<String, String>)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Router::new().route(
            "/messages",
            post(move |headers: HeaderMap, Form(form): Form<HashMap<String, String>>| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send((headers, form));
                    status
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/messages", addr), rx)
    }

    fn relay_config(url: String) -> RelayApiConfig {
        RelayApiConfig {
            url,
            api_key: "key-123".into(),
            from: "no-reply@example.org".into(),
            recipient: "alice@example.org".into(),
        }
    }

    #[tokio::test]
    async fn test_relay_posts_form_with_basic_auth() {
        let (url, mut rx) = relay_server(StatusCode::OK).await;
        let transport = RelayApiTransport::new(&relay_config(url));

        transport.deliver("1. e4 *").await.unwrap();

        let (headers, form) = rx.recv().await.unwrap();
        let auth = headers.get("authorization").unwrap().to_str().unwrap();
        assert!(auth.starts_with("Basic "));
        assert_eq!(form["subject"], MAIL_SUBJECT);
        assert_eq!(form["to"], "alice@example.org");
        assert_eq!(form["text"], "1. e4 *");
    }

    #[tokio::test]
    async fn test_relay_reports_rejection() {
        let (url, _rx) = relay_server(StatusCode::UNAUTHORIZED).await;
        let transport = RelayApiTransport::new(&relay_config(url));

        let err = transport.deliver("*").await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected { status: 401, .. }));
    }
}

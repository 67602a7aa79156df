//! Secondary delivery path: direct SMTP relay
//!
//! Minimal SMTP client dialogue (RFC 5321): EHLO, MAIL FROM, RCPT TO for
//! every recipient including CC/BCC, DATA, QUIT. The whole transaction runs
//! under one bounded timeout; exceeding it counts as a provider failure.

use crate::config::SecondaryRelayConfig;
use crate::delivery::types::{DeliverySender, OutgoingEmail};
use crate::error::{NotifyError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info};
use uuid::Uuid;

pub struct SmtpRelayClient {
    config: SecondaryRelayConfig,
    from_address: String,
}

impl SmtpRelayClient {
    pub fn new(config: SecondaryRelayConfig, default_from: &str) -> Self {
        let from_address = config
            .from_address
            .clone()
            .unwrap_or_else(|| default_from.to_string());
        Self {
            config,
            from_address,
        }
    }

    async fn send_inner(&self, email: &OutgoingEmail) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        debug!("connecting to relay {}", addr);

        let stream = TcpStream::connect(&addr).await?;
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let greeting = Self::read_line(&mut reader).await?;
        if !greeting.starts_with("220") {
            return Err(NotifyError::SmtpProtocol(format!(
                "Invalid greeting: {}",
                greeting.trim()
            )));
        }

        let hello = self
            .config
            .hello_name
            .clone()
            .unwrap_or_else(|| "localhost".to_string());
        Self::write_line(&mut writer, &format!("EHLO {}", hello)).await?;
        Self::read_response(&mut reader, "250").await?;

        Self::write_line(&mut writer, &format!("MAIL FROM:<{}>", self.from_address)).await?;
        Self::read_response(&mut reader, "250").await?;

        // Envelope recipients: To, then CC and BCC
        for recipient in std::iter::once(&email.to)
            .chain(email.cc.iter())
            .chain(email.bcc.iter())
        {
            Self::write_line(&mut writer, &format!("RCPT TO:<{}>", recipient)).await?;
            Self::read_response(&mut reader, "250").await?;
        }

        Self::write_line(&mut writer, "DATA").await?;
        Self::read_response(&mut reader, "354").await?;

        let message = Self::dot_stuff(&self.build_message(email));
        writer.write_all(message.as_bytes()).await?;
        if !message.ends_with("\r\n") {
            writer.write_all(b"\r\n").await?;
        }
        writer.write_all(b".\r\n").await?;
        Self::read_response(&mut reader, "250").await?;

        Self::write_line(&mut writer, "QUIT").await?;
        let _ = Self::read_line(&mut reader).await;

        info!("relay accepted message for {}", email.to);
        Ok(())
    }

    /// Strip CR and LF from a header value. Subjects come from expanded
    /// templates fed by arbitrary payload values, so a value containing a
    /// line break would otherwise inject extra headers into the message.
    fn header_safe(value: &str) -> String {
        value.replace("\r\n", " ").replace(['\r', '\n'], " ")
    }

    /// Escape lines starting with a dot so the server never mistakes a body
    /// line for the end-of-data marker (RFC 5321 dot-stuffing)
    fn dot_stuff(message: &str) -> String {
        message
            .split("\r\n")
            .map(|line| {
                if line.starts_with('.') {
                    format!(".{}", line)
                } else {
                    line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\r\n")
    }

    /// Build an RFC 5322 multipart/alternative message. BCC recipients are
    /// envelope-only and never appear in the headers.
    fn build_message(&self, email: &OutgoingEmail) -> String {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S +0000");
        let boundary = format!("----=_Part_{}", Uuid::new_v4().simple());

        let mut headers = format!(
            "From: <{}>\r\nTo: <{}>\r\n",
            Self::header_safe(&self.from_address),
            Self::header_safe(&email.to)
        );
        if !email.cc.is_empty() {
            let cc_list = email
                .cc
                .iter()
                .map(|a| format!("<{}>", Self::header_safe(a)))
                .collect::<Vec<_>>()
                .join(", ");
            headers.push_str(&format!("Cc: {}\r\n", cc_list));
        }

        let text_body = if email.text_body.is_empty() {
            // Crude but serviceable fallback for text-only clients
            email.html_body.clone()
        } else {
            email.text_body.clone()
        };

        format!(
            "{}Subject: {}\r\n\
             Date: {}\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/alternative; boundary=\"{}\"\r\n\
             \r\n\
             --{}\r\n\
             Content-Type: text/plain; charset=\"UTF-8\"\r\n\
             Content-Transfer-Encoding: 7bit\r\n\
             \r\n\
             {}\r\n\
             --{}\r\n\
             Content-Type: text/html; charset=\"UTF-8\"\r\n\
             Content-Transfer-Encoding: 7bit\r\n\
             \r\n\
             {}\r\n\
             --{}--\r\n",
            headers,
            Self::header_safe(&email.subject),
            date,
            boundary,
            boundary,
            text_body,
            boundary,
            email.html_body,
            boundary
        )
    }

    async fn read_line<R>(reader: &mut BufReader<R>) -> Result<String>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        Ok(line)
    }

    /// Read a (possibly multi-line) response and verify the expected code
    async fn read_response<R>(reader: &mut BufReader<R>, expected: &str) -> Result<String>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        let mut full_response = String::new();

        loop {
            let line = Self::read_line(reader).await?;
            debug!("< {}", line.trim());
            full_response.push_str(&line);

            // Last line has a space after the code instead of a dash. Byte
            // access keeps a malformed multi-byte reply from panicking a
            // char-boundary slice.
            if line.as_bytes().get(3) == Some(&b' ') {
                break;
            }
            if line.is_empty() {
                break;
            }
        }

        if !full_response.starts_with(expected) {
            return Err(NotifyError::SmtpProtocol(format!(
                "Expected {}, got: {}",
                expected,
                full_response.trim()
            )));
        }

        Ok(full_response)
    }

    async fn write_line<W>(writer: &mut W, line: &str) -> Result<()>
    where
        W: tokio::io::AsyncWrite + Unpin,
    {
        debug!("> {}", line);
        writer.write_all(format!("{}\r\n", line).as_bytes()).await?;
        Ok(())
    }
}

#[async_trait]
impl DeliverySender for SmtpRelayClient {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let budget = Duration::from_secs(self.config.timeout_secs);
        match tokio::time::timeout(budget, self.send_inner(email)).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout(self.config.timeout_secs)),
        }
    }
}

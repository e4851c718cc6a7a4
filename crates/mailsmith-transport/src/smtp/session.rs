//! SMTP dialog over an established stream.

use super::command::Command;
use super::config::Credentials;
use super::extension::{AuthMechanism, Extension};
use super::reply::{Reply, ReplyCode, is_last_reply_line, parse_reply};
use super::stream::with_timeout;
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashSet;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Envelope of one mail transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Reverse path (`MAIL FROM`).
    pub from: String,
    /// Forward paths (`RCPT TO`), in order.
    pub recipients: Vec<String>,
}

/// One SMTP conversation.
#[derive(Debug)]
pub(crate) struct Session<S> {
    stream: BufReader<S>,
    extensions: HashSet<Extension>,
    io_timeout: Duration,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(stream: S, io_timeout: Duration) -> Self {
        Self {
            stream: BufReader::new(stream),
            extensions: HashSet::new(),
            io_timeout,
        }
    }

    /// Reads the server greeting.
    pub(crate) async fn greeting(&mut self) -> Result<Reply> {
        let greeting = self.read_reply().await?.expect_success()?;
        tracing::debug!(greeting = %greeting.message_text(), "server ready");
        Ok(greeting)
    }

    /// Sends EHLO and records the advertised extensions.
    pub(crate) async fn ehlo(&mut self, hostname: &str) -> Result<()> {
        let reply = self
            .send_command(&Command::Ehlo {
                hostname: hostname.to_string(),
            })
            .await?
            .expect_success()?;

        // first line is the server greeting
        self.extensions = reply.message.iter().skip(1).map(|l| Extension::parse(l)).collect();
        Ok(())
    }

    /// Sends STARTTLS. The caller performs the handshake on the inner stream.
    pub(crate) async fn starttls(&mut self) -> Result<()> {
        if !self.extensions.contains(&Extension::StartTls) {
            return Err(Error::NotSupported("STARTTLS".into()));
        }
        self.send_command(&Command::StartTls).await?.expect_success()?;
        Ok(())
    }

    /// Authenticates with PLAIN, or LOGIN when PLAIN is not offered.
    pub(crate) async fn authenticate(&mut self, credentials: &Credentials) -> Result<()> {
        let offered = self.auth_mechanisms();
        if offered.is_empty() || offered.contains(&AuthMechanism::Plain) {
            self.auth_plain(credentials).await
        } else if offered.contains(&AuthMechanism::Login) {
            self.auth_login(credentials).await
        } else {
            Err(Error::NotSupported("AUTH PLAIN or LOGIN".into()))
        }
    }

    async fn auth_plain(&mut self, credentials: &Credentials) -> Result<()> {
        let token = format!("\0{}\0{}", credentials.username, credentials.password);
        self.send_command(&Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(STANDARD.encode(token.as_bytes())),
        })
        .await?
        .expect_success()?;
        Ok(())
    }

    async fn auth_login(&mut self, credentials: &Credentials) -> Result<()> {
        self.send_command(&Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        })
        .await?
        .expect_code(ReplyCode::AUTH_CONTINUE)?;

        self.send_command(&Command::AuthResponse(STANDARD.encode(&credentials.username)))
            .await?
            .expect_code(ReplyCode::AUTH_CONTINUE)?;

        self.send_command(&Command::AuthResponse(STANDARD.encode(&credentials.password)))
            .await?
            .expect_success()?;
        Ok(())
    }

    /// Runs one mail transaction and returns the reply to the data terminator.
    pub(crate) async fn deliver(&mut self, envelope: &Envelope, payload: &[u8]) -> Result<Reply> {
        let data = dot_stuff(payload);

        let size = match self.max_size() {
            Some(limit) if limit > 0 && data.len() > limit => {
                return Err(Error::MessageTooLarge(data.len()));
            }
            Some(_) => Some(data.len()),
            None => None,
        };

        self.send_command(&Command::MailFrom {
            from: envelope.from.clone(),
            size,
        })
        .await?
        .expect_success()?;

        for to in &envelope.recipients {
            self.send_command(&Command::RcptTo { to: to.clone() })
                .await?
                .expect_success()?;
        }

        self.send_command(&Command::Data)
            .await?
            .expect_code(ReplyCode::START_DATA)?;

        self.write(&data).await?;
        self.read_reply().await?.expect_success()
    }

    /// Sends QUIT.
    pub(crate) async fn quit(&mut self) -> Result<()> {
        let reply = self.send_command(&Command::Quit).await?;
        if reply.code == ReplyCode::CLOSING {
            return Ok(());
        }
        reply.expect_success()?;
        Ok(())
    }

    /// Returns the underlying stream, e.g. for a TLS upgrade.
    pub(crate) fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    fn auth_mechanisms(&self) -> Vec<AuthMechanism> {
        self.extensions
            .iter()
            .filter_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn max_size(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(size) => Some(size.unwrap_or(0)),
            _ => None,
        })
    }

    async fn send_command(&mut self, command: &Command) -> Result<Reply> {
        tracing::debug!(command = %command.describe(), "C:");
        self.write(&command.serialize()).await?;
        self.read_reply().await
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.get_mut();
        with_timeout(self.io_timeout, "write", async {
            stream.write_all(data).await?;
            stream.flush().await?;
            Ok(())
        })
        .await
    }

    async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let stream = &mut self.stream;
        let read = with_timeout(self.io_timeout, "read", async {
            Ok(stream.read_line(&mut line).await?)
        })
        .await?;

        if read == 0 {
            return Err(Error::Protocol("Connection closed by server".into()));
        }
        Ok(line.trim_end().to_string())
    }

    async fn read_reply(&mut self) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line.is_empty() {
                continue;
            }

            let is_last = is_last_reply_line(&line);
            lines.push(line);

            if is_last {
                break;
            }
        }

        let reply = parse_reply(&lines)?;
        tracing::debug!(code = %reply.code, "S:");
        Ok(reply)
    }
}

/// Prepares a payload for the DATA phase: line endings normalized to CRLF,
/// lines starting with `.` stuffed, terminator appended.
pub(crate) fn dot_stuff(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 16);
    let body = payload.strip_suffix(b"\n").unwrap_or(payload);

    if !body.is_empty() {
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }

    out.extend_from_slice(b".\r\n");
    out
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn envelope() -> Envelope {
        Envelope {
            from: "sender@example.com".to_string(),
            recipients: vec!["a@example.com".to_string(), "b@example.com".to_string()],
        }
    }

    #[test]
    fn test_dot_stuff() {
        assert_eq!(dot_stuff(b"Hello\r\n.hidden\r\n"), b"Hello\r\n..hidden\r\n.\r\n");
        assert_eq!(dot_stuff(b"bare\nlines"), b"bare\r\nlines\r\n.\r\n");
        assert_eq!(dot_stuff(b""), b".\r\n");
    }

    #[tokio::test]
    async fn test_login_fallback() {
        let mock = Builder::new()
            .read(b"220 mock ESMTP\r\n")
            .write(b"EHLO client\r\n")
            .read(b"250-mock\r\n250 AUTH LOGIN\r\n")
            .write(b"AUTH LOGIN\r\n")
            .read(b"334 VXNlcm5hbWU6\r\n")
            .write(b"dXNlcg==\r\n")
            .read(b"334 UGFzc3dvcmQ6\r\n")
            .write(b"cGFzcw==\r\n")
            .read(b"235 ok\r\n")
            .build();

        let mut session = Session::new(mock, TIMEOUT);
        session.greeting().await.unwrap();
        session.ehlo("client").await.unwrap();
        session
            .authenticate(&Credentials::new("user", "pass"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_deliver_with_size() {
        let payload = b"Subject: hi\r\n\r\n.dot\r\n";
        let mock = Builder::new()
            .read(b"220 mock\r\n")
            .write(b"EHLO client\r\n")
            .read(b"250-mock\r\n250 SIZE 1000\r\n")
            .write(b"MAIL FROM:<sender@example.com> SIZE=25\r\n")
            .read(b"250 ok\r\n")
            .write(b"RCPT TO:<a@example.com>\r\n")
            .read(b"250 ok\r\n")
            .write(b"RCPT TO:<b@example.com>\r\n")
            .read(b"250 ok\r\n")
            .write(b"DATA\r\n")
            .read(b"354 go ahead\r\n")
            .write(b"Subject: hi\r\n\r\n..dot\r\n.\r\n")
            .read(b"250 queued as 42\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();

        let mut session = Session::new(mock, TIMEOUT);
        session.greeting().await.unwrap();
        session.ehlo("client").await.unwrap();
        let reply = session.deliver(&envelope(), payload).await.unwrap();
        assert_eq!(reply.message_text(), "queued as 42");
        session.quit().await.unwrap();
    }

    #[tokio::test]
    async fn test_deliver_too_large() {
        let mock = Builder::new()
            .read(b"220 mock\r\n")
            .write(b"EHLO client\r\n")
            .read(b"250-mock\r\n250 SIZE 10\r\n")
            .build();

        let mut session = Session::new(mock, TIMEOUT);
        session.greeting().await.unwrap();
        session.ehlo("client").await.unwrap();
        let err = session
            .deliver(&envelope(), b"this payload is too long\r\n")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MessageTooLarge(_)));
    }

    #[tokio::test]
    async fn test_rejected_recipient() {
        let mock = Builder::new()
            .read(b"220 mock\r\n")
            .write(b"EHLO client\r\n")
            .read(b"250 mock\r\n")
            .write(b"MAIL FROM:<sender@example.com>\r\n")
            .read(b"250 ok\r\n")
            .write(b"RCPT TO:<a@example.com>\r\n")
            .read(b"550 no such user\r\n")
            .build();

        let mut session = Session::new(mock, TIMEOUT);
        session.greeting().await.unwrap();
        session.ehlo("client").await.unwrap();
        let err = session.deliver(&envelope(), b"x\r\n").await.unwrap_err();
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_starttls_not_offered() {
        let mock = Builder::new()
            .read(b"220 mock\r\n")
            .write(b"EHLO client\r\n")
            .read(b"250 mock\r\n")
            .build();

        let mut session = Session::new(mock, TIMEOUT);
        session.greeting().await.unwrap();
        session.ehlo("client").await.unwrap();
        assert!(matches!(
            session.starttls().await,
            Err(Error::NotSupported(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_connection() {
        let mock = Builder::new().build();
        let mut session = Session::new(mock, TIMEOUT);
        assert!(matches!(session.greeting().await, Err(Error::Protocol(_))));
    }
}

//! Raw IMAP over rustls.
//!
//! The session is an explicit object: connect + login up front, fetch
//! per message, logout at the end. No token files, no global state.
//! Read-only — messages are never flagged `\Seen`.
//!
//! Everything here blocks; callers run it under `spawn_blocking`.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use tracing::debug;

use crate::config::MailboxConfig;
use crate::error::MailboxError;

const READ_TIMEOUT: Duration = Duration::from_secs(30);

type TlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;

/// One logged-in IMAP connection with INBOX selected.
pub struct ImapSession {
    tls: TlsStream,
    tag_counter: u32,
}

impl ImapSession {
    /// Connect, log in, and select INBOX.
    pub fn connect(config: &MailboxConfig) -> Result<Self, MailboxError> {
        let tcp = TcpStream::connect((&*config.imap_host, config.imap_port)).map_err(|e| {
            MailboxError::ConnectFailed {
                host: config.imap_host.clone(),
                port: config.imap_port,
                reason: e.to_string(),
            }
        })?;
        tcp.set_read_timeout(Some(READ_TIMEOUT))?;

        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth(),
        );
        let server_name: rustls::pki_types::ServerName<'_> =
            rustls::pki_types::ServerName::try_from(config.imap_host.clone())
                .map_err(|e| MailboxError::Tls(e.to_string()))?;
        let conn = rustls::ClientConnection::new(tls_config, server_name)
            .map_err(|e| MailboxError::Tls(e.to_string()))?;
        let tls = rustls::StreamOwned::new(conn, tcp);

        let mut session = Self { tls, tag_counter: 1 };

        // Server greeting
        let _greeting = session.read_line()?;

        let login = format!(
            "LOGIN \"{}\" \"{}\"",
            config.username,
            config.password.expose_secret()
        );
        let response = session.command(&login)?;
        if !last_line_ok(&response) {
            return Err(MailboxError::LoginFailed {
                username: config.username.clone(),
            });
        }

        let select = session.command("SELECT \"INBOX\"")?;
        if !last_line_ok(&select) {
            return Err(MailboxError::CommandFailed {
                command: "SELECT".into(),
                reason: "INBOX could not be selected".into(),
            });
        }

        debug!(host = %config.imap_host, "IMAP session established");
        Ok(session)
    }

    /// Sequence numbers of all messages in INBOX, ascending.
    pub fn search_all(&mut self) -> Result<Vec<u32>, MailboxError> {
        let response = self.command("SEARCH ALL")?;
        if !last_line_ok(&response) {
            return Err(MailboxError::CommandFailed {
                command: "SEARCH".into(),
                reason: "server rejected SEARCH ALL".into(),
            });
        }

        let mut seqs = Vec::new();
        for line in &response {
            let text = String::from_utf8_lossy(line);
            seqs.extend(parse_search_line(&text));
        }
        seqs.sort_unstable();
        Ok(seqs)
    }

    /// Fetch the raw RFC822 bytes of one message.
    pub fn fetch_raw(&mut self, seq: u32) -> Result<Vec<u8>, MailboxError> {
        let response = self.command(&format!("FETCH {seq} RFC822"))?;
        if !last_line_ok(&response) {
            return Err(MailboxError::CommandFailed {
                command: "FETCH".into(),
                reason: format!("server rejected FETCH {seq}"),
            });
        }

        // First line is `* n FETCH (RFC822 {size}`, last two are the
        // closing `)` and the tagged OK. The body is everything between.
        let body_lines = response
            .get(1..response.len().saturating_sub(2))
            .unwrap_or_default();
        let mut raw = Vec::new();
        for line in body_lines {
            raw.extend_from_slice(line);
        }
        if raw.is_empty() {
            return Err(MailboxError::UnparsableMessage {
                seq: seq.to_string(),
            });
        }
        Ok(raw)
    }

    /// End the session. Errors on LOGOUT are ignored.
    pub fn logout(mut self) {
        let _ = self.command("LOGOUT");
    }

    /// Send one tagged command and collect response lines up to the
    /// tagged completion line.
    fn command(&mut self, cmd: &str) -> Result<Vec<Vec<u8>>, MailboxError> {
        let tag = format!("A{}", self.tag_counter);
        self.tag_counter += 1;

        let full = format!("{tag} {cmd}\r\n");
        self.tls.write_all(full.as_bytes())?;
        self.tls.flush()?;

        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            let done = line.starts_with(tag.as_bytes());
            lines.push(line);
            if done {
                break;
            }
        }
        Ok(lines)
    }

    /// Read one CRLF-terminated line, including the terminator.
    fn read_line(&mut self) -> Result<Vec<u8>, MailboxError> {
        let mut buf = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            match self.tls.read(&mut byte) {
                Ok(0) => {
                    return Err(MailboxError::CommandFailed {
                        command: "READ".into(),
                        reason: "IMAP connection closed".into(),
                    });
                }
                Ok(_) => {
                    buf.push(byte[0]);
                    if buf.ends_with(b"\r\n") {
                        return Ok(buf);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Parse sequence numbers out of a `* SEARCH n n n` response line.
fn parse_search_line(line: &str) -> Vec<u32> {
    if !line.starts_with("* SEARCH") {
        return Vec::new();
    }
    line.split_whitespace()
        .skip(2)
        .filter_map(|tok| tok.parse().ok())
        .collect()
}

/// Did the tagged completion line report OK?
fn last_line_ok(lines: &[Vec<u8>]) -> bool {
    lines
        .last()
        .is_some_and(|l| String::from_utf8_lossy(l).contains("OK"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_line_parses_sequence_numbers() {
        assert_eq!(parse_search_line("* SEARCH 3 7 12\r\n"), vec![3, 7, 12]);
    }

    #[test]
    fn search_line_empty_result() {
        assert_eq!(parse_search_line("* SEARCH\r\n"), Vec::<u32>::new());
    }

    #[test]
    fn non_search_lines_ignored() {
        assert_eq!(parse_search_line("* 12 EXISTS\r\n"), Vec::<u32>::new());
        assert_eq!(parse_search_line("A3 OK SEARCH done\r\n"), Vec::<u32>::new());
    }

    #[test]
    fn last_line_ok_checks_tagged_completion() {
        let ok = vec![b"* SEARCH 1\r\n".to_vec(), b"A3 OK done\r\n".to_vec()];
        assert!(last_line_ok(&ok));

        let bad = vec![b"A3 NO [AUTHENTICATIONFAILED]\r\n".to_vec()];
        assert!(!last_line_ok(&bad));
    }
}

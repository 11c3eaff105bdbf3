use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use native_tls::{HandshakeError, TlsConnector, TlsStream};
use tracing::debug;

use super::error::SmtpError;
use super::types::SmtpReply;

const MAX_LINE_LEN: usize = 4096;

#[derive(Debug)]
enum StreamState {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    Invalid,
}

#[derive(Debug)]
pub(crate) struct SmtpStream {
    state: StreamState,
    buffer: Vec<u8>,
}

impl SmtpStream {
    fn connect(addr: &SocketAddr, timeout: Option<Duration>) -> io::Result<Self> {
        let stream = match timeout {
            Some(timeout) => TcpStream::connect_timeout(addr, timeout)?,
            None => TcpStream::connect(addr)?,
        };
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;
        Ok(Self {
            state: StreamState::Plain(stream),
            buffer: Vec::new(),
        })
    }

    fn upgrade_tls(&mut self, domain: &str, connector: &TlsConnector) -> Result<(), SmtpError> {
        if !self.buffer.is_empty() {
            return Err(SmtpError::Protocol(
                "server sent data before the TLS handshake".into(),
            ));
        }
        let plain = match std::mem::replace(&mut self.state, StreamState::Invalid) {
            StreamState::Plain(stream) => stream,
            StreamState::Tls(stream) => {
                self.state = StreamState::Tls(stream);
                return Ok(());
            }
            StreamState::Invalid => {
                return Err(SmtpError::Protocol("invalid stream state".into()));
            }
        };
        let tls = complete_handshake(connector, domain, plain)?;
        self.state = StreamState::Tls(Box::new(tls));
        Ok(())
    }

    fn send_command(&mut self, command: &str) -> Result<(), SmtpError> {
        check_command_line(command)?;
        let mut data = command.as_bytes().to_vec();
        data.extend_from_slice(b"\r\n");
        let written = match &mut self.state {
            StreamState::Plain(stream) => stream.write_all(&data).and_then(|()| stream.flush()),
            StreamState::Tls(stream) => stream.write_all(&data).and_then(|()| stream.flush()),
            StreamState::Invalid => {
                return Err(SmtpError::Protocol("invalid stream state".into()));
            }
        };
        written.map_err(SmtpError::io)
    }

    fn read_reply(&mut self) -> Result<SmtpReply, SmtpError> {
        let mut lines = Vec::new();
        let mut code: Option<u16> = None;
        loop {
            let line = self.read_line()?;
            let parsed_code = line
                .get(..3)
                .and_then(|digits| digits.parse::<u16>().ok())
                .ok_or_else(|| SmtpError::Protocol(format!("invalid reply: {line}")))?;
            match code {
                Some(existing) if existing != parsed_code => {
                    return Err(SmtpError::Protocol(format!(
                        "inconsistent reply codes: {existing} vs {parsed_code}"
                    )));
                }
                Some(_) => {}
                None => code = Some(parsed_code),
            }
            let continuation = line.as_bytes().get(3) == Some(&b'-');
            lines.push(line.get(4..).unwrap_or_default().to_string());
            if !continuation {
                return Ok(SmtpReply {
                    code: parsed_code,
                    lines,
                });
            }
        }
    }

    fn read_line(&mut self) -> Result<String, SmtpError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let mut line = self.buffer.drain(..=pos).collect::<Vec<_>>();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return String::from_utf8(line)
                    .map_err(|err| SmtpError::Protocol(format!("utf8 error: {err}")));
            }
            if self.buffer.len() > MAX_LINE_LEN {
                return Err(SmtpError::Protocol("reply line too long".into()));
            }

            let mut buf = [0u8; 512];
            let read = match &mut self.state {
                StreamState::Plain(stream) => stream.read(&mut buf),
                StreamState::Tls(stream) => stream.read(&mut buf),
                StreamState::Invalid => {
                    return Err(SmtpError::Protocol("invalid stream state".into()));
                }
            };
            let read = read.map_err(SmtpError::io)?;
            if read == 0 {
                return Err(SmtpError::io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }
            self.buffer.extend_from_slice(&buf[..read]);
        }
    }
}

/// A command is exactly one line: no CR or LF inside it.
fn check_command_line(command: &str) -> Result<(), SmtpError> {
    if command.contains(['\r', '\n']) {
        return Err(SmtpError::Protocol(format!(
            "refusing to send command containing a line break: {command:?}"
        )));
    }
    Ok(())
}

fn complete_handshake(
    connector: &TlsConnector,
    domain: &str,
    stream: TcpStream,
) -> Result<TlsStream<TcpStream>, SmtpError> {
    match connector.connect(domain, stream) {
        Ok(tls) => Ok(tls),
        Err(HandshakeError::Failure(err)) => Err(SmtpError::Tls { source: err }),
        Err(HandshakeError::WouldBlock(mut mid)) => loop {
            match mid.handshake() {
                Ok(tls) => break Ok(tls),
                Err(HandshakeError::Failure(err)) => {
                    break Err(SmtpError::Tls { source: err });
                }
                Err(HandshakeError::WouldBlock(next)) => mid = next,
            }
        },
    }
}

pub(crate) fn resolve_socket_addrs(host: &str, port: u16) -> Result<Vec<SocketAddr>, SmtpError> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|source| SmtpError::Resolve {
            host: host.to_string(),
            source,
        })?
        .collect();
    if addrs.is_empty() {
        return Err(SmtpError::NoAddress {
            host: host.to_string(),
        });
    }
    Ok(addrs)
}

/// One SMTP conversation with one host. Sends `QUIT` when dropped unless it
/// was already sent; the socket closes with the value.
pub(crate) struct SmtpSession {
    host: String,
    peer: SocketAddr,
    stream: SmtpStream,
    transcript: Vec<String>,
    closed: bool,
}

impl SmtpSession {
    pub(crate) fn connect(
        host: &str,
        addresses: &[SocketAddr],
        timeout: Option<Duration>,
    ) -> Result<Self, SmtpError> {
        let mut last_err = None;
        for addr in addresses {
            match SmtpStream::connect(addr, timeout) {
                Ok(stream) => {
                    return Ok(Self {
                        host: host.to_string(),
                        peer: *addr,
                        stream,
                        transcript: Vec::new(),
                        closed: false,
                    });
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(match last_err {
            Some(err) => SmtpError::connect(host, err),
            None => SmtpError::NoAddress {
                host: host.to_string(),
            },
        })
    }

    pub(crate) fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub(crate) fn take_transcript(&mut self) -> Vec<String> {
        std::mem::take(&mut self.transcript)
    }

    fn record(&mut self, direction: &str, message: &str) {
        debug!(host = %self.host, "{direction}: {message}");
        self.transcript
            .push(format!("[{}] {direction}: {message}", self.host));
    }

    fn record_reply(&mut self, reply: &SmtpReply) {
        if reply.lines.iter().all(String::is_empty) {
            self.record("S", &reply.code.to_string());
        } else {
            for line in &reply.lines {
                self.record("S", &format!("{} {line}", reply.code));
            }
        }
    }

    pub(crate) fn read_banner(&mut self) -> Result<SmtpReply, SmtpError> {
        let reply = self.stream.read_reply()?;
        self.record_reply(&reply);
        Ok(reply)
    }

    pub(crate) fn send_command(&mut self, command: &str) -> Result<SmtpReply, SmtpError> {
        self.record("C", command);
        self.stream.send_command(command)?;
        let reply = self.stream.read_reply()?;
        self.record_reply(&reply);
        Ok(reply)
    }

    /// Sends `STARTTLS` and upgrades the stream on a `220` answer.
    pub(crate) fn starttls(
        &mut self,
        domain: &str,
        connector: &TlsConnector,
    ) -> Result<SmtpReply, SmtpError> {
        let reply = self.send_command("STARTTLS")?;
        if reply.code != 220 {
            return Err(SmtpError::Rejected {
                command: "STARTTLS".to_string(),
                code: reply.code,
                message: reply.message(),
            });
        }
        self.stream.upgrade_tls(domain, connector)?;
        self.record("*", "TLS established");
        Ok(reply)
    }

    pub(crate) fn quit(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.record("C", "QUIT");
        if self.stream.send_command("QUIT").is_ok() {
            if let Ok(reply) = self.stream.read_reply() {
                self.record_reply(&reply);
            }
        }
    }
}

impl Drop for SmtpSession {
    fn drop(&mut self) {
        self.quit();
    }
}

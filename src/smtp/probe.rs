use native_tls::TlsConnector;
use tracing::{error, info};

use super::error::SmtpError;
use super::options::SmtpOptions;
use super::session::{SmtpSession, resolve_socket_addrs};
use super::types::{Existence, HostOutcome, ServerAttempt, SmtpReply, SmtpVerification};

const VRFY_CONFIRMED: u16 = 250;

/// Interrogates one mail server about one address.
pub trait ProbeHost {
    fn probe(&self, exchange: &str, email: &str) -> ServerAttempt;
}

/// Walks `exchanges` in order and stops at the first host confirming the
/// address with `250`. Per-host failures are recorded and the next host is
/// tried.
pub fn verify_hosts<P>(prober: &P, exchanges: &[String], email: &str) -> SmtpVerification
where
    P: ProbeHost + ?Sized,
{
    let mut attempts = Vec::new();
    let mut answered = false;

    for exchange in exchanges {
        let attempt = prober.probe(exchange, email);
        let confirmed = attempt.outcome.is_confirmed();
        match &attempt.outcome {
            HostOutcome::Confirmed { .. } => {
                info!("Email address {email} exists on server {exchange}.");
            }
            HostOutcome::NotConfirmed { .. } => {
                answered = true;
                info!("Email address {email} does not exist on server {exchange}.");
            }
            HostOutcome::ConnectFailed { message } => {
                error!("Failed to connect to server {exchange}: {message}");
            }
            HostOutcome::ProtocolError { message } => {
                error!("Error verifying email on server {exchange}: {message}");
            }
        }
        attempts.push(attempt);
        if confirmed {
            return SmtpVerification {
                existence: Existence::Confirmed {
                    exchange: exchange.clone(),
                },
                attempts,
            };
        }
    }

    info!("Email address {email} does not exist on any of the servers.");
    SmtpVerification {
        existence: if answered {
            Existence::Rejected
        } else {
            Existence::Undetermined
        },
        attempts,
    }
}

/// [`ProbeHost`] speaking SMTP over the network:
/// greeting, `EHLO`, `STARTTLS`, `EHLO`, `VRFY`, `QUIT`.
pub struct SmtpProber {
    options: SmtpOptions,
    connector: TlsConnector,
}

impl SmtpProber {
    pub fn new(options: SmtpOptions) -> Result<Self, SmtpError> {
        let connector = tls_connector(&options)?;
        Ok(Self { options, connector })
    }

    pub fn options(&self) -> &SmtpOptions {
        &self.options
    }

    fn dialogue(
        &self,
        exchange: &str,
        email: &str,
        attempt: &mut ServerAttempt,
    ) -> Result<SmtpReply, SmtpError> {
        let addrs = resolve_socket_addrs(exchange, self.options.port)?;
        let mut session = SmtpSession::connect(exchange, &addrs, self.options.timeout())?;
        attempt.address = Some(session.peer().to_string());

        let result = self.converse(&mut session, exchange, email);
        session.quit();
        attempt.transcript = session.take_transcript();
        result
    }

    fn converse(
        &self,
        session: &mut SmtpSession,
        exchange: &str,
        email: &str,
    ) -> Result<SmtpReply, SmtpError> {
        let banner = session.read_banner()?;
        if banner.code != 220 {
            return Err(SmtpError::Greeting {
                host: exchange.to_string(),
                code: banner.code,
                message: banner.message(),
            });
        }

        let helo = self.options.helo_name();
        let ehlo_cmd = format!("EHLO {helo}");
        let ehlo = greet(session, &ehlo_cmd, helo)?;

        if self.options.starttls {
            if !ehlo.has_capability("STARTTLS") {
                return Err(SmtpError::StartTlsUnavailable {
                    host: exchange.to_string(),
                });
            }
            session.starttls(exchange, &self.connector)?;
            // capabilities are re-announced over TLS; the answer is not checked
            session.send_command(&ehlo_cmd)?;
        }

        session.send_command(&format!("VRFY {email}"))
    }
}

fn tls_connector(options: &SmtpOptions) -> Result<TlsConnector, SmtpError> {
    TlsConnector::builder()
        .danger_accept_invalid_certs(options.accept_invalid_certs)
        .danger_accept_invalid_hostnames(options.accept_invalid_certs)
        .build()
        .map_err(|source| SmtpError::TlsInit { source })
}

/// `EHLO`, falling back to `HELO` when the server does not speak ESMTP.
fn greet(session: &mut SmtpSession, ehlo_cmd: &str, helo: &str) -> Result<SmtpReply, SmtpError> {
    let ehlo = session.send_command(ehlo_cmd)?;
    if ehlo.is_positive_completion() {
        return Ok(ehlo);
    }
    let reply = session.send_command(&format!("HELO {helo}"))?;
    if reply.is_positive_completion() {
        Ok(reply)
    } else {
        Err(SmtpError::Rejected {
            command: "HELO".to_string(),
            code: reply.code,
            message: reply.message(),
        })
    }
}

impl ProbeHost for SmtpProber {
    fn probe(&self, exchange: &str, email: &str) -> ServerAttempt {
        let mut attempt = ServerAttempt::new(
            exchange,
            HostOutcome::ProtocolError {
                message: "verification not attempted".to_string(),
            },
        );
        attempt.outcome = match self.dialogue(exchange, email, &mut attempt) {
            Ok(reply) if reply.code == VRFY_CONFIRMED => HostOutcome::Confirmed { reply },
            Ok(reply) => HostOutcome::NotConfirmed { reply },
            Err(err) if err.is_connect_failure() => HostOutcome::ConnectFailed {
                message: err.to_string(),
            },
            Err(err) => HostOutcome::ProtocolError {
                message: err.to_string(),
            },
        };
        attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::{BufRead, BufReader, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::thread;

    struct ScriptedProber {
        outcomes: Vec<(&'static str, HostOutcome)>,
        contacted: RefCell<Vec<String>>,
    }

    impl ScriptedProber {
        fn new(outcomes: Vec<(&'static str, HostOutcome)>) -> Self {
            Self {
                outcomes,
                contacted: RefCell::new(Vec::new()),
            }
        }
    }

    impl ProbeHost for ScriptedProber {
        fn probe(&self, exchange: &str, _email: &str) -> ServerAttempt {
            self.contacted.borrow_mut().push(exchange.to_string());
            let outcome = self
                .outcomes
                .iter()
                .find(|(host, _)| *host == exchange)
                .map(|(_, outcome)| outcome.clone())
                .unwrap_or_else(|| panic!("unexpected host {exchange}"));
            ServerAttempt::new(exchange, outcome)
        }
    }

    fn hosts(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn refused() -> HostOutcome {
        HostOutcome::ConnectFailed {
            message: "connection refused".to_string(),
        }
    }

    #[test]
    fn stops_at_first_confirmation() {
        let prober = ScriptedProber::new(vec![
            (
                "mx1",
                HostOutcome::NotConfirmed {
                    reply: SmtpReply::new(252, "Cannot VRFY user"),
                },
            ),
            (
                "mx2",
                HostOutcome::Confirmed {
                    reply: SmtpReply::new(250, "user <user@example.com>"),
                },
            ),
            ("mx3", refused()),
        ]);
        let result = verify_hosts(&prober, &hosts(&["mx1", "mx2", "mx3"]), "user@example.com");
        assert_eq!(
            result.existence,
            Existence::Confirmed {
                exchange: "mx2".to_string()
            }
        );
        assert_eq!(*prober.contacted.borrow(), vec!["mx1", "mx2"]);
        assert_eq!(result.attempts.len(), 2);
    }

    #[test]
    fn all_connect_failures_are_undetermined() {
        let prober = ScriptedProber::new(vec![("mx1", refused()), ("mx2", refused())]);
        let result = verify_hosts(&prober, &hosts(&["mx1", "mx2"]), "user@example.com");
        assert_eq!(result.existence, Existence::Undetermined);
        assert_eq!(*prober.contacted.borrow(), vec!["mx1", "mx2"]);
    }

    #[test]
    fn answered_without_confirmation_is_rejected() {
        let prober = ScriptedProber::new(vec![
            (
                "mx1",
                HostOutcome::ProtocolError {
                    message: "STARTTLS extension not supported by mx1".to_string(),
                },
            ),
            (
                "mx2",
                HostOutcome::NotConfirmed {
                    reply: SmtpReply::new(550, "User unknown"),
                },
            ),
        ]);
        let result = verify_hosts(&prober, &hosts(&["mx1", "mx2"]), "user@example.com");
        assert_eq!(result.existence, Existence::Rejected);
        assert_eq!(result.attempts.len(), 2);
    }

    #[test]
    fn connector_builds_with_and_without_verification() {
        for accept_invalid_certs in [true, false] {
            let options = SmtpOptions {
                accept_invalid_certs,
                ..SmtpOptions::default()
            };
            let prober = SmtpProber::new(options).expect("tls connector");
            assert_eq!(prober.options().accept_invalid_certs, accept_invalid_certs);
        }
    }

    #[test]
    fn empty_host_list_contacts_nobody() {
        let prober = ScriptedProber::new(Vec::new());
        let result = verify_hosts(&prober, &[], "user@example.com");
        assert_eq!(result.existence, Existence::Undetermined);
        assert!(prober.contacted.borrow().is_empty());
    }

    fn spawn_mock_server(
        banner: &'static str,
        script: Vec<(&'static str, &'static str)>,
    ) -> (u16, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let port = listener.local_addr().expect("addr").port();
        let (ready_tx, ready_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            ready_tx.send(()).ok();
            if let Ok((mut stream, _)) = listener.accept() {
                let _ = handle_session(&mut stream, banner, script);
            }
        });
        ready_rx.recv().expect("server ready");
        (port, handle)
    }

    fn handle_session(
        stream: &mut TcpStream,
        banner: &str,
        script: Vec<(&'static str, &'static str)>,
    ) -> std::io::Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        stream.write_all(banner.as_bytes())?;
        stream.flush()?;
        for (expected, response) in script {
            let mut line = String::new();
            reader.read_line(&mut line)?;
            assert!(
                line.starts_with(expected),
                "expected command starting with '{expected}', got '{line}'"
            );
            stream.write_all(response.as_bytes())?;
            stream.flush()?;
        }
        Ok(())
    }

    fn plaintext_prober(port: u16) -> SmtpProber {
        SmtpProber::new(SmtpOptions {
            port,
            starttls: false,
            timeout_ms: 2_000,
            ..SmtpOptions::default()
        })
        .expect("tls connector")
    }

    #[test]
    #[ignore = "requires loopback TCP binding"]
    fn vrfy_250_confirms() {
        let (port, handle) = spawn_mock_server(
            "220 mock.smtp.test ESMTP\r\n",
            vec![
                ("EHLO localhost", "250-mock.smtp.test\r\n250 VRFY\r\n"),
                ("VRFY user@example.com", "250 2.1.5 <user@example.com>\r\n"),
                ("QUIT", "221 2.0.0 Bye\r\n"),
            ],
        );
        let attempt = plaintext_prober(port).probe("127.0.0.1", "user@example.com");
        assert!(attempt.outcome.is_confirmed(), "{:?}", attempt.outcome);
        assert!(attempt.transcript.iter().any(|l| l.contains("C: QUIT")));
        handle.join().expect("server thread");
    }

    #[test]
    #[ignore = "requires loopback TCP binding"]
    fn vrfy_252_is_not_confirmed() {
        let (port, handle) = spawn_mock_server(
            "220 mock.smtp.test ESMTP\r\n",
            vec![
                ("EHLO", "250 mock.smtp.test\r\n"),
                ("VRFY", "252 2.0.0 Cannot VRFY user\r\n"),
                ("QUIT", "221 2.0.0 Bye\r\n"),
            ],
        );
        let attempt = plaintext_prober(port).probe("127.0.0.1", "user@example.com");
        assert_eq!(attempt.outcome.vrfy_reply().map(|r| r.code), Some(252));
        handle.join().expect("server thread");
    }

    #[test]
    #[ignore = "requires loopback TCP binding"]
    fn missing_starttls_is_protocol_error() {
        let (port, handle) = spawn_mock_server(
            "220 mock.smtp.test ESMTP\r\n",
            vec![
                ("EHLO", "250-mock.smtp.test\r\n250 PIPELINING\r\n"),
                ("QUIT", "221 2.0.0 Bye\r\n"),
            ],
        );
        let prober = SmtpProber::new(SmtpOptions {
            port,
            timeout_ms: 2_000,
            ..SmtpOptions::default()
        })
        .expect("tls connector");
        let attempt = prober.probe("127.0.0.1", "user@example.com");
        match attempt.outcome {
            HostOutcome::ProtocolError { message } => assert!(message.contains("STARTTLS")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        handle.join().expect("server thread");
    }

    #[test]
    #[ignore = "requires loopback TCP binding"]
    fn non_220_greeting_is_connect_failure() {
        let (port, handle) = spawn_mock_server(
            "554 5.3.2 no service here\r\n",
            vec![("QUIT", "221 Bye\r\n")],
        );
        let attempt = plaintext_prober(port).probe("127.0.0.1", "user@example.com");
        assert!(matches!(attempt.outcome, HostOutcome::ConnectFailed { .. }));
        handle.join().expect("server thread");
    }

    #[test]
    #[ignore = "requires loopback TCP binding"]
    fn line_break_in_address_never_reaches_the_server() {
        let (port, handle) = spawn_mock_server(
            "220 mock.smtp.test ESMTP\r\n",
            vec![
                ("EHLO", "250 mock.smtp.test\r\n"),
                ("QUIT", "221 2.0.0 Bye\r\n"),
            ],
        );
        let attempt =
            plaintext_prober(port).probe("127.0.0.1", "user@example.com\r\nRCPT TO:<x@y.z>");
        match attempt.outcome {
            HostOutcome::ProtocolError { message } => assert!(message.contains("line break")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        handle.join().expect("server thread");
    }

    #[test]
    #[ignore = "requires loopback TCP binding"]
    fn closed_port_is_connect_failure() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr").port()
        };
        let attempt = plaintext_prober(port).probe("127.0.0.1", "user@example.com");
        assert!(matches!(attempt.outcome, HostOutcome::ConnectFailed { .. }));
        assert!(attempt.address.is_none());
    }
}

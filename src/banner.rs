use crate::config::ScanConfig;
use crate::types::BannerResult;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

/// How a port is asked for its banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortClass {
    /// Plaintext `GET /`, banner is the `Server:` header.
    Http,
    /// TLS handshake without verification, then the same `GET /`.
    Https,
    /// Send nothing, read whatever the service announces.
    Passive,
}

/// Best-effort banner grabber reusing the prober's connection.
///
/// Every failure (handshake, write, read, timeout) degrades to an empty
/// banner. Nothing here can flip an open port to closed.
pub struct BannerCollector {
    http_ports: Vec<u16>,
    https_ports: Vec<u16>,
    budget: usize,
    user_agent: String,
    timeout: Duration,
    tls: Option<tokio_native_tls::TlsConnector>,
}

impl BannerCollector {
    pub fn new(config: &ScanConfig) -> Self {
        let tls = match insecure_tls_connector() {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(error = %e, "TLS unavailable; TLS ports will report no banner");
                None
            }
        };
        Self {
            http_ports: config.http_ports.clone(),
            https_ports: config.https_ports.clone(),
            budget: config.banner_bytes.max(1),
            user_agent: config.user_agent.clone(),
            timeout: config.banner_timeout,
            tls,
        }
    }

    pub fn class_of(&self, port: u16) -> PortClass {
        if self.https_ports.contains(&port) {
            PortClass::Https
        } else if self.http_ports.contains(&port) {
            PortClass::Http
        } else {
            PortClass::Passive
        }
    }

    /// Grab a banner from `stream`, which is consumed and closed on return.
    pub async fn collect(&self, stream: TcpStream, host: &str, port: u16) -> BannerResult {
        let class = self.class_of(port);
        let deadline = Instant::now() + self.timeout;
        let text = match self.exchange(stream, host, class, deadline).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                debug!(port, ?class, "banner grab timed out");
                None
            }
            Err(e) => {
                debug!(port, ?class, error = %e, "banner grab failed");
                None
            }
        };
        BannerResult { port, text }
    }

    async fn exchange(
        &self,
        mut stream: TcpStream,
        host: &str,
        class: PortClass,
        deadline: Instant,
    ) -> io::Result<Option<String>> {
        match class {
            PortClass::Http => self.http_server_header(&mut stream, host, deadline).await,
            PortClass::Https => {
                let connector = self
                    .tls
                    .as_ref()
                    .ok_or_else(|| io::Error::other("no TLS connector"))?;
                let handshake = async move { connector.connect(host, stream).await.map_err(io::Error::other) };
                let mut tls = before(deadline, handshake).await?;
                self.http_server_header(&mut tls, host, deadline).await
            }
            PortClass::Passive => {
                let mut buf = vec![0u8; self.budget];
                let n = before(deadline, stream.read(&mut buf)).await?;
                Ok(non_empty(decode_lossy(&buf[..n]).trim()))
            }
        }
    }

    async fn http_server_header<S>(
        &self,
        stream: &mut S,
        host: &str,
        deadline: Instant,
    ) -> io::Result<Option<String>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let request = http_request(host, &self.user_agent);
        before(deadline, async {
            stream.write_all(request.as_bytes()).await?;
            stream.flush().await
        })
        .await?;
        let head = read_response_head(stream, self.budget, deadline).await?;
        Ok(extract_server_header(&decode_lossy(&head)))
    }
}

/// TLS client that accepts any certificate and hostname. Banner grabbing is
/// reconnaissance, not a trust decision, so verification is off on purpose.
fn insecure_tls_connector() -> Result<tokio_native_tls::TlsConnector, native_tls::Error> {
    let connector = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()?;
    Ok(tokio_native_tls::TlsConnector::from(connector))
}

/// Minimal HTTP/1.1 request for `/`.
pub fn http_request(host: &str, user_agent: &str) -> String {
    let host_header = if host.contains(':') {
        format!("[{host}]")
    } else {
        host.to_string()
    };
    format!(
        "GET / HTTP/1.1\r\nHost: {host_header}\r\nUser-Agent: {user_agent}\r\nAccept: */*\r\nConnection: close\r\n\r\n"
    )
}

/// Run `fut` until `deadline`; expiry becomes `ErrorKind::TimedOut`.
async fn before<T, F>(deadline: Instant, fut: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    time::timeout_at(deadline, fut)
        .await
        .unwrap_or_else(|_| Err(io::ErrorKind::TimedOut.into()))
}

/// Read until the header block ends, the peer closes, `budget` bytes arrive
/// or `deadline` passes. Whatever arrived before a reset or the deadline is
/// kept; only a read that yields nothing at all is an error.
async fn read_response_head<S>(stream: &mut S, budget: usize, deadline: Instant) -> io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; budget];
    let mut filled = 0;
    while filled < budget {
        match before(deadline, stream.read(&mut buf[filled..])).await {
            Ok(0) => break,
            Ok(n) => {
                filled += n;
                if head_complete(&buf[..filled]) {
                    break;
                }
            }
            Err(_) if filled > 0 => break,
            Err(e) => return Err(e),
        }
    }
    buf.truncate(filled);
    Ok(buf)
}

/// Blank line after the headers, with CRLF or bare LF line endings.
fn head_complete(buf: &[u8]) -> bool {
    buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.windows(2).any(|w| w == b"\n\n")
}

/// Value of the first `Server:` header in a raw response head, trimmed.
pub fn extract_server_header(response: &str) -> Option<String> {
    response
        .lines()
        .skip(1)
        .take_while(|line| !line.trim().is_empty())
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("server")
                .then(|| value.trim())
                .and_then(non_empty)
        })
}

/// UTF-8 decode that drops undecodable fragments instead of failing.
pub fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect()
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_header_extracted_and_trimmed() {
        let resp = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nServer:   TestServer/1.0  \r\n\r\n<html>";
        assert_eq!(extract_server_header(resp).as_deref(), Some("TestServer/1.0"));
    }

    #[test]
    fn server_header_case_insensitive() {
        let resp = "HTTP/1.0 404 Not Found\r\nserver: nginx\r\n\r\n";
        assert_eq!(extract_server_header(resp).as_deref(), Some("nginx"));
    }

    #[test]
    fn server_in_body_ignored() {
        let resp = "HTTP/1.1 200 OK\r\nX-Powered-By: PHP\r\n\r\nServer: fake";
        assert_eq!(extract_server_header(resp), None);
    }

    #[test]
    fn missing_or_empty_server_is_none() {
        assert_eq!(extract_server_header("HTTP/1.1 200 OK\r\nServer:\r\n\r\n"), None);
        assert_eq!(extract_server_header(""), None);
        assert_eq!(extract_server_header("garbage with no newline"), None);
    }

    #[test]
    fn lossy_decode_drops_invalid_bytes() {
        let bytes = b"SSH-2.0-\xff\xfeOpenSSH";
        assert_eq!(decode_lossy(bytes), "SSH-2.0-OpenSSH");
    }

    #[test]
    fn request_carries_host_and_agent() {
        let req = http_request("example.com", "SecureScan/1.0");
        assert!(req.starts_with("GET / HTTP/1.1\r\n"));
        assert!(req.contains("\r\nHost: example.com\r\n"));
        assert!(req.contains("\r\nUser-Agent: SecureScan/1.0\r\n"));
        assert!(req.ends_with("\r\n\r\n"));
        assert!(http_request("::1", "x").contains("Host: [::1]\r\n"));
    }

    #[test]
    fn head_complete_accepts_both_line_endings() {
        assert!(head_complete(b"HTTP/1.1 200 OK\r\nServer: a\r\n\r\n"));
        assert!(head_complete(b"HTTP/1.0 200 OK\nServer: a\n\n"));
        assert!(!head_complete(b"HTTP/1.1 200 OK\r\nServer: a\r\n"));
    }

    #[tokio::test]
    async fn stalled_head_keeps_bytes_read_before_deadline() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        server
            .write_all(b"HTTP/1.1 200 OK\r\nServer: Partial/0.1\r\nX-Pending: 1\r\n")
            .await
            .unwrap();

        let deadline = Instant::now() + Duration::from_millis(200);
        let head = read_response_head(&mut client, 1024, deadline).await.unwrap();

        assert_eq!(
            extract_server_header(&decode_lossy(&head)).as_deref(),
            Some("Partial/0.1")
        );
        drop(server);
    }

    #[tokio::test]
    async fn silent_peer_times_out() {
        let (mut client, _server) = tokio::io::duplex(64);
        let deadline = Instant::now() + Duration::from_millis(100);
        let err = read_response_head(&mut client, 1024, deadline).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn port_classes_follow_config() {
        let collector = BannerCollector::new(&ScanConfig::default());
        assert_eq!(collector.class_of(80), PortClass::Http);
        assert_eq!(collector.class_of(8080), PortClass::Http);
        assert_eq!(collector.class_of(443), PortClass::Https);
        assert_eq!(collector.class_of(8443), PortClass::Https);
        assert_eq!(collector.class_of(22), PortClass::Passive);
    }
}

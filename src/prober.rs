use crate::types::ProbeResult;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, warn};

/// Result of a connect attempt. When the port is open the live stream is
/// handed back so the banner collector can reuse it; dropping the `Probe`
/// closes the socket.
#[derive(Debug)]
pub struct Probe {
    pub result: ProbeResult,
    pub stream: Option<TcpStream>,
}

/// Attempt a TCP connect to `host:port`, bounded by `timeout`.
///
/// Name resolution runs inside the same deadline. Refused, unreachable,
/// unresolvable and timed-out attempts all report `open = false` with no
/// error; only local resource failures (descriptor or buffer exhaustion)
/// are recorded as errors.
pub async fn probe(host: &str, port: u16, timeout: Duration) -> Probe {
    let connect_res = time::timeout(timeout, TcpStream::connect((host, port))).await;

    let (open, stream, error) = match connect_res {
        Ok(Ok(stream)) => (true, Some(stream), None),
        Ok(Err(e)) if is_local_exhaustion(&e) => {
            warn!(port, error = %e, "unexpected socket error");
            (false, None, Some(e.to_string()))
        }
        Ok(Err(e)) => {
            debug!(port, error = %e, "port closed");
            (false, None, None)
        }
        Err(_) => {
            debug!(port, ?timeout, "connect timed out");
            (false, None, None)
        }
    };

    Probe {
        result: ProbeResult { port, open, error },
        stream,
    }
}

/// EMFILE/ENFILE/ENOBUFS, exhausted ephemeral ports (EADDRNOTAVAIL) and
/// their Winsock counterparts mean the scanner itself ran out of resources,
/// which says nothing about the remote port.
fn is_local_exhaustion(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::AddrNotAvailable
        || matches!(e.raw_os_error(), Some(23 | 24 | 105 | 10024 | 10055))
}

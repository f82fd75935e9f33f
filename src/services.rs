use crate::types::ServiceInfo;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Label used for ports missing from the table.
pub const UNKNOWN_SERVICE: &str = "Unknown";

static TCP_SERVICES: OnceLock<HashMap<u16, &'static str>> = OnceLock::new();

fn init_tcp_services() -> HashMap<u16, &'static str> {
    HashMap::from([
        (21, "FTP"),
        (22, "SSH"),
        (23, "Telnet"),
        (25, "SMTP"),
        (53, "DNS"),
        (69, "TFTP"),
        (80, "HTTP"),
        (88, "Kerberos"),
        (110, "POP3"),
        (111, "RPCBind"),
        (135, "MSRPC"),
        (139, "NetBIOS"),
        (143, "IMAP"),
        (161, "SNMP"),
        (389, "LDAP"),
        (443, "HTTPS"),
        (445, "SMB"),
        (465, "SMTPS"),
        (587, "Submission"),
        (636, "LDAPS"),
        (873, "Rsync"),
        (993, "IMAPS"),
        (995, "POP3S"),
        (1433, "MSSQL"),
        (1521, "OracleDB"),
        (2049, "NFS"),
        (2375, "Docker"),
        (3306, "MySQL"),
        (3389, "RDP"),
        (5432, "PostgreSQL"),
        (5672, "AMQP"),
        (5900, "VNC"),
        (6379, "Redis"),
        (8000, "HTTP-Dev"),
        (8080, "HTTP-Alt"),
        (8443, "HTTPS-Alt"),
        (9200, "Elasticsearch"),
        (11211, "Memcached"),
        (27017, "MongoDB"),
    ])
}

/// Map a port to its well-known service label, or [`UNKNOWN_SERVICE`].
pub fn identify(port: u16) -> ServiceInfo {
    let label = TCP_SERVICES
        .get_or_init(init_tcp_services)
        .get(&port)
        .copied()
        .unwrap_or(UNKNOWN_SERVICE);
    ServiceInfo {
        port,
        label: label.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_ports_mapped() {
        let expected = [
            (21, "FTP"),
            (22, "SSH"),
            (23, "Telnet"),
            (25, "SMTP"),
            (53, "DNS"),
            (80, "HTTP"),
            (110, "POP3"),
            (143, "IMAP"),
            (443, "HTTPS"),
            (445, "SMB"),
            (993, "IMAPS"),
            (995, "POP3S"),
            (1433, "MSSQL"),
            (1521, "OracleDB"),
            (3306, "MySQL"),
            (3389, "RDP"),
            (5432, "PostgreSQL"),
            (5900, "VNC"),
            (8080, "HTTP-Alt"),
            (8443, "HTTPS-Alt"),
        ];
        for (port, label) in expected {
            assert_eq!(identify(port).label, label, "port {port}");
        }
    }

    #[test]
    fn unmapped_port_is_unknown() {
        let info = identify(31337);
        assert_eq!(info.port, 31337);
        assert_eq!(info.label, UNKNOWN_SERVICE);
    }
}

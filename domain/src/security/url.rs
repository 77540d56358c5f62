//! SSRF screening for URL-shaped values.
//!
//! The validator decides *whether* a value looks like a URL; whether that URL
//! is safe is delegated to a [`UrlSafetyOracle`]. The default oracle,
//! [`StaticUrlOracle`], only inspects the literal host. It never resolves DNS,
//! so it is a pure function and safe to call from the validator.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};
use url::{Host, Url};

/// Decides whether a URL may be handed to a tool.
///
/// `Err` carries a human-readable reason. The validator prefixes it with the
/// `SSRF attempt blocked` category.
pub trait UrlSafetyOracle: Send + Sync {
    fn check(&self, url: &str) -> Result<(), String>;
}

/// Address classes the oracle may be told to let through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsrfPolicy {
    pub allow_loopback: bool,
    pub allow_private: bool,
    pub allow_link_local: bool,
    pub allowed_schemes: Vec<String>,
}

impl Default for SsrfPolicy {
    fn default() -> Self {
        Self {
            allow_loopback: false,
            allow_private: false,
            allow_link_local: false,
            allowed_schemes: vec!["http".to_string(), "https".to_string()],
        }
    }
}

/// Schemes that are URL-shaped even without `//` (`file:/etc/passwd`,
/// `gopher:host`).
const BARE_SCHEMES: &[&str] = &[
    "file", "gopher", "dict", "ldap", "ldaps", "tftp", "jar", "netdoc", "data", "javascript",
    "vbscript", "expect", "phar", "php", "ftp", "sftp", "smb", "ssh", "telnet", "http", "https",
    "ws", "wss",
];

const BLOCKED_HOSTS: &[&str] = &[
    "metadata.google.internal",
    "metadata",
    "instance-data",
    "metadata.azure.com",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddressClass {
    Loopback,
    Private,
    LinkLocal,
    Reserved,
}

impl AddressClass {
    fn label(&self) -> &'static str {
        match self {
            AddressClass::Loopback => "loopback",
            AddressClass::Private => "private network",
            AddressClass::LinkLocal => "link-local",
            AddressClass::Reserved => "reserved",
        }
    }
}

/// The URL to screen for `value`, or `None` when the value is not URL-shaped.
///
/// URL-shaped means `scheme://...`, one of the dangerous bare schemes
/// (`file:...`), a literal IP address optionally followed by a port and
/// path, or a schemeless `host[:port][/path]` that an HTTP client would
/// accept (`localhost:8080/admin`, `127.1`, `0x7f000001`). Schemeless values
/// are returned with an `http://` prefix.
pub fn url_candidate(value: &str) -> Option<String> {
    let value = value.trim();
    if let Some((scheme, _)) = value.split_once(':')
        && is_scheme(scheme)
    {
        let lower = scheme.to_ascii_lowercase();
        if value[scheme.len()..].starts_with("://") || BARE_SCHEMES.contains(&lower.as_str()) {
            return Some(value.to_string());
        }
    }

    let (head, rest) = match value.find('/') {
        Some(i) => value.split_at(i),
        None => (value, ""),
    };
    if let Ok(ip) = head.parse::<IpAddr>() {
        return Some(match ip {
            IpAddr::V4(_) => format!("http://{}{}", head, rest),
            IpAddr::V6(_) => format!("http://[{}]{}", head, rest),
        });
    }
    if let Some(inner) = head.strip_prefix('[')
        && let Some((addr, _)) = inner.split_once(']')
        && addr.parse::<Ipv6Addr>().is_ok()
    {
        return Some(format!("http://{}{}", head, rest));
    }
    if let Some((host, port)) = head.rsplit_once(':')
        && host.parse::<Ipv4Addr>().is_ok()
        && !port.is_empty()
        && port.bytes().all(|b| b.is_ascii_digit())
    {
        return Some(format!("http://{}{}", head, rest));
    }
    schemeless_candidate(value, head)
}

/// `host[:port][/path]` without a scheme, parsed the way a browser or curl
/// would. IPv4 shorthand (`127.1`, `2130706433`, `0x7f000001`) is normalized
/// by the parser. Bare numbers that land in `0.0.0.0/8` stay numbers, and a
/// domain needs a dot, a port, a path or the name `localhost`.
fn schemeless_candidate(value: &str, head: &str) -> Option<String> {
    if head.is_empty()
        || !head
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_' | b':' | b'@'))
    {
        return None;
    }
    let candidate = format!("http://{}", value);
    let parsed = Url::parse(&candidate).ok()?;
    let qualified = head.len() < value.len() || parsed.port().is_some();
    let shaped = match parsed.host()? {
        Host::Ipv4(ip) => ip.octets()[0] != 0 || qualified,
        Host::Ipv6(_) => true,
        Host::Domain(domain) => domain == "localhost" || domain.contains('.') || qualified,
    };
    shaped.then_some(candidate)
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Host-literal oracle driven by an [`SsrfPolicy`].
#[derive(Debug, Clone, Default)]
pub struct StaticUrlOracle {
    policy: SsrfPolicy,
}

impl StaticUrlOracle {
    pub fn new(policy: SsrfPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SsrfPolicy {
        &self.policy
    }

    fn allowed(&self, class: AddressClass) -> bool {
        match class {
            AddressClass::Loopback => self.policy.allow_loopback,
            AddressClass::Private => self.policy.allow_private,
            AddressClass::LinkLocal => self.policy.allow_link_local,
            AddressClass::Reserved => false,
        }
    }

    fn check_ip(&self, ip: IpAddr) -> Result<(), String> {
        let Some(class) = classify_ip(ip) else {
            return Ok(());
        };
        if self.allowed(class) {
            return Ok(());
        }
        let mut reason = format!("{} address {} is not allowed", class.label(), ip);
        if ip == IpAddr::V4(Ipv4Addr::new(169, 254, 169, 254)) {
            reason.push_str(" (cloud metadata endpoint)");
        }
        Err(reason)
    }

    fn check_domain(&self, domain: &str) -> Result<(), String> {
        let host = domain.trim_end_matches('.').to_ascii_lowercase();
        if (host == "localhost" || host.ends_with(".localhost")) && !self.policy.allow_loopback {
            return Err(format!("host '{}' resolves to loopback", host));
        }
        if BLOCKED_HOSTS.contains(&host.as_str()) && !self.policy.allow_link_local {
            return Err(format!("host '{}' is a cloud metadata endpoint", host));
        }
        Ok(())
    }
}

impl UrlSafetyOracle for StaticUrlOracle {
    fn check(&self, url: &str) -> Result<(), String> {
        let parsed = Url::parse(url).map_err(|e| format!("invalid URL '{}': {}", url, e))?;

        let scheme = parsed.scheme();
        if !self
            .policy
            .allowed_schemes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(scheme))
        {
            return Err(format!("scheme '{}' is not allowed", scheme));
        }

        match parsed.host() {
            None => Err(format!("URL '{}' has no host", url)),
            Some(Host::Domain(domain)) => self.check_domain(domain),
            Some(Host::Ipv4(ip)) => self.check_ip(IpAddr::V4(ip)),
            Some(Host::Ipv6(ip)) => self.check_ip(IpAddr::V6(ip)),
        }
    }
}

fn classify_ip(ip: IpAddr) -> Option<AddressClass> {
    match ip {
        IpAddr::V4(v4) => classify_v4(v4),
        IpAddr::V6(v6) => classify_v6(v6),
    }
}

fn classify_v4(ip: Ipv4Addr) -> Option<AddressClass> {
    let [a, b, _, _] = ip.octets();
    if ip.is_loopback() || a == 0 {
        Some(AddressClass::Loopback)
    } else if ip.is_link_local() {
        Some(AddressClass::LinkLocal)
    } else if ip.is_private()
        || (a == 100 && (64..128).contains(&b))
        || (a == 198 && (b == 18 || b == 19))
    {
        Some(AddressClass::Private)
    } else if ip.is_multicast() || ip.is_broadcast() || a >= 240 {
        Some(AddressClass::Reserved)
    } else {
        None
    }
}

fn classify_v6(ip: Ipv6Addr) -> Option<AddressClass> {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return classify_v4(v4);
    }
    let segments = ip.segments();
    // NAT64 well-known prefix 64:ff9b::/96 embeds an IPv4 address.
    if segments[..6] == [0x64, 0xff9b, 0, 0, 0, 0] {
        let [_, _, _, _, _, _, hi, lo] = segments;
        let v4 = Ipv4Addr::new((hi >> 8) as u8, hi as u8, (lo >> 8) as u8, lo as u8);
        return classify_v4(v4);
    }
    if ip.is_loopback() || ip.is_unspecified() {
        Some(AddressClass::Loopback)
    } else if segments[0] & 0xffc0 == 0xfe80 {
        Some(AddressClass::LinkLocal)
    } else if segments[0] & 0xfe00 == 0xfc00 || segments[0] & 0xffc0 == 0xfec0 {
        Some(AddressClass::Private)
    } else if ip.is_multicast() {
        Some(AddressClass::Reserved)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle() -> StaticUrlOracle {
        StaticUrlOracle::default()
    }

    #[test]
    fn test_url_candidate_shapes() {
        assert_eq!(url_candidate("https://example.com").as_deref(), Some("https://example.com"));
        assert_eq!(url_candidate("file:/etc/passwd").as_deref(), Some("file:/etc/passwd"));
        assert_eq!(url_candidate("127.0.0.1").as_deref(), Some("http://127.0.0.1"));
        assert_eq!(url_candidate("10.0.0.1:8080/x").as_deref(), Some("http://10.0.0.1:8080/x"));
        assert_eq!(url_candidate("::1").as_deref(), Some("http://[::1]"));
        assert_eq!(url_candidate("[::1]:80").as_deref(), Some("http://[::1]:80"));
        assert!(url_candidate("hello").is_none());
        assert!(url_candidate("note: remember milk").is_none());
        assert!(url_candidate("C:\\Windows").is_none());
    }

    #[test]
    fn test_schemeless_hosts_are_url_shaped() {
        for (value, expected) in [
            ("localhost:8080/admin", "http://localhost:8080/admin"),
            ("127.1", "http://127.1"),
            ("0x7f000001", "http://0x7f000001"),
            ("2130706433", "http://2130706433"),
            ("metadata.google.internal/computeMetadata/v1/", "http://metadata.google.internal/computeMetadata/v1/"),
            ("admin@127.0.0.1", "http://admin@127.0.0.1"),
        ] {
            assert_eq!(url_candidate(value).as_deref(), Some(expected), "{value}");
            assert!(oracle().check(expected).is_err(), "{value}");
        }
    }

    #[test]
    fn test_schemeless_numbers_and_words_stay_plain() {
        for value in ["0", "5", "0.5", "0x10", "+10.5", "README", "a b.c"] {
            assert!(url_candidate(value).is_none(), "{value}");
        }
        let notes = url_candidate("notes.txt").unwrap();
        assert!(oracle().check(&notes).is_ok());
        let public = url_candidate("example.com/x").unwrap();
        assert!(oracle().check(&public).is_ok());
    }

    #[test]
    fn test_public_urls_pass() {
        assert!(oracle().check("https://example.com/path").is_ok());
        assert!(oracle().check("http://93.184.216.34/").is_ok());
    }

    #[test]
    fn test_loopback_blocked() {
        for url in [
            "http://127.0.0.1/",
            "http://localhost:8080",
            "http://api.localhost/",
            "http://[::1]/",
            "http://0.0.0.0/",
            "http://2130706433/",
            "http://0x7f000001/",
            "http://[::ffff:127.0.0.1]/",
            "http://[64:ff9b::7f00:1]/",
        ] {
            assert!(oracle().check(url).is_err(), "{url}");
        }
    }

    #[test]
    fn test_private_and_link_local_blocked() {
        let err = oracle().check("http://169.254.169.254/latest/meta-data").unwrap_err();
        assert!(err.contains("cloud metadata"));
        assert!(oracle().check("http://metadata.google.internal/").is_err());
        assert!(oracle().check("http://10.1.2.3/").is_err());
        assert!(oracle().check("http://192.168.0.1/").is_err());
        assert!(oracle().check("http://100.64.0.1/").is_err());
        assert!(oracle().check("http://[fd00::1]/").is_err());
        assert!(oracle().check("http://[fe80::1]/").is_err());
    }

    #[test]
    fn test_disallowed_schemes() {
        let err = oracle().check("gopher://example.com/").unwrap_err();
        assert!(err.contains("scheme 'gopher'"));
        assert!(oracle().check("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_policy_toggles() {
        let permissive = StaticUrlOracle::new(SsrfPolicy {
            allow_loopback: true,
            allow_private: true,
            ..SsrfPolicy::default()
        });
        assert!(permissive.check("http://127.0.0.1:3000/").is_ok());
        assert!(permissive.check("http://10.0.0.5/").is_ok());
        assert!(permissive.check("http://169.254.169.254/").is_err());
        assert!(permissive.check("http://224.0.0.1/").is_err());
    }
}

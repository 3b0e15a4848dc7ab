use std::sync::OnceLock;

use regex::Regex;

use super::ClientError;

fn port_suffix() -> &'static Regex {
    static PORT: OnceLock<Regex> = OnceLock::new();
    PORT.get_or_init(|| Regex::new(r".*:[0-9]{1,5}$").expect("port pattern is valid"))
}

/// Turns a user-supplied agent address into a base URL.
///
/// `host` becomes `http://host:<default_port>`; an explicit port or scheme
/// is kept as given.
pub fn normalize_address(address: &str, default_port: u16) -> Result<String, ClientError> {
    let trimmed = address.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return Err(ClientError::InvalidAddress(address.to_string()));
    }

    let mut normalized = trimmed.to_string();
    if !port_suffix().is_match(&normalized) {
        normalized = format!("{}:{}", normalized, default_port);
    }
    if !normalized.contains("://") {
        normalized = format!("http://{}", normalized);
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_gets_port_and_scheme() {
        assert_eq!(
            normalize_address("10.0.0.5", 1471).unwrap(),
            "http://10.0.0.5:1471"
        );
    }

    #[test]
    fn test_explicit_port_kept() {
        assert_eq!(
            normalize_address("agent.local:8270", 1471).unwrap(),
            "http://agent.local:8270"
        );
    }

    #[test]
    fn test_explicit_scheme_kept() {
        assert_eq!(
            normalize_address("https://agent.local/", 1471).unwrap(),
            "https://agent.local:1471"
        );
        assert_eq!(
            normalize_address("http://agent.local:99", 1471).unwrap(),
            "http://agent.local:99"
        );
    }

    #[test]
    fn test_invalid_address() {
        assert!(matches!(
            normalize_address("  ", 1471),
            Err(ClientError::InvalidAddress(_))
        ));
        assert!(normalize_address("bad host", 1471).is_err());
    }
}

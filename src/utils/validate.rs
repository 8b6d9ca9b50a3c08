//! URL and filename validation for image links.
//!
//! Provider payloads are untrusted: image links can be relative, use odd
//! schemes, or point at internal hosts. Everything that reaches a caller or
//! gets downloaded goes through these checks first.

use thiserror::Error;

/// Validation error types
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid filename: contains disallowed characters")]
    InvalidFilename,

    #[error("URL contains potentially dangerous characters")]
    DangerousUrl,

    #[error("Path traversal detected: {0}")]
    PathTraversal(String),
}

/// Check that a URL is absolute and uses the http or https scheme
///
/// This is the invariant every returned [`SearchResult`](crate::models::SearchResult)
/// image URL must satisfy.
pub fn is_http_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return false;
    }

    let lower = url.to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return false;
    }

    url::Url::parse(url)
        .map(|parsed| parsed.host_str().is_some_and(|h| !h.is_empty()))
        .unwrap_or(false)
}

/// Turn protocol-relative links (`//host/path`) into https links
///
/// Anything else is returned trimmed and otherwise untouched.
pub fn absolutize_url(url: &str) -> String {
    let url = url.trim();
    match url.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

/// Validate a URL before fetching it directly
///
/// Rejects non-HTTP schemes and obvious internal hosts unless
/// `allow_private` is set.
pub fn validate_url(url: &str, allow_private: bool) -> Result<String, ValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(ValidationError::InvalidUrl("empty URL".to_string()));
    }

    if url.contains('\0') || url.contains('\n') || url.contains('\r') {
        return Err(ValidationError::DangerousUrl);
    }

    let parsed = url::Url::parse(url).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        _ => {
            return Err(ValidationError::InvalidUrl(format!(
                "invalid scheme: {}",
                parsed.scheme()
            )))
        }
    }

    if allow_private {
        return Ok(url.to_string());
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| ValidationError::InvalidUrl("missing host".to_string()))?
        .to_lowercase();

    if host == "localhost" || host == "::1" || host == "[::1]" {
        return Err(ValidationError::DangerousUrl);
    }

    if let Ok(ip) = host.parse::<std::net::Ipv4Addr>() {
        if ip.is_loopback() || ip.is_private() || ip.is_unspecified() || ip.is_link_local() {
            return Err(ValidationError::DangerousUrl);
        }
    }

    Ok(url.to_string())
}

/// Sanitize a filename to prevent path traversal and other attacks
///
/// Keeps alphanumerics, dash, underscore, dot and space; limits length.
pub fn sanitize_filename(filename: &str) -> Result<String, ValidationError> {
    let filename = filename.trim();

    if filename.is_empty() {
        return Err(ValidationError::InvalidFilename);
    }

    if filename.contains("..")
        || filename.starts_with('/')
        || filename.starts_with('\\')
        || filename.contains(":/")
        || filename.contains(":\\")
    {
        return Err(ValidationError::PathTraversal(filename.to_string()));
    }

    let mut sanitized: String = filename
        .chars()
        .filter(|ch| ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.' | ' '))
        .collect();

    const MAX_FILENAME_LENGTH: usize = 255;
    if sanitized.chars().count() > MAX_FILENAME_LENGTH {
        sanitized = sanitized.chars().take(MAX_FILENAME_LENGTH).collect();
    }

    if sanitized.is_empty() {
        return Err(ValidationError::InvalidFilename);
    }

    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("https://media.giphy.com/media/abc/giphy.gif"));
        assert!(is_http_url("HTTP://example.com/a.jpg"));
        assert!(is_http_url("  https://example.com/a.jpg  "));

        assert!(!is_http_url(""));
        assert!(!is_http_url("   "));
        assert!(!is_http_url("//example.com/a.jpg"));
        assert!(!is_http_url("ftp://example.com/a.jpg"));
        assert!(!is_http_url("data:image/gif;base64,R0lGOD"));
        assert!(!is_http_url("httpfoo"));
        assert!(!is_http_url("https://"));
    }

    #[test]
    fn test_absolutize_url() {
        assert_eq!(
            absolutize_url("//i.imgur.com/abc.jpg"),
            "https://i.imgur.com/abc.jpg"
        );
        assert_eq!(
            absolutize_url(" https://example.com/x.png "),
            "https://example.com/x.png"
        );
        assert_eq!(absolutize_url("/relative.png"), "/relative.png");
    }

    #[test]
    fn test_validate_url_valid() {
        assert!(validate_url("https://media.tenor.com/abc/tenor.gif", false).is_ok());
        assert!(validate_url("http://example.com/a.png", false).is_ok());
    }

    #[test]
    fn test_validate_url_invalid() {
        assert!(validate_url("", false).is_err());
        assert!(validate_url("ftp://example.com", false).is_err());
        assert!(validate_url("javascript:alert(1)", false).is_err());
        assert!(validate_url("http://localhost:8000/a.png", false).is_err());
        assert!(validate_url("http://127.0.0.1:8000/a.png", false).is_err());
        assert!(validate_url("http://192.168.1.10/a.png", false).is_err());
    }

    #[test]
    fn test_validate_url_private_allowed() {
        assert!(validate_url("http://127.0.0.1:8000/a.png", true).is_ok());
        assert!(validate_url("ftp://127.0.0.1/a.png", true).is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("giphy.gif").unwrap(), "giphy.gif");
        assert_eq!(sanitize_filename("cat (1).png").unwrap(), "cat 1.png");
        assert!(sanitize_filename("../etc/passwd").is_err());
        assert!(sanitize_filename("/etc/passwd").is_err());
        assert!(sanitize_filename("???").is_err());
    }
}

//! Record name and endpoint validation.
//!
//! Valid record names:
//! - Must be non-empty
//! - Must be at most [`MAX_NAME_LEN`] bytes (the S3 key length limit)
//! - Must not contain control characters
//!
//! Valid endpoints are either empty (use the provider default) or an
//! `http://` / `https://` URL with a non-empty host.

use url::Url;

use crate::error::TypeError;

/// Maximum length of a record name in bytes.
pub const MAX_NAME_LEN: usize = 1024;

/// Validate a record name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use bucketdeck_types::validate_record_name;
///
/// assert!(validate_record_name("logs").is_ok());
/// assert!(validate_record_name("photos/2024/cat.jpg").is_ok());
/// assert!(validate_record_name("").is_err());
/// ```
pub fn validate_record_name(name: &str) -> Result<(), TypeError> {
    if name.is_empty() {
        return Err(TypeError::InvalidName {
            name: name.to_string(),
            reason: "name must not be empty".into(),
        });
    }

    if name.len() > MAX_NAME_LEN {
        return Err(TypeError::InvalidName {
            name: name.chars().take(32).collect(),
            reason: format!("name is {} bytes, limit is {MAX_NAME_LEN}", name.len()),
        });
    }

    if let Some(ch) = name.chars().find(|c| c.is_control()) {
        return Err(TypeError::InvalidName {
            name: name.to_string(),
            reason: format!("contains control character: {ch:?}"),
        });
    }

    Ok(())
}

/// Validate a profile endpoint.
///
/// # Examples
///
/// ```
/// use bucketdeck_types::validate_endpoint;
///
/// assert!(validate_endpoint("").is_ok());
/// assert!(validate_endpoint("http://localhost:9000").is_ok());
/// assert!(validate_endpoint("http://:9000").is_err());
/// ```
pub fn validate_endpoint(endpoint: &str) -> Result<(), TypeError> {
    if endpoint.is_empty() {
        return Ok(());
    }

    let invalid = |reason: String| TypeError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    // `Url::parse` silently strips surrounding and embedded tabs/newlines.
    if endpoint.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace".into()));
    }

    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;

    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(invalid(format!("scheme must be http or https, found '{scheme}'")));
    }

    if url.host_str().unwrap_or_default().is_empty() {
        return Err(invalid("missing host".into()));
    }

    Ok(())
}

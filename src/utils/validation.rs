use crate::error::{ApiError, ApiResult};

/// Validate a scan target (host, CIDR or URL) before any engine is
/// invoked. The target is handed to a child process as a single argument,
/// so a leading dash is rejected to keep it from being read as a flag.
pub fn validate_target(target: &str) -> ApiResult<()> {
    if target.is_empty() {
        return Err(ApiError::validation("Target is required"));
    }

    if target.len() > 2048 {
        return Err(ApiError::validation("Target too long"));
    }

    if target.starts_with('-') {
        return Err(ApiError::validation("Target must not begin with a dash"));
    }

    if !target
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '-' | '/' | '_'))
    {
        return Err(ApiError::validation("Target contains invalid characters"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_targets() {
        assert!(validate_target("10.0.0.5").is_ok());
        assert!(validate_target("10.0.0.0/24").is_ok());
        assert!(validate_target("scanme.example.com").is_ok());
        assert!(validate_target("http://10.0.0.5:8080").is_ok());
        assert!(validate_target("fe80::1").is_ok());
    }

    #[test]
    fn test_rejects_empty_target() {
        assert!(matches!(
            validate_target(""),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_flag_like_target() {
        assert!(validate_target("--script=evil").is_err());
    }

    #[test]
    fn test_rejects_shell_metacharacters() {
        assert!(validate_target("10.0.0.5; rm -rf /tmp").is_err());
        assert!(validate_target("10.0.0.5 10.0.0.6").is_err());
    }
}

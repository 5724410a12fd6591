use crate::utils::error::{ConceptsError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl ToString, reason: impl Into<String>) -> ConceptsError {
    ConceptsError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

pub fn validate_s3_bucket_name(field_name: &str, bucket_name: &str) -> Result<()> {
    if bucket_name.is_empty() {
        return Err(invalid(
            field_name,
            bucket_name,
            "S3 bucket name cannot be empty",
        ));
    }

    if bucket_name.len() < 3 || bucket_name.len() > 63 {
        return Err(invalid(
            field_name,
            bucket_name,
            "S3 bucket name must be between 3 and 63 characters",
        ));
    }

    if !bucket_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(invalid(
            field_name,
            bucket_name,
            "S3 bucket name can only contain lowercase letters, numbers, hyphens, and dots",
        ));
    }

    if bucket_name.starts_with('-') || bucket_name.ends_with('-') {
        return Err(invalid(
            field_name,
            bucket_name,
            "S3 bucket name cannot start or end with a hyphen",
        ));
    }

    Ok(())
}

pub fn validate_aws_region(field_name: &str, region: &str) -> Result<()> {
    validate_non_empty_string(field_name, region)?;

    if !region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            field_name,
            region,
            "AWS region can only contain lowercase letters, numbers, and hyphens",
        ));
    }

    Ok(())
}

/// Object key prefixes are joined onto the download directory, so they must
/// stay relative.
pub fn validate_key_prefix(field_name: &str, prefix: &str) -> Result<()> {
    if prefix.starts_with('/') {
        return Err(invalid(
            field_name,
            prefix,
            "Prefix must not start with '/'",
        ));
    }
    if prefix.split('/').any(|segment| segment == "..") {
        return Err(invalid(field_name, prefix, "Prefix must not contain '..'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_bucket_name() {
        assert!(validate_s3_bucket_name("bucket", "cpr-production-document-cache").is_ok());
        assert!(validate_s3_bucket_name("bucket", "ab").is_err());
        assert!(validate_s3_bucket_name("bucket", "Upper-Case").is_err());
        assert!(validate_s3_bucket_name("bucket", "-leading").is_err());
    }

    #[test]
    fn test_validate_region() {
        assert!(validate_aws_region("region", "eu-west-1").is_ok());
        assert!(validate_aws_region("region", "").is_err());
        assert!(validate_aws_region("region", "EU_WEST").is_err());
    }

    #[test]
    fn test_validate_key_prefix() {
        assert!(validate_key_prefix("prefix", "concepts").is_ok());
        assert!(validate_key_prefix("prefix", "").is_ok());
        assert!(validate_key_prefix("prefix", "/concepts").is_err());
        assert!(validate_key_prefix("prefix", "a/../b").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("limit", 10, 1, 1000).is_ok());
        assert!(validate_range("limit", 0, 1, 1000).is_err());
        assert!(validate_range("limit", 1001, 1, 1000).is_err());
    }
}

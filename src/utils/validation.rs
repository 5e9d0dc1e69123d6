//! Field validators shared by request bodies

use validator::ValidationError;

/// Reject values that are empty once trimmed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_blank");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("E1").is_ok());
        assert!(validate_not_blank(" Dock 4 ").is_ok());
        assert!(validate_not_blank("").is_err());
        assert_eq!(validate_not_blank("   ").unwrap_err().code, "not_blank");
    }
}

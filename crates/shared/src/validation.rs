//! Common validation utilities.

use validator::ValidationError;

/// Validates the trimmed length of a string in characters (not bytes).
pub fn validate_trimmed_chars(
    value: &str,
    min: usize,
    max: usize,
    field: &'static str,
) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if (min..=max).contains(&len) {
        Ok(())
    } else {
        let mut err = ValidationError::new("length");
        err.message = Some(format!("{} must be between {} and {} characters", field, min, max).into());
        err.add_param("min".into(), &min);
        err.add_param("max".into(), &max);
        Err(err)
    }
}

/// Trims a value and maps blank input to `None`.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

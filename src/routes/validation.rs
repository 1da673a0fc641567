use std::sync::LazyLock;

use regex::Regex;

use crate::error::AppError;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

pub fn required(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    if value.len() > 1000 {
        return Err(AppError::BadRequest(format!("{field} is too long")));
    }
    Ok(())
}

pub fn email(value: &str) -> Result<(), AppError> {
    if EMAIL_RE.is_match(value.trim()) {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid email address".to_string()))
    }
}

/// Accepts empty strings and `YYYY-MM-DD` dates.
pub fn optional_date(value: &str, field: &str) -> Result<(), AppError> {
    if value.is_empty() || chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("{field} must be a YYYY-MM-DD date")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(email("ops@acme.test").is_ok());
        assert!(email("ops@acme").is_err());
        assert!(email("not an email").is_err());
    }

    #[test]
    fn required_rejects_blank() {
        assert!(required("  ", "Name").is_err());
        assert!(required("Acme", "Name").is_ok());
    }

    #[test]
    fn dates() {
        assert!(optional_date("", "Due date").is_ok());
        assert!(optional_date("2024-03-01", "Due date").is_ok());
        assert!(optional_date("03/01/2024", "Due date").is_err());
    }
}

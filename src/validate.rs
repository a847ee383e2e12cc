//! Validações de entrada compartilhadas pelo serviço.
//!
//! CNPJ é verificado apenas quanto ao formato (14 dígitos após remover a
//! pontuação); os dígitos verificadores não são conferidos.

use crate::error::ManutError;

/// Trims `value` and rejects it when nothing is left.
pub fn required(field: &str, value: &str) -> Result<String, ManutError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ManutError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Returns the CNPJ reduced to its 14 digits.
pub fn cnpj(raw: &str) -> Result<String, ManutError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 14 {
        return Err(ManutError::Validation(format!(
            "CNPJ must have 14 digits, got {:?}",
            raw.trim()
        )));
    }
    Ok(digits)
}

/// Formats a CNPJ as `XX.XXX.XXX/XXXX-XX`, leaving malformed input untouched.
pub fn format_cnpj(raw: &str) -> String {
    match cnpj(raw) {
        Ok(d) => format!(
            "{}.{}.{}/{}-{}",
            &d[..2],
            &d[2..5],
            &d[5..8],
            &d[8..12],
            &d[12..]
        ),
        Err(_) => raw.to_string(),
    }
}

/// Employee registrations are positive integers.
pub fn registration(value: u32) -> Result<u32, ManutError> {
    if value == 0 {
        return Err(ManutError::Validation(
            "registration must be a positive number".into(),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_trims() {
        assert_eq!(required("area", "  Civil ").unwrap(), "Civil");
        assert!(required("area", " \t").is_err());
    }

    #[test]
    fn cnpj_accepts_punctuated_and_bare_forms() {
        assert_eq!(cnpj("12.345.678/0001-90").unwrap(), "12345678000190");
        assert_eq!(cnpj("12345678000190").unwrap(), "12345678000190");
    }

    #[test]
    fn cnpj_rejects_wrong_length() {
        assert!(cnpj("1234").is_err());
        assert!(cnpj("").is_err());
        assert!(cnpj("123456780001901").is_err());
    }

    #[test]
    fn format_cnpj_inserts_punctuation() {
        assert_eq!(format_cnpj("12345678000190"), "12.345.678/0001-90");
        assert_eq!(format_cnpj("abc"), "abc");
    }

    #[test]
    fn registration_must_be_positive() {
        assert_eq!(registration(42).unwrap(), 42);
        assert!(registration(0).is_err());
    }
}

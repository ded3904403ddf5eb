use once_cell::sync::Lazy;
use regex::Regex;

use crate::api::models::NewContact;
use crate::error::ValidationError;

static E164: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+[1-9][0-9]{7,14}$").expect("valid regex"));
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-.()]").expect("valid regex"));

/// Strips common separators and returns the number in E.164 form, or `None`
/// when it does not look like one.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let compact = SEPARATORS.replace_all(raw.trim(), "");
    E164.is_match(&compact).then(|| compact.into_owned())
}

pub fn validate(name: &str, phone: &str) -> Result<NewContact, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::NameRequired);
    }
    if phone.trim().is_empty() {
        return Err(ValidationError::PhoneRequired);
    }
    let phone = normalize_phone(phone).ok_or(ValidationError::InvalidPhone)?;
    Ok(NewContact {
        name: name.to_string(),
        phone,
    })
}

/// State of the add/edit dialog. Values are only cleared by `reset`, so a
/// failed submit never loses what the user typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub phone: String,
    error: Option<String>,
}

impl ContactForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefilled(contact: &NewContact) -> Self {
        Self {
            name: contact.name.clone(),
            phone: contact.phone.clone(),
            error: None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Validates the current values. A validation failure is recorded as the
    /// form error as well as returned.
    pub fn validate(&mut self) -> Result<NewContact, ValidationError> {
        match validate(&self.name, &self.phone) {
            Ok(c) => {
                self.error = None;
                Ok(c)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn submit_failed(&mut self, err: &impl std::fmt::Display) {
        self.error = Some(err.to_string());
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_numbers_normalize_to_e164() {
        assert_eq!(normalize_phone("+48 500-100-200").as_deref(), Some("+48500100200"));
        assert_eq!(normalize_phone(" +1 (415) 555.0100 ").as_deref(), Some("+14155550100"));
        assert_eq!(normalize_phone("500100200"), None);
        assert_eq!(normalize_phone("+0500100200"), None);
        assert_eq!(normalize_phone("+1234"), None);
        assert_eq!(normalize_phone("+1234567890123456"), None);
    }

    #[test]
    fn validation_order_matches_the_form_fields() {
        assert_eq!(validate("  ", "+48500100200"), Err(ValidationError::NameRequired));
        assert_eq!(validate("Ann", ""), Err(ValidationError::PhoneRequired));
        assert_eq!(validate("Ann", "abc"), Err(ValidationError::InvalidPhone));
        assert_eq!(
            validate(" Ann ", "+48 500 100 200"),
            Ok(NewContact { name: "Ann".into(), phone: "+48500100200".into() })
        );
    }

    #[test]
    fn failed_submit_keeps_values() {
        let mut form = ContactForm::new();
        form.name = "Ann".into();
        form.phone = "+48500100200".into();
        form.submit_failed(&"failed to add contact");
        assert_eq!(form.name, "Ann");
        assert_eq!(form.phone, "+48500100200");
        assert_eq!(form.error(), Some("failed to add contact"));

        form.reset();
        assert_eq!(form, ContactForm::new());
    }

    #[test]
    fn invalid_values_set_the_form_error() {
        let mut form = ContactForm::new();
        form.name = "Ann".into();
        assert!(form.validate().is_err());
        assert_eq!(form.error(), Some("Phone number is required"));
    }
}

//! Emergency contacts and the recipient sets derived from them.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{AlertConfig, AppError, ErrorKind};

pub const MISSING_FIELDS_MESSAGE: &str = "Please provide both name and number";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContactError {
    #[error("contact name is empty")]
    EmptyName,
    #[error("contact number is empty")]
    EmptyNumber,
}

impl From<ContactError> for AppError {
    fn from(e: ContactError) -> Self {
        AppError::new(ErrorKind::Validation, MISSING_FIELDS_MESSAGE).with_internal(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    name: String,
    number: String,
}

impl Contact {
    /// Both fields are trimmed; blank input is rejected.
    pub fn new(name: &str, number: &str) -> Result<Self, ContactError> {
        let name = name.trim();
        let number = number.trim();
        if name.is_empty() {
            return Err(ContactError::EmptyName);
        }
        if number.is_empty() {
            return Err(ContactError::EmptyNumber);
        }
        Ok(Self {
            name: name.to_string(),
            number: number.to_string(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn number(&self) -> &str {
        &self.number
    }
}

/// Append-only, insertion-ordered. Duplicates are kept as entered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactRegistry {
    contacts: Vec<Contact>,
}

impl ContactRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_contact(&mut self, name: &str, number: &str) -> Result<&Contact, ContactError> {
        let contact = Contact::new(name, number)?;
        debug!(count = self.contacts.len() + 1, "contact added");
        self.contacts.push(contact);
        Ok(&self.contacts[self.contacts.len() - 1])
    }

    #[must_use]
    pub fn list_contacts(&self) -> &[Contact] {
        &self.contacts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    fn non_helpline_numbers<'a>(
        &'a self,
        config: &'a AlertConfig,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.contacts
            .iter()
            .map(Contact::number)
            .filter(move |number| !config.is_helpline(number))
    }

    #[must_use]
    pub fn message_recipients(&self, config: &AlertConfig) -> Vec<String> {
        self.non_helpline_numbers(config)
            .map(str::to_string)
            .collect()
    }

    /// Both helplines first, in configured order, then every contact that is
    /// not itself a helpline.
    #[must_use]
    pub fn call_recipients(&self, config: &AlertConfig) -> Vec<String> {
        config
            .helplines
            .iter()
            .map(String::as_str)
            .chain(self.non_helpline_numbers(config))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registry(entries: &[(&str, &str)]) -> ContactRegistry {
        let mut registry = ContactRegistry::new();
        for (name, number) in entries {
            registry.add_contact(name, number).unwrap();
        }
        registry
    }

    #[test]
    fn test_add_contact_rejects_missing_fields() {
        let mut registry = ContactRegistry::new();
        assert_eq!(registry.add_contact("", "123"), Err(ContactError::EmptyName));
        assert_eq!(registry.add_contact("Name", ""), Err(ContactError::EmptyNumber));
        assert_eq!(registry.add_contact("   ", "123"), Err(ContactError::EmptyName));
        assert_eq!(registry.add_contact("Name", " \t"), Err(ContactError::EmptyNumber));
        assert!(registry.is_empty());

        registry.add_contact("Name", "123").unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list_contacts()[0].name(), "Name");
        assert_eq!(registry.list_contacts()[0].number(), "123");
    }

    #[test]
    fn test_validation_error_surfaces_alert_copy() {
        let err: AppError = ContactError::EmptyName.into();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.user_facing_message(), MISSING_FIELDS_MESSAGE);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let registry = registry(&[("Alice", "555-1111"), ("Alice", "555-1111")]);
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.message_recipients(&AlertConfig::default()),
            vec!["555-1111", "555-1111"]
        );
    }

    #[test]
    fn test_call_recipients_lead_with_helplines() {
        let registry = registry(&[("Alice", "555-1111")]);
        assert_eq!(
            registry.call_recipients(&AlertConfig::default()),
            vec!["100", "1091", "555-1111"]
        );
    }

    #[test]
    fn test_helpline_contact_is_not_called_twice() {
        let registry = registry(&[("Bob", "1091"), ("Carol", "555-2222"), ("Police", " 100 ")]);
        let config = AlertConfig::default();
        assert_eq!(
            registry.call_recipients(&config),
            vec!["100", "1091", "555-2222"]
        );
        assert_eq!(registry.message_recipients(&config), vec!["555-2222"]);
    }

    #[test]
    fn test_helpline_written_with_separators_is_not_called_twice() {
        let registry = registry(&[("Police", "10-0"), ("Women", "(1091)"), ("Alice", "555-1111")]);
        let config = AlertConfig::default();
        assert_eq!(
            registry.call_recipients(&config),
            vec!["100", "1091", "555-1111"]
        );
        assert_eq!(registry.message_recipients(&config), vec!["555-1111"]);
    }

    #[test]
    fn test_empty_registry_still_calls_helplines() {
        let registry = ContactRegistry::new();
        let config = AlertConfig::default();
        assert_eq!(registry.call_recipients(&config), vec!["100", "1091"]);
        assert!(registry.message_recipients(&config).is_empty());
    }

    proptest! {
        #[test]
        fn prop_helplines_called_exactly_once(
            numbers in prop::collection::vec(
                prop_oneof![Just("100".to_string()), Just("1091".to_string()), "[0-9]{3,8}"],
                0..12,
            )
        ) {
            let mut registry = ContactRegistry::new();
            for (i, number) in numbers.iter().enumerate() {
                registry.add_contact(&format!("contact {i}"), number).unwrap();
            }
            let config = AlertConfig::default();
            let calls = registry.call_recipients(&config);

            for helpline in &config.helplines {
                prop_assert_eq!(calls.iter().filter(|n| *n == helpline).count(), 1);
            }
            prop_assert_eq!(&calls[..2], &config.helplines[..]);
            prop_assert_eq!(&calls[2..], &registry.message_recipients(&config)[..]);
        }

        #[test]
        fn prop_message_recipients_preserve_order(
            numbers in prop::collection::vec(
                prop_oneof![Just("100".to_string()), Just("1091".to_string()), "[0-9]{3,8}"],
                0..12,
            )
        ) {
            let mut registry = ContactRegistry::new();
            for number in &numbers {
                registry.add_contact("someone", number).unwrap();
            }
            let config = AlertConfig::default();
            let expected: Vec<String> = numbers
                .iter()
                .filter(|n| n.as_str() != "100" && n.as_str() != "1091")
                .cloned()
                .collect();
            prop_assert_eq!(registry.message_recipients(&config), expected);
        }
    }
}

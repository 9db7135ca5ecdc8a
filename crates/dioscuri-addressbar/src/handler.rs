//! Submit handling for the address bar form

use std::collections::HashMap;
use std::hash::BuildHasher;

use crate::encoding::{decode_component, encode_component};
use crate::{AddressError, Result, ADDRESS_FIELD};

/// Snapshot of a submitted form's field values
pub trait FormFields {
    /// First value submitted under `name`, if any
    fn field(&self, name: &str) -> Option<String>;
}

impl<S: BuildHasher> FormFields for HashMap<String, String, S> {
    fn field(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FormFields for [(K, V)] {
    fn field(&self, name: &str) -> Option<String> {
        self.iter()
            .find(|(key, _)| key.as_ref() == name)
            .map(|(_, value)| value.as_ref().to_string())
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FormFields for Vec<(K, V)> {
    fn field(&self, name: &str) -> Option<String> {
        self.as_slice().field(name)
    }
}

/// A form submission as delivered by the host environment
pub trait SubmitEvent: FormFields {
    /// Stop the host from performing its own form submission
    fn prevent_default(&self);
}

/// Something that can move the page to a new location
pub trait Navigator {
    fn navigate(&self, destination: &str);
}

/// Result of handling one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Location was set to this path
    Navigate(String),
    /// Address was empty or absent; nothing happened
    Stay,
}

/// Non-empty address taken from the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressInput(String);

impl AddressInput {
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Read the address field out of a form snapshot
    pub fn from_fields<F: FormFields + ?Sized>(fields: &F, name: &str) -> Option<Self> {
        fields.field(name).and_then(Self::new)
    }

    /// Recover the address from a destination path produced by [`Self::destination`]
    pub fn from_destination(path: &str) -> Result<Self> {
        let encoded = path
            .strip_prefix('/')
            .ok_or_else(|| AddressError::NotAPath(path.to_string()))?;
        let decoded = decode_component(encoded)?;
        Self::new(decoded).ok_or(AddressError::Empty)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// `/` followed by the URI-component encoding of the address
    pub fn destination(&self) -> String {
        format!("/{}", encode_component(&self.0))
    }
}

/// Converts address bar submissions into navigations
#[derive(Debug, Clone)]
pub struct AddressBarHandler {
    field: String,
}

impl AddressBarHandler {
    pub fn new() -> Self {
        Self {
            field: ADDRESS_FIELD.to_string(),
        }
    }

    pub fn with_field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Decide where a submission leads without touching the host
    pub fn resolve<F: FormFields + ?Sized>(&self, fields: &F) -> SubmitOutcome {
        match AddressInput::from_fields(fields, &self.field) {
            Some(input) => SubmitOutcome::Navigate(input.destination()),
            None => SubmitOutcome::Stay,
        }
    }

    /// Handle a submit event: suppress the default, then navigate if the
    /// address is non-empty.
    pub fn on_submit<E, N>(&self, event: &E, navigator: &N) -> SubmitOutcome
    where
        E: SubmitEvent + ?Sized,
        N: Navigator + ?Sized,
    {
        event.prevent_default();

        let outcome = self.resolve(event);
        match &outcome {
            SubmitOutcome::Navigate(destination) => {
                tracing::debug!(%destination, "Address bar navigating");
                navigator.navigate(destination);
            }
            SubmitOutcome::Stay => {
                tracing::trace!("Address bar submitted without an address");
            }
        }
        outcome
    }
}

impl Default for AddressBarHandler {
    fn default() -> Self {
        Self::new()
    }
}

//! Client-side form validation. The rules mirror what the web forms check before submitting,
//! so most bad input never reaches the server.

use crate::FieldErrors;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NAME: Regex = Regex::new(r"^[a-zA-Z0-9\s\-',.&]+$").unwrap();
    static ref ADDRESS: Regex = Regex::new(r"^[a-zA-Z0-9\s\-',.#&]+$").unwrap();
    static ref PLACE: Regex = Regex::new(r"^[a-zA-Z\s\-']+$").unwrap();
    static ref POSTAL_CODE: Regex = Regex::new(r"^[a-zA-Z0-9\s\-]+$").unwrap();
    static ref PHONE: Regex = Regex::new(r"^\+?[1-9]\d{1,14}$").unwrap();
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Implemented by everything that gets submitted from a form.
pub trait Validate {
    /// Check the input, returning one message per offending field.
    fn validate(&self) -> Result<(), FieldErrors>;
}

/// A single check. The first failing rule of a field produces its message.
#[derive(Clone, Copy)]
pub(crate) enum Rule {
    Required(&'static str),
    MinLength(usize, &'static str),
    MaxLength(usize, &'static str),
    Matches(&'static Regex, &'static str),
    Email(&'static str)
}

impl Rule {
    fn check(&self, value: &str) -> Option<&'static str> {
        let len = value.chars().count();
        let ok = match *self {
            Rule::Required(_) => !value.is_empty(),
            Rule::MinLength(min, _) => len >= min,
            Rule::MaxLength(max, _) => len <= max,
            Rule::Matches(regex, _) => regex.is_match(value),
            Rule::Email(_) => EMAIL.is_match(value)
        };
        if ok {
            None
        } else {
            Some(self.message())
        }
    }

    fn message(&self) -> &'static str {
        match *self {
            Rule::Required(message)
            | Rule::MinLength(_, message)
            | Rule::MaxLength(_, message)
            | Rule::Matches(_, message)
            | Rule::Email(message) => message
        }
    }
}

/// Collects field errors for one input.
#[derive(Default)]
pub(crate) struct Validator {
    errors: FieldErrors
}

impl Validator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Check a required field.
    pub(crate) fn field(&mut self, name: &'static str, value: &str, rules: &[Rule]) -> &mut Self {
        let value = value.trim();
        if let Some(message) = rules.iter().find_map(|rule| rule.check(value)) {
            self.errors.insert(name.to_string(), message.to_string());
        }
        self
    }

    /// Check a field only if it was supplied, as in partial updates.
    pub(crate) fn optional(
        &mut self,
        name: &'static str,
        value: Option<&str>,
        rules: &[Rule]
    ) -> &mut Self {
        if let Some(value) = value {
            self.field(name, value, rules);
        }
        self
    }

    pub(crate) fn finish(&mut self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
}

pub(crate) fn name() -> [Rule; 3] {
    [
        Rule::MinLength(2, "Name must be at least 2 characters"),
        Rule::MaxLength(100, "Name must be less than 100 characters"),
        Rule::Matches(
            &NAME,
            "Name can only contain letters, numbers, spaces, and basic punctuation"
        )
    ]
}

pub(crate) fn organization_email() -> [Rule; 3] {
    [
        Rule::Required("Email is required"),
        Rule::Email("Invalid email address"),
        Rule::MaxLength(255, "Email must be less than 255 characters")
    ]
}

pub(crate) fn phone() -> [Rule; 2] {
    [
        Rule::Required("Phone number is required"),
        Rule::Matches(
            &PHONE,
            "Phone number must be in E.164 format (e.g., +1234567890)"
        )
    ]
}

pub(crate) fn address() -> [Rule; 3] {
    [
        Rule::MinLength(5, "Address must be at least 5 characters"),
        Rule::MaxLength(200, "Address must be less than 200 characters"),
        Rule::Matches(
            &ADDRESS,
            "Address can only contain letters, numbers, spaces, and basic punctuation"
        )
    ]
}

pub(crate) fn city() -> [Rule; 3] {
    [
        Rule::MinLength(2, "City must be at least 2 characters"),
        Rule::MaxLength(100, "City must be less than 100 characters"),
        Rule::Matches(
            &PLACE,
            "City can only contain letters, spaces, hyphens and apostrophes"
        )
    ]
}

pub(crate) fn region() -> [Rule; 3] {
    [
        Rule::MinLength(2, "State/Province must be at least 2 characters"),
        Rule::MaxLength(100, "State/Province must be less than 100 characters"),
        Rule::Matches(
            &PLACE,
            "State/Province can only contain letters, spaces, hyphens and apostrophes"
        )
    ]
}

pub(crate) fn country() -> [Rule; 3] {
    [
        Rule::MinLength(2, "Country must be at least 2 characters"),
        Rule::MaxLength(100, "Country must be less than 100 characters"),
        Rule::Matches(
            &PLACE,
            "Country can only contain letters, spaces, hyphens and apostrophes"
        )
    ]
}

pub(crate) fn postal_code() -> [Rule; 3] {
    [
        Rule::MinLength(3, "Postal code must be at least 3 characters"),
        Rule::MaxLength(20, "Postal code must be less than 20 characters"),
        Rule::Matches(
            &POSTAL_CODE,
            "Postal code can only contain letters, numbers, spaces, and hyphens"
        )
    ]
}

pub(crate) fn email() -> [Rule; 2] {
    [
        Rule::Required("Email is required"),
        Rule::Email("Invalid email address")
    ]
}

//! Request validation
//!
//! Rules are plain data: each field carries a list of [`Rule`]s whose checks
//! are pure functions. Only uniqueness needs the outside world, through the
//! `exists` predicate the caller passes in.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use validator::ValidateEmail;

/// A single check applied to one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Present and not blank
    Required,
    /// A syntactically valid email address
    Email,
    /// At least this many characters
    Min(usize),
    /// At most this many characters
    Max(usize),
    /// Equal to the named companion field
    Confirmed(&'static str),
    /// One of a fixed set of values
    OneOf(&'static [&'static str]),
    /// No stored row has this value in the named column
    Unique(&'static str),
}

/// Field name paired with the rules applied to it, in order
pub type FieldRules = (&'static str, &'static [Rule]);

/// Messages per field, in field order
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for a field
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Apply a rule table.
///
/// `value_of` returns the raw input for a field; `exists(column, value)`
/// answers [`Rule::Unique`]. A missing or blank field only reports
/// `Required` (when listed) and skips the remaining rules.
pub fn validate<'a>(
    table: &[FieldRules],
    value_of: impl Fn(&str) -> Option<&'a str>,
    exists: impl Fn(&str, &str) -> bool,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    for &(field, rules) in table {
        let value = value_of(field).map(str::trim).filter(|v| !v.is_empty());

        let value = match value {
            Some(value) => value,
            None => {
                if rules.contains(&Rule::Required) {
                    errors.add(field, format!("The {} field is required.", field));
                }
                continue;
            }
        };

        for rule in rules.iter() {
            if let Some(message) = check(field, rule, value, &value_of, &exists) {
                errors.add(field, message);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check<'a>(
    field: &str,
    rule: &Rule,
    value: &str,
    value_of: &impl Fn(&str) -> Option<&'a str>,
    exists: &impl Fn(&str, &str) -> bool,
) -> Option<String> {
    let passes = match rule {
        Rule::Required => true,
        Rule::Email => is_email(value),
        Rule::Min(min) => value.chars().count() >= *min,
        Rule::Max(max) => value.chars().count() <= *max,
        Rule::Confirmed(other) => value_of(*other).map(str::trim) == Some(value),
        Rule::OneOf(allowed) => allowed.contains(&value),
        Rule::Unique(column) => !exists(column, value),
    };
    if passes {
        return None;
    }

    Some(match rule {
        Rule::Required => format!("The {} field is required.", field),
        Rule::Email => format!("The {} must be a valid email address.", field),
        Rule::Min(min) => format!("The {} must be at least {} characters long.", field, min),
        Rule::Max(max) => format!("The {} may not be greater than {} characters.", field, max),
        Rule::Confirmed(_) => format!("The {} confirmation does not match.", field),
        Rule::OneOf(allowed) => format!("The {} must be one of: {}.", field, allowed.join(", ")),
        Rule::Unique(_) => format!("This {} is already in use.", field),
    })
}

fn is_email(value: &str) -> bool {
    value.to_owned().validate_email()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TABLE: &[FieldRules] = &[
        ("name", &[Rule::Required, Rule::Max(5)]),
        ("email", &[Rule::Required, Rule::Email, Rule::Unique("email")]),
        ("type", &[Rule::Required, Rule::OneOf(&["COMMON", "SHOPKEEPER"])]),
        ("nickname", &[Rule::Max(3)]),
        ("secret", &[Rule::Min(4), Rule::Confirmed("secret_confirmation")]),
    ];

    fn run(input: &[(&'static str, &'static str)], taken: &[&str]) -> Result<(), ValidationErrors> {
        let input: HashMap<&str, &str> = input.iter().copied().collect();
        validate(
            TABLE,
            |field| input.get(field).copied(),
            |column, value| column == "email" && taken.contains(&value),
        )
    }

    #[test]
    fn test_valid_input_passes() {
        let result = run(
            &[("name", "Ana"), ("email", "ana@example.com"), ("type", "COMMON")],
            &[],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_missing_fields_only_report_required() {
        let errors = run(&[("name", "   ")], &[]).unwrap_err();

        assert_eq!(errors.field("name"), ["The name field is required."]);
        assert_eq!(errors.field("email"), ["The email field is required."]);
        assert_eq!(errors.field("type").len(), 1);
        // optional and absent
        assert!(errors.field("nickname").is_empty());
    }

    #[test]
    fn test_rule_failures_are_collected_per_field() {
        let errors = run(
            &[
                ("name", "Anastasia"),
                ("email", "not-an-email"),
                ("type", "ADMIN"),
                ("nickname", "abcd"),
            ],
            &[],
        )
        .unwrap_err();

        assert_eq!(errors.field("name"), ["The name may not be greater than 5 characters."]);
        assert_eq!(errors.field("email"), ["The email must be a valid email address."]);
        assert_eq!(errors.field("type"), ["The type must be one of: COMMON, SHOPKEEPER."]);
        assert_eq!(errors.field("nickname").len(), 1);
    }

    #[test]
    fn test_unique_consults_exists() {
        let errors = run(
            &[("name", "Ana"), ("email", "ana@example.com"), ("type", "COMMON")],
            &["ana@example.com"],
        )
        .unwrap_err();

        assert_eq!(errors.field("email"), ["This email is already in use."]);
    }

    #[test]
    fn test_min_and_confirmed() {
        let base = [("name", "Ana"), ("email", "ana@example.com"), ("type", "COMMON")];

        let mut input = base.to_vec();
        input.extend([("secret", "abc"), ("secret_confirmation", "abd")]);
        let errors = run(&input, &[]).unwrap_err();
        assert_eq!(
            errors.field("secret"),
            [
                "The secret must be at least 4 characters long.",
                "The secret confirmation does not match."
            ]
        );

        let mut input = base.to_vec();
        input.push(("secret", "abcd"));
        let errors = run(&input, &[]).unwrap_err();
        assert_eq!(errors.field("secret"), ["The secret confirmation does not match."]);

        let mut input = base.to_vec();
        input.extend([("secret", "abcd"), ("secret_confirmation", "abcd")]);
        assert!(run(&input, &[]).is_ok());
    }

    #[test]
    fn test_errors_are_std_errors() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "bad");

        let err: Box<dyn std::error::Error> = Box::new(errors);
        assert_eq!(err.to_string(), "invalid fields: email");
    }

    #[test]
    fn test_is_email() {
        assert!(is_email("a@b.co"));
        assert!(is_email("first.last+tag@example.com.br"));
        assert!(!is_email("@b.co"));
        assert!(!is_email("a@@b.co"));
        assert!(!is_email("a b@c.co"));
        assert!(!is_email("a@.co"));
    }

    #[test]
    fn test_errors_serialize_as_field_map() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "bad");

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({ "email": ["bad"] }));
    }
}

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Category, Cents, MAX_AMOUNT_CENTS, ParseCentsError, contains_emoji, parse_cents};

pub const MIN_DESCRIPTION_CHARS: usize = 3;

/// Raw fields of an add/edit submission, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseForm {
    pub date: NaiveDate,
    pub trip_name: Option<String>,
    pub category: String,
    pub amount: String,
    pub location: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
}

/// A form that passed validation, with trimmed text and typed values.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedForm {
    pub date: NaiveDate,
    pub trip_name: Option<String>,
    pub category: Category,
    pub amount_cents: Cents,
    pub location: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
}

/// Every field-level problem found in a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.0.iter().any(|m| m.contains(needle))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Blank strings count as "not provided".
fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl ExpenseForm {
    /// Check every field, collecting all messages rather than stopping at the first.
    pub fn validate(&self) -> Result<ValidatedForm, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let category = Category::from_str(&self.category);
        if category.is_none() {
            errors.push(format!(
                "Please select a category (one of: {}).",
                Category::names()
            ));
        }

        let amount_cents = match parse_cents(&self.amount) {
            Ok(cents) if cents > MAX_AMOUNT_CENTS => {
                errors.push("Amount is too large.");
                None
            }
            Ok(cents) if cents > 0 => Some(cents),
            Ok(_) => {
                errors.push("Amount must be greater than 0.");
                None
            }
            Err(ParseCentsError::OutOfRange) => {
                errors.push("Amount is too large.");
                None
            }
            Err(ParseCentsError::InvalidFormat) => {
                errors.push("Amount must be a valid number.");
                None
            }
        };

        let location = self.location.trim().to_string();
        if location.is_empty() {
            errors.push("Location cannot be empty.");
        }

        let description = non_blank(&self.description);
        if let Some(desc) = &description {
            if desc.chars().count() < MIN_DESCRIPTION_CHARS {
                errors.push(format!(
                    "Description must have at least {} characters.",
                    MIN_DESCRIPTION_CHARS
                ));
            }
        }

        let emoji = non_blank(&self.emoji);
        if let Some(e) = &emoji {
            if !contains_emoji(e) {
                errors.push("Emoji must contain at least one valid emoji symbol.");
            }
        }

        match (category, amount_cents) {
            (Some(category), Some(amount_cents)) if errors.is_empty() => Ok(ValidatedForm {
                date: self.date,
                trip_name: non_blank(&self.trip_name),
                category,
                amount_cents,
                location,
                description,
                emoji,
            }),
            _ => Err(errors),
        }
    }
}

//! Filter keys: the parameter tuple that identifies one impulse response

use std::fmt;

use serde::{Deserialize, Serialize};

/// Catalog token reserved for the headphone equalization filter
pub const HEADPHONE_FILTER_TOKEN: &str = "HPFILTER";

/// One component of a filter key
///
/// Integral numbers are stored as integers regardless of how they were
/// spelled (`40`, `40.0`, OSC int or float), everything else as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyComponent {
    Int(i64),
    Text(String),
}

impl KeyComponent {
    /// Parse a catalog token
    pub fn parse(token: &str) -> Self {
        if let Ok(value) = token.parse::<i64>() {
            return Self::Int(value);
        }
        match token.parse::<f64>() {
            Ok(value) if is_integral(value) => Self::Int(value as i64),
            _ => Self::Text(token.to_string()),
        }
    }

    /// Build from a numeric control value
    pub fn from_f64(value: f64) -> Self {
        if is_integral(value) {
            Self::Int(value as i64)
        } else {
            Self::Text(value.to_string())
        }
    }
}

fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64
}

impl From<i64> for KeyComponent {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for KeyComponent {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<&str> for KeyComponent {
    fn from(token: &str) -> Self {
        Self::parse(token)
    }
}

impl fmt::Display for KeyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Ordered tuple of key components, matched exactly
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterKey(Vec<KeyComponent>);

impl FilterKey {
    pub fn new(components: Vec<KeyComponent>) -> Self {
        Self(components)
    }

    /// Build a key from whitespace-separated catalog tokens
    pub fn from_tokens<'a, I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        tokens.into_iter().map(KeyComponent::parse).collect()
    }

    /// Key of the headphone equalization filter
    pub fn headphone() -> Self {
        Self(vec![KeyComponent::Text(HEADPHONE_FILTER_TOKEN.to_string())])
    }

    /// All-zero key with the given number of components
    pub fn zeros(arity: usize) -> Self {
        Self(vec![KeyComponent::Int(0); arity])
    }

    pub fn is_headphone(&self) -> bool {
        matches!(self.0.as_slice(), [KeyComponent::Text(t)] if t == HEADPHONE_FILTER_TOKEN)
    }

    #[inline]
    pub fn components(&self) -> &[KeyComponent] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<KeyComponent> for FilterKey {
    fn from_iter<T: IntoIterator<Item = KeyComponent>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{component}")?;
        }
        Ok(())
    }
}

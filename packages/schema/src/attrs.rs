//! # Attribute Values
//!
//! Typed attribute bags carried by nodes and marks.
//!
//! Every attribute a node or mark may carry is declared up front with an
//! [`AttrType`] and an optional default. Values are stored as [`AttrValue`] and
//! always have a canonical textual form, which is what the markup layer writes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Attribute bag, ordered by name so equal bags compare and serialize identically
pub type Attrs = BTreeMap<String, AttrValue>;

/// Unit of a [`Length`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Pt,
    Px,
    Em,
    Rem,
}

impl LengthUnit {
    /// Suffix order matters when parsing: `rem` must be tried before `em`
    const ALL: [LengthUnit; 4] = [LengthUnit::Rem, LengthUnit::Pt, LengthUnit::Px, LengthUnit::Em];

    pub fn as_str(&self) -> &'static str {
        match self {
            LengthUnit::Pt => "pt",
            LengthUnit::Px => "px",
            LengthUnit::Em => "em",
            LengthUnit::Rem => "rem",
        }
    }
}

/// A size such as `18pt` or `1.5em`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Length {
    pub value: f64,
    pub unit: LengthUnit,
}

impl Length {
    pub fn new(value: f64, unit: LengthUnit) -> Self {
        Self { value, unit }
    }

    pub fn pt(value: f64) -> Self {
        Self::new(value, LengthUnit::Pt)
    }

    pub fn is_positive(&self) -> bool {
        self.value.is_finite() && self.value > 0.0
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LengthParseError {
    #[error("'{0}' has no supported unit (expected pt, px, em or rem)")]
    MissingUnit(String),

    #[error("'{0}' is not a number")]
    InvalidNumber(String),
}

impl FromStr for Length {
    type Err = LengthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let unit = LengthUnit::ALL
            .into_iter()
            .find(|unit| trimmed.ends_with(unit.as_str()))
            .ok_or_else(|| LengthParseError::MissingUnit(trimmed.to_string()))?;

        let number = trimmed[..trimmed.len() - unit.as_str().len()].trim();
        let value: f64 = number
            .parse()
            .map_err(|_| LengthParseError::InvalidNumber(number.to_string()))?;

        Ok(Length::new(value, unit))
    }
}

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum AttrValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    Length(Length),
}

impl AttrValue {
    pub fn text(value: impl Into<String>) -> Self {
        AttrValue::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttrValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_length(&self) -> Option<Length> {
        match self {
            AttrValue::Length(value) => Some(*value),
            _ => None,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            AttrValue::Text(_) => "text",
            AttrValue::Integer(_) => "integer",
            AttrValue::Boolean(_) => "boolean",
            AttrValue::Length(_) => "length",
        }
    }
}

/// Canonical textual form (what the markup layer writes)
impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Text(value) => f.write_str(value),
            AttrValue::Integer(value) => write!(f, "{}", value),
            AttrValue::Boolean(value) => write!(f, "{}", value),
            AttrValue::Length(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Integer(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Boolean(value)
    }
}

impl From<Length> for AttrValue {
    fn from(value: Length) -> Self {
        AttrValue::Length(value)
    }
}

/// Declared value type of an attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttrType {
    Text,
    Integer { min: i64, max: i64 },
    Boolean,
    /// Strictly positive length
    Length,
    /// Text restricted to a fixed set of choices
    OneOf(Vec<String>),
}

impl AttrType {
    pub fn integer() -> Self {
        AttrType::Integer {
            min: i64::MIN,
            max: i64::MAX,
        }
    }

    pub fn integer_range(min: i64, max: i64) -> Self {
        AttrType::Integer { min, max }
    }

    pub fn one_of(choices: &[&str]) -> Self {
        AttrType::OneOf(choices.iter().map(|c| c.to_string()).collect())
    }

    /// Check a value against this type, returning the reason on mismatch
    pub fn check(&self, value: &AttrValue) -> Result<(), String> {
        match (self, value) {
            (AttrType::Text, AttrValue::Text(_)) => Ok(()),
            (AttrType::Boolean, AttrValue::Boolean(_)) => Ok(()),
            (AttrType::Integer { min, max }, AttrValue::Integer(v)) => {
                if v < min || v > max {
                    Err(format!("{} is outside {}..={}", v, min, max))
                } else {
                    Ok(())
                }
            }
            (AttrType::Length, AttrValue::Length(length)) => {
                if length.is_positive() {
                    Ok(())
                } else {
                    Err(format!("{} is not a positive size", length))
                }
            }
            (AttrType::OneOf(choices), AttrValue::Text(v)) => {
                if choices.iter().any(|c| c == v) {
                    Ok(())
                } else {
                    Err(format!("'{}' is not one of [{}]", v, choices.join(", ")))
                }
            }
            (expected, found) => Err(format!(
                "expected {}, found {}",
                expected.name(),
                found.kind_name()
            )),
        }
    }

    /// Parse the canonical textual form of a value of this type
    pub fn parse(&self, raw: &str) -> Result<AttrValue, String> {
        let value = match self {
            AttrType::Text | AttrType::OneOf(_) => AttrValue::Text(raw.to_string()),
            AttrType::Integer { .. } => raw
                .trim()
                .parse::<i64>()
                .map(AttrValue::Integer)
                .map_err(|_| format!("'{}' is not an integer", raw))?,
            AttrType::Boolean => match raw.trim() {
                "true" => AttrValue::Boolean(true),
                "false" => AttrValue::Boolean(false),
                other => return Err(format!("'{}' is not a boolean", other)),
            },
            AttrType::Length => AttrValue::Length(raw.parse().map_err(|e: LengthParseError| e.to_string())?),
        };

        self.check(&value)?;
        Ok(value)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AttrType::Text => "text",
            AttrType::Integer { .. } => "integer",
            AttrType::Boolean => "boolean",
            AttrType::Length => "length",
            AttrType::OneOf(_) => "choice",
        }
    }
}

/// Declaration of one attribute: its type and optional default
///
/// Attributes without a default are required.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrSpec {
    pub ty: AttrType,
    pub default: Option<AttrValue>,
}

impl AttrSpec {
    pub fn required(ty: AttrType) -> Self {
        Self { ty, default: None }
    }

    pub fn with_default(ty: AttrType, default: impl Into<AttrValue>) -> Self {
        Self {
            ty,
            default: Some(default.into()),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_parse_and_display() {
        let length: Length = "18pt".parse().unwrap();
        assert_eq!(length, Length::pt(18.0));
        assert_eq!(length.to_string(), "18pt");

        let length: Length = "1.25rem".parse().unwrap();
        assert_eq!(length.unit, LengthUnit::Rem);
        assert_eq!(length.to_string(), "1.25rem");
    }

    #[test]
    fn test_length_rejects_unknown_unit() {
        assert!(matches!(
            "12furlongs".parse::<Length>(),
            Err(LengthParseError::MissingUnit(_))
        ));
        assert!(matches!(
            "bigpt".parse::<Length>(),
            Err(LengthParseError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_length_type_requires_positive_value() {
        assert!(AttrType::Length.parse("0pt").is_err());
        assert!(AttrType::Length.parse("-3px").is_err());
        assert!(AttrType::Length.parse("3px").is_ok());
    }

    #[test]
    fn test_integer_range_check() {
        let ty = AttrType::integer_range(1, 6);
        assert!(ty.check(&AttrValue::Integer(3)).is_ok());
        assert!(ty.check(&AttrValue::Integer(7)).is_err());
        assert!(ty.check(&AttrValue::text("3")).is_err());
    }

    #[test]
    fn test_one_of_parse() {
        let ty = AttrType::one_of(&["flowchart", "external_xml"]);
        assert_eq!(ty.parse("flowchart"), Ok(AttrValue::text("flowchart")));
        assert!(ty.parse("sequence").is_err());
    }
}

//! The aircraft registry consulted when booking flight lessons.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// US N-number: `N`, a non-zero digit, up to four more digits, then up to two
/// letters excluding I and O.
pub const DEFAULT_TAIL_NUMBER_PATTERN: &str = r"^N[1-9][0-9]{0,4}[A-HJ-NP-Z]{0,2}$";

/// Answers whether a tail number identifies a bookable aircraft.
pub trait AircraftRegistry: std::fmt::Debug {
    /// Whether `tail_number` is a known aircraft.
    fn is_known(&self, tail_number: &str) -> bool;
}

/// One aircraft of the school's fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aircraft {
    /// Registration, e.g. `N123AB`.
    pub tail_number: String,
    /// Make and model.
    pub model: String,
}

impl Aircraft {
    /// Create an aircraft entry.
    #[must_use]
    pub fn new(tail_number: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            tail_number: tail_number.into(),
            model: model.into(),
        }
    }
}

/// The training fleet out of the box.
#[must_use]
pub fn default_aircraft() -> Vec<Aircraft> {
    vec![
        Aircraft::new("N123AB", "Cessna 172"),
        Aircraft::new("N456CD", "Cessna 152"),
        Aircraft::new("N789EF", "Piper Cherokee"),
    ]
}

/// A fixed list of aircraft, checked against a tail-number pattern.
#[derive(Debug, Clone)]
pub struct Fleet {
    aircraft: Vec<Aircraft>,
    pattern: Regex,
}

impl Fleet {
    /// Build a fleet, rejecting tail numbers that don't match `pattern`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the pattern does not compile or an
    /// aircraft's tail number does not match it.
    pub fn new(aircraft: Vec<Aircraft>, pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::validation("tail_number_pattern", e.to_string()))?;

        if let Some(bad) = aircraft
            .iter()
            .find(|a| !pattern.is_match(&normalize(&a.tail_number)))
        {
            return Err(Error::validation(
                "tail_number",
                format!("'{}' is not a valid tail number", bad.tail_number),
            ));
        }

        Ok(Self { aircraft, pattern })
    }

    /// Aircraft in registration order.
    #[must_use]
    pub fn aircraft(&self) -> &[Aircraft] {
        &self.aircraft
    }

    /// Whether `tail_number` is well-formed, regardless of fleet membership.
    #[must_use]
    pub fn is_valid_tail_number(&self, tail_number: &str) -> bool {
        self.pattern.is_match(&normalize(tail_number))
    }

    /// Look up an aircraft, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn find(&self, tail_number: &str) -> Option<&Aircraft> {
        let wanted = normalize(tail_number);
        self.aircraft
            .iter()
            .find(|a| normalize(&a.tail_number) == wanted)
    }
}

impl AircraftRegistry for Fleet {
    fn is_known(&self, tail_number: &str) -> bool {
        self.is_valid_tail_number(tail_number) && self.find(tail_number).is_some()
    }
}

fn normalize(tail_number: &str) -> String {
    tail_number.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_fleet() -> Fleet {
        Fleet::new(default_aircraft(), DEFAULT_TAIL_NUMBER_PATTERN).unwrap()
    }

    #[test]
    fn test_default_fleet() {
        let fleet = default_fleet();
        assert_eq!(fleet.aircraft().len(), 3);
        assert!(fleet.is_known("N123AB"));
        assert!(fleet.is_known(" n456cd "));
        assert!(!fleet.is_known("N999ZZ"));
    }

    #[test]
    fn test_default_pattern() {
        let fleet = default_fleet();
        assert!(fleet.is_valid_tail_number("N1"));
        assert!(fleet.is_valid_tail_number("N12345"));
        assert!(fleet.is_valid_tail_number("N789EF"));
        assert!(!fleet.is_valid_tail_number("N0123"));
        assert!(!fleet.is_valid_tail_number("N12IO"));
        assert!(!fleet.is_valid_tail_number("G-ABCD"));
    }

    #[test]
    fn test_find_returns_model() {
        let fleet = default_fleet();
        assert_eq!(fleet.find("n789ef").map(|a| a.model.as_str()), Some("Piper Cherokee"));
    }

    #[test]
    fn test_new_rejects_bad_tail_number() {
        let err = Fleet::new(
            vec![Aircraft::new("G-ABCD", "Piper Warrior")],
            DEFAULT_TAIL_NUMBER_PATTERN,
        )
        .unwrap_err();
        assert!(err.to_string().contains("G-ABCD"));
    }

    #[test]
    fn test_new_rejects_bad_pattern() {
        let err = Fleet::new(default_aircraft(), "([").unwrap_err();
        assert!(err.to_string().contains("tail_number_pattern"));
    }

    #[test]
    fn test_custom_pattern() {
        let fleet = Fleet::new(
            vec![Aircraft::new("G-ABCD", "Piper Warrior")],
            r"^G-[A-Z]{4}$",
        )
        .unwrap();
        assert!(fleet.is_known("G-ABCD"));
        assert!(!fleet.is_known("N123AB"));
    }
}

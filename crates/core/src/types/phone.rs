//! Phone numbers for the Gulf countries and Egypt.
//!
//! Checkout accepts local numbers for the selected country, numbers with an
//! international prefix (`+966...` or `00966...`), and Egyptian numbers in
//! their domestic `0`-prefixed form.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A country the phone input supports, with its subscriber number lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialingCountry {
    /// ISO 3166-1 alpha-2 code.
    pub code: &'static str,
    /// Arabic display name.
    pub name_ar: &'static str,
    /// International dialing prefix, including the plus sign.
    pub dial_code: &'static str,
    /// Minimum subscriber number length (without the dial code).
    pub min_length: usize,
    /// Maximum subscriber number length (without the dial code).
    pub max_length: usize,
}

/// Supported countries, sorted by Arabic name.
pub const DIALING_COUNTRIES: &[DialingCountry] = &[
    DialingCountry {
        code: "AE",
        name_ar: "الإمارات",
        dial_code: "+971",
        min_length: 8,
        max_length: 9,
    },
    DialingCountry {
        code: "BH",
        name_ar: "البحرين",
        dial_code: "+973",
        min_length: 8,
        max_length: 8,
    },
    DialingCountry {
        code: "SA",
        name_ar: "السعودية",
        dial_code: "+966",
        min_length: 9,
        max_length: 9,
    },
    DialingCountry {
        code: "KW",
        name_ar: "الكويت",
        dial_code: "+965",
        min_length: 8,
        max_length: 8,
    },
    DialingCountry {
        code: "OM",
        name_ar: "عمان",
        dial_code: "+968",
        min_length: 8,
        max_length: 8,
    },
    DialingCountry {
        code: "QA",
        name_ar: "قطر",
        dial_code: "+974",
        min_length: 8,
        max_length: 8,
    },
    DialingCountry {
        code: "EG",
        name_ar: "مصر",
        dial_code: "+20",
        min_length: 10,
        max_length: 10,
    },
];

impl DialingCountry {
    /// Look up a supported country by ISO code (case-insensitive).
    #[must_use]
    pub fn by_code(code: &str) -> Option<&'static Self> {
        DIALING_COUNTRIES
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code.trim()))
    }

    /// Find the supported country whose dial code prefixes `international`.
    fn by_prefix(international: &str) -> Option<&'static Self> {
        DIALING_COUNTRIES
            .iter()
            .filter(|c| international.starts_with(c.dial_code))
            .max_by_key(|c| c.dial_code.len())
    }
}

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains characters other than digits and separators.
    #[error("phone number may only contain digits")]
    InvalidCharacters,
    /// The dialing country could not be determined.
    #[error("unsupported or unknown dialing country")]
    UnknownCountry,
    /// The subscriber number is shorter than the country allows.
    #[error("too short: expected {min}-{max} digits")]
    TooShort {
        /// Minimum length.
        min: usize,
        /// Maximum length.
        max: usize,
    },
    /// The subscriber number is longer than the country allows.
    #[error("too long: expected {min}-{max} digits")]
    TooLong {
        /// Minimum length.
        min: usize,
        /// Maximum length.
        max: usize,
    },
}

impl PhoneError {
    /// Arabic message for the checkout form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Empty => "رقم الهاتف مطلوب".to_string(),
            Self::InvalidCharacters => "رقم الهاتف يجب أن يحتوي على أرقام فقط".to_string(),
            Self::UnknownCountry => "يرجى اختيار الدولة أو إدخال رمز الدولة".to_string(),
            Self::TooShort { min, max } => format!("قصير جداً. يجب أن يكون {min}-{max} أرقام."),
            Self::TooLong { min, max } => format!("طويل جداً. يجب أن يكون {min}-{max} أرقام."),
        }
    }
}

/// A validated phone number, stored in international form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber {
    country_code: String,
    subscriber: String,
    international: String,
}

impl PhoneNumber {
    /// Parse a phone number.
    ///
    /// `country_code` is the ISO code of the country selected in the form. It
    /// is used for numbers typed without an international prefix.
    ///
    /// # Errors
    ///
    /// Returns a `PhoneError` if the number is empty, has stray characters,
    /// cannot be tied to a supported country, or has the wrong length.
    pub fn parse(input: &str, country_code: Option<&str>) -> Result<Self, PhoneError> {
        let compact: String = input
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
            .collect();
        if compact.is_empty() {
            return Err(PhoneError::Empty);
        }

        let international = compact
            .strip_prefix('+')
            .map(|rest| format!("+{rest}"))
            .or_else(|| compact.strip_prefix("00").map(|rest| format!("+{rest}")));

        let (country, subscriber) = if let Some(international) = international {
            let country =
                DialingCountry::by_prefix(&international).ok_or(PhoneError::UnknownCountry)?;
            let subscriber = international
                .get(country.dial_code.len()..)
                .unwrap_or_default()
                .to_string();
            (country, subscriber)
        } else {
            let selected = country_code.and_then(DialingCountry::by_code);
            match (selected, compact.strip_prefix('0')) {
                (Some(country), Some(local)) => (country, local.to_string()),
                (Some(country), None) => (country, compact.clone()),
                (None, Some(local)) => (
                    DialingCountry::by_code("EG").ok_or(PhoneError::UnknownCountry)?,
                    local.to_string(),
                ),
                (None, None) => return Err(PhoneError::UnknownCountry),
            }
        };

        if subscriber.is_empty() {
            return Err(PhoneError::TooShort {
                min: country.min_length,
                max: country.max_length,
            });
        }
        if !subscriber.chars().all(|c| c.is_ascii_digit()) {
            return Err(PhoneError::InvalidCharacters);
        }
        if subscriber.len() < country.min_length {
            return Err(PhoneError::TooShort {
                min: country.min_length,
                max: country.max_length,
            });
        }
        if subscriber.len() > country.max_length {
            return Err(PhoneError::TooLong {
                min: country.min_length,
                max: country.max_length,
            });
        }

        Ok(Self {
            country_code: country.code.to_string(),
            international: format!("{}{subscriber}", country.dial_code),
            subscriber,
        })
    }

    /// ISO code of the number's country.
    #[must_use]
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Digits after the dial code.
    #[must_use]
    pub fn subscriber(&self) -> &str {
        &self.subscriber
    }

    /// The number in international form, e.g. `+966512345678`.
    #[must_use]
    pub fn international(&self) -> &str {
        &self.international
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.international)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_local_number_for_selected_country() {
        let phone = PhoneNumber::parse("512 345 678", Some("SA")).unwrap();
        assert_eq!(phone.international(), "+966512345678");
        assert_eq!(phone.country_code(), "SA");
    }

    #[test]
    fn test_international_prefix_overrides_selection() {
        let phone = PhoneNumber::parse("+97150123456", Some("SA")).unwrap();
        assert_eq!(phone.country_code(), "AE");
        assert_eq!(phone.subscriber(), "50123456");
    }

    #[test]
    fn test_double_zero_prefix() {
        let phone = PhoneNumber::parse("0096599887766", None).unwrap();
        assert_eq!(phone.country_code(), "KW");
    }

    #[test]
    fn test_leading_zero_without_country_assumes_egypt() {
        let phone = PhoneNumber::parse("01012345678", None).unwrap();
        assert_eq!(phone.country_code(), "EG");
        assert_eq!(phone.international(), "+201012345678");
    }

    #[test]
    fn test_length_limits() {
        assert_eq!(
            PhoneNumber::parse("5123", Some("SA")),
            Err(PhoneError::TooShort { min: 9, max: 9 })
        );
        assert_eq!(
            PhoneNumber::parse("5123456789", Some("SA")),
            Err(PhoneError::TooLong { min: 9, max: 9 })
        );
    }

    #[test]
    fn test_rejects_letters_and_unknown_country() {
        assert_eq!(
            PhoneNumber::parse("5123abc78", Some("SA")),
            Err(PhoneError::InvalidCharacters)
        );
        assert_eq!(
            PhoneNumber::parse("12345678", None),
            Err(PhoneError::UnknownCountry)
        );
        assert_eq!(
            PhoneNumber::parse("+4412345678", None),
            Err(PhoneError::UnknownCountry)
        );
        assert_eq!(PhoneNumber::parse("  ", None), Err(PhoneError::Empty));
    }

    #[test]
    fn test_by_code_is_case_insensitive() {
        assert_eq!(DialingCountry::by_code("qa").unwrap().dial_code, "+974");
        assert!(DialingCountry::by_code("US").is_none());
    }
}

use serde::{Deserialize, Serialize};

use super::validators::ValidationError;

const MIN_DIGITS: usize = 12;
const MAX_DIGITS: usize = 19;

/// Card networks recognised from the IIN prefix and the number length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    Amex,
    Diners,
    Jcb,
    Visa,
    Master,
    Discover,
}

impl CardBrand {
    /// Returns the brand name stored alongside the card
    pub fn as_str(&self) -> &'static str {
        match self {
            CardBrand::Amex => "amex",
            CardBrand::Diners => "diners",
            CardBrand::Jcb => "jcb",
            CardBrand::Visa => "visa",
            CardBrand::Master => "master",
            CardBrand::Discover => "discover",
        }
    }

    fn valid_lengths(&self) -> &'static [usize] {
        match self {
            CardBrand::Amex => &[15],
            CardBrand::Diners => &[14],
            CardBrand::Jcb => &[16, 17, 18, 19],
            CardBrand::Visa => &[13, 16, 19],
            CardBrand::Master => &[16],
            CardBrand::Discover => &[16, 19],
        }
    }

    /// Inclusive prefix ranges, compared against the same number of leading digits
    fn prefix_ranges(&self) -> &'static [(u32, u32)] {
        match self {
            CardBrand::Amex => &[(34, 34), (37, 37)],
            CardBrand::Diners => &[(300, 305), (36, 36), (38, 39)],
            CardBrand::Jcb => &[(3528, 3589)],
            CardBrand::Visa => &[(4, 4)],
            CardBrand::Master => &[(51, 55), (2221, 2720)],
            CardBrand::Discover => &[(6011, 6011), (622126, 622925), (644, 649), (65, 65)],
        }
    }

    fn matches(&self, digits: &str) -> bool {
        self.valid_lengths().contains(&digits.len())
            && self
                .prefix_ranges()
                .iter()
                .any(|&(low, high)| prefix_in_range(digits, low, high))
    }
}

impl std::fmt::Display for CardBrand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Prefix tables are disjoint, so lookup order is irrelevant.
const BRANDS: [CardBrand; 6] = [
    CardBrand::Amex,
    CardBrand::Diners,
    CardBrand::Jcb,
    CardBrand::Visa,
    CardBrand::Master,
    CardBrand::Discover,
];

/// A card number that passed the checksum and was classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardNumber {
    digits: String,
    brand: CardBrand,
}

impl CardNumber {
    /// Separator-stripped digits. Only ever handed to the tokenizer.
    pub fn digits(&self) -> &str {
        &self.digits
    }

    pub fn brand(&self) -> CardBrand {
        self.brand
    }
}

/// Validates a raw card number and detects its brand.
///
/// Hyphens and spaces are stripped, the remaining characters must all be
/// ASCII digits, 12 to 19 of them, with a valid Luhn checksum and a known
/// brand prefix for that length.
pub fn validate_card_number(raw: &str) -> Result<CardNumber, ValidationError> {
    let digits: String = raw.chars().filter(|c| *c != '-' && *c != ' ').collect();

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidCardNumber);
    }

    if !(MIN_DIGITS..=MAX_DIGITS).contains(&digits.len()) {
        return Err(ValidationError::InvalidCardNumber);
    }

    if !luhn_checksum_valid(&digits) {
        return Err(ValidationError::InvalidCardNumber);
    }

    let brand = detect_brand(&digits).ok_or(ValidationError::InvalidCardNumber)?;

    Ok(CardNumber { digits, brand })
}

/// Returns the brand for an all-digit string, or None when no prefix matches
pub fn detect_brand(digits: &str) -> Option<CardBrand> {
    BRANDS.into_iter().find(|brand| brand.matches(digits))
}

/// Luhn check over a string that is known to contain only ASCII digits
fn luhn_checksum_valid(digits: &str) -> bool {
    let sum: u32 = digits
        .bytes()
        .rev()
        .map(|b| u32::from(b - b'0'))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

fn prefix_in_range(digits: &str, low: u32, high: u32) -> bool {
    let width = low.to_string().len();
    digits
        .get(..width)
        .and_then(|prefix| prefix.parse::<u32>().ok())
        .is_some_and(|prefix| (low..=high).contains(&prefix))
}

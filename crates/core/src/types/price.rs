//! Prices, bulk price tiers and currency conversion.
//!
//! The store API quotes every price in USD. Visitors see amounts converted
//! into the currency of the store's configured country, or raw USD with a
//! `$` prefix when no currency can be resolved.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when building prices or currencies.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is not a decimal number.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    /// Conversion rates must be strictly positive.
    #[error("conversion rate must be positive, got {0}")]
    NonPositiveRate(Decimal),
    /// Currency codes cannot be empty.
    #[error("currency code cannot be empty")]
    EmptyCode,
}

/// A bulk-pricing breakpoint: buying at least `min_quantity` units costs
/// `price_in_usd` per unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTier {
    /// Smallest quantity this price applies to.
    pub min_quantity: u32,
    /// Unit price in USD.
    pub price_in_usd: Decimal,
}

impl PriceTier {
    /// Build a tier from the API's string representation of the price.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::InvalidAmount` if `price_in_usd` is not a decimal.
    pub fn parse(min_quantity: u32, price_in_usd: &str) -> Result<Self, PriceError> {
        let price_in_usd = price_in_usd
            .trim()
            .parse::<Decimal>()
            .map_err(|_| PriceError::InvalidAmount(price_in_usd.to_string()))?;
        Ok(Self {
            min_quantity,
            price_in_usd,
        })
    }

    /// Total in USD for buying `quantity` units at this tier's unit price.
    #[must_use]
    pub fn total_for(&self, quantity: u32) -> Decimal {
        self.price_in_usd * Decimal::from(quantity)
    }

    /// Whole-number percentage saved per unit compared to `base`.
    ///
    /// Returns `None` when this tier is not cheaper than the base price.
    #[must_use]
    pub fn savings_percent(&self, base: &Self) -> Option<u32> {
        if base.price_in_usd <= Decimal::ZERO || self.price_in_usd >= base.price_in_usd {
            return None;
        }
        let saved = (base.price_in_usd - self.price_in_usd) / base.price_in_usd
            * Decimal::ONE_HUNDRED;
        saved
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u32()
    }

    /// The base tier: the one with the lowest `min_quantity`.
    #[must_use]
    pub fn base(tiers: &[Self]) -> Option<&Self> {
        tiers.iter().min_by_key(|tier| tier.min_quantity)
    }

    /// The tier that applies when buying `quantity` units.
    ///
    /// Picks the tier with the highest `min_quantity` not exceeding
    /// `quantity`, falling back to the base tier for quantities below every
    /// breakpoint.
    #[must_use]
    pub fn for_quantity(tiers: &[Self], quantity: u32) -> Option<&Self> {
        tiers
            .iter()
            .filter(|tier| tier.min_quantity <= quantity)
            .max_by_key(|tier| tier.min_quantity)
            .or_else(|| Self::base(tiers))
    }
}

/// The currency visitors see prices in, with its rate against USD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// Display code (e.g., "SAR", "EGP").
    pub code: String,
    /// Units of this currency per one USD.
    pub rate_to_usd: Decimal,
}

impl Currency {
    /// Create a currency, rejecting empty codes and non-positive rates.
    ///
    /// # Errors
    ///
    /// Returns `PriceError` if the code is empty or the rate is not positive.
    pub fn new(code: impl Into<String>, rate_to_usd: Decimal) -> Result<Self, PriceError> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(PriceError::EmptyCode);
        }
        if rate_to_usd <= Decimal::ZERO {
            return Err(PriceError::NonPositiveRate(rate_to_usd));
        }
        Ok(Self { code, rate_to_usd })
    }

    /// Convert a USD amount into this currency.
    #[must_use]
    pub fn convert(&self, amount_in_usd: Decimal) -> Decimal {
        amount_in_usd * self.rate_to_usd
    }

    /// Convert and format a USD amount, e.g. `"37.50 SAR"`.
    #[must_use]
    pub fn format(&self, amount_in_usd: Decimal) -> String {
        format!("{} {}", two_places(self.convert(amount_in_usd)), self.code)
    }
}

/// Format a USD amount for display in the given currency.
///
/// Without a currency the raw USD amount is shown with a `$` prefix.
#[must_use]
pub fn format_amount(amount_in_usd: Decimal, currency: Option<&Currency>) -> String {
    currency.map_or_else(
        || format!("${}", two_places(amount_in_usd)),
        |currency| currency.format(amount_in_usd),
    )
}

/// Round half away from zero to two decimal places and always print both.
fn two_places(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn tiers() -> Vec<PriceTier> {
        vec![
            PriceTier::parse(3, "8.00").unwrap(),
            PriceTier::parse(1, "10.00").unwrap(),
            PriceTier::parse(5, "7.00").unwrap(),
        ]
    }

    #[test]
    fn test_convert_ten_dollars_at_three_seventy_five() {
        let currency = Currency::new("SAR", dec("3.75")).unwrap();
        let tier = PriceTier::parse(1, "10.00").unwrap();
        assert_eq!(currency.convert(tier.price_in_usd), dec("37.50"));
        assert_eq!(currency.format(tier.price_in_usd), "37.50 SAR");
    }

    #[test]
    fn test_format_amount_falls_back_to_usd() {
        assert_eq!(format_amount(dec("10"), None), "$10.00");
        assert_eq!(format_amount(dec("12.345"), None), "$12.35");
    }

    #[test]
    fn test_currency_rejects_bad_input() {
        assert_eq!(
            Currency::new("", dec("1")).unwrap_err(),
            PriceError::EmptyCode
        );
        assert!(matches!(
            Currency::new("EGP", Decimal::ZERO),
            Err(PriceError::NonPositiveRate(_))
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            PriceTier::parse(1, "ten"),
            Err(PriceError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_base_tier_is_lowest_min_quantity() {
        let tiers = tiers();
        let base = PriceTier::base(&tiers).unwrap();
        assert_eq!(base.min_quantity, 1);
        assert_eq!(base.price_in_usd, dec("10.00"));
    }

    #[test]
    fn test_tier_for_quantity_picks_breakpoint() {
        let tiers = tiers();
        assert_eq!(PriceTier::for_quantity(&tiers, 1).unwrap().min_quantity, 1);
        assert_eq!(PriceTier::for_quantity(&tiers, 4).unwrap().min_quantity, 3);
        assert_eq!(PriceTier::for_quantity(&tiers, 50).unwrap().min_quantity, 5);
    }

    #[test]
    fn test_tier_for_quantity_below_every_breakpoint_uses_base() {
        let tiers = vec![PriceTier::parse(2, "9.00").unwrap()];
        assert_eq!(PriceTier::for_quantity(&tiers, 1).unwrap().min_quantity, 2);
        assert!(PriceTier::for_quantity(&[], 1).is_none());
    }

    #[test]
    fn test_savings_percent() {
        let base = PriceTier::parse(1, "10.00").unwrap();
        let bulk = PriceTier::parse(3, "8.00").unwrap();
        assert_eq!(bulk.savings_percent(&base), Some(20));
        assert_eq!(base.savings_percent(&base), None);
    }

    #[test]
    fn test_total_for_quantity() {
        let tier = PriceTier::parse(3, "8.50").unwrap();
        assert_eq!(tier.total_for(3), dec("25.50"));
    }
}

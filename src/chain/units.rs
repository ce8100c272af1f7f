//! Base-unit / display-unit conversions for the native currency

use crate::error::{WalletError, WalletResult};

use ethers::types::U256;
use ethers::utils::parse_ether;
use serde::{Serialize, Serializer};
use std::fmt;

/// Native-currency balance held in base units (wei)
///
/// Displays as ether rounded half-up to four fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    wei: U256,
}

impl Balance {
    pub fn from_wei(wei: U256) -> Self {
        Self { wei }
    }

    pub fn wei(&self) -> U256 {
        self.wei
    }

    /// Approximate ether value for gauges; display goes through `Display`
    pub fn as_eth(&self) -> f64 {
        (self.wei / U256::exp10(12)).low_u128() as f64 / 1e6
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Integer arithmetic only: scale to 1e-4 ether with half-up rounding.
        let step = U256::exp10(14);
        let scaled = self.wei.saturating_add(step / 2) / step;
        let whole = scaled / U256::from(10_000u64);
        let frac = (scaled % U256::from(10_000u64)).as_u64();
        write!(f, "{}.{:04}", whole, frac)
    }
}

impl Serialize for Balance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Convert a display-unit amount string to base units
pub fn parse_amount(amount: &str) -> WalletResult<U256> {
    parse_ether(amount)
        .map_err(|e| WalletError::Validation(format!("invalid amount {}: {}", amount, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_ether_displays_with_four_digits() {
        let balance = Balance::from_wei(U256::exp10(18));
        assert_eq!(balance.to_string(), "1.0000");
    }

    #[test]
    fn zero_displays_as_zero() {
        assert_eq!(Balance::from_wei(U256::zero()).to_string(), "0.0000");
    }

    #[test]
    fn fractions_round_half_up() {
        // 0.00005 ether rounds up to the last displayed digit
        let balance = Balance::from_wei(U256::exp10(13) * 5);
        assert_eq!(balance.to_string(), "0.0001");

        // 0.000049 ether rounds down
        let balance = Balance::from_wei(U256::exp10(12) * 49);
        assert_eq!(balance.to_string(), "0.0000");
    }

    #[test]
    fn large_balances_keep_the_whole_part() {
        let balance = Balance::from_wei(U256::exp10(18) * 12_345u64 + U256::exp10(17) * 6);
        assert_eq!(balance.to_string(), "12345.6000");
    }

    #[test]
    fn parse_amount_converts_display_units() {
        assert_eq!(parse_amount("1").unwrap(), U256::exp10(18));
        assert_eq!(parse_amount("0.5").unwrap(), U256::exp10(17) * 5);
    }

    #[test]
    fn parse_amount_rejects_garbage() {
        assert!(parse_amount("abc").is_err());
    }
}

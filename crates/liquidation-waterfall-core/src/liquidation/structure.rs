use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Currency, Money, Multiple, Shares};

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// A shareholder. Identity only; the calculator never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investor {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A class of stock and the economic rights attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareClass {
    pub id: String,
    pub name: String,
    /// Original issue price per share, in major currency units (e.g. dollars)
    pub original_issue_price: Money,
    /// Liquidation preference as a multiple of the issue price (0 = none)
    #[serde(default)]
    pub liquidation_preference_multiple: Multiple,
    #[serde(default)]
    pub preferred: bool,
    /// Only meaningful when `preferred` is set
    #[serde(default)]
    pub participating: bool,
    /// Cap on preference + participation as a multiple of the issue price.
    /// `None` means uncapped. Only meaningful for participating preferred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participation_cap_multiple: Option<Multiple>,
    /// Lower ranks are paid first; `None` sorts after every ranked class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seniority_rank: Option<u32>,
}

/// One certificate (or position) of shares held by an investor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareHolding {
    pub investor_id: String,
    pub share_class_id: String,
    pub number_of_shares: Shares,
}

/// The cap table snapshot a waterfall is computed against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityStructure {
    pub investors: Vec<Investor>,
    pub share_classes: Vec<ShareClass>,
    pub holdings: Vec<ShareHolding>,
    /// Currency of issue prices and of the exit amount's minor units
    #[serde(default)]
    pub currency: Currency,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ShareClass {
    /// Rank assigned to classes without an explicit seniority.
    pub const UNRANKED: u32 = u32::MAX;

    pub fn seniority(&self) -> u32 {
        self.seniority_rank.unwrap_or(Self::UNRANKED)
    }

    pub fn has_preference(&self) -> bool {
        self.liquidation_preference_multiple > Decimal::ZERO
    }

    pub fn is_participating_preferred(&self) -> bool {
        self.preferred && self.participating
    }

    /// Common stock and participating preferred share in the residual pool.
    pub fn is_residual_eligible(&self) -> bool {
        !self.preferred || self.participating
    }

    /// Cap multiple that actually applies, i.e. ignored unless the class is
    /// participating preferred.
    pub fn effective_cap_multiple(&self) -> Option<Multiple> {
        if self.is_participating_preferred() {
            self.participation_cap_multiple
        } else {
            None
        }
    }

    /// Preference owed per share, in minor units.
    pub fn preference_per_share(&self, minor_unit_scale: Decimal) -> Money {
        self.original_issue_price * minor_unit_scale * self.liquidation_preference_multiple
    }

    /// Ceiling on total proceeds per share, in minor units, if capped.
    pub fn cap_per_share(&self, minor_unit_scale: Decimal) -> Option<Money> {
        self.effective_cap_multiple()
            .map(|cap| self.original_issue_price * minor_unit_scale * cap)
    }
}

impl EquityStructure {
    pub fn share_class(&self, id: &str) -> Option<&ShareClass> {
        self.share_classes.iter().find(|c| c.id == id)
    }

    /// Total shares issued in a class across all holdings.
    pub fn shares_in_class(&self, share_class_id: &str) -> Shares {
        self.holdings
            .iter()
            .filter(|h| h.share_class_id == share_class_id)
            .map(|h| h.number_of_shares)
            .sum()
    }

    pub fn minor_unit_scale(&self) -> Decimal {
        self.currency.minor_unit_scale()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn seed_class() -> ShareClass {
        ShareClass {
            id: "seed".into(),
            name: "Series Seed".into(),
            original_issue_price: dec!(10),
            liquidation_preference_multiple: dec!(1),
            preferred: true,
            participating: true,
            participation_cap_multiple: Some(dec!(3)),
            seniority_rank: None,
        }
    }

    #[test]
    fn test_unranked_sorts_last() {
        let class = seed_class();
        assert_eq!(class.seniority(), ShareClass::UNRANKED);
        let ranked = ShareClass {
            seniority_rank: Some(1),
            ..seed_class()
        };
        assert!(ranked.seniority() < class.seniority());
    }

    #[test]
    fn test_per_share_amounts_in_minor_units() {
        let class = seed_class();
        assert_eq!(class.preference_per_share(dec!(100)), dec!(1000));
        assert_eq!(class.cap_per_share(dec!(100)), Some(dec!(3000)));
    }

    #[test]
    fn test_cap_ignored_unless_participating_preferred() {
        let non_participating = ShareClass {
            participating: false,
            ..seed_class()
        };
        assert_eq!(non_participating.effective_cap_multiple(), None);
        assert!(!non_participating.is_residual_eligible());

        let common = ShareClass {
            preferred: false,
            participating: false,
            liquidation_preference_multiple: Decimal::ZERO,
            ..seed_class()
        };
        assert_eq!(common.cap_per_share(dec!(100)), None);
        assert!(common.is_residual_eligible());
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{
            "investors": [{"id": "x", "name": "X"}],
            "share_classes": [{"id": "common", "name": "Common", "original_issue_price": "0.001"}],
            "holdings": [{"investor_id": "x", "share_class_id": "common", "number_of_shares": 10}]
        }"#;
        let structure: EquityStructure = serde_json::from_str(json).unwrap();
        let class = &structure.share_classes[0];
        assert!(!class.preferred);
        assert!(!class.has_preference());
        assert_eq!(structure.currency, Currency::USD);
        assert_eq!(structure.shares_in_class("common"), 10);
    }
}

use rust_decimal::Decimal;
use std::collections::HashSet;

use super::structure::EquityStructure;
use crate::error::CalculationError;
use crate::types::{Money, Shares};
use crate::CalculationResult;

/// Reject inputs the waterfall cannot run against. Runs before any stage so a
/// failed calculation never touches accumulator state.
pub fn validate_inputs(exit_amount: Money, structure: &EquityStructure) -> CalculationResult<()> {
    if exit_amount <= Decimal::ZERO {
        return Err(CalculationError::InvalidInput {
            field: "exit_amount".into(),
            reason: "Exit amount must be positive".into(),
        });
    }
    if !exit_amount.fract().is_zero() {
        return Err(CalculationError::InvalidInput {
            field: "exit_amount".into(),
            reason: "Exit amount must be a whole number of minor currency units".into(),
        });
    }

    validate_share_classes(structure)?;

    let mut investor_ids = HashSet::new();
    for investor in &structure.investors {
        if !investor_ids.insert(investor.id.as_str()) {
            return Err(CalculationError::InvalidInput {
                field: format!("investors[{}]", investor.id),
                reason: "Duplicate investor id".into(),
            });
        }
    }

    if !structure.holdings.iter().any(|h| h.number_of_shares > 0) {
        return Err(CalculationError::InvalidInput {
            field: "holdings".into(),
            reason: "No holdings with a positive share count; nothing to distribute against"
                .into(),
        });
    }

    for (idx, holding) in structure.holdings.iter().enumerate() {
        if !investor_ids.contains(holding.investor_id.as_str()) {
            return Err(CalculationError::ReferenceIntegrity {
                holding: format!("#{idx}"),
                missing: format!("investor '{}'", holding.investor_id),
            });
        }
        if structure.share_class(&holding.share_class_id).is_none() {
            return Err(CalculationError::ReferenceIntegrity {
                holding: format!("#{idx}"),
                missing: format!("share class '{}'", holding.share_class_id),
            });
        }
    }

    validate_magnitudes(structure)
}

/// Share totals must fit in `Shares`, and every class's preference and cap
/// must fit in a `Decimal`, so the later stages can use plain arithmetic.
fn validate_magnitudes(structure: &EquityStructure) -> CalculationResult<()> {
    structure
        .holdings
        .iter()
        .try_fold(0 as Shares, |total, h| total.checked_add(h.number_of_shares))
        .ok_or_else(|| CalculationError::InvalidInput {
            field: "holdings".into(),
            reason: "Total share count overflows".into(),
        })?;

    let scale = structure.minor_unit_scale();
    let mut total_claim = Decimal::ZERO;
    for class in &structure.share_classes {
        let out_of_range = |what: &str| CalculationError::InvalidInput {
            field: format!("share_classes[{}]", class.id),
            reason: format!("{what} is too large to compute"),
        };
        let shares = Decimal::from(structure.shares_in_class(&class.id));
        let price = class
            .original_issue_price
            .checked_mul(scale)
            .ok_or_else(|| out_of_range("Issue price"))?;

        total_claim = price
            .checked_mul(class.liquidation_preference_multiple)
            .and_then(|per_share| per_share.checked_mul(shares))
            .and_then(|claim| total_claim.checked_add(claim))
            .ok_or_else(|| out_of_range("Liquidation preference"))?;

        if let Some(cap) = class.effective_cap_multiple() {
            price
                .checked_mul(cap)
                .and_then(|per_share| per_share.checked_mul(shares))
                .ok_or_else(|| out_of_range("Participation cap"))?;
        }
    }
    Ok(())
}

fn validate_share_classes(structure: &EquityStructure) -> CalculationResult<()> {
    let mut seen = HashSet::new();
    for class in &structure.share_classes {
        if !seen.insert(class.id.as_str()) {
            return Err(CalculationError::InvalidInput {
                field: format!("share_classes[{}]", class.id),
                reason: "Duplicate share class id".into(),
            });
        }
        if class.original_issue_price < Decimal::ZERO {
            return Err(CalculationError::InvalidInput {
                field: format!("share_classes[{}].original_issue_price", class.id),
                reason: "Original issue price cannot be negative".into(),
            });
        }
        if class.liquidation_preference_multiple < Decimal::ZERO {
            return Err(CalculationError::InvalidInput {
                field: format!("share_classes[{}].liquidation_preference_multiple", class.id),
                reason: "Liquidation preference multiple cannot be negative".into(),
            });
        }
        if let Some(cap) = class.participation_cap_multiple {
            if cap <= Decimal::ZERO {
                return Err(CalculationError::InvalidInput {
                    field: format!("share_classes[{}].participation_cap_multiple", class.id),
                    reason: "Participation cap multiple must be positive".into(),
                });
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liquidation::structure::{Investor, ShareClass, ShareHolding};
    use rust_decimal_macros::dec;

    fn structure() -> EquityStructure {
        EquityStructure {
            investors: vec![Investor {
                id: "x".into(),
                name: "Investor X".into(),
                email: Some("x@example.com".into()),
            }],
            share_classes: vec![ShareClass {
                id: "common".into(),
                name: "Common".into(),
                original_issue_price: dec!(0.0001),
                liquidation_preference_multiple: Decimal::ZERO,
                preferred: false,
                participating: false,
                participation_cap_multiple: None,
                seniority_rank: None,
            }],
            holdings: vec![ShareHolding {
                investor_id: "x".into(),
                share_class_id: "common".into(),
                number_of_shares: 1000,
            }],
            currency: Default::default(),
        }
    }

    fn invalid_field(result: CalculationResult<()>) -> String {
        match result {
            Err(CalculationError::InvalidInput { field, .. }) => field,
            other => panic!("Expected InvalidInput, got: {other:?}"),
        }
    }

    #[test]
    fn test_valid_structure_passes() {
        assert!(validate_inputs(dec!(100), &structure()).is_ok());
    }

    #[test]
    fn test_exit_amount_must_be_positive_whole_units() {
        assert_eq!(invalid_field(validate_inputs(dec!(0), &structure())), "exit_amount");
        assert_eq!(invalid_field(validate_inputs(dec!(-5), &structure())), "exit_amount");
        assert_eq!(invalid_field(validate_inputs(dec!(10.5), &structure())), "exit_amount");
        // Trailing zero scale is still a whole amount
        assert!(validate_inputs(dec!(10.00), &structure()).is_ok());
    }

    #[test]
    fn test_no_positive_holdings() {
        let mut s = structure();
        s.holdings[0].number_of_shares = 0;
        assert_eq!(invalid_field(validate_inputs(dec!(100), &s)), "holdings");
        s.holdings.clear();
        assert_eq!(invalid_field(validate_inputs(dec!(100), &s)), "holdings");
    }

    #[test]
    fn test_unknown_references() {
        let mut s = structure();
        s.holdings[0].share_class_id = "series_z".into();
        match validate_inputs(dec!(100), &s) {
            Err(CalculationError::ReferenceIntegrity { missing, .. }) => {
                assert!(missing.contains("series_z"));
            }
            other => panic!("Expected ReferenceIntegrity, got: {other:?}"),
        }

        let mut s = structure();
        s.holdings[0].investor_id = "ghost".into();
        assert!(matches!(
            validate_inputs(dec!(100), &s),
            Err(CalculationError::ReferenceIntegrity { .. })
        ));
    }

    #[test]
    fn test_share_class_numerics() {
        let mut s = structure();
        s.share_classes[0].liquidation_preference_multiple = dec!(-1);
        assert_eq!(
            invalid_field(validate_inputs(dec!(100), &s)),
            "share_classes[common].liquidation_preference_multiple"
        );

        let mut s = structure();
        s.share_classes[0].participation_cap_multiple = Some(Decimal::ZERO);
        assert_eq!(
            invalid_field(validate_inputs(dec!(100), &s)),
            "share_classes[common].participation_cap_multiple"
        );
    }

    #[test]
    fn test_duplicate_ids() {
        let mut s = structure();
        let dup = s.share_classes[0].clone();
        s.share_classes.push(dup);
        assert_eq!(
            invalid_field(validate_inputs(dec!(100), &s)),
            "share_classes[common]"
        );

        let mut s = structure();
        let dup = s.investors[0].clone();
        s.investors.push(dup);
        assert_eq!(invalid_field(validate_inputs(dec!(100), &s)), "investors[x]");
    }

    #[test]
    fn test_out_of_range_magnitudes() {
        let mut s = structure();
        s.share_classes[0].original_issue_price = dec!(100000000000);
        s.share_classes[0].liquidation_preference_multiple = dec!(1);
        s.holdings[0].number_of_shares = u64::MAX;
        assert_eq!(invalid_field(validate_inputs(dec!(100), &s)), "share_classes[common]");

        let mut s = structure();
        s.share_classes[0].original_issue_price = dec!(100000000000);
        s.share_classes[0].preferred = true;
        s.share_classes[0].participating = true;
        s.share_classes[0].participation_cap_multiple = Some(dec!(3));
        s.holdings[0].number_of_shares = u64::MAX;
        assert_eq!(invalid_field(validate_inputs(dec!(100), &s)), "share_classes[common]");

        let mut s = structure();
        s.holdings[0].number_of_shares = u64::MAX;
        let extra = s.holdings[0].clone();
        s.holdings.push(extra);
        assert_eq!(invalid_field(validate_inputs(dec!(100), &s)), "holdings");

        // Large but representable
        let mut s = structure();
        s.holdings[0].number_of_shares = u64::MAX;
        assert!(validate_inputs(dec!(100), &s).is_ok());
    }
}

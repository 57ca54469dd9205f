use std::collections::HashMap;

use super::structure::ShareHolding;
use crate::types::{Money, Shares};

/// Composite (investor, share class) key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HoldingKey {
    pub investor_id: String,
    pub share_class_id: String,
}

impl HoldingKey {
    pub fn new(investor_id: impl Into<String>, share_class_id: impl Into<String>) -> Self {
        HoldingKey {
            investor_id: investor_id.into(),
            share_class_id: share_class_id.into(),
        }
    }
}

/// Running totals for one (investor, share class) position during a
/// single calculation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayoutAccumulator {
    pub share_count: Shares,
    pub preference_amount: Money,
    pub participation_amount: Money,
    pub common_amount: Money,
}

impl PayoutAccumulator {
    pub fn with_shares(share_count: Shares) -> Self {
        PayoutAccumulator {
            share_count,
            ..Default::default()
        }
    }
}

/// Arena of accumulators indexed by [`HoldingKey`].
///
/// Entries keep the order in which their key first appeared in the holdings,
/// which is what ties fall back to when payouts are sorted.
#[derive(Debug, Clone, Default)]
pub struct Accumulators {
    entries: Vec<(HoldingKey, PayoutAccumulator)>,
    positions: HashMap<HoldingKey, usize>,
}

impl Accumulators {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &HoldingKey) -> Option<&PayoutAccumulator> {
        self.positions.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HoldingKey, &PayoutAccumulator)> {
        self.entries.iter().map(|(k, a)| (k, a))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&HoldingKey, &mut PayoutAccumulator)> {
        self.entries.iter_mut().map(|(k, a)| (&*k, a))
    }

    fn add_shares(&mut self, key: HoldingKey, shares: Shares) {
        match self.positions.get(&key) {
            Some(&i) => self.entries[i].1.share_count += shares,
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, PayoutAccumulator::with_shares(shares)));
            }
        }
    }
}

/// Collapse raw holdings into one zero-valued accumulator per
/// (investor, share class), summing share counts. Zero-share holdings do not
/// create entries.
pub fn aggregate_holdings(holdings: &[ShareHolding]) -> Accumulators {
    let mut accumulators = Accumulators::default();
    for holding in holdings.iter().filter(|h| h.number_of_shares > 0) {
        accumulators.add_shares(
            HoldingKey::new(&holding.investor_id, &holding.share_class_id),
            holding.number_of_shares,
        );
    }
    accumulators
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

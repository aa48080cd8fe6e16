use crate::fixed::{Fixed64, count_to_fixed64};
use crate::id::ProductId;
use crate::product::Product;

/// Why a sink refused an incoming unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The sink has no product assigned.
    NoProduct,
    /// The incoming product's name differs from the assigned product's.
    ProductMismatch { expected: String, received: String },
}

/// What happened to a unit delivered to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Counted into stock.
    Stored,
    /// Counted as failed (defective on arrival).
    Failed,
    /// Counted as lost because the sink was full.
    Lost,
    /// Not counted at all.
    Rejected(RejectReason),
}

/// Configuration and counters of a storage sink.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SinkState {
    pub product: Option<ProductId>,
    /// Maximum stock; 0 means unlimited.
    pub capacity: u64,
    pub current_stock: u64,
    /// Units dropped because the sink was full.
    pub loss: u64,
    /// Units that arrived marked failed.
    pub fail: u64,
    /// Units ever received (stored, failed or lost).
    pub in_count: u64,
    /// Units ever withdrawn by downstream sources.
    pub out_count: u64,
}

impl SinkState {
    pub const DEFAULT_CAPACITY: u64 = 1000;

    pub fn new() -> Self {
        Self {
            product: None,
            capacity: Self::DEFAULT_CAPACITY,
            current_stock: 0,
            loss: 0,
            fail: 0,
            in_count: 0,
            out_count: 0,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.capacity == 0
    }

    pub fn has_room(&self) -> bool {
        self.is_unlimited() || self.current_stock < self.capacity
    }

    /// Deliver one unit of `incoming`. `assigned` is the sink's own product,
    /// resolved by the caller.
    pub fn receive(
        &mut self,
        assigned: Option<&Product>,
        incoming: &Product,
        is_fail: bool,
    ) -> ReceiveOutcome {
        let Some(assigned) = assigned else {
            return ReceiveOutcome::Rejected(RejectReason::NoProduct);
        };
        if !assigned.matches(incoming) {
            return ReceiveOutcome::Rejected(RejectReason::ProductMismatch {
                expected: assigned.name.clone(),
                received: incoming.name.clone(),
            });
        }

        self.in_count += 1;
        if is_fail {
            self.fail += 1;
            ReceiveOutcome::Failed
        } else if self.has_room() {
            self.current_stock += 1;
            ReceiveOutcome::Stored
        } else {
            self.loss += 1;
            ReceiveOutcome::Lost
        }
    }

    /// Take `units` out of stock for a downstream source. Returns `false`
    /// (and changes nothing) when stock is insufficient.
    pub fn withdraw(&mut self, units: u64) -> bool {
        if self.current_stock < units {
            return false;
        }
        self.current_stock -= units;
        self.out_count += units;
        true
    }

    /// Net units received and not withdrawn.
    pub fn elements(&self) -> i64 {
        self.in_count as i64 - self.out_count as i64
    }

    /// `(elements - 2*fail - 2*loss) * price`. Failed and lost units cost
    /// twice their price.
    pub fn profit(&self, price: Fixed64) -> Fixed64 {
        let net = self.elements() - 2 * self.fail as i64 - 2 * self.loss as i64;
        count_to_fixed64(net).saturating_mul(price)
    }
}

impl Default for SinkState {
    fn default() -> Self {
        Self::new()
    }
}

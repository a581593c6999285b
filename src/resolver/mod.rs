//! Requirement resolution.
//!
//! Determines, from a model's declared input specification and a patient's
//! confirmed order results, whether the model's input contract is satisfied.
//! Pure over its inputs: no state, no mutation, safe to call concurrently.

pub mod key_path;

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::inference::InferenceModel;
use crate::models::order::Order;
use crate::state_machine::states::OrderState;
pub use key_path::RequirementKey;

/// Outcome of resolving one model against a patient's orders.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Source category -> requirement keys that resolved.
    pub available: BTreeMap<String, Vec<String>>,
    /// Source category -> requirement keys that did not resolve.
    pub missing: BTreeMap<String, Vec<String>>,
    /// Resolved values, nested `{category: {key: value}}`; doubles as the
    /// job's input snapshot.
    pub snapshot: Value,
    /// Orders whose required keys all resolved (and that required at least
    /// one key).
    pub compatible_order_ids: Vec<Uuid>,
    /// Source category -> the order selected for it, compatible or not.
    pub source_orders: BTreeMap<String, Uuid>,
}

impl Resolution {
    /// Ready when no declared source has an unresolved key.
    pub fn is_ready(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Resolve `model` against a patient's orders on file.
///
/// For each declared source, the most recently confirmed order of that
/// category is selected (restricted to `override_ids` when supplied) and each
/// required dotted key is resolved against its result payload. An order is
/// compatible iff every required key resolves and the source declares at
/// least one key; a zero-key source never matches vacuously.
pub fn resolve(
    model: &InferenceModel,
    orders: &[Order],
    override_ids: Option<&[Uuid]>,
) -> Resolution {
    let mut available: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut missing: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut snapshot = Map::new();
    let mut compatible_order_ids = Vec::new();
    let mut source_orders = BTreeMap::new();

    for source in &model.sources {
        let selected = orders
            .iter()
            .filter(|order| order.status == OrderState::Confirmed)
            .filter(|order| order.category.eq_ignore_ascii_case(&source.category))
            .filter(|order| {
                override_ids
                    .map(|ids| ids.contains(&order.order_id))
                    .unwrap_or(true)
            })
            .max_by_key(|order| (order.confirmed_at, order.seq));

        let Some(order) = selected else {
            if !source.required_keys.is_empty() {
                missing.insert(source.category.clone(), source.required_keys.clone());
            }
            continue;
        };
        source_orders.insert(source.category.clone(), order.order_id);

        let mut resolved_here = Vec::new();
        let mut missing_here = Vec::new();
        let mut values = Map::new();

        for raw_key in &source.required_keys {
            let key = RequirementKey::parse(raw_key);
            match key.resolve(&order.result_payload) {
                Some(value) => {
                    resolved_here.push(raw_key.clone());
                    values.insert(raw_key.clone(), value);
                }
                None => missing_here.push(raw_key.clone()),
            }
        }

        let compatible = !source.required_keys.is_empty() && missing_here.is_empty();
        if compatible {
            compatible_order_ids.push(order.order_id);
        }

        if !resolved_here.is_empty() {
            available.insert(source.category.clone(), resolved_here);
            snapshot.insert(source.category.clone(), Value::Object(values));
        }
        if !missing_here.is_empty() {
            missing.insert(source.category.clone(), missing_here);
        }
    }

    Resolution {
        available,
        missing,
        snapshot: Value::Object(snapshot),
        compatible_order_ids,
        source_orders,
    }
}

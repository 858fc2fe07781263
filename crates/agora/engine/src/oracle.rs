//! Weight oracles: the external source of voting weight.
//!
//! Weight is looked up live at vote time and never cached by the engine. The
//! active oracle is named by address in the engine settings and can only be
//! swapped by governance, so every oracle the settings may point at must be
//! registered up front.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use agora_types::{Address, Weight};
use async_trait::async_trait;
use thiserror::Error;

/// Errors a weight oracle may report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("account not known to oracle: {0}")]
    UnknownAccount(Address),

    #[error("oracle backend error: {0}")]
    Backend(String),
}

/// Returns a voter's current weight.
#[async_trait]
pub trait WeightOracle: Send + Sync {
    async fn weight_of(&self, account: &Address) -> Result<Weight, OracleError>;
}

/// An in-memory balance table. Accounts without an entry weigh zero.
#[derive(Debug, Default)]
pub struct StaticWeightOracle {
    weights: RwLock<HashMap<Address, Weight>>,
}

impl StaticWeightOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: impl IntoIterator<Item = (Address, Weight)>) -> Self {
        Self {
            weights: RwLock::new(weights.into_iter().collect()),
        }
    }

    /// Set an account's balance, returning the previous one.
    pub fn set_weight(&self, account: Address, weight: Weight) -> Weight {
        self.weights
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(account, weight)
            .unwrap_or(0)
    }
}

#[async_trait]
impl WeightOracle for StaticWeightOracle {
    async fn weight_of(&self, account: &Address) -> Result<Weight, OracleError> {
        let weights = self
            .weights
            .read()
            .map_err(|e| OracleError::Backend(e.to_string()))?;
        Ok(weights.get(account).copied().unwrap_or(0))
    }
}

/// Oracles the engine may consult, keyed by address.
#[derive(Default, Clone)]
pub struct OracleRegistry {
    oracles: HashMap<Address, Arc<dyn WeightOracle>>,
}

impl OracleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, address: Address, oracle: Arc<dyn WeightOracle>) {
        self.oracles.insert(address, oracle);
    }

    pub fn get(&self, address: &Address) -> Option<Arc<dyn WeightOracle>> {
        self.oracles.get(address).cloned()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.oracles.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.oracles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_oracle_reports_balances() {
        let alice = Address::derive(b"alice");
        let bob = Address::derive(b"bob");
        let oracle = StaticWeightOracle::with_weights([(alice, 8)]);

        assert_eq!(oracle.weight_of(&alice).await.unwrap(), 8);
        assert_eq!(oracle.weight_of(&bob).await.unwrap(), 0);

        assert_eq!(oracle.set_weight(alice, 3), 8);
        assert_eq!(oracle.weight_of(&alice).await.unwrap(), 3);
    }

    #[test]
    fn registry_lookup() {
        let mut registry = OracleRegistry::new();
        let addr = Address::derive(b"oracle");
        assert!(registry.is_empty());
        registry.register(addr, Arc::new(StaticWeightOracle::new()));
        assert!(registry.contains(&addr));
        assert!(registry.get(&addr).is_some());
        assert!(registry.get(&Address::derive(b"other")).is_none());
        assert_eq!(registry.len(), 1);
    }
}

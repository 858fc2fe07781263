//! Call targets and the gas meter that bounds them.
//!
//! A proposal's action is an opaque call against a registered target. The
//! engine never interprets the payload; it only forwards a bounded amount of
//! gas and classifies the outcome.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use agora_types::{Address, ProposalId};
use async_trait::async_trait;
use thiserror::Error;

/// Why a target call did not succeed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallFailure {
    /// The callee rejected the call; the payload describes why.
    #[error("call reverted ({} bytes of revert data)", .0.len())]
    Reverted(Vec<u8>),

    /// The callee drew more gas than it was forwarded.
    #[error("call ran out of gas")]
    OutOfGas,

    /// The callee did not return within the engine's call timeout.
    #[error("call timed out")]
    TimedOut,
}

impl CallFailure {
    pub fn revert(reason: impl Into<Vec<u8>>) -> Self {
        CallFailure::Reverted(reason.into())
    }

    /// Bytes reported on the `ExecutionFailed` event.
    pub fn payload(&self) -> Vec<u8> {
        match self {
            CallFailure::Reverted(data) => data.clone(),
            CallFailure::OutOfGas => b"out of gas".to_vec(),
            CallFailure::TimedOut => b"call timed out".to_vec(),
        }
    }
}

/// Gas forwarded to a single target call.
///
/// Targets charge for their work with [`GasMeter::charge`]; a charge beyond
/// the limit pins usage at the limit and fails with [`CallFailure::OutOfGas`].
#[derive(Debug)]
pub struct GasMeter {
    limit: u64,
    used: AtomicU64,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            used: AtomicU64::new(0),
        }
    }

    pub fn charge(&self, amount: u64) -> Result<(), CallFailure> {
        let limit = self.limit;
        let within = |used: u64| used.checked_add(amount).filter(|next| *next <= limit);
        let previous = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                Some(within(used).unwrap_or(limit))
            })
            .unwrap_or_else(|used| used);
        match within(previous) {
            Some(_) => Ok(()),
            None => Err(CallFailure::OutOfGas),
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn used(&self) -> u64 {
        self.used.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used())
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

/// Everything a target learns about the call it is serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub proposal: ProposalId,
    /// Always the engine's own address.
    pub caller: Address,
    pub target: Address,
    pub payload: Vec<u8>,
}

/// An opaque resource a proposal can act on.
///
/// Implementations must not call back into the engine that invoked them: the
/// engine holds its mutation lock for the duration of the call.
#[async_trait]
pub trait CallTarget: Send + Sync {
    async fn call(&self, request: &CallRequest, gas: &GasMeter) -> Result<Vec<u8>, CallFailure>;
}

/// Call targets keyed by address.
#[derive(Default, Clone)]
pub struct TargetRegistry {
    targets: HashMap<Address, Arc<dyn CallTarget>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, address: Address, target: Arc<dyn CallTarget>) {
        self.targets.insert(address, target);
    }

    pub fn get(&self, address: &Address) -> Option<Arc<dyn CallTarget>> {
        self.targets.get(address).cloned()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.targets.contains_key(address)
    }
}

/// Returns its payload, charging gas per byte.
#[derive(Debug, Clone, Copy)]
pub struct EchoTarget {
    pub gas_per_byte: u64,
}

impl Default for EchoTarget {
    fn default() -> Self {
        Self { gas_per_byte: 10 }
    }
}

#[async_trait]
impl CallTarget for EchoTarget {
    async fn call(&self, request: &CallRequest, gas: &GasMeter) -> Result<Vec<u8>, CallFailure> {
        gas.charge(self.gas_per_byte.saturating_mul(request.payload.len() as u64))?;
        Ok(request.payload.clone())
    }
}

/// Rejects every call with a fixed reason.
#[derive(Debug, Clone)]
pub struct RevertingTarget {
    pub reason: Vec<u8>,
}

impl RevertingTarget {
    pub fn new(reason: impl Into<Vec<u8>>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl CallTarget for RevertingTarget {
    async fn call(&self, _request: &CallRequest, _gas: &GasMeter) -> Result<Vec<u8>, CallFailure> {
        Err(CallFailure::revert(self.reason.clone()))
    }
}

/// Consumes a fixed amount of gas before succeeding; fails if the meter runs dry.
#[derive(Debug, Clone, Copy)]
pub struct GasBurnerTarget {
    pub burn: u64,
}

#[async_trait]
impl CallTarget for GasBurnerTarget {
    async fn call(&self, _request: &CallRequest, gas: &GasMeter) -> Result<Vec<u8>, CallFailure> {
        gas.charge(self.burn)?;
        Ok(self.burn.to_le_bytes().to_vec())
    }
}

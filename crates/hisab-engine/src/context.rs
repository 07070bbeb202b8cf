//! Per-operation context: who is acting, why, and the timestamp every
//! row written by the operation shares.

use chrono::{DateTime, Utc};

use hisab_core::validation::validate_actor;
use hisab_core::{Actor, DEFAULT_CURRENCY};

use crate::error::EngineResult;

#[derive(Debug, Clone)]
pub(crate) struct Context<'a> {
    pub actor: &'a Actor,
    pub reason: String,
    pub now: DateTime<Utc>,
    /// Currency for accounts created on first use.
    pub currency: String,
}

impl<'a> Context<'a> {
    pub fn new(actor: &'a Actor, reason: impl Into<String>) -> EngineResult<Self> {
        validate_actor(actor)?;
        Ok(Context {
            actor,
            reason: reason.into(),
            now: Utc::now(),
            currency: DEFAULT_CURRENCY.to_string(),
        })
    }

    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_string();
        self
    }
}

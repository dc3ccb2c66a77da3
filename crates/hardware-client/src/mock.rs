//! Mock HardwareClient for unit testing
//!
//! Stores records in memory, records every call, and can be told to fail a
//! given operation so controllers can exercise their error paths.

use crate::error::HardwareError;
use crate::hardware_trait::HardwareClientTrait;
use crate::models::Hardware;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Operation selector for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    Push,
    Lookup,
    Delete,
}

/// A call observed by the mock, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Push(String),
    Lookup(String),
    Delete(String),
}

#[derive(Debug, Clone)]
enum Failure {
    NotFound,
    Api(String),
}

/// Mock HardwareClient for testing
#[derive(Clone)]
pub struct MockHardwareClient {
    base_url: String,
    records: Arc<Mutex<HashMap<String, Hardware>>>,
    failures: Arc<Mutex<HashMap<MockOperation, Failure>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockHardwareClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            records: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Seed a record without recording a call
    pub fn insert(&self, hardware: Hardware) {
        self.records
            .lock()
            .unwrap()
            .insert(hardware.id.clone(), hardware);
    }

    pub fn record(&self, id: &str) -> Option<Hardware> {
        self.records.lock().unwrap().get(id).cloned()
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Make every subsequent `op` fail with an API error
    pub fn fail(&self, op: MockOperation, message: impl Into<String>) {
        self.failures
            .lock()
            .unwrap()
            .insert(op, Failure::Api(message.into()));
    }

    /// Make every subsequent `op` answer NotFound regardless of contents
    pub fn fail_not_found(&self, op: MockOperation) {
        self.failures.lock().unwrap().insert(op, Failure::NotFound);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    fn enter(&self, op: MockOperation, call: MockCall, id: &str) -> Result<(), HardwareError> {
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().get(&op) {
            Some(Failure::NotFound) => Err(HardwareError::NotFound(format!("hardware {}", id))),
            Some(Failure::Api(message)) => Err(HardwareError::Api(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl HardwareClientTrait for MockHardwareClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn push(&self, hardware: &Hardware) -> Result<(), HardwareError> {
        self.enter(
            MockOperation::Push,
            MockCall::Push(hardware.id.clone()),
            &hardware.id,
        )?;
        self.insert(hardware.clone());
        Ok(())
    }

    async fn lookup(&self, id: &str) -> Result<Hardware, HardwareError> {
        self.enter(MockOperation::Lookup, MockCall::Lookup(id.to_string()), id)?;
        self.record(id)
            .ok_or_else(|| HardwareError::NotFound(format!("hardware {}", id)))
    }

    async fn delete(&self, id: &str) -> Result<(), HardwareError> {
        self.enter(MockOperation::Delete, MockCall::Delete(id.to_string()), id)?;
        match self.records.lock().unwrap().remove(id) {
            Some(_) => Ok(()),
            None => Err(HardwareError::NotFound(format!("hardware {}", id))),
        }
    }
}

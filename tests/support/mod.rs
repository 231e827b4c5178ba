//! Shared test doubles for the integration suites.

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use mediaforge::GenError;
use mediaforge::traits::{ArtifactStore, SessionVerifier};
use mediaforge::types::{ArtifactRecord, CallerId};

/// Artifact store that records every persisted record.
#[derive(Default)]
pub struct RecordingStore {
    records: Mutex<Vec<ArtifactRecord>>,
    fail: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn records(&self) -> Vec<ArtifactRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactStore for RecordingStore {
    async fn persist_artifact(&self, record: ArtifactRecord) -> Result<String, GenError> {
        let mut records = self.records.lock().unwrap();
        records.push(record);
        if self.fail {
            return Err(GenError::StorageError("store offline".to_string()));
        }
        Ok(format!("record-{}", records.len()))
    }
}

/// Wait until the store holds `count` records; panics after one second.
pub async fn wait_for_records(store: &RecordingStore, count: usize) {
    for _ in 0..100 {
        if store.records().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {count} persisted records, found {}",
        store.records().len()
    );
}

/// Verifier accepting exactly one token.
pub struct StaticVerifier {
    pub token: String,
    pub caller: CallerId,
}

impl StaticVerifier {
    pub fn new(token: &str, caller: &str) -> Self {
        Self {
            token: token.to_string(),
            caller: CallerId::new(caller),
        }
    }
}

#[async_trait]
impl SessionVerifier for StaticVerifier {
    async fn verify_session(&self, token: &str) -> Result<CallerId, GenError> {
        if token == self.token {
            Ok(self.caller.clone())
        } else {
            Err(GenError::AuthError("Invalid session".to_string()))
        }
    }
}

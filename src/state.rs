// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::gateway::client::NodeClient;
use crate::gateway::VaultGateway;
use crate::storage::{AuditLog, HistoryStore};

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<VaultGateway<NodeClient>>,
    pub history: Arc<HistoryStore>,
    pub audit: Arc<AuditLog>,
}

impl AppState {
    pub fn new(
        gateway: Arc<VaultGateway<NodeClient>>,
        history: Arc<HistoryStore>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            gateway,
            history,
            audit,
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    use alloy::signers::local::PrivateKeySigner;
    use tempfile::TempDir;

    use crate::gateway::capacity::CapacityManager;
    use crate::signer::KeyMaterial;
    use crate::storage::StoragePaths;

    /// Build an AppState over a temp data directory and an unreachable
    /// coordinator URL. Suitable for handlers that never dial out.
    pub fn test_state() -> (TempDir, AppState) {
        let dir = TempDir::new().expect("tempdir");
        let history =
            Arc::new(HistoryStore::open(&dir.path().join("history.redb")).expect("open store"));
        let audit = Arc::new(AuditLog::new(StoragePaths::new(dir.path())));

        let network = NodeClient::new("http://127.0.0.1:9", "testnet").expect("client");
        let signer = Arc::new(KeyMaterial::from_signer(PrivateKeySigner::random()));
        let gateway = Arc::new(VaultGateway::new(
            network,
            signer,
            CapacityManager::new(None),
            history.clone(),
        ));

        (dir, AppState::new(gateway, history, audit))
    }
}

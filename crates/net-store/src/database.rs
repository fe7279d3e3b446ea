//! Snapshot-transactional table store

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use l2net_core::{ReconcileError, Result};
use l2net_shared_types::{
    NetworkRecord, PortBinding, SegmentationReservation, SubnetRecord, VlanBinding,
};

/// Every table the reconciler persists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    /// Keyed by network id
    #[serde(default)]
    pub vlan_bindings: BTreeMap<String, VlanBinding>,
    /// Insertion ordered
    #[serde(default)]
    pub port_bindings: Vec<PortBinding>,
    #[serde(default)]
    pub segmentation_reservations: Vec<SegmentationReservation>,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkRecord>,
    #[serde(default)]
    pub subnets: BTreeMap<String, SubnetRecord>,
}

/// Transactional store backed by memory or a JSON file.
///
/// A transaction runs against a private copy of the tables. The copy only
/// replaces the live tables after it has been durably written, so a failed
/// closure or a failed write leaves nothing behind.
#[derive(Debug)]
pub struct Database {
    path: Option<PathBuf>,
    tables: Mutex<Tables>,
}

impl Database {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            tables: Mutex::new(Tables::default()),
        }
    }

    /// Open a file-backed database, starting empty when the file does not exist
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let tables = match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let tables: Tables = serde_json::from_str(&content)?;
                log::info!(
                    "Loaded {} VLAN bindings and {} reservations from {}",
                    tables.vlan_bindings.len(),
                    tables.segmentation_reservations.len(),
                    path.display()
                );
                tables
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No store found at {}, starting fresh", path.display());
                Tables::default()
            }
            Err(e) => {
                log::warn!("Failed to read store {}: {}", path.display(), e);
                return Err(e.into());
            }
        };

        Ok(Self {
            path: Some(path),
            tables: Mutex::new(tables),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` as one read-modify-write transaction
    pub async fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Tables) -> Result<T>,
    {
        let mut live = self.tables.lock().await;
        let mut staged = live.clone();

        let value = f(&mut staged)?;

        if staged != *live {
            if let Some(path) = &self.path {
                persist(path, &staged).await?;
            }
            *live = staged;
        }

        Ok(value)
    }

    /// Read-only view of the committed tables
    pub async fn read<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&Tables) -> T,
    {
        let tables = self.tables.lock().await;
        f(&tables)
    }
}

async fn persist(path: &Path, tables: &Tables) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let content = serde_json::to_vec_pretty(tables)?;

    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(".tmp");
    let temp_path = PathBuf::from(temp_path);

    let mut file = tokio::fs::File::create(&temp_path).await?;
    file.write_all(&content).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&temp_path, path).await.map_err(|e| {
        ReconcileError::store(format!(
            "failed to commit {} -> {}: {}",
            temp_path.display(),
            path.display(),
            e
        ))
    })?;

    log::debug!("Committed store snapshot to {}", path.display());
    Ok(())
}

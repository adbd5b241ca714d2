//! On-disk resource manifest.
//!
//! The manifest is a JSON array of `{ID, Path, Type}` records for every
//! resource whose type is registered as serializable. Types registered with
//! a disk cache also keep their own state in a `<path>.cache` sidecar.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ResourceRegistry, ResourceSlot};
use crate::error::CoreResult;
use crate::id::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "ID")]
    pub id: Uuid,
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Type")]
    pub type_name: String,
    #[serde(rename = "Assembly", default, skip_serializing_if = "Option::is_none")]
    pub assembly: Option<String>,
}

/// Outcome of [`ResourceRegistry::load_database`].
#[derive(Debug, Default, Clone)]
pub struct DatabaseReport {
    pub loaded: Vec<Uuid>,
    /// Already live under the same ID.
    pub skipped: Vec<Uuid>,
    /// Declared type names with no registered resource constructor.
    pub unresolved: Vec<String>,
    /// Constructed but not hydrated; unloaded again so a later `load` can retry.
    pub failed: Vec<Uuid>,
}

impl ResourceRegistry {
    pub fn manifest_entries(&self) -> Vec<ManifestEntry> {
        let slots: Vec<ResourceSlot> = self.instances.borrow().values().cloned().collect();
        let mut entries: Vec<ManifestEntry> = slots
            .iter()
            .filter_map(|slot| {
                let (name, info) = self.host.types().resource_by_type(slot.type_id())?;
                if !info.options.serializable {
                    return None;
                }
                let resource = slot.get().borrow();
                Some(ManifestEntry {
                    id: resource.meta().id(),
                    path: resource.meta().path(),
                    type_name: name.to_string(),
                    assembly: None,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path).then(a.id.cmp(&b.id)));
        entries
    }

    pub(super) fn write_manifest(&self) -> CoreResult<PathBuf> {
        let file = self.config.manifest_path();
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.manifest_entries())?;
        fs::write(&file, json)?;
        Ok(file)
    }

    /// Writes the manifest and the sidecar of every disk-cached resource.
    /// A sidecar that fails to write is logged and skipped.
    pub fn save_database(&self) -> CoreResult<PathBuf> {
        let file = self.write_manifest()?;
        let slots: Vec<ResourceSlot> = self.instances.borrow().values().cloned().collect();
        for slot in slots.iter().filter(|slot| self.is_disk_cached(slot)) {
            let id = slot.get().borrow().meta().id();
            if let Err(err) = self.save_resource(id) {
                warn!(%id, %err, "failed to write resource cache");
            }
        }
        info!(path = %file.display(), "saved resource database");
        Ok(file)
    }

    /// Re-creates the resources listed in the manifest.
    ///
    /// Entries already live are skipped, so repeated or partial loads are
    /// safe. A disk-cached resource whose sidecar cannot be read is unloaded
    /// again right away; an explicit `load` with the right arguments can
    /// still bring it back later.
    pub fn load_database(&self) -> CoreResult<DatabaseReport> {
        let mut report = DatabaseReport::default();
        let file = self.config.manifest_path();
        if !file.exists() {
            debug!(path = %file.display(), "no resource manifest");
            return Ok(report);
        }
        let entries: Vec<ManifestEntry> = serde_json::from_str(&fs::read_to_string(&file)?)?;

        for entry in entries {
            if self.is_loaded(entry.id) {
                report.skipped.push(entry.id);
                continue;
            }
            let info = match self.host.types().resource(&entry.type_name) {
                Ok(info) => info,
                Err(err) => {
                    let kind = self.host.types().kind_of(&entry.type_name);
                    warn!(
                        id = %entry.id,
                        path = entry.path.as_str(),
                        ?kind,
                        %err,
                        "skipping manifest entry"
                    );
                    report.unresolved.push(entry.type_name.clone());
                    continue;
                }
            };

            let slot = (info.create)(&self.host);
            {
                let mut resource = slot.get().borrow_mut();
                resource.meta().set_path(&entry.path);
                resource.meta().set_id(entry.id);
                resource
                    .meta()
                    .set_native_handle(self.host.bridge().resource_instance(entry.id));
                resource.on_load();
            }
            self.register(&slot);

            if info.options.disk_cache {
                let hydrated = match self.hydrate(&slot) {
                    Ok(found) => found,
                    Err(err) => {
                        warn!(id = %entry.id, %err, "resource cache unreadable");
                        false
                    }
                };
                if !hydrated {
                    warn!(
                        id = %entry.id,
                        path = entry.path.as_str(),
                        "could not hydrate resource; leaving it unloaded"
                    );
                    self.unload(entry.id);
                    report.failed.push(entry.id);
                    continue;
                }
            }
            report.loaded.push(entry.id);
        }

        info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "loaded resource database"
        );
        Ok(report)
    }
}

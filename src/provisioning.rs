//! Access-control descriptors written in secure mode.
//!
//! Before registering, a secure daemon writes one JSON file per resource into
//! the provisioning directory, listing the resource link that clients are
//! allowed to reach. The provisioning tooling picks the files up from there.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::ResourceSettings;
use crate::device_info::BASELINE_INTERFACE;
use crate::error::{DaemonError, Result};

/// One resource link of an access-control list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLink {
    pub href: String,
    pub rel: String,
    pub rt: Vec<String>,
    #[serde(rename = "if")]
    pub interfaces: Vec<String>,
}

impl ResourceLink {
    pub fn for_resource(settings: &ResourceSettings) -> Self {
        Self {
            href: settings.resource_path(),
            rel: String::new(),
            rt: vec![settings.kind.resource_type().to_string()],
            interfaces: vec![BASELINE_INTERFACE.to_string()],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlList {
    pub resources: Vec<ResourceLink>,
}

impl AccessControlList {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }
}

/// File the descriptor for `settings` is written to.
pub fn acl_path(dir: &Path, settings: &ResourceSettings) -> PathBuf {
    dir.join(format!("{}.acl.json", settings.identifier()))
}

/// Write the access-control descriptor of a secure resource.
pub fn provision(dir: &Path, settings: &ResourceSettings) -> Result<PathBuf> {
    let path = acl_path(dir, settings);
    let acl = AccessControlList {
        resources: vec![ResourceLink::for_resource(settings)],
    };
    acl.save(&path).map_err(|e| {
        DaemonError::ProvisioningFailed(format!("{}: {}", path.display(), e))
    })?;
    info!(
        "[Provisioning] Wrote access control for {} to {:?}",
        settings.resource_path(),
        path
    );
    Ok(path)
}

//! Marshal and scan policies.
//!
//! Two independent knobs steer the codecs:
//! * [`MarshalUnset`] decides whether an unset container is "zero" for the
//!   purpose of struct field omission.
//! * [`ScanNull`] decides which state a storage `NULL` lands in.
//!
//! A [`Policies`] value bundles both and can be handed to the `*_with`
//! codec entry points directly. The process-wide defaults are kept behind a
//! read/write lock and are consulted whenever a container carries no
//! override of its own. The lock is only held while copying the value.

use std::path::Path;
use std::sync::RwLock;

use config::{Config, Environment, File, FileFormat};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// How an unset container behaves when its surrounding record is marshaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarshalUnset {
    /// Unset fields count as zero, so records tagged for omission drop them.
    #[default]
    Skip,
    /// Unset fields are emitted as an explicit `null`.
    Null,
}

/// Which state a storage `NULL` is scanned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanNull {
    #[default]
    AsNull,
    AsUnset,
}

/// Both policy axes as one injectable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Policies {
    pub marshal_unset: MarshalUnset,
    pub scan_null: ScanNull,
}

pub const ENV_PREFIX: &str = "PRESENCE";

lazy_static! {
    static ref DEFAULTS: RwLock<Policies> = RwLock::new(Policies::default());
}

fn read_defaults() -> Policies {
    // Policies is Copy, so a poisoned lock still holds a consistent value.
    match DEFAULTS.read() {
        Ok(guard) => *guard,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

fn write_defaults(update: impl FnOnce(&mut Policies)) {
    let mut guard = match DEFAULTS.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    update(&mut guard);
}

impl Policies {
    pub fn new(marshal_unset: MarshalUnset, scan_null: ScanNull) -> Self {
        Self { marshal_unset, scan_null }
    }
    /// Snapshot of the process-wide defaults.
    pub fn current() -> Self {
        read_defaults()
    }
    /// Replaces both process-wide defaults at once.
    pub fn install(self) {
        write_defaults(|defaults| *defaults = self);
        info!(
            marshal_unset = ?self.marshal_unset,
            scan_null = ?self.scan_null,
            "installed default policies"
        );
    }
    pub fn with_marshal_unset(mut self, marshal_unset: MarshalUnset) -> Self {
        self.marshal_unset = marshal_unset;
        self
    }
    pub fn with_scan_null(mut self, scan_null: ScanNull) -> Self {
        self.scan_null = scan_null;
        self
    }
    /// Reads policies from TOML text. Keys left out keep their default.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
    /// Reads policies from a config file, format inferred from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
    /// Reads `PRESENCE_MARSHAL_UNSET` and `PRESENCE_SCAN_NULL`.
    pub fn from_env() -> Result<Self> {
        let settings = Config::builder()
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

pub fn default_marshal_unset() -> MarshalUnset {
    read_defaults().marshal_unset
}

pub fn set_default_marshal_unset(marshal_unset: MarshalUnset) {
    write_defaults(|defaults| defaults.marshal_unset = marshal_unset);
    info!(?marshal_unset, "default marshal unset policy changed");
}

pub fn default_scan_null() -> ScanNull {
    read_defaults().scan_null
}

pub fn set_default_scan_null(scan_null: ScanNull) {
    write_defaults(|defaults| defaults.scan_null = scan_null);
    info!(?scan_null, "default scan null policy changed");
}

//! Persisted link configuration.
//!
//! Implements [`ConfigPort`] with one postcard blob, `linkcfg`, in the
//! `feedercam` namespace of the default NVS partition.  Host builds keep
//! the blob in a `RefCell` so the same encode/validate path runs in tests.

use core::cell::RefCell;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::LinkConfig;
use log::{info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

const NAMESPACE: &str = "feedercam";
const KEY: &str = "linkcfg";

/// Largest blob `load` will read back.
const MAX_BLOB_SIZE: usize = 512;

#[cfg(target_os = "espidf")]
type Backend = EspNvs<NvsDefault>;

/// Stand-in for the NVS namespace on host builds.
#[cfg(not(target_os = "espidf"))]
type Backend = Option<Vec<u8>>;

pub struct NvsAdapter {
    backend: RefCell<Backend>,
}

impl NvsAdapter {
    /// Take the default partition and open the namespace read-write.
    /// ESP-IDF erases and re-initialises a partition with no free pages.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Result<Self, ConfigError> {
        let partition = EspDefaultNvsPartition::take().map_err(|e| {
            warn!("NVS: default partition unavailable: {}", e);
            ConfigError::IoError
        })?;
        let nvs = EspNvs::new(partition, NAMESPACE, true).map_err(|e| {
            warn!("NVS: cannot open '{}': {}", NAMESPACE, e);
            ConfigError::IoError
        })?;
        info!("NVS: namespace '{}' open", NAMESPACE);
        Ok(Self {
            backend: RefCell::new(nvs),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self, ConfigError> {
        info!("NVS: in-memory backend");
        Ok(Self {
            backend: RefCell::new(None),
        })
    }

    /// Overwrite the stored blob.  Host builds only; lets tests plant a
    /// damaged record.
    #[cfg(not(target_os = "espidf"))]
    pub fn put_raw(&self, bytes: &[u8]) {
        *self.backend.borrow_mut() = Some(bytes.to_vec());
    }

    /// Raw blob, `None` when nothing was ever saved.
    #[cfg(target_os = "espidf")]
    fn read_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        let mut buf = [0u8; MAX_BLOB_SIZE];
        let nvs = self.backend.borrow();
        match nvs.get_blob(KEY, &mut buf) {
            Ok(found) => Ok(found.map(<[u8]>::to_vec)),
            Err(e) => {
                warn!("NVS: read of '{}' failed: {}", KEY, e);
                Err(ConfigError::IoError)
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        let blob = self.backend.borrow().clone();
        if blob.as_ref().is_some_and(|b| b.len() > MAX_BLOB_SIZE) {
            return Err(ConfigError::IoError);
        }
        Ok(blob)
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&self, bytes: &[u8]) -> Result<(), ConfigError> {
        use esp_idf_svc::sys::ESP_ERR_NVS_NOT_ENOUGH_SPACE;

        self.backend
            .borrow_mut()
            .set_blob(KEY, bytes)
            .map_err(|e| {
                if e.code() == ESP_ERR_NVS_NOT_ENOUGH_SPACE as i32 {
                    ConfigError::StorageFull
                } else {
                    warn!("NVS: write of '{}' failed: {}", KEY, e);
                    ConfigError::IoError
                }
            })
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&self, bytes: &[u8]) -> Result<(), ConfigError> {
        *self.backend.borrow_mut() = Some(bytes.to_vec());
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> Result<LinkConfig, ConfigError> {
    let cfg: LinkConfig = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
    // An older firmware may have stored values the current ranges reject.
    cfg.validate().map_err(|e| {
        warn!("NVS: stored config invalid: {}", e);
        ConfigError::Corrupted
    })?;
    Ok(cfg)
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<LinkConfig, ConfigError> {
        match self.read_blob()? {
            Some(bytes) => {
                let cfg = decode(&bytes)?;
                info!("NVS: loaded link config ({} bytes)", bytes.len());
                Ok(cfg)
            }
            None => {
                info!("NVS: no stored link config, using defaults");
                Ok(LinkConfig::default())
            }
        }
    }

    fn save(&self, config: &LinkConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.write_blob(&bytes)?;
        info!("NVS: link config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

//! # Credential Files
//!
//! Writes the bundle issued by the registry into the run's key directory:
//! - `<id>.public.key`
//! - `<id>.private.key` (owner read/write only)
//! - `<id>.cert.pem`
//! - `<id>.txt` holding the identifier itself
//!
//! The directory is created fresh for every run. A directory left over from
//! an earlier run is an error, never silently reused.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use shared::{
    constants::{CERTIFICATE_SUFFIX, IDENTIFIER_SUFFIX, PRIVATE_KEY_SUFFIX, PUBLIC_KEY_SUFFIX},
    error::{ProvisionError, ProvisionResult},
    types::{CredentialBundle, DeviceId},
};

/// Paths of the files written for one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialFiles {
    pub public_key: PathBuf,
    pub private_key: PathBuf,
    pub certificate: PathBuf,
    pub identifier: PathBuf,
}

impl CredentialFiles {
    /// File layout for `device_id` inside `dir`
    pub fn for_device(dir: &Path, device_id: &DeviceId) -> Self {
        let file = |suffix: &str| dir.join(format!("{}{}", device_id, suffix));
        Self {
            public_key: file(PUBLIC_KEY_SUFFIX),
            private_key: file(PRIVATE_KEY_SUFFIX),
            certificate: file(CERTIFICATE_SUFFIX),
            identifier: file(IDENTIFIER_SUFFIX),
        }
    }
}

/// Credential material read back from disk
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub device_id: DeviceId,
    pub certificate_pem: String,
    pub public_key: String,
    pub files: CredentialFiles,
}

/// Key directory of a provisioning run
pub struct CredentialStore {
    /// Path to the key directory
    dir: PathBuf,
}

impl CredentialStore {
    /// Create the key directory; fails if it already exists
    pub async fn create(dir: impl Into<PathBuf>) -> ProvisionResult<Self> {
        let dir = dir.into();

        match tokio::fs::create_dir(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ProvisionError::KeyDirectoryExists(dir));
            }
            Err(e) => return Err(e.into()),
        }

        info!(path = ?dir, "Created key directory");
        Ok(Self { dir })
    }

    /// Open an existing key directory
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the bundle's files for `device_id`
    pub async fn write_bundle(
        &self,
        device_id: &DeviceId,
        bundle: &CredentialBundle,
    ) -> ProvisionResult<CredentialFiles> {
        let files = CredentialFiles::for_device(&self.dir, device_id);

        tokio::fs::write(&files.public_key, &bundle.public_key).await?;

        tokio::fs::write(&files.private_key, &bundle.private_key).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&files.private_key, perms).await?;
        }

        tokio::fs::write(&files.certificate, &bundle.certificate_pem).await?;
        tokio::fs::write(&files.identifier, device_id.as_str()).await?;

        debug!(
            device_id = %device_id,
            certificate_id = %bundle.certificate_id,
            path = ?self.dir,
            "Credential files written"
        );
        Ok(files)
    }

    /// Read back the public material stored for `device_id`
    pub async fn load(&self, device_id: &DeviceId) -> ProvisionResult<StoredCredentials> {
        let files = CredentialFiles::for_device(&self.dir, device_id);

        let stored_id = tokio::fs::read_to_string(&files.identifier).await?;
        if stored_id.trim() != device_id.as_str() {
            return Err(ProvisionError::StorageIOError(format!(
                "{} holds identifier '{}', expected '{}'",
                files.identifier.display(),
                stored_id.trim(),
                device_id
            )));
        }

        let certificate_pem = tokio::fs::read_to_string(&files.certificate).await?;
        let public_key = tokio::fs::read_to_string(&files.public_key).await?;

        Ok(StoredCredentials {
            device_id: device_id.clone(),
            certificate_pem,
            public_key,
            files,
        })
    }

    /// Remove the key directory and everything in it
    pub async fn remove(self) -> ProvisionResult<()> {
        tokio::fs::remove_dir_all(&self.dir).await?;
        info!(path = ?self.dir, "Key directory removed");
        Ok(())
    }
}

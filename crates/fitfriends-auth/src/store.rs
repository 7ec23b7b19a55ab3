//! Token pair persistence
//!
//! Holds the access/refresh pair for one session. The file-backed variant
//! writes a small JSON object keyed by `ACCESS_TOKEN_KEY` and
//! `REFRESH_TOKEN_KEY`, always via temp-file + rename so a crash never leaves
//! half a pair on disk. A tokio Mutex serializes saves; the last write wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use common::Secret;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::error::{Error, Result};

/// Access and refresh token issued together by the auth endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPair {
    pub access: Secret<String>,
    pub refresh: Secret<String>,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: Secret::new(access.into()),
            refresh: Secret::new(refresh.into()),
        }
    }
}

/// On-disk layout: a flat object keyed by the storage keys. Either key may be
/// absent and unknown keys are ignored.
type TokenFile = BTreeMap<String, String>;

#[derive(Default)]
struct Slots {
    access: Option<Secret<String>>,
    refresh: Option<Secret<String>>,
}

/// Session token storage.
///
/// `path` is `None` for in-memory stores; every mutation of a file-backed
/// store is persisted before the call returns.
pub struct TokenStore {
    path: Option<PathBuf>,
    slots: Mutex<Slots>,
}

impl TokenStore {
    /// Store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            slots: Mutex::new(Slots::default()),
        }
    }

    /// Load tokens from `path`.
    ///
    /// A missing file is a cold start: the parent directory and an empty
    /// token file are created so later saves only need the rename.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let slots = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading token file: {e}")))?;
            let mut file: TokenFile = serde_json::from_str(&contents)
                .map_err(|e| Error::StoreParse(format!("parsing token file: {e}")))?;
            let slots = Slots {
                access: file.remove(ACCESS_TOKEN_KEY).map(Secret::new),
                refresh: file.remove(REFRESH_TOKEN_KEY).map(Secret::new),
            };
            info!(
                path = %path.display(),
                has_access = slots.access.is_some(),
                has_refresh = slots.refresh.is_some(),
                "loaded token file"
            );
            slots
        } else {
            info!(path = %path.display(), "token file not found, starting signed out");
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|e| Error::Io(format!("creating token directory: {e}")))?;
            }
            let slots = Slots::default();
            write_atomic(&path, &slots).await?;
            slots
        };

        Ok(Self {
            path: Some(path),
            slots: Mutex::new(slots),
        })
    }

    /// Replace both tokens and persist them.
    pub async fn save(&self, access: String, refresh: String) -> Result<()> {
        let mut slots = self.slots.lock().await;
        slots.access = Some(Secret::new(access));
        slots.refresh = Some(Secret::new(refresh));
        debug!("saved token pair");
        self.persist(&slots).await
    }

    /// Current access token, if any.
    pub async fn access(&self) -> Option<Secret<String>> {
        self.slots.lock().await.access.clone()
    }

    /// Current refresh token, if any.
    pub async fn refresh(&self) -> Option<Secret<String>> {
        self.slots.lock().await.refresh.clone()
    }

    /// Both tokens, when both are present.
    pub async fn pair(&self) -> Option<TokenPair> {
        let slots = self.slots.lock().await;
        match (&slots.access, &slots.refresh) {
            (Some(access), Some(refresh)) => Some(TokenPair {
                access: access.clone(),
                refresh: refresh.clone(),
            }),
            _ => None,
        }
    }

    /// Whether any token is held.
    pub async fn has_tokens(&self) -> bool {
        let slots = self.slots.lock().await;
        slots.access.is_some() || slots.refresh.is_some()
    }

    /// Forget both tokens.
    pub async fn drop_tokens(&self) -> Result<()> {
        let mut slots = self.slots.lock().await;
        slots.access = None;
        slots.refresh = None;
        debug!("dropped token pair");
        self.persist(&slots).await
    }

    /// Backing file, if this store is file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self, slots: &Slots) -> Result<()> {
        match &self.path {
            Some(path) => write_atomic(path, slots).await,
            None => Ok(()),
        }
    }
}

/// Write the token file atomically with owner-only permissions.
async fn write_atomic(path: &Path, slots: &Slots) -> Result<()> {
    let mut file = TokenFile::new();
    if let Some(access) = &slots.access {
        file.insert(ACCESS_TOKEN_KEY.to_owned(), access.as_str().to_owned());
    }
    if let Some(refresh) = &slots.refresh {
        file.insert(REFRESH_TOKEN_KEY.to_owned(), refresh.as_str().to_owned());
    }
    let json = serde_json::to_string_pretty(&file)
        .map_err(|e| Error::StoreParse(format!("serializing tokens: {e}")))?;

    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let tmp_path = dir.join(format!(".tokens.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting token file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp token file: {e}")))?;

    debug!(path = %path.display(), "persisted tokens");
    Ok(())
}

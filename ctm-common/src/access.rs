//! View/edit access gate
//!
//! `view` reads the published snapshot. `edit` reads and writes the editable
//! store and is bound to the curriculum whose edit password unlocked it.

use crate::db::{curricula, Curriculum};
use crate::mirror::{Mirror, StoreKind};
use crate::password::verify_password;
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Mode requested on the selection form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedMode {
    View,
    Edit,
}

impl FromStr for RequestedMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "view" => Ok(RequestedMode::View),
            "edit" => Ok(RequestedMode::Edit),
            other => Err(Error::invalid(format!("Unknown mode '{}'", other))),
        }
    }
}

/// Per-session access mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    #[default]
    View,
    Edit {
        curriculum_id: i64,
    },
}

impl AccessMode {
    /// Whether requests for `curriculum_id` may write
    pub fn can_edit(&self, curriculum_id: i64) -> bool {
        matches!(self, AccessMode::Edit { curriculum_id: id } if *id == curriculum_id)
    }

    /// Store that requests for `curriculum_id` read from
    pub fn store_for(&self, curriculum_id: i64) -> StoreKind {
        if self.can_edit(curriculum_id) {
            StoreKind::Editable
        } else {
            StoreKind::Snapshot
        }
    }

    /// `"edit"` or `"view"` as seen by one curriculum's pages
    pub fn label_for(&self, curriculum_id: i64) -> &'static str {
        if self.can_edit(curriculum_id) {
            "edit"
        } else {
            "view"
        }
    }

    /// Fail with [`Error::Forbidden`] unless in edit mode for `curriculum_id`
    pub fn require_edit(&self, curriculum_id: i64) -> Result<()> {
        if self.can_edit(curriculum_id) {
            Ok(())
        } else {
            Err(Error::Forbidden("Edit mode is required for this action".to_string()))
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::View => f.write_str("view"),
            AccessMode::Edit { curriculum_id } => write!(f, "edit({})", curriculum_id),
        }
    }
}

/// Compute the mode a selection-form submission leads to
///
/// The edit password is checked against the snapshot copy of the curriculum,
/// or the editable copy when it has never been promoted. A wrong password is
/// [`Error::Forbidden`] and the caller keeps its prior mode.
pub async fn transition(
    mirror: &Mirror,
    curriculum_id: i64,
    requested: RequestedMode,
    password: &str,
) -> Result<AccessMode> {
    let curriculum = lookup_curriculum(mirror, curriculum_id).await?;

    match requested {
        RequestedMode::View => Ok(AccessMode::View),
        RequestedMode::Edit => {
            if check_password(curriculum.edit_password, password).await? {
                info!("Edit mode unlocked for curriculum {}", curriculum_id);
                Ok(AccessMode::Edit { curriculum_id })
            } else {
                warn!("Rejected edit password for curriculum {}", curriculum_id);
                Err(Error::Forbidden("Incorrect password".to_string()))
            }
        }
    }
}

/// Check the CLO password of a curriculum
pub async fn verify_clo_password(mirror: &Mirror, curriculum_id: i64, password: &str) -> Result<bool> {
    let curriculum = lookup_curriculum(mirror, curriculum_id).await?;
    if curriculum.clo_edit_password.is_empty() || password.trim().is_empty() {
        return Ok(false);
    }
    check_password(curriculum.clo_edit_password, password).await
}

/// Verify on the blocking pool
async fn check_password(stored: String, submitted: &str) -> Result<bool> {
    let submitted = submitted.to_string();
    tokio::task::spawn_blocking(move || verify_password(&stored, &submitted))
        .await
        .map_err(|e| Error::Internal(format!("Password check failed: {}", e)))
}

/// Snapshot copy of a curriculum, or the editable copy when never promoted
async fn lookup_curriculum(mirror: &Mirror, curriculum_id: i64) -> Result<Curriculum> {
    let published = {
        let mut conn = mirror.pool(StoreKind::Snapshot).acquire().await?;
        curricula::get(&mut conn, curriculum_id).await?
    };
    match published {
        Some(c) => Ok(c),
        None => {
            let mut conn = mirror.pool(StoreKind::Editable).acquire().await?;
            curricula::require(&mut conn, curriculum_id).await
        }
    }
}

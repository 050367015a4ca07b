//! Editable store and published snapshot
//!
//! [`Mirror`] owns one pool per store and names the target of every access.
//! `promote` copies one curriculum from the editable store to the snapshot and
//! `restore` copies it back. Each job runs as a single transaction on the
//! target store, so a failure leaves the target untouched.
//!
//! Primary keys are copied verbatim in both directions. Because every table
//! uses `AUTOINCREMENT`, ids handed out by the editable store are never reused
//! and explicit key copies cannot collide.

use crate::db::{self, clos, courses, credit_rows, curricula, ksec, ylo};
use crate::db::{Clo, CloSummary, Course, CreditRow, Curriculum, KsecItem, YloEntry};
use crate::{Error, Result};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Which copy of the record store an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// `real.sqlite3`, written by edit-mode requests
    Editable,
    /// `example.sqlite3`, read by view-mode requests
    Snapshot,
}

impl StoreKind {
    pub fn name(self) -> &'static str {
        match self {
            StoreKind::Editable => "real",
            StoreKind::Snapshot => "example",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "real" => Some(StoreKind::Editable),
            "example" => Some(StoreKind::Snapshot),
            _ => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            StoreKind::Editable => StoreKind::Snapshot,
            StoreKind::Snapshot => StoreKind::Editable,
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Direction of a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Editable to snapshot
    Promote,
    /// Snapshot to editable
    Restore,
}

impl SyncDirection {
    pub fn source(self) -> StoreKind {
        match self {
            SyncDirection::Promote => StoreKind::Editable,
            SyncDirection::Restore => StoreKind::Snapshot,
        }
    }

    pub fn target(self) -> StoreKind {
        self.source().other()
    }
}

/// Row counts written by one sync job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub curriculum_id: i64,
    pub direction: SyncDirection,
    pub revision: i64,
    pub credit_rows: usize,
    pub courses: usize,
    pub ksec_items: usize,
    pub ylo_entries: usize,
    pub clos: usize,
    pub clo_summaries: usize,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "curriculum {} {} -> {}: {} credit rows, {} courses, {} K/S/E/C items, \
             {} YLO entries, {} CLOs, {} CLO summaries (revision {})",
            self.curriculum_id,
            self.direction.source(),
            self.direction.target(),
            self.credit_rows,
            self.courses,
            self.ksec_items,
            self.ylo_entries,
            self.clos,
            self.clo_summaries,
            self.revision
        )
    }
}

/// Everything belonging to one curriculum in one store
#[derive(Debug, Clone, PartialEq)]
pub struct CurriculumBundle {
    pub curriculum: Curriculum,
    pub credit_rows: Vec<CreditRow>,
    pub courses: Vec<Course>,
    pub ksec_items: Vec<KsecItem>,
    pub ylo_entries: Vec<YloEntry>,
    pub clos: Vec<Clo>,
    pub clo_summaries: Vec<CloSummary>,
}

impl CurriculumBundle {
    /// Read a curriculum and all of its dependent rows
    pub async fn load(conn: &mut SqliteConnection, curriculum_id: i64) -> Result<Self> {
        let curriculum = curricula::require(conn, curriculum_id).await?;
        Ok(Self {
            curriculum,
            credit_rows: credit_rows::list(conn, curriculum_id).await?,
            courses: courses::list(conn, curriculum_id).await?,
            ksec_items: ksec::list(conn, curriculum_id).await?,
            ylo_entries: ylo::list(conn, curriculum_id).await?,
            clos: clos::list_for_curriculum(conn, curriculum_id).await?,
            clo_summaries: clos::list_summaries(conn, curriculum_id).await?,
        })
    }
}

/// Delete every dependent row of a curriculum, children first
pub async fn clear_curriculum(conn: &mut SqliteConnection, curriculum_id: i64) -> Result<()> {
    clos::delete_summaries_for_curriculum(conn, curriculum_id).await?;
    clos::delete_for_curriculum(conn, curriculum_id).await?;
    ksec::delete_all(conn, curriculum_id).await?;
    ylo::delete_all(conn, curriculum_id).await?;
    courses::delete_all(conn, curriculum_id).await?;
    credit_rows::delete_all(conn, curriculum_id).await?;
    Ok(())
}

/// The pair of stores
#[derive(Debug, Clone)]
pub struct Mirror {
    editable: SqlitePool,
    snapshot: SqlitePool,
    editable_path: PathBuf,
    snapshot_path: PathBuf,
}

impl Mirror {
    /// Open (creating if needed) both store files and apply the schema
    pub async fn open(editable_path: &Path, snapshot_path: &Path) -> Result<Self> {
        let editable = db::init_database(editable_path).await?;
        let snapshot = db::init_database(snapshot_path).await?;
        Ok(Self {
            editable,
            snapshot,
            editable_path: editable_path.to_path_buf(),
            snapshot_path: snapshot_path.to_path_buf(),
        })
    }

    pub fn pool(&self, kind: StoreKind) -> &SqlitePool {
        match kind {
            StoreKind::Editable => &self.editable,
            StoreKind::Snapshot => &self.snapshot,
        }
    }

    pub fn path(&self, kind: StoreKind) -> &Path {
        match kind {
            StoreKind::Editable => &self.editable_path,
            StoreKind::Snapshot => &self.snapshot_path,
        }
    }

    /// Copy one curriculum from the editable store to the snapshot
    pub async fn promote(&self, curriculum_id: i64) -> Result<SyncReport> {
        self.sync(curriculum_id, SyncDirection::Promote).await
    }

    /// Copy one curriculum from the snapshot back over the editable store
    pub async fn restore(&self, curriculum_id: i64) -> Result<SyncReport> {
        self.sync(curriculum_id, SyncDirection::Restore).await
    }

    /// Promote every curriculum of the editable store
    pub async fn promote_all(&self) -> Result<Vec<SyncReport>> {
        let ids: Vec<i64> = {
            let mut conn = self.editable.acquire().await?;
            curricula::list(&mut conn).await?.into_iter().map(|c| c.id).collect()
        };
        let mut reports = Vec::with_capacity(ids.len());
        for id in ids {
            reports.push(self.promote(id).await?);
        }
        Ok(reports)
    }

    /// Whether the snapshot is behind the editable store for a curriculum
    ///
    /// True when the snapshot lacks the curriculum or the revision counters
    /// differ.
    pub async fn needs_promote(&self, curriculum_id: i64) -> Result<bool> {
        let editable = {
            let mut conn = self.editable.acquire().await?;
            curricula::require(&mut conn, curriculum_id).await?
        };
        let snapshot = {
            let mut conn = self.snapshot.acquire().await?;
            curricula::get(&mut conn, curriculum_id).await?
        };
        Ok(match snapshot {
            Some(published) => published.revision != editable.revision,
            None => true,
        })
    }

    /// Fold the WAL of a store into its main file so the file is complete on disk
    pub async fn checkpoint(&self, kind: StoreKind) -> Result<()> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(self.pool(kind))
            .await?;
        Ok(())
    }

    async fn sync(&self, curriculum_id: i64, direction: SyncDirection) -> Result<SyncReport> {
        let source = direction.source();
        let target = direction.target();

        let bundle = {
            let mut conn = self.pool(source).acquire().await?;
            match CurriculumBundle::load(&mut conn, curriculum_id).await {
                Err(Error::NotFound(_)) => {
                    return Err(Error::not_found(format!(
                        "Curriculum {} in the {} database",
                        curriculum_id, source
                    )))
                }
                other => other?,
            }
        };

        let mut tx = self.pool(target).begin().await?;
        let report = write_bundle(&mut tx, &bundle, direction).await?;
        tx.commit().await?;

        info!("Sync complete: {}", report);
        Ok(report)
    }
}

/// Replace the target's copy of a curriculum with `bundle`
async fn write_bundle(
    conn: &mut SqliteConnection,
    bundle: &CurriculumBundle,
    direction: SyncDirection,
) -> Result<SyncReport> {
    let curriculum_id = bundle.curriculum.id;

    clear_curriculum(conn, curriculum_id).await?;

    match direction {
        SyncDirection::Promote => curricula::upsert(conn, &bundle.curriculum).await?,
        SyncDirection::Restore => {
            curricula::delete(conn, curriculum_id).await?;
            curricula::insert_with_id(conn, &bundle.curriculum).await?;
        }
    }

    let mut row_ids: HashMap<i64, i64> = HashMap::with_capacity(bundle.credit_rows.len());
    for row in &bundle.credit_rows {
        credit_rows::insert_with_id(conn, row).await?;
        row_ids.insert(row.id, row.id);
    }

    for course in &bundle.courses {
        let mut copy = course.clone();
        copy.credit_row_id = course
            .credit_row_id
            .and_then(|old| row_ids.get(&old).copied());
        if course.credit_row_id.is_some() && copy.credit_row_id.is_none() {
            debug!(
                "Course {} points at unknown credit row {:?}; link dropped",
                course.id, course.credit_row_id
            );
        }
        courses::insert_with_id(conn, &copy).await?;
    }

    for item in &bundle.ksec_items {
        ksec::insert_with_id(conn, item).await?;
    }
    for entry in &bundle.ylo_entries {
        ylo::insert_with_id(conn, entry).await?;
    }

    let course_ids: Vec<i64> = bundle.courses.iter().map(|c| c.id).collect();
    let mut clo_count = 0;
    for clo in bundle.clos.iter().filter(|c| course_ids.contains(&c.course_id)) {
        clos::insert_with_id(conn, clo).await?;
        clo_count += 1;
    }
    let mut summary_count = 0;
    for summary in bundle
        .clo_summaries
        .iter()
        .filter(|s| course_ids.contains(&s.course_id))
    {
        clos::insert_summary_with_id(conn, summary).await?;
        summary_count += 1;
    }

    Ok(SyncReport {
        curriculum_id,
        direction,
        revision: bundle.curriculum.revision,
        credit_rows: bundle.credit_rows.len(),
        courses: bundle.courses.len(),
        ksec_items: bundle.ksec_items.len(),
        ylo_entries: bundle.ylo_entries.len(),
        clos: clo_count,
        clo_summaries: summary_count,
    })
}

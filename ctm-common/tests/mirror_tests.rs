//! Tests for promote/restore between the editable store and the snapshot

mod common;

use common::{add_course, add_curriculum, add_row, temp_mirror};
use ctm_common::aggregate::replace_clos;
use ctm_common::codes::{KsecCategory, KsecType};
use ctm_common::db::clos::NewClo;
use ctm_common::db::{courses, curricula, ksec, ylo, RowKind};
use ctm_common::mirror::CurriculumBundle;
use ctm_common::{Error, Mirror, StoreKind};

/// Curriculum with rows, courses, catalogue, YLO text and CLOs in the editable store
async fn populated(mirror: &Mirror) -> i64 {
    let mut conn = mirror.pool(StoreKind::Editable).acquire().await.unwrap();
    let cid = add_curriculum(&mut conn, "B.Eng Computer").await;
    let general = add_row(&mut conn, cid, RowKind::General, "Language").await;
    let core = add_row(&mut conn, cid, RowKind::Core, "Basic Engineering").await;
    add_row(&mut conn, cid, RowKind::Plo, "PLO1: Apply knowledge").await;
    add_row(&mut conn, cid, RowKind::Free, "Free Electives").await;

    add_course(&mut conn, cid, Some(general), "LA101", 1, 3, "PLO1").await;
    let course = add_course(&mut conn, cid, Some(core), "EN201", 3, 3, "PLO1").await;
    add_course(&mut conn, cid, None, "FE001", 7, 3, "").await;

    ksec::insert(&mut conn, cid, KsecType::Knowledge, KsecCategory::General, "Math", 0)
        .await
        .unwrap();
    ksec::insert(&mut conn, cid, KsecType::Skills, KsecCategory::Core, "Teamwork", 0)
        .await
        .unwrap();
    ylo::upsert(&mut conn, cid, "PLO1", 3, "Apply statics").await.unwrap();

    replace_clos(
        &mut conn,
        cid,
        course,
        &[NewClo {
            clo: "CLO1: Solve".to_string(),
            bloom: "Apply".to_string(),
            k: "GE(K)1".to_string(),
            s: "CE(S)1".to_string(),
            ..Default::default()
        }],
    )
    .await
    .unwrap();
    curricula::bump_revision(&mut conn, cid).await.unwrap();
    cid
}

async fn bundle(mirror: &Mirror, kind: StoreKind, cid: i64) -> CurriculumBundle {
    let mut conn = mirror.pool(kind).acquire().await.unwrap();
    CurriculumBundle::load(&mut conn, cid).await.unwrap()
}

#[tokio::test]
async fn test_promote_copies_everything_with_same_ids() {
    let (_dir, mirror) = temp_mirror().await;
    let cid = populated(&mirror).await;

    let report = mirror.promote(cid).await.unwrap();
    assert_eq!(report.credit_rows, 4);
    assert_eq!(report.courses, 3);
    assert_eq!(report.clos, 1);
    assert_eq!(report.clo_summaries, 1);

    let editable = bundle(&mirror, StoreKind::Editable, cid).await;
    let snapshot = bundle(&mirror, StoreKind::Snapshot, cid).await;
    assert_eq!(editable, snapshot);
}

#[tokio::test]
async fn test_promote_then_restore_round_trip() {
    let (_dir, mirror) = temp_mirror().await;
    let cid = populated(&mirror).await;
    let before = bundle(&mirror, StoreKind::Editable, cid).await;

    mirror.promote(cid).await.unwrap();
    mirror.restore(cid).await.unwrap();

    let after = bundle(&mirror, StoreKind::Editable, cid).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_promote_is_idempotent() {
    let (_dir, mirror) = temp_mirror().await;
    let cid = populated(&mirror).await;

    mirror.promote(cid).await.unwrap();
    let once = bundle(&mirror, StoreKind::Snapshot, cid).await;
    mirror.promote(cid).await.unwrap();
    let twice = bundle(&mirror, StoreKind::Snapshot, cid).await;
    assert_eq!(once, twice);
}

#[tokio::test]
async fn test_restore_discards_unpromoted_edits() {
    let (_dir, mirror) = temp_mirror().await;
    let cid = populated(&mirror).await;
    mirror.promote(cid).await.unwrap();

    {
        let mut conn = mirror.pool(StoreKind::Editable).acquire().await.unwrap();
        add_course(&mut conn, cid, None, "NEW999", 2, 3, "").await;
        curricula::rename(&mut conn, cid, "Renamed").await.unwrap();
    }

    mirror.restore(cid).await.unwrap();

    let mut conn = mirror.pool(StoreKind::Editable).acquire().await.unwrap();
    let all = courses::list(&mut conn, cid).await.unwrap();
    assert!(all.iter().all(|c| c.course_code != "NEW999"));
    assert_eq!(curricula::require(&mut conn, cid).await.unwrap().name, "B.Eng Computer");
}

#[tokio::test]
async fn test_needs_promote_follows_revision() {
    let (_dir, mirror) = temp_mirror().await;
    let cid = populated(&mirror).await;

    assert!(mirror.needs_promote(cid).await.unwrap(), "Unpublished curriculum needs promote");
    mirror.promote(cid).await.unwrap();
    assert!(!mirror.needs_promote(cid).await.unwrap());

    {
        let mut conn = mirror.pool(StoreKind::Editable).acquire().await.unwrap();
        curricula::bump_revision(&mut conn, cid).await.unwrap();
    }
    assert!(mirror.needs_promote(cid).await.unwrap());
}

#[tokio::test]
async fn test_promote_leaves_other_curricula_alone() {
    let (_dir, mirror) = temp_mirror().await;
    let first = populated(&mirror).await;
    let second = populated(&mirror).await;
    mirror.promote_all().await.unwrap();

    {
        let mut conn = mirror.pool(StoreKind::Editable).acquire().await.unwrap();
        add_course(&mut conn, first, None, "ONLY1", 1, 1, "").await;
    }
    mirror.promote(first).await.unwrap();

    let second_editable = bundle(&mirror, StoreKind::Editable, second).await;
    let second_snapshot = bundle(&mirror, StoreKind::Snapshot, second).await;
    assert_eq!(second_editable, second_snapshot);
}

#[tokio::test]
async fn test_restore_without_snapshot_copy() {
    let (_dir, mirror) = temp_mirror().await;
    let cid = populated(&mirror).await;

    let err = mirror.restore(cid).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    // Editable copy untouched
    let editable = bundle(&mirror, StoreKind::Editable, cid).await;
    assert_eq!(editable.courses.len(), 3);
}

#[tokio::test]
async fn test_failed_promote_leaves_snapshot_untouched() {
    let (_dir, mirror) = temp_mirror().await;
    let cid = populated(&mirror).await;
    mirror.promote(cid).await.unwrap();
    let published = bundle(&mirror, StoreKind::Snapshot, cid).await;

    // New editable course whose id is already taken in the snapshot by a
    // course of another curriculum
    let clashing = {
        let mut conn = mirror.pool(StoreKind::Editable).acquire().await.unwrap();
        curricula::rename(&mut conn, cid, "Renamed").await.unwrap();
        let id = add_course(&mut conn, cid, None, "NEW100", 2, 3, "").await;
        curricula::bump_revision(&mut conn, cid).await.unwrap();
        courses::get(&mut conn, cid, id).await.unwrap().unwrap()
    };
    let other_cid = {
        let mut conn = mirror.pool(StoreKind::Snapshot).acquire().await.unwrap();
        let other_cid = add_curriculum(&mut conn, "Other").await;
        let mut squatter = clashing.clone();
        squatter.curriculum_id = other_cid;
        squatter.course_code = "SQ001".to_string();
        courses::insert_with_id(&mut conn, &squatter).await.unwrap();
        other_cid
    };

    let err = mirror.promote(cid).await.unwrap_err();
    assert!(matches!(err, Error::Database(_)));

    assert_eq!(bundle(&mirror, StoreKind::Snapshot, cid).await, published);
    let mut conn = mirror.pool(StoreKind::Snapshot).acquire().await.unwrap();
    let survivor = courses::get(&mut conn, other_cid, clashing.id).await.unwrap().unwrap();
    assert_eq!(survivor.course_code, "SQ001");
    assert!(mirror.needs_promote(cid).await.unwrap());
}

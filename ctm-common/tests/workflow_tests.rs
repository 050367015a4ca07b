//! Course list, catalogue, study plan, CLO editor and access workflows

mod common;

use common::{add_course, add_curriculum, add_row, temp_mirror};
use ctm_common::access::{transition, verify_clo_password, RequestedMode};
use ctm_common::catalogue::{save_catalogue, ItemSubmission};
use ctm_common::clo_editor::{reset_clos, save_clos, CloDraft};
use ctm_common::codes::{KsecCategory, KsecType};
use ctm_common::course_list::{
    parse_lines, reset_course_list, save_course_list, save_study_plan, CourseKsec, CourseScope,
};
use ctm_common::credit_table::create_curriculum;
use ctm_common::db::clos::{self, NewClo};
use ctm_common::db::{courses, curricula, ksec, RowKind, FREE_ELECTIVE_CATEGORY};
use ctm_common::{AccessMode, Error, StoreKind};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_course_list_upserts_by_code() {
    let (_dir, mirror) = temp_mirror().await;
    let pool = mirror.pool(StoreKind::Editable);
    let (cid, row, stale) = {
        let mut conn = pool.acquire().await.unwrap();
        let cid = add_curriculum(&mut conn, "B.Eng").await;
        let row = add_row(&mut conn, cid, RowKind::Core, "Basic Engineering").await;
        add_course(&mut conn, cid, Some(row), "EN101", 1, 3, "PLO1").await;
        let stale = add_course(&mut conn, cid, Some(row), "EN102", 1, 3, "").await;
        (cid, row, stale)
    };

    let lines = parse_lines(
        &strings(&["EN101", "EN103", "EN101"]),
        &strings(&["Statics", "Drawing", "Duplicate"]),
        &strings(&["4", "2", "9"]),
        &strings(&["PLO2", "", ""]),
    )
    .unwrap();
    let outcome = save_course_list(pool, cid, CourseScope::Row(row), 1, &lines).await.unwrap();
    assert_eq!((outcome.updated, outcome.created, outcome.deleted), (1, 1, 1));

    let mut conn = pool.acquire().await.unwrap();
    let listed = courses::list_for_row(&mut conn, cid, row, 1).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].course_code, "EN101");
    assert_eq!(listed[0].course_name, "Statics");
    assert_eq!(listed[0].credits, 4);
    assert_eq!(listed[0].plo, "PLO2");
    assert_eq!(listed[1].course_code, "EN103");
    assert!(courses::get(&mut conn, cid, stale).await.unwrap().is_none());
}

#[tokio::test]
async fn test_free_elective_scope() {
    let (_dir, mirror) = temp_mirror().await;
    let pool = mirror.pool(StoreKind::Editable);
    let cid = {
        let mut conn = pool.acquire().await.unwrap();
        add_curriculum(&mut conn, "B.Eng").await
    };

    let lines = parse_lines(&strings(&["FE001"]), &strings(&["Music"]), &strings(&["3"]), &[]).unwrap();
    save_course_list(pool, cid, CourseScope::FreeElective, 7, &lines).await.unwrap();

    {
        let mut conn = pool.acquire().await.unwrap();
        let listed = courses::list_free_electives(&mut conn, cid, 7).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].category, FREE_ELECTIVE_CATEGORY);
        assert_eq!(listed[0].credit_row_id, None);
    }

    let deleted = reset_course_list(pool, cid, CourseScope::FreeElective, 7).await.unwrap();
    assert_eq!(deleted, 1);
}

#[tokio::test]
async fn test_course_list_rejects_bad_scope_and_semester() {
    let (_dir, mirror) = temp_mirror().await;
    let pool = mirror.pool(StoreKind::Editable);
    let cid = {
        let mut conn = pool.acquire().await.unwrap();
        add_curriculum(&mut conn, "B.Eng").await
    };
    let lines = parse_lines(&strings(&["X1"]), &[], &[], &[]).unwrap();

    let err = save_course_list(pool, cid, CourseScope::Row(404), 1, &lines).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    let err = save_course_list(pool, cid, CourseScope::FreeElective, 9, &lines).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_study_plan_ignores_other_semesters() {
    let (_dir, mirror) = temp_mirror().await;
    let pool = mirror.pool(StoreKind::Editable);
    let (cid, here, elsewhere) = {
        let mut conn = pool.acquire().await.unwrap();
        let cid = add_curriculum(&mut conn, "B.Eng").await;
        let here = add_course(&mut conn, cid, None, "A1", 3, 3, "").await;
        let elsewhere = add_course(&mut conn, cid, None, "B1", 4, 3, "").await;
        (cid, here, elsewhere)
    };

    let updates = vec![
        CourseKsec::parse(here, "ge(k)1, CE(K)2", "GE(S)1", "", "CE(C)1").unwrap(),
        CourseKsec::parse(elsewhere, "GE(K)1", "", "", "").unwrap(),
    ];
    let saved = save_study_plan(pool, cid, 3, &updates).await.unwrap();
    assert_eq!(saved, 1);

    let mut conn = pool.acquire().await.unwrap();
    let course = courses::require(&mut conn, cid, here).await.unwrap();
    assert_eq!(course.knowledge, "GE(K)1, CE(K)2");
    assert_eq!(course.character, "CE(C)1");
    assert_eq!(courses::require(&mut conn, cid, elsewhere).await.unwrap().knowledge, "");
}

#[tokio::test]
async fn test_catalogue_save_renumbers_per_category() {
    let (_dir, mirror) = temp_mirror().await;
    let pool = mirror.pool(StoreKind::Editable);
    let (cid, kept, dropped) = {
        let mut conn = pool.acquire().await.unwrap();
        let cid = add_curriculum(&mut conn, "B.Eng").await;
        let kept = ksec::insert(&mut conn, cid, KsecType::Knowledge, KsecCategory::General, "Math", 0)
            .await
            .unwrap();
        let dropped = ksec::insert(&mut conn, cid, KsecType::Knowledge, KsecCategory::General, "Old", 1)
            .await
            .unwrap();
        ksec::insert(&mut conn, cid, KsecType::Skills, KsecCategory::Core, "Lab work", 0)
            .await
            .unwrap();
        (cid, kept, dropped)
    };

    let items = vec![
        ItemSubmission {
            id: None,
            category: KsecCategory::Core,
            description: "Thermodynamics".to_string(),
        },
        ItemSubmission {
            id: Some(kept),
            category: KsecCategory::General,
            description: "Mathematics".to_string(),
        },
        ItemSubmission {
            id: None,
            category: KsecCategory::General,
            description: "Physics".to_string(),
        },
    ];
    let outcome = save_catalogue(pool, cid, KsecType::Knowledge, &items).await.unwrap();
    assert_eq!((outcome.updated, outcome.created, outcome.deleted), (1, 2, 1));

    let mut conn = pool.acquire().await.unwrap();
    let codes: Vec<String> = ksec::catalogue(&mut conn, cid, KsecType::Knowledge)
        .await
        .unwrap()
        .into_iter()
        .map(|(code, desc)| format!("{} {}", code, desc))
        .collect();
    assert_eq!(codes, vec!["GE(K)1 Mathematics", "GE(K)2 Physics", "CE(K)1 Thermodynamics"]);
    assert!(ksec::get(&mut conn, cid, dropped).await.unwrap().is_none());
    assert_eq!(ksec::list_type(&mut conn, cid, KsecType::Skills).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_save_clos_writes_both_stores() {
    let (_dir, mirror) = temp_mirror().await;
    let (cid, course) = {
        let mut conn = mirror.pool(StoreKind::Editable).acquire().await.unwrap();
        let cid = add_curriculum(&mut conn, "B.Eng").await;
        for (desc, order) in [("A", 0), ("B", 1)] {
            ksec::insert(&mut conn, cid, KsecType::Knowledge, KsecCategory::General, desc, order)
                .await
                .unwrap();
        }
        let course = add_course(&mut conn, cid, None, "EN101", 1, 3, "PLO1").await;
        (cid, course)
    };
    mirror.promote(cid).await.unwrap();

    let draft = CloDraft {
        lines: vec![
            NewClo {
                clo: "CLO1: Explain".to_string(),
                bloom: "Understand".to_string(),
                k: "GE(K)1".to_string(),
                ..Default::default()
            },
            NewClo {
                clo: "CLO2: Build".to_string(),
                bloom: "Create".to_string(),
                ..Default::default()
            },
        ],
        description: "Statics and dynamics".to_string(),
    };
    let figures = save_clos(&mirror, cid, course, &draft).await.unwrap();
    assert_eq!(figures.bloom_score, 6);
    assert_eq!(figures.k_percent, 50.0);

    for kind in [StoreKind::Editable, StoreKind::Snapshot] {
        let mut conn = mirror.pool(kind).acquire().await.unwrap();
        let stored = clos::list_for_course(&mut conn, course).await.unwrap();
        assert_eq!(stored.len(), 2, "{} store", kind);
        assert_eq!(stored[1].clo_index, 2);
        let summary = clos::get_summary(&mut conn, course).await.unwrap().unwrap();
        assert_eq!(summary.bloom_score, 6);
        let described = courses::require(&mut conn, cid, course).await.unwrap();
        assert_eq!(described.description, "Statics and dynamics");
    }
    assert!(!mirror.needs_promote(cid).await.unwrap());

    reset_clos(&mirror, cid, course).await.unwrap();
    for kind in [StoreKind::Editable, StoreKind::Snapshot] {
        let mut conn = mirror.pool(kind).acquire().await.unwrap();
        assert!(clos::list_for_course(&mut conn, course).await.unwrap().is_empty());
        assert!(clos::get_summary(&mut conn, course).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_save_clos_keeps_ids_equal_across_stores() {
    let (_dir, mirror) = temp_mirror().await;
    let (cid, course) = {
        let mut conn = mirror.pool(StoreKind::Editable).acquire().await.unwrap();
        let cid = add_curriculum(&mut conn, "B.Eng").await;
        let course = add_course(&mut conn, cid, None, "EN101", 1, 3, "PLO1").await;
        (cid, course)
    };
    mirror.promote(cid).await.unwrap();

    // Advance the editable CLO sequence without touching the snapshot
    {
        let mut conn = mirror.pool(StoreKind::Editable).acquire().await.unwrap();
        for i in 1..=3 {
            clos::insert(&mut conn, course, i, &NewClo::default()).await.unwrap();
        }
        clos::delete_for_course(&mut conn, course).await.unwrap();
    }

    let draft = CloDraft {
        lines: vec![NewClo {
            clo: "CLO1: Explain".to_string(),
            bloom: "Understand".to_string(),
            ..Default::default()
        }],
        description: String::new(),
    };
    save_clos(&mirror, cid, course, &draft).await.unwrap();

    let (editable, editable_summary) = {
        let mut conn = mirror.pool(StoreKind::Editable).acquire().await.unwrap();
        (
            clos::list_for_course(&mut conn, course).await.unwrap(),
            clos::get_summary(&mut conn, course).await.unwrap(),
        )
    };
    let mut conn = mirror.pool(StoreKind::Snapshot).acquire().await.unwrap();
    assert_eq!(editable[0].id, 4);
    assert_eq!(clos::list_for_course(&mut conn, course).await.unwrap(), editable);
    assert_eq!(clos::get_summary(&mut conn, course).await.unwrap(), editable_summary);
}

#[tokio::test]
async fn test_save_clos_needs_course_in_snapshot() {
    let (_dir, mirror) = temp_mirror().await;
    let (cid, course) = {
        let mut conn = mirror.pool(StoreKind::Editable).acquire().await.unwrap();
        let cid = add_curriculum(&mut conn, "B.Eng").await;
        let course = add_course(&mut conn, cid, None, "EN101", 1, 3, "").await;
        (cid, course)
    };

    let err = save_clos(&mirror, cid, course, &CloDraft::default()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let mut conn = mirror.pool(StoreKind::Editable).acquire().await.unwrap();
    assert_eq!(curricula::require(&mut conn, cid).await.unwrap().revision, 0);
}

#[tokio::test]
async fn test_access_transitions() {
    let (_dir, mirror) = temp_mirror().await;
    let pool = mirror.pool(StoreKind::Editable);
    let cid = create_curriculum(pool, "B.Eng", "edit-me", "clo-me").await.unwrap();

    let mode = transition(&mirror, cid, RequestedMode::Edit, "edit-me").await.unwrap();
    assert_eq!(mode, AccessMode::Edit { curriculum_id: cid });

    let err = transition(&mirror, cid, RequestedMode::Edit, "nope").await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    let mode = transition(&mirror, cid, RequestedMode::View, "").await.unwrap();
    assert_eq!(mode, AccessMode::View);

    let err = transition(&mirror, 404, RequestedMode::View, "").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    assert!(verify_clo_password(&mirror, cid, "clo-me").await.unwrap());
    assert!(!verify_clo_password(&mirror, cid, "edit-me").await.unwrap());
}

#[tokio::test]
async fn test_empty_clo_password_never_unlocks() {
    let (_dir, mirror) = temp_mirror().await;
    let pool = mirror.pool(StoreKind::Editable);
    let cid = create_curriculum(pool, "B.Eng", "edit-me", "").await.unwrap();

    assert!(!verify_clo_password(&mirror, cid, "").await.unwrap());
    assert!(!verify_clo_password(&mirror, cid, "anything").await.unwrap());
}

#[tokio::test]
async fn test_password_checked_against_snapshot_once_promoted() {
    let (_dir, mirror) = temp_mirror().await;
    let pool = mirror.pool(StoreKind::Editable);
    let cid = create_curriculum(pool, "B.Eng", "old", "clo").await.unwrap();
    mirror.promote(cid).await.unwrap();

    {
        let mut conn = pool.acquire().await.unwrap();
        curricula::set_passwords(&mut conn, cid, "new-plain", "clo").await.unwrap();
    }

    assert!(transition(&mirror, cid, RequestedMode::Edit, "old").await.is_ok());
    assert!(transition(&mirror, cid, RequestedMode::Edit, "new-plain").await.is_err());
}

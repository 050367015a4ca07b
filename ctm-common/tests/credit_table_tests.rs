//! Tests for the credit-table bulk save and curriculum reset

mod common;

use common::{add_course, add_curriculum, add_row, temp_mirror};
use ctm_common::credit_table::{apply, create_curriculum, reset_curriculum, CreditTableSubmission};
use ctm_common::db::{courses, credit_rows, curricula, ylo, RowKind};
use ctm_common::password::verify_password;
use ctm_common::{Error, StoreKind};

fn submission(fields: &[(&str, &str)]) -> CreditTableSubmission {
    CreditTableSubmission::from_fields(fields.iter().copied()).unwrap()
}

#[tokio::test]
async fn test_free_row_upsert_never_duplicates() {
    let (_dir, mirror) = temp_mirror().await;
    let pool = mirror.pool(StoreKind::Editable);
    let cid = {
        let mut conn = pool.acquire().await.unwrap();
        add_curriculum(&mut conn, "B.Eng").await
    };

    apply(pool, cid, &submission(&[("free_credit_0", "3")])).await.unwrap();
    apply(pool, cid, &submission(&[("free_credit_0", "6"), ("free_credit_7", "1")]))
        .await
        .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    let free = credit_rows::list_kind(&mut conn, cid, RowKind::Free).await.unwrap();
    assert_eq!(free.len(), 1);
    assert_eq!(free[0].name, "Free Electives");
    assert_eq!(free[0].credits, [6, 0, 0, 0, 0, 0, 0, 1]);
}

#[tokio::test]
async fn test_update_delete_and_append() {
    let (_dir, mirror) = temp_mirror().await;
    let pool = mirror.pool(StoreKind::Editable);
    let (cid, keep, drop_me, other_kind) = {
        let mut conn = pool.acquire().await.unwrap();
        let cid = add_curriculum(&mut conn, "B.Eng").await;
        let keep = add_row(&mut conn, cid, RowKind::General, "Language").await;
        let drop_me = add_row(&mut conn, cid, RowKind::General, "Humanities").await;
        let other = add_row(&mut conn, cid, RowKind::Core, "Basic Engineering").await;
        (cid, keep, drop_me, other)
    };

    let keep_id = keep.to_string();
    let outcome = apply(
        pool,
        cid,
        &submission(&[
            ("curriculum_name", "B.Eng (2025)"),
            ("general_id_0", keep_id.as_str()),
            ("general_name_0", "Languages"),
            ("general_credit_0_0", "3"),
            ("general_name_1", "Science"),
            ("general_credit_1_1", "4"),
            ("general_name_new_0", "Integration"),
            ("general_name_new_1", ""),
        ]),
    )
    .await
    .unwrap();
    assert!(outcome.renamed);
    assert_eq!(outcome.deleted_rows, 1);
    assert_eq!(outcome.updated_rows, 1);
    assert_eq!(outcome.created_rows, 2);

    let mut conn = pool.acquire().await.unwrap();
    assert_eq!(curricula::require(&mut conn, cid).await.unwrap().name, "B.Eng (2025)");
    assert!(credit_rows::get(&mut conn, cid, drop_me).await.unwrap().is_none());
    assert!(
        credit_rows::get(&mut conn, cid, other_kind).await.unwrap().is_some(),
        "Rows of a kind with no posted ids are kept"
    );

    let general = credit_rows::list_kind(&mut conn, cid, RowKind::General).await.unwrap();
    let names: Vec<&str> = general.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Languages", "Science", "Integration"]);
    assert_eq!(general[0].credits[0], 3);
    assert_eq!(general[1].sort_order, 2);
    assert_eq!(general[2].sort_order, 3);
}

#[tokio::test]
async fn test_reorder_general_rows() {
    let (_dir, mirror) = temp_mirror().await;
    let pool = mirror.pool(StoreKind::Editable);
    let (cid, a, b) = {
        let mut conn = pool.acquire().await.unwrap();
        let cid = add_curriculum(&mut conn, "B.Eng").await;
        let a = add_row(&mut conn, cid, RowKind::General, "A").await;
        let b = add_row(&mut conn, cid, RowKind::General, "B").await;
        (cid, a, b)
    };

    let key_a = format!("general_order_{}", a);
    let key_b = format!("general_order_{}", b);
    apply(pool, cid, &submission(&[(key_a.as_str(), "2"), (key_b.as_str(), "1")]))
        .await
        .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    let general = credit_rows::list_kind(&mut conn, cid, RowKind::General).await.unwrap();
    assert_eq!(general[0].id, b);
    assert_eq!(general[1].id, a);
}

#[tokio::test]
async fn test_save_recomputes_plo_and_prunes_ylo() {
    let (_dir, mirror) = temp_mirror().await;
    let pool = mirror.pool(StoreKind::Editable);
    let (cid, plo) = {
        let mut conn = pool.acquire().await.unwrap();
        let cid = add_curriculum(&mut conn, "B.Eng").await;
        let plo = add_row(&mut conn, cid, RowKind::Plo, "PLO1: Apply").await;
        add_course(&mut conn, cid, None, "EN101", 2, 3, "PLO1").await;
        ylo::upsert(&mut conn, cid, "PLO1", 2, "kept").await.unwrap();
        ylo::upsert(&mut conn, cid, "PLO1", 6, "pruned").await.unwrap();
        (cid, plo)
    };

    let outcome = apply(pool, cid, &submission(&[])).await.unwrap();
    assert_eq!(outcome.pruned_ylo, 1);
    assert_eq!(outcome.revision, 1);

    let mut conn = pool.acquire().await.unwrap();
    let row = credit_rows::require(&mut conn, cid, plo).await.unwrap();
    assert_eq!(row.credits[1], 3);
    assert!(ylo::get(&mut conn, cid, "PLO1", 2).await.unwrap().is_some());
    assert!(ylo::get(&mut conn, cid, "PLO1", 6).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_curriculum_writes_nothing() {
    let (_dir, mirror) = temp_mirror().await;
    let pool = mirror.pool(StoreKind::Editable);
    let err = apply(pool, 99, &submission(&[("free_credit_0", "3")])).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let mut conn = pool.acquire().await.unwrap();
    assert!(credit_rows::list(&mut conn, 99).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_and_reset_curriculum() {
    let (_dir, mirror) = temp_mirror().await;
    let pool = mirror.pool(StoreKind::Editable);

    let cid = create_curriculum(pool, "B.Sc Physics", "edit-pw", "clo-pw").await.unwrap();
    {
        let mut conn = pool.acquire().await.unwrap();
        let stored = curricula::require(&mut conn, cid).await.unwrap();
        assert!(verify_password(&stored.edit_password, "edit-pw"));
        assert!(verify_password(&stored.clo_edit_password, "clo-pw"));
        assert_eq!(credit_rows::list(&mut conn, cid).await.unwrap().len(), 14);
        add_course(&mut conn, cid, None, "PH101", 1, 3, "PLO1").await;
    }

    reset_curriculum(pool, cid).await.unwrap();

    let mut conn = pool.acquire().await.unwrap();
    assert!(courses::list(&mut conn, cid).await.unwrap().is_empty());
    let rows = credit_rows::list(&mut conn, cid).await.unwrap();
    assert_eq!(rows.len(), 14);
    assert_eq!(rows.iter().filter(|r| r.row_kind == RowKind::General).count(), 7);
    assert_eq!(rows.iter().filter(|r| r.row_kind == RowKind::Core).count(), 5);
    assert_eq!(rows.iter().filter(|r| r.row_kind == RowKind::Free).count(), 1);
    assert!(rows.iter().any(|r| r.row_kind == RowKind::Plo && r.name == "PLO1:"));
}

#[tokio::test]
async fn test_clearing_a_name_keeps_the_row() {
    let (_dir, mirror) = temp_mirror().await;
    let pool = mirror.pool(StoreKind::Editable);
    let (cid, first, second) = {
        let mut conn = pool.acquire().await.unwrap();
        let cid = add_curriculum(&mut conn, "B.Eng").await;
        let first = add_row(&mut conn, cid, RowKind::Core, "Basic Science").await;
        let second = add_row(&mut conn, cid, RowKind::Core, "Basic Engineering").await;
        (cid, first, second)
    };

    let (first_id, second_id) = (first.to_string(), second.to_string());
    let outcome = apply(
        pool,
        cid,
        &submission(&[
            ("core_id_0", first_id.as_str()),
            ("core_name_0", ""),
            ("core_id_1", second_id.as_str()),
            ("core_name_1", "Basic Engineering"),
        ]),
    )
    .await
    .unwrap();
    assert_eq!(outcome.deleted_rows, 0);

    let mut conn = pool.acquire().await.unwrap();
    let core = credit_rows::list_kind(&mut conn, cid, RowKind::Core).await.unwrap();
    assert_eq!(core.len(), 2);
    let untouched = core.iter().find(|r| r.id == first).unwrap();
    assert_eq!(untouched.name, "Basic Science");
}

#[tokio::test]
async fn test_remove_checkbox_deletes_the_row() {
    let (_dir, mirror) = temp_mirror().await;
    let pool = mirror.pool(StoreKind::Editable);
    let (cid, first, second) = {
        let mut conn = pool.acquire().await.unwrap();
        let cid = add_curriculum(&mut conn, "B.Eng").await;
        let first = add_row(&mut conn, cid, RowKind::Core, "Basic Science").await;
        let second = add_row(&mut conn, cid, RowKind::Core, "Basic Engineering").await;
        (cid, first, second)
    };

    let (first_id, second_id) = (first.to_string(), second.to_string());
    let outcome = apply(
        pool,
        cid,
        &submission(&[
            ("core_id_0", first_id.as_str()),
            ("core_name_0", "Basic Science"),
            ("core_remove_0", "on"),
            ("core_id_1", second_id.as_str()),
            ("core_name_1", "Basic Engineering"),
        ]),
    )
    .await
    .unwrap();
    assert_eq!(outcome.deleted_rows, 1);

    let mut conn = pool.acquire().await.unwrap();
    let core = credit_rows::list_kind(&mut conn, cid, RowKind::Core).await.unwrap();
    assert_eq!(core.len(), 1);
    assert_eq!(core[0].id, second);
}

#[tokio::test]
async fn test_rows_posted_without_ids_delete_nothing() {
    let (_dir, mirror) = temp_mirror().await;
    let pool = mirror.pool(StoreKind::Editable);
    let cid = {
        let mut conn = pool.acquire().await.unwrap();
        let cid = add_curriculum(&mut conn, "B.Eng").await;
        add_row(&mut conn, cid, RowKind::Plo, "PLO1: Apply").await;
        add_row(&mut conn, cid, RowKind::Plo, "PLO2: Design").await;
        cid
    };

    let outcome = apply(pool, cid, &submission(&[("plo_name_0", "PLO3: New")]))
        .await
        .unwrap();
    assert_eq!(outcome.deleted_rows, 0);
    assert_eq!(outcome.created_rows, 1);

    let mut conn = pool.acquire().await.unwrap();
    let mut names: Vec<String> = credit_rows::list_kind(&mut conn, cid, RowKind::Plo)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["PLO1: Apply", "PLO2: Design", "PLO3: New"]);
}

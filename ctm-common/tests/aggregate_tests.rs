//! Tests for PLO totals, YLO pruning and CLO summaries against a real store

mod common;

use common::{add_course, add_curriculum, add_row, temp_mirror};
use ctm_common::aggregate::{prune_ylo, recompute_plo_totals, replace_clos};
use ctm_common::codes::{KsecCategory, KsecType};
use ctm_common::db::clos::{self, NewClo};
use ctm_common::db::{credit_rows, ksec, ylo, RowKind};
use ctm_common::StoreKind;

#[tokio::test]
async fn test_plo_totals_respect_tag_boundaries() {
    let (_dir, mirror) = temp_mirror().await;
    let mut conn = mirror.pool(StoreKind::Editable).acquire().await.unwrap();

    let cid = add_curriculum(&mut conn, "B.Eng").await;
    let plo1 = add_row(&mut conn, cid, RowKind::Plo, "PLO1: Apply knowledge").await;
    let plo10 = add_row(&mut conn, cid, RowKind::Plo, "PLO10: Lifelong learning").await;
    add_course(&mut conn, cid, None, "EN301", 3, 3, "PLO1").await;
    add_course(&mut conn, cid, None, "EN302", 3, 4, "PLO10").await;
    add_course(&mut conn, cid, None, "EN501", 5, 2, "PLO1, PLO10").await;

    let updated = recompute_plo_totals(&mut conn, cid).await.unwrap();
    assert_eq!(updated, 2);

    let row1 = credit_rows::require(&mut conn, cid, plo1).await.unwrap();
    assert_eq!(row1.credits, [0, 0, 3, 0, 2, 0, 0, 0]);
    let row10 = credit_rows::require(&mut conn, cid, plo10).await.unwrap();
    assert_eq!(row10.credits, [0, 0, 4, 0, 2, 0, 0, 0]);
}

#[tokio::test]
async fn test_unprefixed_plo_label_matches_nothing() {
    let (_dir, mirror) = temp_mirror().await;
    let mut conn = mirror.pool(StoreKind::Editable).acquire().await.unwrap();

    let cid = add_curriculum(&mut conn, "B.Eng").await;
    let row = add_row(&mut conn, cid, RowKind::Plo, "Outcome one").await;
    add_course(&mut conn, cid, None, "EN101", 1, 3, "PLO1").await;

    recompute_plo_totals(&mut conn, cid).await.unwrap();
    let stored = credit_rows::require(&mut conn, cid, row).await.unwrap();
    assert_eq!(stored.total_credits(), 0);
}

#[tokio::test]
async fn test_prune_ylo_without_credited_course() {
    let (_dir, mirror) = temp_mirror().await;
    let mut conn = mirror.pool(StoreKind::Editable).acquire().await.unwrap();

    let cid = add_curriculum(&mut conn, "B.Eng").await;
    add_course(&mut conn, cid, None, "EN401", 4, 0, "PLO2").await;
    add_course(&mut conn, cid, None, "EN402", 4, 3, "PLO3").await;
    ylo::upsert(&mut conn, cid, "PLO2", 4, "Zero-credit only").await.unwrap();
    ylo::upsert(&mut conn, cid, "PLO3", 4, "Credited").await.unwrap();
    ylo::upsert(&mut conn, cid, "PLO3", 5, "Other semester").await.unwrap();

    let deleted = prune_ylo(&mut conn, cid).await.unwrap();
    assert_eq!(deleted, 2);

    assert!(ylo::get(&mut conn, cid, "PLO2", 4).await.unwrap().is_none());
    assert!(ylo::get(&mut conn, cid, "PLO3", 4).await.unwrap().is_some());
    assert!(ylo::get(&mut conn, cid, "PLO3", 5).await.unwrap().is_none());
}

#[tokio::test]
async fn test_prune_ylo_is_scoped_to_curriculum() {
    let (_dir, mirror) = temp_mirror().await;
    let mut conn = mirror.pool(StoreKind::Editable).acquire().await.unwrap();

    let first = add_curriculum(&mut conn, "First").await;
    let second = add_curriculum(&mut conn, "Second").await;
    add_course(&mut conn, second, None, "X401", 4, 3, "PLO2").await;
    ylo::upsert(&mut conn, second, "PLO2", 4, "Kept").await.unwrap();

    prune_ylo(&mut conn, first).await.unwrap();
    assert!(ylo::get(&mut conn, second, "PLO2", 4).await.unwrap().is_some());
}

#[tokio::test]
async fn test_clo_summary_against_catalogue() {
    let (_dir, mirror) = temp_mirror().await;
    let mut conn = mirror.pool(StoreKind::Editable).acquire().await.unwrap();

    let cid = add_curriculum(&mut conn, "B.Eng").await;
    for i in 0..5 {
        ksec::insert(&mut conn, cid, KsecType::Knowledge, KsecCategory::General, &format!("K item {}", i), i)
            .await
            .unwrap();
    }
    let course = add_course(&mut conn, cid, None, "EN101", 1, 3, "PLO1").await;

    let lines = vec![
        NewClo {
            clo: "CLO1: Explain".to_string(),
            bloom: "Apply".to_string(),
            k: "GE(K)1, GE(K)2".to_string(),
            ..Default::default()
        },
        NewClo {
            clo: "CLO2: Design".to_string(),
            bloom: "Valuing".to_string(),
            k: "GE(K)2".to_string(),
            ..Default::default()
        },
    ];
    let figures = replace_clos(&mut conn, cid, course, &lines).await.unwrap();
    assert_eq!(figures.k_percent, 40.0);
    assert_eq!(figures.s_percent, 0.0);
    assert_eq!(figures.bloom_score, 3);

    let stored = clos::list_for_course(&mut conn, course).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].clo_index, 2);

    let summary = clos::get_summary(&mut conn, course).await.unwrap().unwrap();
    assert_eq!(summary.k_percent, 40.0);

    // A second save replaces the summary instead of adding one
    replace_clos(&mut conn, cid, course, &lines[..1]).await.unwrap();
    assert_eq!(clos::list_summaries(&mut conn, cid).await.unwrap().len(), 1);
    assert_eq!(clos::list_for_course(&mut conn, course).await.unwrap().len(), 1);
}

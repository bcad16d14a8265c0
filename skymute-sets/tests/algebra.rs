use std::sync::Arc;

use async_trait::async_trait;

use skymute_sets::algebra::{difference, fixed, intersection, union, FixedSet};
use skymute_sets::{DidSet, QueryableSource, SetError, SetSource};

/// A source that fails every evaluation.
struct FailingSource;

#[async_trait]
impl SetSource for FailingSource {
    async fn get_dids(&self) -> Result<DidSet, SetError> {
        Err(SetError::Stopped("synthetic failure"))
    }
}

fn dids(entries: &[&str]) -> DidSet {
    entries.iter().copied().collect()
}

#[tokio::test]
async fn union_is_commutative() {
    let a = fixed(["did:plc:a", "did:plc:b"]);
    let b = fixed(["did:plc:b", "did:plc:c"]);

    let ab = union(vec![a.clone(), b.clone()]).get_dids().await.unwrap();
    let ba = union(vec![b, a]).get_dids().await.unwrap();

    assert_eq!(ab, ba);
    assert_eq!(ab, dids(&["did:plc:a", "did:plc:b", "did:plc:c"]));
}

#[tokio::test]
async fn union_error_carries_operand_index() {
    let source = union(vec![fixed(["did:plc:a"]), Arc::new(FailingSource)]);

    match source.get_dids().await {
        Err(SetError::Operand { op, index, .. }) => {
            assert_eq!(op, "union");
            assert_eq!(index, 1);
        }
        other => panic!("expected operand error, got {other:?}"),
    }
}

#[tokio::test]
async fn intersection_of_no_operands_is_empty() {
    let result = intersection(vec![]).get_dids().await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn intersection_of_identical_operands_is_identity() {
    let a = || fixed(["did:plc:a", "did:plc:b"]);
    let result = intersection(vec![a(), a(), a()]).get_dids().await.unwrap();
    assert_eq!(result, dids(&["did:plc:a", "did:plc:b"]));
}

#[tokio::test]
async fn intersection_keeps_only_common_members() {
    let result = intersection(vec![
        fixed(["did:plc:a", "did:plc:b", "did:plc:c"]),
        fixed(["did:plc:b", "did:plc:c"]),
        fixed(["did:plc:c", "did:plc:d"]),
    ])
    .get_dids()
    .await
    .unwrap();
    assert_eq!(result, dids(&["did:plc:c"]));
}

#[tokio::test]
async fn intersection_error_carries_operand_index() {
    let source = intersection(vec![fixed(["did:plc:a"]), Arc::new(FailingSource)]);

    match source.get_dids().await {
        Err(SetError::Operand { op, index, .. }) => {
            assert_eq!(op, "intersection");
            assert_eq!(index, 1);
        }
        other => panic!("expected operand error, got {other:?}"),
    }
}

#[tokio::test]
async fn difference_of_set_with_itself_is_empty() {
    let a = fixed(["did:plc:a", "did:plc:b"]);
    let result = difference(a.clone(), a).get_dids().await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn difference_subtracts_right_from_left() {
    let result = difference(
        fixed(["did:plc:a", "did:plc:b"]),
        fixed(["did:plc:b", "did:plc:c"]),
    )
    .get_dids()
    .await
    .unwrap();
    assert_eq!(result, dids(&["did:plc:a"]));
}

#[tokio::test]
async fn difference_reports_failing_side() {
    let err = difference(fixed(["did:plc:a"]), Arc::new(FailingSource))
        .get_dids()
        .await
        .unwrap_err();
    match err {
        SetError::Side { side, .. } => assert_eq!(side, "right"),
        other => panic!("expected side error, got {other:?}"),
    }

    let err = difference(Arc::new(FailingSource), fixed(["did:plc:a"]))
        .get_dids()
        .await
        .unwrap_err();
    match err {
        SetError::Side { side, .. } => assert_eq!(side, "left"),
        other => panic!("expected side error, got {other:?}"),
    }
}

#[tokio::test]
async fn fixed_set_answers_membership_directly() {
    let set = FixedSet::from_dids(["did:plc:a"]);
    assert!(set.contains("did:plc:a").await.unwrap());
    assert!(!set.contains("did:plc:b").await.unwrap());
    assert_eq!(set.get_dids().await.unwrap(), dids(&["did:plc:a"]));
}

#[tokio::test]
async fn combinators_compose() {
    // (A ∪ B) ∩ (A \ C)
    let a = fixed(["did:plc:a", "did:plc:b"]);
    let b = fixed(["did:plc:c"]);
    let c = fixed(["did:plc:b"]);

    let composed = intersection(vec![
        union(vec![a.clone(), b]),
        difference(a, c),
    ]);
    assert_eq!(composed.get_dids().await.unwrap(), dids(&["did:plc:a"]));
}

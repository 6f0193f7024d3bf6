use super::*;
use std::io::Write;

fn unit(x: f32, y: f32) -> Vec<f32> {
    let norm = (x * x + y * y).sqrt();
    vec![x / norm, y / norm]
}

fn sample_index() -> FlatIndex {
    FlatIndex::from_vectors(
        "all-mpnet-base-v2",
        2,
        vec![unit(1.0, 0.0), unit(0.0, 1.0), unit(1.0, 1.0)],
    )
    .expect("build index")
}

#[test]
fn search_orders_by_ascending_distance() {
    let index = sample_index();
    let results = index.search(&unit(1.0, 0.0), 3).expect("search");

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].row_id, 0);
    assert!(results[0].distance < 1e-6);
    assert!(results[0].distance <= results[1].distance);
    assert!(results[1].distance <= results[2].distance);
    // Orthogonal vector is the worst match.
    assert_eq!(results[2].row_id, 1);
}

#[test]
fn search_returns_fewer_when_index_is_small() {
    let index = sample_index();
    let results = index.search(&unit(1.0, 0.0), 10).expect("search");
    assert_eq!(results.len(), 3);
}

#[test]
fn search_rejects_zero_k() {
    let index = sample_index();
    let result = index.search(&unit(1.0, 0.0), 0);
    assert!(matches!(result, Err(AdvisorError::InvalidArgument(_))));
}

#[test]
fn search_rejects_dimension_mismatch() {
    let index = sample_index();
    let result = index.search(&[1.0, 0.0, 0.0], 2);
    assert!(matches!(result, Err(AdvisorError::InvalidArgument(_))));
}

#[test]
fn distances_are_never_negative() {
    let index = sample_index();
    let results = index.search(&unit(1.0, 0.0), 3).expect("search");
    assert!(results.iter().all(|e| e.distance >= 0.0));
}

#[test]
fn empty_index_returns_no_candidates() {
    let index = FlatIndex::from_vectors("all-mpnet-base-v2", 2, Vec::new()).expect("build index");
    let results = index.search(&unit(1.0, 0.0), 5).expect("search");
    assert!(results.is_empty());
}

#[test]
fn load_parses_index_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"{{"model":"all-mpnet-base-v2","dimension":2,"vectors":[[1.0,0.0],[0.0,1.0]]}}"#
    )
    .expect("write index");

    let index = FlatIndex::load(file.path()).expect("load index");
    assert_eq!(index.len(), 2);
    assert_eq!(index.dimension(), 2);
    assert_eq!(index.model(), "all-mpnet-base-v2");
}

#[test]
fn load_rejects_ragged_vectors() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"{{"model":"m","dimension":2,"vectors":[[1.0,0.0],[0.5]]}}"#
    )
    .expect("write index");

    let result = FlatIndex::load(file.path());
    assert!(matches!(result, Err(AdvisorError::Dataset(_))));
}

#[test]
fn alignment_check_flags_count_mismatch() {
    let index = sample_index();
    assert!(index.validate_alignment(3).is_ok());
    assert!(matches!(
        index.validate_alignment(4),
        Err(AdvisorError::Dataset(_))
    ));
}

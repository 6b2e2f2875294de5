//! Discovery against device trees on local disk.

use crate::common::{LocalFleet, at};
use lb_discoverer::{
    AnomalyKind, Discoverer, DiscoveryConfig, LocalStorage, QueryWindow, discover,
};
use lb_error::LbError;
use std::sync::Arc;

fn discoverer(fleet: &LocalFleet) -> Discoverer {
    let storage = Arc::new(LocalStorage::new(fleet.base()));
    Discoverer::new(storage, DiscoveryConfig::new()).unwrap()
}

#[tokio::test]
async fn test_boundary_sessions_on_disk() {
    let fleet = LocalFleet::new();
    fleet.daily_sessions("/EEEE0001", 5);

    let window = QueryWindow::new(at(2, 0), at(4, 0)).unwrap();
    let discovery = discoverer(&fleet)
        .discover(&["/EEEE0001"], &window)
        .await
        .unwrap();

    assert_eq!(
        discovery.paths(),
        vec![
            "/EEEE0001/00000002/00000001.MF4",
            "/EEEE0001/00000002/00000002.MF4",
            "/EEEE0001/00000002/00000003.MF4",
            "/EEEE0001/00000003/00000001.MF4",
            "/EEEE0001/00000003/00000002.MF4",
            "/EEEE0001/00000003/00000003.MF4",
        ]
    );
    // The session before the window is listed since only its end is known
    assert_eq!(discovery.stats.folders_listed, 3);
    assert_eq!(discovery.stats.folders_pruned, 2);
}

#[tokio::test]
async fn test_modification_time_closes_the_file() {
    let fleet = LocalFleet::new();
    fleet.daily_sessions("/EEEE0001", 1);
    let discoverer = discoverer(&fleet);

    let early = QueryWindow::new(at(1, 2), at(1, 3)).unwrap();
    let discovery = discoverer.discover(&["/EEEE0001"], &early).await.unwrap();
    assert_eq!(discovery.paths(), vec!["/EEEE0001/00000001/00000001.MF4"]);

    let late = QueryWindow::new(at(1, 17), at(1, 18)).unwrap();
    let discovery = discoverer.discover(&["/EEEE0001"], &late).await.unwrap();
    assert_eq!(discovery.paths(), vec!["/EEEE0001/00000001/00000003.MF4"]);
}

#[tokio::test]
async fn test_first_file_of_session_starts_at_previous_session_end() {
    let fleet = LocalFleet::new();
    fleet.daily_sessions("/EEEE0001", 5);

    let window = QueryWindow::new(at(3, 1), at(3, 2)).unwrap();
    let discovery = discoverer(&fleet)
        .discover(&["/EEEE0001"], &window)
        .await
        .unwrap();

    assert_eq!(discovery.paths(), vec!["/EEEE0001/00000003/00000001.MF4"]);
    assert_eq!(discovery.stats.folders_listed, 2);
}

#[tokio::test]
async fn test_window_inside_one_file() {
    let fleet = LocalFleet::new();
    fleet.daily_sessions("/EEEE0001", 3);

    let window = QueryWindow::new(at(2, 9), at(2, 10)).unwrap();
    let discovery = discoverer(&fleet)
        .discover(&["/EEEE0001"], &window)
        .await
        .unwrap();

    assert_eq!(discovery.paths(), vec!["/EEEE0001/00000002/00000002.MF4"]);
}

#[tokio::test]
async fn test_anomalies_and_extensions_on_disk() {
    let fleet = LocalFleet::new();
    fleet.daily_sessions("/EEEE0001", 3);
    fleet.file("/EEEE0001/00000002/00000004.mf4", at(2, 20));
    fleet.file("/EEEE0001/00000002/00000005.TXT", at(2, 21));
    fleet.file("/EEEE0001/backup_old/00000001.MF4", at(2, 3));
    std::fs::write(fleet.base().join("EEEE0001/device.json"), b"{}").unwrap();

    let window = QueryWindow::new(at(2, 0), at(3, 0)).unwrap();
    let discovery = discoverer(&fleet)
        .discover(&["/EEEE0001"], &window)
        .await
        .unwrap();

    assert_eq!(
        discovery.paths(),
        vec![
            "/EEEE0001/00000002/00000001.MF4",
            "/EEEE0001/00000002/00000002.MF4",
            "/EEEE0001/00000002/00000003.MF4",
            "/EEEE0001/00000002/00000004.mf4",
            "/EEEE0001/backup_old/00000001.MF4",
        ]
    );
    assert_eq!(discovery.anomalies.len(), 1);
    assert_eq!(discovery.anomalies[0].kind, AnomalyKind::UnrecognizedFolder);
}

#[tokio::test]
async fn test_entry_point_on_disk() {
    let fleet = LocalFleet::new();
    fleet.daily_sessions("/EEEE0001", 4);
    fleet.daily_sessions("/EEEE0002", 4);
    let storage = Arc::new(LocalStorage::new(fleet.base()));

    let paths = discover(
        storage.clone(),
        &["EEEE0002", "EEEE0003", "EEEE0001"],
        at(4, 16),
        at(5, 0),
        None,
    )
    .await
    .unwrap();
    assert_eq!(
        paths,
        vec![
            "/EEEE0002/00000004/00000003.MF4",
            "/EEEE0001/00000004/00000003.MF4",
        ]
    );

    let err = discover(storage, &["EEEE0001"], at(5, 0), at(5, 0), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LbError::InvalidWindow { .. }));
}

#[tokio::test]
async fn test_concurrent_roots_on_disk() {
    let fleet = LocalFleet::new();
    let roots: Vec<String> = (1..=6).map(|d| format!("/EEEE{d:04}")).collect();
    for root in &roots {
        fleet.daily_sessions(root, 3);
    }
    let storage = Arc::new(LocalStorage::new(fleet.base()));
    let discoverer =
        Discoverer::new(storage, DiscoveryConfig::new().with_concurrency(3)).unwrap();

    let window = QueryWindow::since(at(3, 8));
    let results = discoverer.discover_each(roots.as_slice(), &window).await;

    assert_eq!(results.len(), 6);
    for (result, root) in results.iter().zip(&roots) {
        assert_eq!(&result.root, root);
        let discovery = result.result.as_ref().unwrap();
        assert_eq!(
            discovery.paths(),
            vec![
                format!("{root}/00000003/00000002.MF4"),
                format!("{root}/00000003/00000003.MF4"),
            ]
        );
    }
}

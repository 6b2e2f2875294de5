//! S3 discovery tests using LocalStack.
//!
//! Object timestamps are assigned by the store on upload, so these tests
//! use windows relative to the time of the run.

use crate::common::LocalStackTestContext;
use chrono::{Duration, Utc};
use lb_discoverer::storage::s3::{S3Config, S3Credentials};
use lb_discoverer::{AnomalyKind, Discoverer, DiscoveryConfig, QueryWindow, S3Storage};
use std::sync::Arc;

async fn upload_fleet(ctx: &LocalStackTestContext, bucket: &str, prefix: &str) {
    for s in 1..=3 {
        for f in 1..=2 {
            ctx.put(bucket, &format!("{prefix}EEEE0001/{s:08}/{f:08}.MF4"))
                .await
                .unwrap();
        }
    }
    ctx.put(bucket, &format!("{prefix}EEEE0001/00000002/00000003.TXT"))
        .await
        .unwrap();
    ctx.put(bucket, &format!("{prefix}EEEE0001/backup_old/00000001.MF4"))
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_discover_files_from_s3() {
    let ctx = LocalStackTestContext::new().await;

    if !ctx.is_available().await {
        eprintln!("LocalStack not available, skipping test");
        return;
    }

    let bucket = "lb-discover-bucket";
    ctx.create_bucket(bucket).await.unwrap();
    ctx.clear(bucket, "fleet/").await.unwrap();
    upload_fleet(&ctx, bucket, "fleet/").await;

    let config = S3Config::new(bucket)
        .with_prefix("fleet/")
        .with_endpoint(&ctx.endpoint)
        .with_region("us-east-1")
        .with_credentials(S3Credentials::keys("test", "test"));
    let storage = Arc::new(S3Storage::from_config(&config).await);
    let discoverer = Discoverer::new(storage, DiscoveryConfig::new()).unwrap();

    let now = Utc::now();
    let window = QueryWindow::new(now - Duration::hours(1), now + Duration::hours(1)).unwrap();
    let discovery = discoverer.discover(&["EEEE0001"], &window).await.unwrap();

    assert_eq!(
        discovery.paths(),
        vec![
            "/EEEE0001/00000001/00000001.MF4",
            "/EEEE0001/00000001/00000002.MF4",
            "/EEEE0001/00000002/00000001.MF4",
            "/EEEE0001/00000002/00000002.MF4",
            "/EEEE0001/00000003/00000001.MF4",
            "/EEEE0001/00000003/00000002.MF4",
            "/EEEE0001/backup_old/00000001.MF4",
        ]
    );
    assert!(
        discovery
            .anomalies
            .iter()
            .any(|a| a.kind == AnomalyKind::UnrecognizedFolder)
    );

    ctx.clear(bucket, "fleet/").await.unwrap();
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_window_before_uploads_stops_after_first_session() {
    let ctx = LocalStackTestContext::new().await;

    if !ctx.is_available().await {
        eprintln!("LocalStack not available, skipping test");
        return;
    }

    let bucket = "lb-discover-prune-bucket";
    ctx.create_bucket(bucket).await.unwrap();
    ctx.clear(bucket, "").await.unwrap();
    upload_fleet(&ctx, bucket, "").await;

    let config = S3Config::new(bucket)
        .with_endpoint(&ctx.endpoint)
        .with_region("us-east-1")
        .with_credentials(S3Credentials::keys("test", "test"));
    let storage = Arc::new(S3Storage::from_config(&config).await);
    let discoverer = Discoverer::new(storage, DiscoveryConfig::new()).unwrap();

    let window = QueryWindow::until(Utc::now() - Duration::days(365));
    let discovery = discoverer.discover(&["/EEEE0001"], &window).await.unwrap();

    // LastModified ends a file, so the first file of the first session and
    // the lone file of the unrecognized folder have no known start.
    let paths = discovery.paths();
    assert!(paths.iter().any(|p| p == "/EEEE0001/00000001/00000001.MF4"));
    assert!(paths.iter().any(|p| p == "/EEEE0001/backup_old/00000001.MF4"));
    assert!(
        paths
            .iter()
            .all(|p| !p.contains("/00000002/") && !p.contains("/00000003/"))
    );
    assert_eq!(discovery.stats.folders_listed, 2);
    assert_eq!(discovery.stats.folders_pruned, 2);
}

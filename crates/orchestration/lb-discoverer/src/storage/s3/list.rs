//! Delimited S3 listing with pagination support.

use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use chrono::{DateTime, Utc};
use lb_error::StorageError;
use tracing::debug;

use super::retry::{RetryConfig, with_retry};
use crate::storage::{NameFilter, file_name};

/// An object returned by a delimited listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Object {
    /// The full object key
    pub key: String,

    /// Size of the object in bytes
    pub size: u64,

    /// Last modified timestamp
    pub last_modified: Option<DateTime<Utc>>,
}

/// One "directory level" of a bucket.
#[derive(Debug, Clone, Default)]
pub struct DelimitedListing {
    /// Common prefixes directly below the listed prefix (each ends with `/`)
    pub prefixes: Vec<String>,

    /// Objects directly below the listed prefix
    pub objects: Vec<S3Object>,

    /// Pages fetched
    pub pages: usize,
}

/// How much of a level to read.
#[derive(Clone, Copy)]
pub enum ListGoal<'a> {
    /// Every prefix and object of the level.
    Everything,

    /// Only the first object whose file name passes the filter.
    FirstObject(NameFilter<'a>),
}

/// A `ListObjectsV2` page reduced to what a level listing needs.
#[derive(Debug, Clone, Default)]
pub(crate) struct ListPage {
    pub prefixes: Vec<String>,
    pub objects: Vec<S3Object>,
    /// Token of the following page, when the response was truncated
    pub continuation: Option<String>,
}

impl ListPage {
    /// Directory markers (keys ending with `/`) are dropped.
    pub(crate) fn from_output(output: &ListObjectsV2Output) -> Self {
        let prefixes = output
            .common_prefixes()
            .iter()
            .filter_map(|common| common.prefix())
            .map(str::to_string)
            .collect();

        let objects = output
            .contents()
            .iter()
            .filter_map(|obj| {
                let key = obj.key().unwrap_or_default();
                if key.is_empty() || key.ends_with('/') {
                    return None;
                }
                Some(S3Object {
                    key: key.to_string(),
                    size: obj.size().unwrap_or(0).max(0) as u64,
                    last_modified: obj
                        .last_modified()
                        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
                })
            })
            .collect();

        let continuation = match output.is_truncated() {
            Some(true) => output.next_continuation_token().map(str::to_string),
            _ => None,
        };

        Self {
            prefixes,
            objects,
            continuation,
        }
    }
}

impl DelimitedListing {
    /// Fold a page in and return the token of the page to fetch next, if the
    /// goal is not met yet.
    pub(crate) fn absorb(&mut self, page: ListPage, goal: ListGoal<'_>) -> Option<String> {
        self.pages += 1;
        self.prefixes.extend(page.prefixes);

        match goal {
            ListGoal::Everything => {
                self.objects.extend(page.objects);
                page.continuation
            }
            ListGoal::FirstObject(accept) => {
                // Keys come back in UTF-8 binary order, so the first accepted
                // key of the first page holding one is the first by name.
                match page.objects.into_iter().find(|obj| accept(file_name(&obj.key))) {
                    Some(found) => {
                        self.objects.push(found);
                        None
                    }
                    None => page.continuation,
                }
            }
        }
    }
}

/// List one level below `prefix` using `/` as delimiter.
///
/// Pages of up to `page_size` keys (objects plus prefixes) are followed
/// until the level is exhausted or `goal` is met.
pub async fn list_level(
    client: &Client,
    bucket: &str,
    prefix: &str,
    goal: ListGoal<'_>,
    page_size: Option<i32>,
    retry: &RetryConfig,
) -> Result<DelimitedListing, StorageError> {
    let mut listing = DelimitedListing::default();
    let mut continuation_token: Option<String> = None;

    loop {
        let mut req = client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .delimiter("/");

        if let Some(page_size) = page_size {
            req = req.max_keys(page_size);
        }

        if let Some(ref token) = continuation_token {
            req = req.continuation_token(token);
        }

        let resp = with_retry(retry, "list_objects_v2", || {
            let req = req.clone();
            async move {
                req.send()
                    .await
                    .map_err(|e| map_sdk_error("list", prefix, e))
            }
        })
        .await?;

        continuation_token = listing.absorb(ListPage::from_output(&resp), goal);
        if continuation_token.is_none() {
            break;
        }
    }

    debug!(
        bucket,
        prefix,
        pages = listing.pages,
        prefixes = listing.prefixes.len(),
        objects = listing.objects.len(),
        "Listed S3 level"
    );

    Ok(listing)
}

/// Map an SDK error onto the storage error taxonomy.
pub(crate) fn map_sdk_error<E>(
    operation: &str,
    target: &str,
    err: SdkError<E, HttpResponse>,
) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = format!("{operation} {target}: {}", DisplayErrorContext(&err));

    if matches!(err, SdkError::TimeoutError(_) | SdkError::DispatchFailure(_)) {
        return StorageError::Unavailable(message);
    }

    let status = err.raw_response().map(|resp| resp.status().as_u16());
    classify_response(err.code(), status, message)
}

/// Classify a service response by its error code and HTTP status.
pub(crate) fn classify_response(
    code: Option<&str>,
    status: Option<u16>,
    message: String,
) -> StorageError {
    match (code, status) {
        (Some("NoSuchBucket"), _) => StorageError::InvalidPath(message),
        (Some("NoSuchKey" | "NotFound"), _) | (_, Some(404)) => StorageError::NotFound(message),
        (Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch"), _)
        | (_, Some(403)) => StorageError::AccessDenied(message),
        (
            Some("SlowDown" | "Throttling" | "RequestTimeout" | "InternalError" | "ServiceUnavailable"),
            _,
        )
        | (_, Some(429 | 500..=599)) => StorageError::Unavailable(message),
        _ => StorageError::Io(message),
    }
}

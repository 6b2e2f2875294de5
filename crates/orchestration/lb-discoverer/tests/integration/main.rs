//! Integration tests for lb-discoverer.
//!
//! Local filesystem and in-memory tests run by default. The S3 tests require
//! LocalStack and are marked as `#[ignore]`.
//!
//! ## Running the S3 tests
//!
//! 1. Start LocalStack:
//!    ```bash
//!    docker run --rm -p 4566:4566 localstack/localstack
//!    ```
//!
//! 2. Run the ignored tests:
//!    ```bash
//!    LOCALSTACK_ENDPOINT=http://localhost:4566 cargo test -p lb-discoverer -- --ignored
//!    ```

mod common;
mod local_test;
mod s3_test;

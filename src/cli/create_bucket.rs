use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::time::Duration;

use aws_sdk_s3::types::{BucketVersioningStatus, MfaDelete, VersioningConfiguration};
use aws_sdk_s3::Client;

use crate::config::{CreateBucketArgs, S3Options};
use crate::error::{operation_error, StoreError};
use crate::io::create_s3_client;

/// Attempts to observe a freshly created bucket before giving up. Some S3
/// implementations (Scality) lack a native waiter, so existence is polled.
const WAIT_ATTEMPTS: u32 = 15;
const WAIT_INTERVAL: Duration = Duration::from_secs(1);

const USAGE_WARNING: &str = "\
This command is mainly for development purposes.
Please consult the documentation of your S3 system to learn how to properly create a new bucket.
For required settings from the host perspective please consult the host documentation.
If you still want to use this command please confirm the usage by entering: yes";

/// `store create-bucket <bucket> [--update-configuration] [--accept-warning]`
pub async fn run_create_bucket(options: &S3Options, args: &CreateBucketArgs) -> ExitCode {
    if !args.accept_warning && !confirm_usage() {
        return ExitCode::FAILURE;
    }

    let client = create_s3_client(options).await;
    let bucket = &args.bucket;

    match bucket_exists(&client, bucket).await {
        Ok(true) => {
            println!("Bucket already exists: {}", bucket);
            if !args.update_configuration {
                return ExitCode::FAILURE;
            }
        }
        Ok(false) => {
            println!("Creating bucket <{}> ...", bucket);
            if let Err(err) = create_and_wait(&client, bucket).await {
                eprintln!("Error: {}", err);
                return ExitCode::FAILURE;
            }
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::FAILURE;
        }
    }

    println!("Enabling versioning on bucket <{}> ...", bucket);
    if let Err(err) = enable_versioning(&client, bucket).await {
        eprintln!("Error: {}", err);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print the usage warning and ask for an interactive confirmation.
fn confirm_usage() -> bool {
    println!("{}", USAGE_WARNING);
    print!("> ");
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("yes") || answer.eq_ignore_ascii_case("y")
}

async fn bucket_exists(client: &Client, bucket: &str) -> Result<bool, StoreError> {
    match client.head_bucket().bucket(bucket).send().await {
        Ok(_) => Ok(true),
        Err(e) => {
            let not_found = e
                .as_service_error()
                .map(|se| se.is_not_found())
                .unwrap_or(false);
            if not_found {
                Ok(false)
            } else {
                Err(operation_error(&e))
            }
        }
    }
}

async fn create_and_wait(client: &Client, bucket: &str) -> Result<(), StoreError> {
    client
        .create_bucket()
        .bucket(bucket)
        .send()
        .await
        .map_err(|e| operation_error(&e))?;

    for _ in 0..WAIT_ATTEMPTS {
        if bucket_exists(client, bucket).await.unwrap_or(false) {
            return Ok(());
        }
        tokio::time::sleep(WAIT_INTERVAL).await;
    }
    Err(StoreError::Operation {
        status: None,
        message: format!("bucket <{}> did not materialize after creation", bucket),
    })
}

async fn enable_versioning(client: &Client, bucket: &str) -> Result<(), StoreError> {
    client
        .put_bucket_versioning()
        .bucket(bucket)
        .versioning_configuration(
            VersioningConfiguration::builder()
                .status(BucketVersioningStatus::Enabled)
                .mfa_delete(MfaDelete::Disabled)
                .build(),
        )
        .send()
        .await
        .map_err(|e| operation_error(&e))?;
    Ok(())
}

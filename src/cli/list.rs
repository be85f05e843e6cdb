use std::process::ExitCode;

use aws_sdk_s3::types::CorsRule;
use aws_sdk_s3::Client;
use serde_json::{json, Value};

use crate::config::{ListArgs, S3Options};
use crate::error::{operation_error, StoreError};
use crate::io::create_s3_client;

const RECORD_SEPARATOR: &str = "----------------------------------------";

/// `store list [bucket] [object]`
///
/// Without arguments lists all buckets with their versioning and CORS
/// state. With a bucket lists its objects. With a bucket and an object key
/// lists the versions and delete markers of that object.
pub async fn run_list(options: &S3Options, args: &ListArgs) -> ExitCode {
    let client = create_s3_client(options).await;

    let result = match (&args.bucket, &args.object) {
        (None, _) => list_buckets(&client).await,
        (Some(bucket), None) => list_objects(&client, bucket).await,
        (Some(bucket), Some(object)) => list_versions(&client, bucket, object).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn list_buckets(client: &Client) -> Result<(), StoreError> {
    let resp = client
        .list_buckets()
        .send()
        .await
        .map_err(|e| operation_error(&e))?;

    for bucket in resp.buckets() {
        let name = bucket.name().unwrap_or_default();

        let versioning = client
            .get_bucket_versioning()
            .bucket(name)
            .send()
            .await
            .ok()
            .and_then(|v| v.status().map(|s| Value::String(s.as_str().to_string())));

        // Buckets without a CORS configuration answer with an error; show
        // those as unset rather than failing the listing.
        let cors = client
            .get_bucket_cors()
            .bucket(name)
            .send()
            .await
            .ok()
            .map(|c| Value::Array(c.cors_rules().iter().map(cors_rule_value).collect()));

        print_record(&[
            ("Name", Some(Value::String(name.to_string()))),
            ("Versioning", versioning),
            ("CORS", cors),
        ]);
    }
    Ok(())
}

async fn list_objects(client: &Client, bucket: &str) -> Result<(), StoreError> {
    let resp = client
        .list_objects_v2()
        .bucket(bucket)
        .send()
        .await
        .map_err(|e| operation_error(&e))?;

    for object in resp.contents() {
        print_record(&[
            ("Key", object.key().map(string_value)),
            (
                "LastModified",
                object.last_modified().map(|t| Value::String(t.to_string())),
            ),
            ("ETag", object.e_tag().map(string_value)),
            ("Size", object.size().map(Value::from)),
        ]);
    }
    Ok(())
}

async fn list_versions(client: &Client, bucket: &str, object: &str) -> Result<(), StoreError> {
    let resp = client
        .list_object_versions()
        .bucket(bucket)
        .prefix(object)
        .send()
        .await
        .map_err(|e| operation_error(&e))?;

    for version in resp.versions().iter().filter(|v| v.key() == Some(object)) {
        print_record(&[
            ("Key", version.key().map(string_value)),
            (
                "LastModified",
                version.last_modified().map(|t| Value::String(t.to_string())),
            ),
            ("ETag", version.e_tag().map(string_value)),
            ("Size", version.size().map(Value::from)),
            ("VersionId", version.version_id().map(string_value)),
            ("IsLatest", version.is_latest().map(Value::from)),
        ]);
    }

    println!("Delete Markers:");
    println!("{}", RECORD_SEPARATOR);
    for marker in resp
        .delete_markers()
        .iter()
        .filter(|m| m.key() == Some(object))
    {
        print_record(&[
            ("Key", marker.key().map(string_value)),
            (
                "LastModified",
                marker.last_modified().map(|t| Value::String(t.to_string())),
            ),
            ("VersionId", marker.version_id().map(string_value)),
            ("IsLatest", marker.is_latest().map(Value::from)),
        ]);
    }
    Ok(())
}

fn string_value(s: &str) -> Value {
    Value::String(s.to_string())
}

fn cors_rule_value(rule: &CorsRule) -> Value {
    json!({
        "AllowedHeaders": rule.allowed_headers(),
        "AllowedMethods": rule.allowed_methods(),
        "AllowedOrigins": rule.allowed_origins(),
        "ExposeHeaders": rule.expose_headers(),
        "MaxAgeSeconds": rule.max_age_seconds(),
    })
}

/// Print one record as `Key: json-value` lines, `---` for unset fields.
fn print_record(fields: &[(&str, Option<Value>)]) {
    for (key, value) in fields {
        match value {
            Some(v) => println!("{}: {}", key, v),
            None => println!("{}: ---", key),
        }
    }
    println!("{}", RECORD_SEPARATOR);
}

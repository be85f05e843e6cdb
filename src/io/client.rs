use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::Client;
use aws_smithy_runtime_api::box_error::BoxError;
use aws_smithy_runtime_api::client::interceptors::context::BeforeTransmitInterceptorContextMut;
use aws_smithy_runtime_api::client::interceptors::Intercept;
use aws_smithy_runtime_api::client::runtime_components::RuntimeComponents;
use aws_smithy_types::config_bag::ConfigBag;

use crate::config::S3Options;

/// Forces a `Content-Length: 0` header on PUT requests with an empty body.
///
/// Some S3-compatible services reject an empty-body PUT that carries no
/// content length. The transport layer only sets the header for non-empty
/// bodies, so zero-byte object writes need it added explicitly.
#[derive(Debug, Default)]
pub(crate) struct EmptyBodyContentLength;

impl Intercept for EmptyBodyContentLength {
    fn name(&self) -> &'static str {
        "EmptyBodyContentLength"
    }

    fn modify_before_signing(
        &self,
        context: &mut BeforeTransmitInterceptorContextMut<'_>,
        _runtime_components: &RuntimeComponents,
        _cfg: &mut ConfigBag,
    ) -> Result<(), BoxError> {
        let request = context.request_mut();
        if request.method() != "PUT" {
            return Ok(());
        }
        let body_is_empty = request.body().bytes().is_some_and(|b| b.is_empty());
        if body_is_empty && request.headers().get("content-length").is_none() {
            request.headers_mut().insert("content-length", "0");
        }
        Ok(())
    }
}

/// Create an S3 client from the connection options of the configuration
/// record.
///
/// Custom endpoints get path-style addressing when the configuration asks
/// for it, which most S3-compatible services (MinIO, Ceph, Scality) require:
/// ```ignore
/// let client = create_s3_client(&options).await;
/// ```
pub async fn create_s3_client(options: &S3Options) -> Client {
    let region = Region::new(options.region.clone());
    let credentials = Credentials::new(
        options.credentials.key.clone(),
        options.credentials.secret.clone(),
        None,
        None,
        "objectstore-config",
    );

    let mut config_loader = aws_config::defaults(BehaviorVersion::latest())
        .region(region)
        .credentials_provider(credentials);

    if let Some(endpoint) = &options.endpoint {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    let mut builder =
        aws_sdk_s3::config::Builder::from(&sdk_config).interceptor(EmptyBodyContentLength);
    if options.use_path_style_endpoint {
        builder = builder.force_path_style(true);
    }

    Client::from_conf(builder.build())
}

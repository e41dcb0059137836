// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Bucket administration for AWS S3.
//!
//! `object_store` only addresses objects inside an existing bucket, so bucket
//! lifecycle calls and cross-bucket server-side copies go through `aws-sdk-s3`.

use aws_credential_types::Credentials;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info};

use super::config::StorageConfig;
use super::error::{looks_transient, StorageError, StorageResult};
use super::target::StorageTarget;

/// Region in which S3 rejects an explicit location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// Characters left as-is in the key part of `x-amz-copy-source`.
const COPY_SOURCE_KEY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// S3 client used for bucket-level calls.
#[derive(Clone, Debug)]
pub struct S3BucketAdmin {
    client: Client,
    region: String,
}

impl S3BucketAdmin {
    /// Create the admin client from the same options as the object store.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if only one half of the static credentials is set,
    /// or `UrlParseError` if `endpoint` is not a valid URL.
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        let region = config.region().to_string();

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.clone()));

        match (
            config.get_option("access_key_id"),
            config.get_option("secret_access_key"),
        ) {
            (Some(access_key_id), Some(secret_access_key)) => {
                let credentials = Credentials::new(
                    access_key_id,
                    secret_access_key,
                    config.get_option("session_token").cloned(),
                    None,
                    "lake-depot",
                );
                builder = builder.credentials_provider(credentials);
            }
            (None, None) => {}
            _ => {
                return Err(StorageError::ConfigError(
                    "AWS requires both 'access_key_id' and 'secret_access_key'".to_string(),
                ))
            }
        }

        if let Some(endpoint) = config.get_option("endpoint") {
            url::Url::parse(endpoint)?;
            // S3-compatible services (MinIO, LocalStack) need path-style addressing
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        if let Some(timeout) = config
            .get_option("timeout")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|s| *s > 0)
        {
            builder = builder.timeout_config(
                aws_sdk_s3::config::timeout::TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(timeout))
                    .build(),
            );
        }

        info!(region = %region, "S3 bucket admin initialized");

        Ok(Self {
            client: Client::from_conf(builder.build()),
            region,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Location constraint to send with CreateBucket, `None` in us-east-1.
    pub(crate) fn location_constraint(region: &str) -> Option<BucketLocationConstraint> {
        if region == DEFAULT_REGION {
            None
        } else {
            Some(BucketLocationConstraint::from(region))
        }
    }

    pub async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if let Some(constraint) = Self::location_constraint(&self.region) {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(constraint)
                    .build(),
            );
        }

        request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket))?;

        info!("Created bucket={} region={}", bucket, self.region);
        Ok(())
    }

    pub async fn delete_bucket(&self, bucket: &str) -> StorageResult<()> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket))?;

        info!("Deleted bucket={}", bucket);
        Ok(())
    }

    pub async fn list_buckets(&self) -> StorageResult<Vec<String>> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "*"))?;

        let mut names: Vec<String> = output
            .buckets()
            .iter()
            .filter_map(|bucket| bucket.name().map(str::to_string))
            .collect();
        names.sort();

        debug!("Listed count={} buckets", names.len());
        Ok(names)
    }

    /// Server-side copy, used when source and destination buckets differ.
    pub async fn copy_object(&self, from: &StorageTarget, to: &StorageTarget) -> StorageResult<()> {
        self.client
            .copy_object()
            .copy_source(copy_source(from))
            .bucket(to.container())
            .key(to.key())
            .send()
            .await
            .map_err(|e| {
                let resource = copy_error_resource(e.code(), from, to);
                map_sdk_error(e, &resource)
            })?;

        info!("Copied from={} to={}", from, to);
        Ok(())
    }
}

/// `bucket/key` with the key percent-encoded, slashes kept.
fn copy_source(from: &StorageTarget) -> String {
    format!(
        "{}/{}",
        from.container(),
        utf8_percent_encode(from.key(), COPY_SOURCE_KEY)
    )
}

/// A missing key on CopyObject can only be the source; other failures are
/// reported against the destination.
fn copy_error_resource(code: Option<&str>, from: &StorageTarget, to: &StorageTarget) -> String {
    match code {
        Some("NoSuchKey") => from.to_string(),
        _ => to.to_string(),
    }
}

/// Translate an SDK failure into the storage taxonomy using the S3 error code.
fn map_sdk_error<E, R>(err: SdkError<E, R>, resource: &str) -> StorageError
where
    E: ProvideErrorMetadata + Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            return StorageError::Transient(format!("{}: {}", resource, message))
        }
        SdkError::ServiceError(_) => {}
        _ => {
            return if looks_transient(&message) {
                StorageError::Transient(format!("{}: {}", resource, message))
            } else {
                StorageError::Backend(format!("{}: {}", resource, message))
            }
        }
    }

    classify_s3_code(err.code(), resource, message)
}

fn classify_s3_code(code: Option<&str>, resource: &str, message: String) -> StorageError {
    match code {
        Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "ExpiredToken") => {
            StorageError::AccessDenied(format!("{}: {}", resource, message))
        }
        Some("BucketAlreadyExists" | "BucketAlreadyOwnedByYou") => {
            StorageError::ContainerAlreadyExists(resource.to_string())
        }
        Some("NoSuchBucket") => StorageError::ContainerNotFound(resource.to_string()),
        Some("BucketNotEmpty") => StorageError::ContainerNotEmpty(resource.to_string()),
        Some("NoSuchKey") => match resource.split_once('/') {
            Some((container, key)) => StorageError::NotFound {
                container: container.to_string(),
                key: key.to_string(),
            },
            None => StorageError::NotFound {
                container: resource.to_string(),
                key: String::new(),
            },
        },
        Some("SlowDown" | "RequestTimeout" | "InternalError" | "ServiceUnavailable") => {
            StorageError::Transient(format!("{}: {}", resource, message))
        }
        _ => StorageError::Backend(format!("{}: {}", resource, message)),
    }
}

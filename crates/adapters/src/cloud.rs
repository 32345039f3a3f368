// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cloud provider calls: object upload, FPGA image lifecycle, instance teardown.

use async_trait::async_trait;
use fab_core::{HostAddr, ImageIds, ImageState, StorageKey};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::subprocess::{
    run_with_timeout, stderr_summary, SubprocessError, CLOUD_CLI_TIMEOUT, UPLOAD_TIMEOUT,
};

/// Regions that host F1 instances; images are replicated to all of them.
pub const F1_REGIONS: &[&str] = &["us-east-1", "us-west-2", "eu-west-1"];

#[derive(Debug, Error)]
pub enum CloudError {
    #[error("{call} failed (exit {code}): {stderr}")]
    CallFailed { call: &'static str, code: i32, stderr: String },
    #[error("{call} returned unexpected output: {message}")]
    BadResponse { call: &'static str, message: String },
    #[error("no instance found for host {0}")]
    NoInstance(HostAddr),
    #[error(transparent)]
    Subprocess(#[from] SubprocessError),
}

/// Parameters for an image creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateImageRequest {
    pub bucket: String,
    pub key: StorageKey,
    pub logs_prefix: String,
    pub name: String,
    pub description: String,
}

/// One status observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStatus {
    pub state: ImageState,
    /// Raw provider response, kept for the results directory.
    pub raw: String,
}

/// Adapter for the cloud provider.
#[async_trait]
pub trait CloudAdapter: Clone + Send + Sync + 'static {
    async fn put_object(&self, bucket: &str, key: &StorageKey, file: &Path) -> Result<(), CloudError>;

    async fn create_image(&self, request: &CreateImageRequest) -> Result<ImageIds, CloudError>;

    async fn describe_image(&self, image_id: &str) -> Result<ImageStatus, CloudError>;

    async fn copy_image_to_all_regions(&self, image_id: &str) -> Result<(), CloudError>;

    /// Terminate the instance backing `host`.
    async fn terminate_instance(
        &self,
        host: &HostAddr,
        instance_id: Option<&str>,
    ) -> Result<(), CloudError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateImageResponse {
    fpga_image_id: String,
    fpga_image_global_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeImagesResponse {
    fpga_images: Vec<FpgaImage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FpgaImage {
    state: FpgaImageState,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FpgaImageState {
    code: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesResponse {
    reservations: Vec<Reservation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    instances: Vec<Instance>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Instance {
    instance_id: String,
}

/// Talks to AWS through the `aws` command-line client.
#[derive(Clone, Debug)]
pub struct AwsCliAdapter {
    program: PathBuf,
    region: Option<String>,
}

impl AwsCliAdapter {
    pub fn new(region: Option<String>) -> Self {
        Self { program: PathBuf::from("aws"), region }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn source_region(&self) -> &str {
        self.region.as_deref().unwrap_or(F1_REGIONS[0])
    }

    async fn call(
        &self,
        call: &'static str,
        args: Vec<String>,
        timeout: Duration,
    ) -> Result<String, CloudError> {
        let mut cmd = tokio::process::Command::new(&self.program);
        if let Some(region) = &self.region {
            cmd.arg("--region").arg(region);
        }
        cmd.args(&args).arg("--output").arg("json");
        tracing::debug!(call, ?args, "aws");
        let output = run_with_timeout(cmd, timeout, call).await?;
        if !output.status.success() {
            return Err(CloudError::CallFailed {
                call,
                code: output.status.code().unwrap_or(-1),
                stderr: stderr_summary(&output),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Argument vector for `create-fpga-image`.
    pub fn create_image_args(request: &CreateImageRequest) -> Vec<String> {
        vec![
            "ec2".into(),
            "create-fpga-image".into(),
            "--input-storage-location".into(),
            format!("Bucket={},Key={}", request.bucket, request.key),
            "--logs-storage-location".into(),
            format!("Bucket={},Key={}", request.bucket, request.logs_prefix),
            "--name".into(),
            request.name.clone(),
            "--description".into(),
            request.description.clone(),
        ]
    }
}

/// Parse `create-fpga-image` JSON output.
pub fn parse_create_image(json: &str) -> Result<ImageIds, CloudError> {
    let resp: CreateImageResponse = serde_json::from_str(json)
        .map_err(|e| CloudError::BadResponse { call: "create-fpga-image", message: e.to_string() })?;
    Ok(ImageIds { image_id: resp.fpga_image_id, global_image_id: resp.fpga_image_global_id })
}

/// Parse `describe-fpga-images` JSON output into the first image's state.
pub fn parse_describe_image(json: &str) -> Result<ImageState, CloudError> {
    let resp: DescribeImagesResponse = serde_json::from_str(json).map_err(|e| {
        CloudError::BadResponse { call: "describe-fpga-images", message: e.to_string() }
    })?;
    let image = resp.fpga_images.into_iter().next().ok_or(CloudError::BadResponse {
        call: "describe-fpga-images",
        message: "no images in response".to_string(),
    })?;
    Ok(ImageState::from_code(&image.state.code))
}

/// Parse `describe-instances` JSON output into instance ids.
pub fn parse_instance_ids(json: &str) -> Result<Vec<String>, CloudError> {
    let resp: DescribeInstancesResponse = serde_json::from_str(json).map_err(|e| {
        CloudError::BadResponse { call: "describe-instances", message: e.to_string() }
    })?;
    Ok(resp.reservations.into_iter().flat_map(|r| r.instances).map(|i| i.instance_id).collect())
}

#[async_trait]
impl CloudAdapter for AwsCliAdapter {
    async fn put_object(&self, bucket: &str, key: &StorageKey, file: &Path) -> Result<(), CloudError> {
        let args = vec![
            "s3".into(),
            "cp".into(),
            file.display().to_string(),
            format!("s3://{}/{}", bucket, key),
        ];
        self.call("s3 cp", args, UPLOAD_TIMEOUT).await?;
        Ok(())
    }

    async fn create_image(&self, request: &CreateImageRequest) -> Result<ImageIds, CloudError> {
        let out = self.call("create-fpga-image", Self::create_image_args(request), CLOUD_CLI_TIMEOUT).await?;
        tracing::debug!(output = %out, "create-fpga-image result");
        parse_create_image(&out)
    }

    async fn describe_image(&self, image_id: &str) -> Result<ImageStatus, CloudError> {
        let args = vec!["ec2".into(), "describe-fpga-images".into(), "--fpga-image-ids".into(), image_id.to_string()];
        let raw = self.call("describe-fpga-images", args, CLOUD_CLI_TIMEOUT).await?;
        let state = parse_describe_image(&raw)?;
        Ok(ImageStatus { state, raw })
    }

    async fn copy_image_to_all_regions(&self, image_id: &str) -> Result<(), CloudError> {
        let source = self.source_region().to_string();
        for region in F1_REGIONS.iter().filter(|r| **r != source) {
            let mut cmd = tokio::process::Command::new(&self.program);
            cmd.args([
                "ec2",
                "copy-fpga-image",
                "--source-fpga-image-id",
                image_id,
                "--source-region",
                &source,
                "--region",
                region,
                "--output",
                "json",
            ]);
            let output = run_with_timeout(cmd, CLOUD_CLI_TIMEOUT, "copy-fpga-image").await?;
            if !output.status.success() {
                return Err(CloudError::CallFailed {
                    call: "copy-fpga-image",
                    code: output.status.code().unwrap_or(-1),
                    stderr: stderr_summary(&output),
                });
            }
            tracing::info!(image_id, region, "copied image");
        }
        Ok(())
    }

    async fn terminate_instance(
        &self,
        host: &HostAddr,
        instance_id: Option<&str>,
    ) -> Result<(), CloudError> {
        let ids = match instance_id {
            Some(id) => vec![id.to_string()],
            None => {
                let args = vec![
                    "ec2".into(),
                    "describe-instances".into(),
                    "--filters".into(),
                    format!("Name=private-ip-address,Values={}", host),
                ];
                let out = self.call("describe-instances", args, CLOUD_CLI_TIMEOUT).await?;
                parse_instance_ids(&out)?
            }
        };
        if ids.is_empty() {
            return Err(CloudError::NoInstance(host.clone()));
        }
        let mut args = vec!["ec2".to_string(), "terminate-instances".to_string(), "--instance-ids".to_string()];
        args.extend(ids);
        self.call("terminate-instances", args, CLOUD_CLI_TIMEOUT).await?;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{CloudAdapter, CloudError, CreateImageRequest, ImageStatus};
    use async_trait::async_trait;
    use fab_core::{HostAddr, ImageIds, ImageState, StorageKey};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    /// Recorded provider call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum CloudCall {
        PutObject { bucket: String, key: StorageKey, file: PathBuf },
        CreateImage(CreateImageRequest),
        DescribeImage { image_id: String },
        CopyToAllRegions { image_id: String },
        Terminate { host: HostAddr },
    }

    #[derive(Default)]
    struct FakeCloudState {
        calls: Vec<CloudCall>,
        states: VecDeque<ImageState>,
        fail_create: bool,
        fail_put: bool,
        fail_terminate: bool,
        next_image: u32,
    }

    /// Fake provider.
    ///
    /// `describe_image` pops scripted states; once exhausted it reports
    /// `available`. Image ids are `afi-N` / `agfi-N`.
    #[derive(Clone, Default)]
    pub struct FakeCloud {
        inner: Arc<Mutex<FakeCloudState>>,
    }

    impl FakeCloud {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn script_states(&self, states: impl IntoIterator<Item = ImageState>) {
            self.inner.lock().states.extend(states);
        }

        pub fn fail_create(&self) {
            self.inner.lock().fail_create = true;
        }

        pub fn fail_put(&self) {
            self.inner.lock().fail_put = true;
        }

        pub fn fail_terminate(&self) {
            self.inner.lock().fail_terminate = true;
        }

        pub fn calls(&self) -> Vec<CloudCall> {
            self.inner.lock().calls.clone()
        }

        pub fn uploads(&self) -> Vec<StorageKey> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    CloudCall::PutObject { key, .. } => Some(key),
                    _ => None,
                })
                .collect()
        }

        pub fn terminated(&self) -> Vec<HostAddr> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    CloudCall::Terminate { host } => Some(host),
                    _ => None,
                })
                .collect()
        }

        pub fn count(&self, pred: impl Fn(&CloudCall) -> bool) -> usize {
            self.inner.lock().calls.iter().filter(|c| pred(c)).count()
        }
    }

    fn injected(call: &'static str) -> CloudError {
        CloudError::CallFailed { call, code: 254, stderr: "injected failure".to_string() }
    }

    #[async_trait]
    impl CloudAdapter for FakeCloud {
        async fn put_object(&self, bucket: &str, key: &StorageKey, file: &Path) -> Result<(), CloudError> {
            let mut state = self.inner.lock();
            state.calls.push(CloudCall::PutObject {
                bucket: bucket.to_string(),
                key: key.clone(),
                file: file.to_path_buf(),
            });
            if state.fail_put {
                return Err(injected("s3 cp"));
            }
            Ok(())
        }

        async fn create_image(&self, request: &CreateImageRequest) -> Result<ImageIds, CloudError> {
            let mut state = self.inner.lock();
            state.calls.push(CloudCall::CreateImage(request.clone()));
            if state.fail_create {
                return Err(injected("create-fpga-image"));
            }
            state.next_image += 1;
            let n = state.next_image;
            Ok(ImageIds { image_id: format!("afi-{}", n), global_image_id: format!("agfi-{}", n) })
        }

        async fn describe_image(&self, image_id: &str) -> Result<ImageStatus, CloudError> {
            let mut state = self.inner.lock();
            state.calls.push(CloudCall::DescribeImage { image_id: image_id.to_string() });
            let image_state = state.states.pop_front().unwrap_or(ImageState::Available);
            let raw = format!(
                "{{\"FpgaImages\": [{{\"FpgaImageId\": \"{}\", \"State\": {{\"Code\": \"{}\"}}}}]}}",
                image_id,
                image_state.code()
            );
            Ok(ImageStatus { state: image_state, raw })
        }

        async fn copy_image_to_all_regions(&self, image_id: &str) -> Result<(), CloudError> {
            self.inner.lock().calls.push(CloudCall::CopyToAllRegions { image_id: image_id.to_string() });
            Ok(())
        }

        async fn terminate_instance(
            &self,
            host: &HostAddr,
            _instance_id: Option<&str>,
        ) -> Result<(), CloudError> {
            let mut state = self.inner.lock();
            state.calls.push(CloudCall::Terminate { host: host.clone() });
            if state.fail_terminate {
                return Err(injected("terminate-instances"));
            }
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{CloudCall, FakeCloud};

#[cfg(test)]
#[path = "cloud_tests.rs"]
mod tests;

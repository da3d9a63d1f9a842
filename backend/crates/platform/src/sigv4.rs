//! AWS Signature Version 4
//!
//! Header-based signing of bodiless requests to S3-compatible endpoints,
//! on top of the AWS SDK's `aws-sigv4` signer. The listen endpoint is not
//! part of the S3 API, so requests to it are built by hand and only the
//! signature comes from the SDK.

use std::time::SystemTime;

use aws_credential_types::Credentials;
use aws_sigv4::http_request::{
    PayloadChecksumKind, PercentEncodingMode, SignableBody, SignableRequest, SigningParams,
    SigningSettings, UriPathNormalizationMode, sign,
};
use aws_sigv4::sign::v4;
use thiserror::Error;

const SERVICE: &str = "s3";
const PROVIDER_NAME: &str = "object-storage-config";

/// Request signing failure
#[derive(Debug, Error)]
#[error("Request signing failed: {0}")]
pub struct SigningError(String);

/// Static access key pair scoped to one region
#[derive(Clone, Copy)]
pub struct S3Credentials<'a> {
    pub access_key: &'a str,
    pub secret_key: &'a str,
    pub region: &'a str,
}

/// Sign a bodiless request to `url`
///
/// Returns the headers to attach (`x-amz-date`, `x-amz-content-sha256`,
/// `authorization`). The signed `host` comes from the URL authority, which
/// is what the HTTP client sends.
pub fn sign_request(
    method: &str,
    url: &str,
    credentials: &S3Credentials<'_>,
    time: SystemTime,
) -> Result<Vec<(String, String)>, SigningError> {
    let identity = Credentials::new(
        credentials.access_key,
        credentials.secret_key,
        None,
        None,
        PROVIDER_NAME,
    )
    .into();

    // S3 signs the path as sent: no double encoding, no normalisation.
    let mut settings = SigningSettings::default();
    settings.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;
    settings.percent_encoding_mode = PercentEncodingMode::Single;
    settings.uri_path_normalization_mode = UriPathNormalizationMode::Disabled;

    let params: SigningParams<'_> = v4::SigningParams::builder()
        .identity(&identity)
        .region(credentials.region)
        .name(SERVICE)
        .time(time)
        .settings(settings)
        .build()
        .map_err(|e| SigningError(e.to_string()))?
        .into();

    let request = SignableRequest::new(method, url, std::iter::empty(), SignableBody::Bytes(&[]))
        .map_err(|e| SigningError(e.to_string()))?;

    let (instructions, _signature) = sign(request, &params)
        .map_err(|e| SigningError(e.to_string()))?
        .into_parts();

    Ok(instructions
        .headers()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect())
}

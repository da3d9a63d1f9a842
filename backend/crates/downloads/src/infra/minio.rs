//! Object Storage Notification Listener
//!
//! Subscribes to an S3-compatible server's bucket listen endpoint
//! (`GET /<bucket>?events=...`), which answers with a never-ending body of
//! newline-delimited JSON record batches interleaved with whitespace
//! keep-alives. Decoded notifications are pushed into a bounded channel.

use std::time::{Duration, SystemTime};

use futures::StreamExt;
use percent_encoding::percent_decode_str;
use platform::config::ObjectStorageConfig;
use platform::sigv4::{self, S3Credentials};
use rand::Rng;
use reqwest::Url;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::application::service::NotificationSource;
use crate::domain::value_objects::DownloadNotification;
use crate::error::{DownloadError, DownloadResult};

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const BACKOFF_BASE: Duration = Duration::from_millis(500);
const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Listener for bucket access notifications
pub struct MinioNotificationListener {
    config: ObjectStorageConfig,
    client: reqwest::Client,
    listen_url: Url,
    channel_capacity: usize,
}

impl MinioNotificationListener {
    pub fn new(config: ObjectStorageConfig) -> DownloadResult<Self> {
        let listen_url = listen_url(&config)?;
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            config,
            client,
            listen_url,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        })
    }

    async fn run(self, sender: mpsc::Sender<DownloadNotification>, cancel: CancellationToken) {
        tracing::info!(
            bucket = %self.config.bucket,
            events = ?self.config.events,
            "Subscribing to bucket notifications"
        );

        let mut attempt: u32 = 0;
        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sender.closed() => break,
                result = self.stream_once(&sender) => result,
            };

            if sender.is_closed() {
                break;
            }

            let error = match result {
                Ok(delivered) => {
                    if delivered > 0 {
                        attempt = 0;
                    }
                    "notification stream ended".to_string()
                }
                Err(e) => e.to_string(),
            };

            attempt = attempt.saturating_add(1);
            let backoff = backoff_delay(attempt);
            tracing::warn!(
                attempt = attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "Bucket notification stream interrupted, reconnecting"
            );

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(backoff) => {}
            }
        }

        tracing::info!(bucket = %self.config.bucket, "Bucket notification listener stopped");
    }

    /// Open one listen request and forward notifications until it ends
    ///
    /// Returns the number of notifications delivered.
    async fn stream_once(
        &self,
        sender: &mpsc::Sender<DownloadNotification>,
    ) -> DownloadResult<u64> {
        let response = self.connect().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DownloadError::Transport(format!(
                "listen request failed with status {}: {}",
                status,
                body.trim()
            )));
        }

        tracing::info!(bucket = %self.config.bucket, "Bucket notification stream connected");

        let mut decoder = NotificationDecoder::default();
        let mut delivered = 0u64;
        let mut body = std::pin::pin!(response.bytes_stream());

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for notification in decoder.push(&chunk) {
                if sender.send(notification).await.is_err() {
                    return Ok(delivered);
                }
                delivered += 1;
            }
        }

        Ok(delivered)
    }

    async fn connect(&self) -> DownloadResult<reqwest::Response> {
        let signed = sigv4::sign_request(
            "GET",
            self.listen_url.as_str(),
            &S3Credentials {
                access_key: &self.config.access_key,
                secret_key: &self.config.secret_key,
                region: &self.config.region,
            },
            SystemTime::now(),
        )?;

        let mut request = self.client.get(self.listen_url.clone());
        for (name, value) in signed {
            request = request.header(name, value);
        }

        Ok(request.send().await?)
    }
}

impl NotificationSource for MinioNotificationListener {
    fn subscribe(self, cancel: CancellationToken) -> mpsc::Receiver<DownloadNotification> {
        let (sender, receiver) = mpsc::channel(self.channel_capacity);
        tokio::spawn(self.run(sender, cancel));
        receiver
    }
}

/// Build `<endpoint>/<bucket>?events=...`
fn listen_url(config: &ObjectStorageConfig) -> DownloadResult<Url> {
    let mut url = Url::parse(&config.endpoint).map_err(|e| {
        DownloadError::InvalidConfig(format!("invalid endpoint {:?}: {}", config.endpoint, e))
    })?;
    if url.host_str().is_none() {
        return Err(DownloadError::InvalidConfig(format!(
            "endpoint {:?} has no host",
            config.endpoint
        )));
    }

    let base = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{}/{}", base, config.bucket));
    url.set_query(None);
    {
        let mut pairs = url.query_pairs_mut();
        for event in &config.events {
            pairs.append_pair("events", event);
        }
    }

    Ok(url)
}

/// Exponential backoff with up to 25% jitter, capped
fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let base = BACKOFF_BASE
        .saturating_mul(1u32 << exponent)
        .min(BACKOFF_MAX);
    let jitter_ms = rand::rng().random_range(0..=(base.as_millis() as u64 / 4));
    (base + Duration::from_millis(jitter_ms)).min(BACKOFF_MAX)
}

// Wire format

#[derive(Debug, Deserialize)]
struct RecordBatch {
    #[serde(rename = "Records", default)]
    records: Vec<EventRecord>,
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    #[serde(rename = "eventName", default)]
    event_name: Option<String>,
    s3: S3Entity,
    #[serde(default)]
    source: Option<EventSource>,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
}

#[derive(Debug, Deserialize)]
struct EventSource {
    #[serde(default)]
    host: Option<String>,
}

/// Incremental decoder for the newline-delimited listen body
#[derive(Debug, Default)]
pub struct NotificationDecoder {
    buffer: Vec<u8>,
}

impl NotificationDecoder {
    /// Feed bytes, returning notifications from every completed line
    pub fn push(&mut self, chunk: &[u8]) -> Vec<DownloadNotification> {
        self.buffer.extend_from_slice(chunk);

        let mut notifications = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            notifications.extend(decode_line(&line));
        }
        notifications
    }
}

/// Decode one line; blank keep-alives and malformed batches yield nothing
pub fn decode_line(line: &[u8]) -> Vec<DownloadNotification> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Vec::new();
    }

    let batch: RecordBatch = match serde_json::from_slice(line) {
        Ok(batch) => batch,
        Err(e) => {
            DownloadError::Decode(e).log();
            return Vec::new();
        }
    };

    batch
        .records
        .into_iter()
        .filter_map(|record| {
            let key = decode_object_key(&record.s3.object.key);
            match record.source.and_then(|s| s.host).filter(|h| !h.is_empty()) {
                Some(host) => Some(DownloadNotification::new(key, host)),
                None => {
                    tracing::warn!(
                        key = %key,
                        event = ?record.event_name,
                        "Dropping notification without source host"
                    );
                    None
                }
            }
        })
        .collect()
}

/// Undo the query-style escaping servers apply to keys in event records
///
/// `+` stands for a space; malformed escapes are kept verbatim.
pub fn decode_object_key(raw: &str) -> String {
    percent_decode_str(&raw.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

//! Periodic data capture.
//!
//! A [`Collector`] calls one method of one resource at a fixed interval and
//! forwards each result as a timestamped [`CaptureRecord`] over an mpsc
//! channel.  Capture errors are logged and the loop keeps going; the loop
//! ends when the collector is closed or the receiving side is dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use motus_types::{MotusError, ResourceName};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One captured sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub resource: String,
    pub method: String,
    pub captured_at: DateTime<Utc>,
    pub data: Value,
}

/// What to capture, how often, and where to send it.
#[derive(Debug, Clone)]
pub struct CollectorParams {
    pub resource: ResourceName,
    pub method: String,
    pub interval: Duration,
    pub sink: mpsc::Sender<CaptureRecord>,
}

/// A single capture of the target method.
pub type CaptureFn = Arc<dyn Fn() -> BoxFuture<'static, Result<Value, MotusError>> + Send + Sync>;

/// Periodic capture of one method.
pub struct Collector {
    params: CollectorParams,
    capture: CaptureFn,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Collector {
    pub fn new(params: CollectorParams, capture: CaptureFn) -> Self {
        Self {
            params,
            capture,
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn method(&self) -> &str {
        &self.params.method
    }

    /// Start capturing in a background task.  Calling it again while running
    /// is a no-op.
    pub fn collect(&mut self) {
        if self.task.is_some() {
            return;
        }
        let params = self.params.clone();
        let capture = Arc::clone(&self.capture);
        let cancel = self.cancel.clone();

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(params.interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let data = match capture().await {
                    Ok(data) => data,
                    Err(e) => {
                        warn!(resource = %params.resource, method = %params.method, error = %e, "capture failed");
                        continue;
                    }
                };
                let record = CaptureRecord {
                    resource: params.resource.to_string(),
                    method: params.method.clone(),
                    captured_at: Utc::now(),
                    data,
                };
                if params.sink.send(record).await.is_err() {
                    debug!(resource = %params.resource, method = %params.method, "capture sink closed");
                    break;
                }
            }
        }));
    }

    /// Stop capturing and wait for the background task to finish.
    pub async fn close(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(method = %self.params.method, error = %e, "collector task ended abnormally");
            }
        }
    }
}

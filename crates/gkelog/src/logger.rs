use crate::error::Error;
use crate::severity::Severity;
use crate::shipper::{Shipper, LOGGING_API_URL};

use google_logging2::api::{LogEntry, MonitoredResource, WriteLogEntriesRequest};

use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

// Entries waiting for the shipper. Beyond this, new entries are dropped.
const QUEUE_SIZE: usize = 100;

/// A handle on Google Cloud Logging for one project.
///
/// Creating it performs no I/O. Use [`Client::logger`] to obtain a [`Builder`] for a log
/// within the project.
#[derive(Debug, Clone)]
pub struct Client {
    project_id: String,
    metadata_host: String,
    logging_endpoint: String,
    http: reqwest::Client,
}

impl Client {
    /// Creates a client that obtains its access tokens from the metadata server on
    /// `metadata_host`.
    pub fn new(project_id: &str, metadata_host: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::ClientBuildError {
                project_id: project_id.to_string(),
                source: e,
            })?;
        Ok(Self {
            project_id: project_id.to_string(),
            metadata_host: metadata_host.to_string(),
            logging_endpoint: LOGGING_API_URL.to_string(),
            http,
        })
    }

    /// Sends entries to `url` instead of the Google Logging API's `entries:write`.
    #[must_use]
    pub fn with_logging_endpoint(self, url: &str) -> Self {
        Self {
            logging_endpoint: url.to_string(),
            ..self
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Starts building a logger that writes to `projects/<project>/logs/<log_id>` with
    /// the given monitored resource type.
    pub fn logger(&self, log_id: &str, resource_type: &str) -> Builder {
        Builder::new(
            &format!("projects/{}/logs/{}", self.project_id, log_id),
            resource_type,
        )
    }
}

/// Builder for the [`Logger`]
#[derive(Default, Debug)]
pub struct Builder {
    log_name: String,
    resource_type: String,
    resource_labels: HashMap<String, String>,
}

/// Writes entries to one log. Every call is fire-and-forget: the entry is queued for
/// the shipper and never waited on.
#[derive(Debug, Clone)]
pub struct Logger {
    log_name: String,
    resource: MonitoredResource,
    tx: mpsc::Sender<WriteLogEntriesRequest>,
}

impl Builder {
    /// Creates a Builder object.
    ///
    /// # Parameters
    /// - `log_name`: The `logName` of the [LogEntry](https://cloud.google.com/logging/docs/reference/v2/rest/v2/LogEntry), e.g. `projects/my-project/logs/my-log-id`.
    /// - `resource_type`: The `type` of the [MonitoredResource](https://cloud.google.com/logging/docs/reference/v2/rest/v2/MonitoredResource) attached to every entry. For example: `container`.
    ///
    /// # Example
    ///
    /// ```
    /// use slog_gke::logger::Builder;
    /// let (logger, _entries) = Builder::new(
    ///     "projects/my-gcp-project/logs/my-log-id",
    ///     "container",
    /// )
    /// .with_resource_labels([("cluster_name", "my-cluster"), ("namespace_id", "default")])
    /// .build();
    /// ```
    #[must_use = "The builder must be used"]
    pub fn new(log_name: &str, resource_type: &str) -> Self {
        Self {
            log_name: log_name.to_string(),
            resource_type: resource_type.to_string(),
            ..Default::default()
        }
    }

    /// Sets the `labels` of the monitored resource attached to every entry.
    #[must_use = "The builder must be used"]
    pub fn with_resource_labels<K, V>(self, labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            resource_labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..self
        }
    }

    /// Returns the [`Logger`] together with the receiving end of its queue, for callers
    /// that transport the [`WriteLogEntriesRequest`]s themselves.
    #[must_use = "The logger and receiver must be used to handle logging correctly"]
    pub fn build(self) -> (Logger, mpsc::Receiver<WriteLogEntriesRequest>) {
        let (tx, rx) = mpsc::channel::<WriteLogEntriesRequest>(QUEUE_SIZE);
        (self.into_logger(tx), rx)
    }

    /// Returns the [`Logger`] together with a [`Shipper`] that sends its entries to the
    /// Google Logging API once spawned.
    #[must_use = "The logger and shipper must be used to handle logging correctly"]
    pub fn build_with_shipper(self, client: &Client) -> (Logger, Shipper) {
        let (logger, rx) = self.build();
        let shipper = Shipper::new(
            client.http.clone(),
            &client.metadata_host,
            &client.logging_endpoint,
            rx,
        );
        (logger, shipper)
    }

    fn into_logger(self, tx: mpsc::Sender<WriteLogEntriesRequest>) -> Logger {
        let labels = if self.resource_labels.is_empty() {
            None
        } else {
            Some(self.resource_labels)
        };
        Logger {
            log_name: self.log_name,
            resource: MonitoredResource {
                type_: Some(self.resource_type),
                labels,
            },
            tx,
        }
    }
}

impl Logger {
    pub fn log_name(&self) -> &str {
        &self.log_name
    }

    fn construct_log_entry(
        &self,
        severity: Severity,
        message: &str,
        labels: HashMap<String, String>,
    ) -> LogEntry {
        LogEntry {
            text_payload: Some(message.to_string()),
            labels: if labels.is_empty() { None } else { Some(labels) },
            severity: Some(severity.to_string()),
            timestamp: Some(Utc::now()),
            resource: Some(self.resource.clone()),
            ..Default::default()
        }
    }

    /// Queues one entry. Never blocks; when the queue is full or the shipper is gone the
    /// entry is dropped with a note on stderr.
    pub fn log(&self, severity: Severity, message: &str, labels: HashMap<String, String>) {
        let body = WriteLogEntriesRequest {
            log_name: Some(self.log_name.clone()),
            entries: Some(vec![self.construct_log_entry(severity, message, labels)]),
            ..Default::default()
        };

        match self.tx.try_send(body) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                eprintln!("Google Logger queue is full, log message dropped");
            }
            Err(TrySendError::Closed(_)) => {
                eprintln!("Google Logger shipper has stopped, log message dropped");
            }
        }
    }
}

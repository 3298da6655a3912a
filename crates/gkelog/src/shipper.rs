use tokio::sync::mpsc;

use google_logging2::api::WriteLogEntriesRequest;

use chrono::{DateTime, TimeDelta, Utc};

use reqwest::{Client, Response};

use crate::error::Error;

pub(crate) const LOGGING_API_URL: &str = "https://logging.googleapis.com/v2/entries:write";

/// Token caching
#[derive(Default)]
pub struct Token {
    token: Option<String>,
    renew_after: DateTime<Utc>,
}

async fn get_error_response(response: Response, context: String) -> Error {
    let status = response.status();

    let body = match response.bytes().await {
        Ok(bytes) => match serde_json::from_slice::<String>(&bytes) {
            Ok(json) => json,
            Err(_) => String::from_utf8_lossy(&bytes).to_string(),
        },
        Err(e) => format!("could not decode body of HTTP Error response: {e}"),
    };

    Error::HttpResponseError {
        context,
        status,
        body,
    }
}

impl Token {
    fn renew_after_from_expires_in(expires_in: u64) -> DateTime<Utc> {
        let renew_after = TimeDelta::seconds(expires_in.saturating_sub(60) as i64);
        Utc::now() + renew_after
    }

    async fn fetch_access_token(
        &mut self,
        client: &Client,
        metadata_host: &str,
    ) -> Result<String, Error> {
        if let Some(token) = &self.token {
            if Utc::now() < self.renew_after {
                return Ok(token.clone());
            }
        }

        let response = client
            .get(format!(
                "http://{metadata_host}/computeMetadata/v1/instance/service-accounts/default/token"
            ))
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| Error::ShipperReqwestError {
                context: "performing HTTP GET token credentials from metadata server".to_string(),
                source: e,
            })?;

        if response.status().is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| Error::ShipperReqwestError {
                    context: "consuming response body of access token request".to_string(),
                    source: e,
                })?;
            let token_data: serde_json::Value =
                serde_json::from_str(&body).map_err(|e| Error::ShipperSerializeError {
                    context: "deserializing token data".to_string(),
                    source: e,
                })?;
            let token_str = token_data["access_token"]
                .as_str()
                .ok_or(Error::ShipperTokenNotFound)?
                .to_string();
            let expires_in = token_data["expires_in"]
                .as_u64()
                .ok_or(Error::ShipperTokenExpiryNotFound)?;
            self.token = Some(token_str.clone());
            self.renew_after = Self::renew_after_from_expires_in(expires_in);
            Ok(token_str)
        } else {
            Err(get_error_response(response, "fetching token".to_string()).await)
        }
    }
}

/// Sends the queued log entries to the Google Logging API.
///
/// Spawn [`run_log_shipper`](Shipper::run_log_shipper) on a Tokio runtime. It returns once
/// every [`Logger`](crate::logger::Logger) feeding it has been dropped and the queue is
/// drained.
pub struct Shipper {
    client: Client,
    metadata_host: String,
    endpoint: String,
    token: Token,
    rx: mpsc::Receiver<WriteLogEntriesRequest>,
}

impl Shipper {
    pub(crate) fn new(
        client: Client,
        metadata_host: &str,
        endpoint: &str,
        rx: mpsc::Receiver<WriteLogEntriesRequest>,
    ) -> Self {
        Shipper {
            client,
            metadata_host: metadata_host.to_string(),
            endpoint: endpoint.to_string(),
            token: Token::default(),
            rx,
        }
    }

    async fn send_log_entry(
        &mut self,
        token: &str,
        body: WriteLogEntriesRequest,
    ) -> Result<(), Error> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ShipperReqwestError {
                context: "performing HTTP POST request to the Google Logging API".to_string(),
                source: e,
            })?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(get_error_response(
                response,
                "response when sending log entry to Google Logging API".to_string(),
            )
            .await)
        }
    }

    /// The process that receives log entries and sends them to the Google Logging API
    pub async fn run_log_shipper(mut self) {
        while let Some(log_entry) = self.rx.recv().await {
            match self
                .token
                .fetch_access_token(&self.client, &self.metadata_host)
                .await
            {
                Ok(token) => {
                    if let Err(e) = self.send_log_entry(&token, log_entry).await {
                        eprintln!("Failed to send log entry: {}", e);
                    }
                }
                Err(e) => {
                    eprintln!("Failed to fetch access token: {}", e);
                }
            }
        }
    }
}

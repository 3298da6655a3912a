use reqwest::StatusCode;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Metadata server request failed with context '{context}'. Error: {source}")]
    MetadataRequestError {
        context: String,
        source: reqwest::Error,
    },
    #[error("Metadata server returned an empty value for '{0}'")]
    MetadataValueEmpty(String),
    #[error("{0} not set. Please define it in the pod spec using the Kubernetes downward API")]
    MissingEnvVar(String),
    #[error("Convert instance name '{0}' to cluster id failed")]
    ClusterIdError(String),
    #[error("Convert pod name '{0}' to component name failed")]
    ComponentNameError(String),
    #[error("Could not create the Google Logging client for project '{project_id}'. Error: {source}")]
    ClientBuildError {
        project_id: String,
        source: reqwest::Error,
    },
    #[error("Serde JSON serialization failed with context '{context}'. Error: {source}")]
    ShipperSerializeError {
        context: String,
        source: serde_json::Error,
    },
    #[error("Reqwest error with context '{context}'. Error: {source}")]
    ShipperReqwestError {
        context: String,
        source: reqwest::Error,
    },
    #[error("No 'access_token' found in the metadata server response body")]
    ShipperTokenNotFound,
    #[error("No 'expires_in' found in the metadata server response body")]
    ShipperTokenExpiryNotFound,
    #[error("unsuccessful HTTP response error with context '{context}'. HTTP status code: '{status}', body: '{body}'")]
    HttpResponseError {
        context: String,
        status: StatusCode,
        body: String,
    },
}

/// The error a [`Hook`](crate::hook::Hook) may return from `fire`.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

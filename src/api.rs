// API client module: a small blocking client for the hash cracking service.
// Both calls POST a JSON body to a single endpoint and parse a JSON reply.

use log::info;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::http::{HttpClient, RetryPolicy};

pub const DEFAULT_API_URL: &str = "https://api.onlinehashcrack.com/v2";

/// WPA-PMKID/EAPOL hash mode. Fixed by the service contract.
pub const ALGO_MODE: u32 = 22000;

const AGREE_TERMS: &str = "yes";
const LIST_TASKS_ACTION: &str = "list_tasks";

/// Submit payload.
#[derive(Serialize, Debug)]
pub struct SubmitRequest<'a> {
    pub api_key: &'a str,
    pub agree_terms: &'static str,
    pub algo_mode: u32,
    pub hashes: &'a [String],
}

/// Task listing payload.
#[derive(Serialize, Debug)]
pub struct ListTasksRequest<'a> {
    pub api_key: &'a str,
    pub agree_terms: &'static str,
    pub action: &'static str,
}

/// A cracking job as reported by the service.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Task {
    #[serde(default, deserialize_with = "string_or_number")]
    pub task_id: String,
    #[serde(default = "unknown_status", deserialize_with = "status_or_unknown")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cracked: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub password: String,
}

/// Common response envelope. `message` only matters when `success` is false.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tasks: Vec<Task>,
}

impl ApiResponse {
    /// Turns `success: false` into [`Error::ApiLogic`].
    pub fn into_result(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            let message = self
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Unknown error".into());
            Err(Error::ApiLogic(message))
        }
    }
}

/// The remote operations the controller depends on.
pub trait CrackingService: Send + Sync {
    fn submit_hashes(&self, api_key: &str, hashes: &[String]) -> Result<ApiResponse>;
    fn list_tasks(&self, api_key: &str) -> Result<ApiResponse>;
}

/// Client for the real service: holds the retrying HTTP client and the
/// endpoint URL.
#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
    endpoint: String,
}

impl ApiClient {
    /// Client with the default retry policy and 30s timeout.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_policy(endpoint, RetryPolicy::default())
    }

    pub fn with_policy(endpoint: impl Into<String>, policy: RetryPolicy) -> Result<Self> {
        Ok(ApiClient {
            http: HttpClient::new(policy)?,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn post<T: Serialize>(&self, body: &T) -> Result<ApiResponse> {
        let res = self.http.post_json(&self.endpoint, body)?;
        let status = res.status();
        if !status.is_success() {
            let txt = res.text().unwrap_or_default();
            return Err(Error::Http(format!("{} - {}", status, txt.trim())));
        }
        let txt = res
            .text()
            .map_err(|e| Error::Http(format!("reading response body: {e}")))?;
        serde_json::from_str(&txt).map_err(|e| Error::Parse(e.to_string()))
    }
}

impl CrackingService for ApiClient {
    fn submit_hashes(&self, api_key: &str, hashes: &[String]) -> Result<ApiResponse> {
        info!("Submitting {} hash(es) to {}", hashes.len(), self.endpoint);
        self.post(&SubmitRequest {
            api_key,
            agree_terms: AGREE_TERMS,
            algo_mode: ALGO_MODE,
            hashes,
        })
    }

    fn list_tasks(&self, api_key: &str) -> Result<ApiResponse> {
        info!("Listing tasks from {}", self.endpoint);
        self.post(&ListTasksRequest {
            api_key,
            agree_terms: AGREE_TERMS,
            action: LIST_TASKS_ACTION,
        })
    }
}

fn unknown_status() -> String {
    "unknown".into()
}

fn status_or_unknown<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown_status))
}

// Task ids are opaque; some deployments send them as numbers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

// Explicit nulls read the same as missing fields.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

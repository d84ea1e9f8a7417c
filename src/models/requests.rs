//! Request DTOs for the proxy API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;

use crate::scheduler::timeline::Process;

/// Trims `value` and reports `missing` when nothing is left.
fn required(value: &str, missing: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        Err(missing.to_string())
    } else {
        Ok(value.to_string())
    }
}

/// Request body for queued fetches (POST /fetch)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchRequest {
    /// URL to fetch
    #[serde(default)]
    pub url: String,
}

impl FetchRequest {
    /// Returns the trimmed URL, or an error message if it is missing.
    pub fn validate(&self) -> Result<String, String> {
        required(&self.url, "missing url")
    }
}

/// Query string for synchronous fetches (GET /fetch?url=)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchQuery {
    pub url: Option<String>,
}

impl FetchQuery {
    pub fn validate(&self) -> Result<String, String> {
        required(self.url.as_deref().unwrap_or_default(), "missing url")
    }
}

/// Request body for switching policy (PUT /scheduler)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyRequest {
    /// One of `fcfs`, `sjf`, `rr`
    #[serde(default)]
    pub algorithm: String,
}

/// Request body for blocklist changes (POST/DELETE /admin/blocklist)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlocklistRequest {
    #[serde(default)]
    pub domain: String,
}

impl BlocklistRequest {
    pub fn validate(&self) -> Result<String, String> {
        required(&self.domain, "missing domain")
    }
}

/// Request body for the timeline simulator (POST /scheduler/simulate)
#[derive(Debug, Clone, Deserialize)]
pub struct SimulateRequest {
    pub algorithm: String,
    #[serde(default)]
    pub processes: Vec<Process>,
    /// Round robin quantum; defaults when absent
    #[serde(default)]
    pub quantum: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_request_trims_url() {
        let req: FetchRequest = serde_json::from_str(r#"{"url": "  http://a/x.css "}"#).unwrap();
        assert_eq!(req.validate(), Ok("http://a/x.css".to_string()));
    }

    #[test]
    fn test_fetch_request_missing_url() {
        let req: FetchRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.validate(), Err("missing url".to_string()));

        let query = FetchQuery::default();
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_blocklist_request_validate() {
        let req: BlocklistRequest = serde_json::from_str(r#"{"domain": " "}"#).unwrap();
        assert_eq!(req.validate(), Err("missing domain".to_string()));
    }

    #[test]
    fn test_simulate_request_deserialize() {
        let json = r#"{
            "algorithm": "rr",
            "processes": [{"id": "P1", "arrival": 0, "burst": 3}],
            "quantum": 1
        }"#;
        let req: SimulateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.algorithm, "rr");
        assert_eq!(req.processes.len(), 1);
        assert_eq!(req.processes[0].burst, 3);
        assert_eq!(req.quantum, Some(1));
    }
}

//! Request and response shapes of the Scalar REST API

use serde::{Deserialize, Deserializer, Serialize};

/// Body of every `POST /api/x` call
#[derive(Debug, Clone, Serialize)]
pub struct QueryEnvelope<P> {
    pub method: String,
    pub params: P,
}

impl<P: Serialize> QueryEnvelope<P> {
    pub fn new(method: impl Into<String>, params: P) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// Listing response `{ data: [...], total }`
#[derive(Debug, Clone, Deserialize)]
pub struct Paged<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

impl<T> Paged<T> {
    /// True when `offset + data.len()` has reached `total`
    pub fn is_last_page(&self, offset: u64) -> bool {
        offset + self.data.len() as u64 >= self.total
    }
}

/// Pagination and filters for listing queries
#[derive(Debug, Clone, Serialize)]
pub struct ListParams {
    pub size: u32,
    pub offset: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            size: 10,
            offset: 0,
            address: None,
            chain: None,
        }
    }
}

impl ListParams {
    pub fn page(size: u32, offset: u64) -> Self {
        Self {
            size,
            offset,
            ..Self::default()
        }
    }

    pub fn for_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossChainStatus {
    Pending,
    Verifying,
    Approved,
    Executing,
    Success,
    Failed,
    #[serde(other)]
    Unknown,
}

impl CrossChainStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, CrossChainStatus::Success | CrossChainStatus::Failed)
    }
}

/// One row of the cross-chain transaction listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CrossChainTx {
    pub id: String,
    #[serde(default)]
    pub command_id: Option<String>,
    pub source_chain: String,
    #[serde(default)]
    pub source_tx_hash: Option<String>,
    pub destination_chain: String,
    #[serde(default)]
    pub destination_tx_hash: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    /// Base units as a decimal string
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub symbol: Option<String>,
    pub status: CrossChainStatus,
    #[serde(default)]
    pub created_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatMetric {
    TxCount,
    Volume,
    ActiveUsers,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatParams {
    pub metric: StatMetric,
    /// Bucket width, e.g. "day"
    pub interval: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<u64>,
}

impl StatParams {
    pub fn daily(metric: StatMetric) -> Self {
        Self {
            metric,
            interval: "day".to_string(),
            from: None,
            to: None,
        }
    }
}

/// Statistics bucket `{ time, data }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatPoint {
    pub time: u64,
    #[serde(deserialize_with = "number_or_string")]
    pub data: f64,
}

/// Volumes come back as decimal strings, counts as numbers
fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let body = QueryEnvelope::new("searchProtocols", ListParams::page(20, 40));
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"method": "searchProtocols", "params": {"size": 20, "offset": 40}})
        );
    }

    #[test]
    fn test_paged_parse() {
        let json = r#"{"data": [{"id": "1", "source_chain": "bitcoin|4", "destination_chain": "evm|11155111", "amount": "100000", "status": "executing", "created_at": 1700000000}], "total": 3}"#;
        let page: Paged<CrossChainTx> = serde_json::from_str(json).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.data[0].status, CrossChainStatus::Executing);
        assert!(!page.data[0].status.is_final());
        assert!(!page.is_last_page(0));
        assert!(page.is_last_page(2));
    }

    #[test]
    fn test_unknown_status() {
        let status: CrossChainStatus = serde_json::from_str(r#""queued""#).unwrap();
        assert_eq!(status, CrossChainStatus::Unknown);
    }

    #[test]
    fn test_stat_points() {
        let json = r#"[{"time": 1700000000, "data": 12}, {"time": 1700086400, "data": "0.5"}]"#;
        let points: Vec<StatPoint> = serde_json::from_str(json).unwrap();
        assert_eq!(points[0].data, 12.0);
        assert_eq!(points[1].data, 0.5);
    }
}

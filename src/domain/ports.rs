use crate::domain::model::{AccountRef, CallId, ContractAddress};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 部署請求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployRequest {
    pub future_id: CallId,
    pub contract: String,
    pub constructor_args: Vec<serde_json::Value>,
    pub from: AccountRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytecode: Option<String>,
}

/// 對已部署合約的狀態變更呼叫
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractCall {
    pub method: String,
    pub args: Vec<serde_json::Value>,
    pub from: AccountRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployReceipt {
    pub address: ContractAddress,
    pub tx_hash: String,
}

/// 執行日誌中的一筆已完成紀錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub call_id: CallId,
    pub method: String,
    pub args: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<ContractAddress>,
    pub tx_hash: String,
    pub recorded_at: DateTime<Utc>,
}

/// 提交狀態變更的外部機制（節點、部署框架或本地帳本）
#[async_trait]
pub trait ContractClient: Send + Sync {
    async fn deploy(&self, request: &DeployRequest) -> Result<DeployReceipt>;
    async fn submit(&self, address: &ContractAddress, call: &ContractCall) -> Result<TxReceipt>;
}

/// 唯讀查詢
#[async_trait]
pub trait ContractReader: Send + Sync {
    async fn read(
        &self,
        address: &ContractAddress,
        method: &str,
        args: &[serde_json::Value],
    ) -> Result<serde_json::Value>;

    /// 閘道啟動時用來確認每條路由都有對應的查詢
    fn supports(&self, _method: &str) -> bool {
        true
    }
}

/// 已完成呼叫的持久化紀錄，重跑時據此跳過
pub trait Journal: Send + Sync {
    fn lookup(
        &self,
        call_id: &CallId,
    ) -> impl std::future::Future<Output = Result<Option<JournalEntry>>> + Send;
    fn record(&self, entry: JournalEntry) -> impl std::future::Future<Output = Result<()>> + Send;
}

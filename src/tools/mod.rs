//! Tool catalog and the generic tool handler
//!
//! Every advertised tool resolves through the same handler; the tool name is
//! only a key into the canned dataset. Authorization is layered on top by
//! [`crate::gate::AuthGate`].

use crate::dataset::DatasetResolver;
use crate::models::{ToolDescriptor, ToolOutcome};
use std::sync::Arc;
use tracing::warn;

/// Handles an already authorized tool call for `phone_number`.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, phone_number: &str, tool_name: &str) -> ToolOutcome;
}

/// Serves `<tool_name>.json` from the identity's dataset directory.
pub struct CannedDataHandler {
    dataset: Arc<DatasetResolver>,
}

impl CannedDataHandler {
    pub fn new(dataset: Arc<DatasetResolver>) -> Self {
        Self { dataset }
    }
}

#[async_trait::async_trait]
impl ToolHandler for CannedDataHandler {
    async fn handle(&self, phone_number: &str, tool_name: &str) -> ToolOutcome {
        match self.dataset.get(phone_number, tool_name).await {
            Ok(Some(bytes)) => ToolOutcome::Data(bytes),
            Ok(None) => {
                warn!(phone_number, tool = tool_name, "no canned dataset for tool");
                ToolOutcome::DataUnavailable(format!(
                    "error reading test data file: no {} data available for {}",
                    tool_name, phone_number
                ))
            }
            Err(e) => {
                warn!(phone_number, tool = tool_name, error = %e, "failed to read canned dataset");
                ToolOutcome::DataUnavailable(format!("error reading test data file: {}", e))
            }
        }
    }
}

/// Fixed registry of tools advertised to the agent.
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self { tools }
    }

    pub fn list(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        create_default_catalog()
    }
}

const DEFAULT_TOOLS: &[(&str, &str)] = &[
    (
        "fetch_net_worth",
        "Calculate comprehensive net worth using ONLY actual data from accounts users connected on Fi Money including: Bank account balances, Mutual fund investment holdings, Indian Stocks investment holdings, Total US Stocks investment (If investing through Fi Money app), EPF account balances, Credit card debt and loan balances (if credit report connected), Any other assets/liabilities linked to Fi Money platform.",
    ),
    (
        "fetch_credit_report",
        "Retrieve comprehensive credit report including scores, active loans, credit card utilization, payment history, date of birth and recent inquiries from connected credit bureaus.",
    ),
    (
        "fetch_epf_details",
        "Retrieve detailed EPF (Employee Provident Fund) account information including: Account balance and contributions, Employer and employee contribution history, Interest earned and credited amounts.",
    ),
    (
        "fetch_mf_transactions",
        "Retrieve detailed transaction history from accounts connected to Fi Money platform including: Mutual fund transactions.",
    ),
    (
        "fetch_bank_transactions",
        "Retrieve detailed bank transactions for each bank account connected to Fi money platform.",
    ),
    (
        "fetch_stock_transactions",
        "Retrieve detailed indian stock transactions for all connected indian stock accounts to Fi money platform.",
    ),
];

/// The six financial data tools, in advertisement order.
pub fn create_default_catalog() -> ToolCatalog {
    ToolCatalog::new(
        DEFAULT_TOOLS
            .iter()
            .map(|(name, description)| ToolDescriptor {
                name: name.to_string(),
                description: description.to_string(),
            })
            .collect(),
    )
}

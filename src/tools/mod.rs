//! Retrieval capabilities the loop can call: the structured financial-data
//! service and web search.

mod data;
mod web;

use std::fmt;

use async_trait::async_trait;

use crate::error::ToolError;

pub use data::DataQueryClient;
pub use web::WebSearchClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    DataQuery,
    WebSearch,
}

impl Capability {
    pub fn label(self) -> &'static str {
        match self {
            Capability::DataQuery => "data_query",
            Capability::WebSearch => "web_search",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Executes one named capability with a text argument.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, capability: Capability, argument: &str) -> Result<String, ToolError>;
}

/// Dispatches each capability to its backing client. A client left out at
/// construction reports `NotConfigured` instead of panicking.
pub struct FinancialTools {
    data: Option<DataQueryClient>,
    web: Option<WebSearchClient>,
}

impl FinancialTools {
    pub fn new(data: Option<DataQueryClient>, web: Option<WebSearchClient>) -> Self {
        Self { data, web }
    }

    pub fn is_configured(&self, capability: Capability) -> bool {
        match capability {
            Capability::DataQuery => self.data.is_some(),
            Capability::WebSearch => self.web.is_some(),
        }
    }
}

#[async_trait]
impl ToolInvoker for FinancialTools {
    async fn invoke(&self, capability: Capability, argument: &str) -> Result<String, ToolError> {
        if argument.trim().is_empty() {
            return Err(ToolError::Other(format!(
                "{capability} called with an empty argument"
            )));
        }
        match capability {
            Capability::DataQuery => match &self.data {
                Some(client) => client.query(argument).await,
                None => Err(ToolError::NotConfigured("DATA_QUERY_URL")),
            },
            Capability::WebSearch => match &self.web {
                Some(client) => client.search(argument).await,
                None => Err(ToolError::NotConfigured("TAVILY_API_KEY")),
            },
        }
    }
}

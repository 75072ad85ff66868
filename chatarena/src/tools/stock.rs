//! Stock quote tool: Alpha Vantage GLOBAL_QUOTE lookup.
//!
//! Returns the provider's raw response payload; provider errors surface
//! as-is to the caller rather than being swallowed.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Tool, ToolError, ToolSpec};

/// Tool name for stock quotes.
pub const TOOL_STOCK_PRICE: &str = "stock_price";

const ALPHA_VANTAGE_URL: &str = "https://www.alphavantage.co/query";

pub struct StockPriceTool {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl StockPriceTool {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: ALPHA_VANTAGE_URL.to_string(),
        }
    }

    /// Point at a different quote endpoint (e.g. a local stub in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Tool for StockPriceTool {
    fn name(&self) -> &str {
        TOOL_STOCK_PRICE
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_STOCK_PRICE.to_string(),
            description: Some(
                "Fetch the latest stock quote for the given symbol (e.g. AAPL, TSLA)."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "symbol": { "type": "string", "description": "Ticker symbol, e.g. AAPL." }
                },
                "required": ["symbol"]
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let symbol = args
            .get("symbol")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidInput("missing 'symbol'".to_string()))?;

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ToolError::Transport(format!("quote request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ToolError::Transport(format!(
                "quote request failed with status: {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ToolError::Transport(format!("failed to read quote response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Spec declares the single required "symbol" argument.
    #[test]
    fn spec_declares_symbol() {
        let spec = StockPriceTool::new("demo").spec();
        assert_eq!(spec.name, "stock_price");
        assert_eq!(spec.input_schema["required"][0], "symbol");
    }

    /// **Scenario**: A missing symbol is rejected before any network I/O.
    #[tokio::test]
    async fn missing_symbol_is_invalid_input() {
        let err = StockPriceTool::new("demo").call(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}

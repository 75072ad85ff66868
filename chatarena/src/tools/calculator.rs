//! Calculator tool: arithmetic on two numbers.
//!
//! Failures the model can recover from (division by zero, an unsupported
//! operation) come back as an in-band `{"error": ...}` result rather than an
//! `Err`, so the turn keeps going and the model can react.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Tool, ToolError, ToolSpec};

/// Tool name for the calculator.
pub const TOOL_CALCULATOR: &str = "calculator";

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        TOOL_CALCULATOR
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_CALCULATOR.to_string(),
            description: Some(
                "Perform an arithmetic operation on two numbers. For example: add 19 with 6 — \
                 num1 is 19, num2 is 6 and operation is add. Supported operations: add, sub, \
                 mult, div."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "num1": { "type": "number", "description": "First operand." },
                    "num2": { "type": "number", "description": "Second operand." },
                    "operation": {
                        "type": "string",
                        "enum": ["add", "sub", "mult", "div"],
                        "description": "Operation to perform."
                    }
                },
                "required": ["num1", "num2", "operation"]
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let num1 = args
            .get("num1")
            .and_then(Value::as_f64)
            .ok_or_else(|| ToolError::InvalidInput("missing numeric 'num1'".to_string()))?;
        let num2 = args
            .get("num2")
            .and_then(Value::as_f64)
            .ok_or_else(|| ToolError::InvalidInput("missing numeric 'num2'".to_string()))?;
        let operation = args
            .get("operation")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidInput("missing 'operation'".to_string()))?;

        let result = match operation {
            "add" => num1 + num2,
            "sub" => num1 - num2,
            "mult" => num1 * num2,
            "div" => {
                if num2 == 0.0 {
                    return Ok(json!({"error": "division by zero is not allowed"}).to_string());
                }
                num1 / num2
            }
            other => {
                return Ok(
                    json!({"error": format!("unsupported operation {other}")}).to_string(),
                );
            }
        };

        Ok(json!({
            "num1": args["num1"],
            "num2": args["num2"],
            "operation": operation,
            "result": json_number(result),
        })
        .to_string())
    }
}

/// Renders a whole-valued result as an integer so `19 + 6` reads `25`, not `25.0`.
fn json_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn call(args: Value) -> Value {
        let text = CalculatorTool.call(args).await.unwrap();
        serde_json::from_str(&text).unwrap()
    }

    /// **Scenario**: calculator(19, 6, add) returns 25 as an integer.
    #[tokio::test]
    async fn add_returns_integer_result() {
        let result = call(json!({"num1": 19, "num2": 6, "operation": "add"})).await;
        assert_eq!(result["result"], 25);
        assert_eq!(result["operation"], "add");
        assert_eq!(result["num1"], 19);
    }

    /// **Scenario**: Division by zero returns an in-band error value, not an Err.
    #[tokio::test]
    async fn div_by_zero_is_in_band_error() {
        let result = call(json!({"num1": 5, "num2": 0, "operation": "div"})).await;
        assert_eq!(result["error"], "division by zero is not allowed");
        assert!(result.get("result").is_none());
    }

    /// **Scenario**: Unsupported operation is an in-band error naming the operation.
    #[tokio::test]
    async fn unsupported_operation_is_in_band_error() {
        let result = call(json!({"num1": 1, "num2": 2, "operation": "pow"})).await;
        assert_eq!(result["error"], "unsupported operation pow");
    }

    /// **Scenario**: sub, mult and fractional div all compute correctly.
    #[tokio::test]
    async fn remaining_operations() {
        let sub = call(json!({"num1": 19, "num2": 6, "operation": "sub"})).await;
        assert_eq!(sub["result"], 13);
        let mult = call(json!({"num1": 12, "num2": 7, "operation": "mult"})).await;
        assert_eq!(mult["result"], 84);
        let div = call(json!({"num1": 7, "num2": 2, "operation": "div"})).await;
        assert_eq!(div["result"], 3.5);
    }

    /// **Scenario**: Missing arguments are an InvalidInput fault, not in-band.
    #[tokio::test]
    async fn missing_argument_is_invalid_input() {
        let err = CalculatorTool
            .call(json!({"num1": 1, "operation": "add"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}

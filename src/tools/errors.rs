use rmcp::ErrorData as McpError;
use rmcp::model::{CallToolResult, Content};
use tokio::task::JoinError;

use crate::dataset::Outcome;

/// Render an outcome as tool output. Store failures stay data: they are
/// returned as an error-flagged result, not as a protocol error.
pub(super) fn outcome_to_result(outcome: &Outcome) -> Result<CallToolResult, McpError> {
    let body = serde_json::to_string_pretty(outcome)
        .map_err(|e| McpError::internal_error(format!("failed to encode result: {e}"), None))?;
    let content = vec![Content::text(body)];
    Ok(if outcome.is_error() {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    })
}

pub(super) fn join_to_mcp_error(e: JoinError) -> McpError {
    McpError::internal_error(format!("dataset task did not complete: {e}"), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Failure;

    #[test]
    fn failure_is_flagged_but_not_a_protocol_error() {
        let outcome = Outcome::Failed(Failure {
            error: "File does not exist: /x.csv".into(),
            action: "validate".into(),
            file_path: "/x.csv".into(),
        });
        let result = outcome_to_result(&outcome).unwrap();
        assert_eq!(result.is_error, Some(true));
        let text = &result.content[0].as_text().unwrap().text;
        assert!(text.contains("\"action\": \"validate\""), "got: {text}");
    }

    #[tokio::test]
    async fn cancelled_task_is_internal_error() {
        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();
        let err = join_to_mcp_error(handle.await.unwrap_err());
        assert_eq!(err.code, rmcp::model::ErrorCode(-32603));
        assert!(err.message.contains("did not complete"), "got: {}", err.message);
    }
}

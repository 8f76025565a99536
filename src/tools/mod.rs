mod errors;
mod params;

pub use params::DatasetParams;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use tracing::info;

use errors::{join_to_mcp_error, outcome_to_result};

use crate::dataset::DatasetStore;

/// MCP server handler exposing the corpus store as a single `dataset` tool.
///
/// Store settings come from the environment, see [`crate::config::Settings`].
#[derive(Clone)]
pub struct Corpus {
    store: DatasetStore,
    default_language: Option<String>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl Corpus {
    pub fn new(store: DatasetStore, default_language: Option<String>) -> Self {
        Self {
            store,
            default_language,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "dataset",
        description = "Manage the text dataset CSV file. Actions: 'create' a new dataset (never overwrites an existing file), 'append' records (creates the file if missing; missing fields get defaults), 'stats' for record counts and text lengths by domain, language and date, 'validate' for quality issues (missing values, empty or short text, duplicates, missing source URLs). Returns a JSON document; failures carry an 'error' field."
    )]
    async fn dataset(
        &self,
        Parameters(params): Parameters<DatasetParams>,
    ) -> Result<CallToolResult, McpError> {
        let request = match params.into_request(self.default_language.as_deref()) {
            Ok(request) => request,
            Err(rejected) => return outcome_to_result(&rejected),
        };

        info!(
            action = %request.action,
            file_path = %request.file_path,
            records = request.data.as_ref().map_or(0, Vec::len),
            "tool:dataset"
        );

        let store = self.store.clone();
        let outcome = tokio::task::spawn_blocking(move || store.execute(request))
            .await
            .map_err(join_to_mcp_error)?;

        outcome_to_result(&outcome)
    }
}

#[tool_handler]
impl ServerHandler for Corpus {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "corpus".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "corpus stores extracted text samples in a CSV dataset (text, source_url, date_extracted, domain, language). Use the dataset tool to create the file, append records as you extract them, and check stats/validate before finishing."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

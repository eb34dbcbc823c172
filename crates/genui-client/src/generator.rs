use crate::error::ClientResult;
use crate::session::SessionContext;
use crate::stream::ChunkStream;
use genui_core::{JsonValue, UiTree};
use serde::Serialize;

/// What a generator is asked to produce.
///
/// Serialized as the request body of [`HttpGenerator`](crate::HttpGenerator):
/// `{"prompt": "...", "context": {...}, "currentTree": {...}}`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    /// Free-form data for the collaborator (catalog hints, user data, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<JsonValue>,
    /// The tree the new response should build on. It is also the base every
    /// patch of the session is replayed onto.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_tree: Option<UiTree>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_tree(mut self, tree: UiTree) -> Self {
        self.current_tree = Some(tree);
        self
    }

    pub fn with_context(mut self, context: JsonValue) -> Self {
        self.context = Some(context);
        self
    }

    /// The base tree of a session started with this request.
    pub fn starting_tree(&self) -> UiTree {
        self.current_tree.clone().unwrap_or_default()
    }
}

/// The model-invocation collaborator.
///
/// A generator turns a request into a stream of raw text chunks: some prose,
/// a `---` line, then newline-delimited patch lines, optionally followed by
/// a `[[TOKENS:...]]` marker. It does not need to respect chunk or line
/// boundaries. Dropping the returned stream must release the underlying
/// request.
#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    /// Open a text stream for `request`.
    ///
    /// # Errors
    ///
    /// Return an error if the stream cannot be opened at all. Failures while
    /// the stream is being read are reported as stream items instead.
    async fn generate(
        &self,
        request: &GenerateRequest,
        ctx: &SessionContext,
    ) -> ClientResult<ChunkStream<'static>>;

    /// Name for logging.
    fn name(&self) -> &'static str {
        "generator"
    }
}

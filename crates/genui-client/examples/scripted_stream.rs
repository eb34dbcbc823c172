//! Streams a canned response through a [`Controller`] and prints every
//! snapshot as it is published.
//!
//! Run with `RUST_LOG=debug` to see the session lifecycle and per-chunk
//! replay statistics.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use genui_client::core::UiTree;
use genui_client::{
    ChunkStream, ClientError, ClientResult, Controller, GenerateRequest, Generator,
    SessionContext, SessionParams, Snapshot, UiSubscriber,
};
use log::info;
use std::sync::Arc;

const RESPONSE: &str = concat!(
    "Here is a small profile card.\n",
    "---\n",
    r#"{"op":"set","path":"/root","value":"card"}"#,
    "\n",
    r#"{"op":"set","path":"/elements/card","value":{"type":"Card","props":{"title":"Ada"},"children":["bio","follow"]}}"#,
    "\n",
    r#"{"op":"set","path":"/elements/bio","value":{"type":"Text","props":{"text":"Mathematician"}}}"#,
    "\n",
    r#"{"op":"set","path":"/elements/follow","value":{"type":"Button","props":{"label":"Follow"}}}"#,
    "\n[[TOKENS:{\"input\":120,\"output\":64}]]",
);

/// Replays [`RESPONSE`] in small, uneven chunks.
struct ScriptedGenerator {
    chunk_size: usize,
    delay: Duration,
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        _request: &GenerateRequest,
        _ctx: &SessionContext,
    ) -> ClientResult<ChunkStream<'static>> {
        let chunks: Vec<Bytes> = RESPONSE
            .as_bytes()
            .chunks(self.chunk_size)
            .map(Bytes::copy_from_slice)
            .collect();
        let delay = self.delay;
        let stream = futures::stream::iter(chunks)
            .then(move |chunk| async move {
                tokio::time::sleep(delay).await;
                Ok::<_, ClientError>(chunk)
            })
            .boxed();
        Ok(stream)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

struct PrintingSubscriber;

#[async_trait]
impl UiSubscriber for PrintingSubscriber {
    async fn on_snapshot(&self, snapshot: &Snapshot, _params: SessionParams<'async_trait>) {
        info!(
            "snapshot #{}: root={:?}, {} elements, {} changes",
            snapshot.sequence,
            snapshot.tree.root,
            snapshot.tree.len(),
            snapshot.delta.len()
        );
    }

    async fn on_conversation(&self, params: SessionParams<'async_trait>) {
        info!("assistant: {}", params.conversation);
    }

    async fn on_complete(&self, tree: &UiTree, params: SessionParams<'async_trait>) {
        let total = params.usage.and_then(|usage| usage.total());
        info!("done: {} elements, {:?} tokens", tree.len(), total);
    }

    async fn on_error(&self, error: &ClientError, _params: SessionParams<'async_trait>) {
        info!("failed: {error}");
    }
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    env_logger::Builder::from_default_env().init();

    let generator = ScriptedGenerator {
        chunk_size: 23,
        delay: Duration::from_millis(30),
    };
    let controller = Controller::with_subscribers(generator, Arc::new(PrintingSubscriber));

    let session = controller
        .send(GenerateRequest::new("a profile card for Ada"))
        .await;
    let outcome = session.wait().await?;

    info!("session ended {}", outcome.status);
    println!("{}", serde_json::to_string_pretty(&*outcome.tree)?);

    Ok(())
}

//! Drives one streaming exchange against the generative service.

use anyhow::Result;
use tracing::warn;

use providers::gemini::GeminiClient;
use shared::agent_api::Turn;

use crate::accumulator::Accumulator;

/// Everything the provider needs for one exchange.
pub struct ExchangeRequest {
    pub system_instruction: String,
    pub turns: Vec<Turn>,
    pub search_enabled: bool,
}

/// Runs the exchange to completion, folding chunks into `accumulator` and
/// invoking `on_update` after every visible change. On failure the
/// accumulator content is replaced with a user-visible error string; the
/// error is also returned so the caller can raise a notification.
pub async fn run(
    client: &GeminiClient,
    request: &ExchangeRequest,
    accumulator: &mut Accumulator,
    mut on_update: impl FnMut(&Accumulator),
) -> Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    accumulator.start();

    let stream = client.generate_stream(
        &request.system_instruction,
        &request.turns,
        request.search_enabled,
        tx,
    );
    let fold = async {
        while let Some(chunk) = rx.recv().await {
            if accumulator.apply(chunk) {
                on_update(accumulator);
            }
        }
    };

    let (result, ()) = tokio::join!(stream, fold);
    if let Err(err) = result {
        warn!(%err, "exchange failed");
        accumulator.fail(&err.to_string());
        return Err(err);
    }
    Ok(())
}

//! Decision substitution and the continuation message.

use super::{ExecutionId, ResultItem};
use crate::types::Message;

/// Opening marker of the helpers-result envelope. Consumed by the renderer.
pub const HELPERS_RESULT_OPEN: &str = "<helpers_result>";
/// Closing marker of the helpers-result envelope.
pub const HELPERS_RESULT_CLOSE: &str = "</helpers_result>";

const COMPLETED_PREAMBLE: &str =
    "The bash command you requested has been completed. Here are the results:";
const DO_NOT_REPEAT: &str = "Please process these results and provide a complete response to the user's original request. Do not run the command again.";

/// Replace the sentinel registered under `execution_id` with `decision`.
///
/// Matching is by embedded id, not position. Returns the new list and the
/// number of entries replaced (zero for a stale or mismatched id).
pub fn substitute_decision(
    results: Vec<ResultItem>,
    execution_id: &ExecutionId,
    decision: &ResultItem,
) -> (Vec<ResultItem>, usize) {
    let mut replaced = 0;
    let updated = results
        .into_iter()
        .map(|item| {
            if item.pending_execution_id() == Some(execution_id) {
                replaced += 1;
                decision.clone()
            } else {
                item
            }
        })
        .collect();
    (updated, replaced)
}

/// Build the user message announcing the completed action.
pub fn build_continuation_message(results: &[ResultItem]) -> Message {
    let mut lines = Vec::with_capacity(results.len() + 4);
    lines.push(COMPLETED_PREAMBLE.to_string());
    lines.push(HELPERS_RESULT_OPEN.to_string());
    lines.extend(results.iter().map(ResultItem::render));
    lines.push(HELPERS_RESULT_CLOSE.to_string());
    lines.push(DO_NOT_REPEAT.to_string());
    Message::user(lines.join("\n"))
}

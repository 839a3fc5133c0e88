use crate::trace::Trace;

/// Splits a flat, time-ordered trace list into one sequence per
/// `action.triggered` marker. Each chunk is an owned copy of its marker whose
/// children are the traces that follow it up to the next marker. Traces
/// before the first marker are dropped.
pub fn chunk_sequences(traces: &[Trace]) -> Vec<Trace> {
    let mut chunks: Vec<Trace> = Vec::new();
    for trace in traces {
        if trace.kind().is_action_triggered() {
            chunks.push(Trace::new(trace.event.clone()));
        } else if let Some(current) = chunks.last_mut() {
            current.traces.push(trace.clone());
        }
    }
    chunks
}

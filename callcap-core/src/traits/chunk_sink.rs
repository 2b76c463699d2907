use crate::models::audio::AudioChunk;

/// Consumer of fixed-size chunks emitted by the streaming engine.
///
/// Invoked from the engine's worker thread. Implementations must not block
/// for long — each chunk arrives once per `chunk_duration` and a slow
/// consumer backs the queues up. Errors are logged per-chunk and never stop
/// the recording; panics are caught at the engine boundary.
pub trait ChunkSink: Send + Sync {
    fn on_chunk(&self, chunk: &AudioChunk) -> Result<(), String>;
}

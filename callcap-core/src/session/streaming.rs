//! Streaming capture: fixed-size chunks emitted to a consumer while the
//! recording is still in progress.
//!
//! Each device callback pushes frames into an unbounded queue (in addition
//! to the full-history buffer kept for final export); a dedicated worker
//! thread drains the queue(s) and emits chunks. Unbounded queues are
//! deliberate — transient consumer slowness must never lose audio — and the
//! queue depth is surfaced in a trace log each poll cycle.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::models::audio::AudioChunk;
use crate::models::config::CaptureConfig;
use crate::models::error::CaptureError;
use crate::models::recording::DualCapture;
use crate::models::state::CaptureState;
use crate::processing::mixer;
use crate::traits::chunk_sink::ChunkSink;
use crate::traits::stream_adapter::{FrameSink, StreamAdapter};

use super::{collect_dual, concat_frames};

/// How long the worker waits on each queue before rechecking the stop flag.
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

pub(crate) enum StreamMsg {
    Frame(Vec<f32>),
    Shutdown,
}

/// Background worker that slices queued frames into fixed-size chunks.
///
/// Dual mode mixes the two queues by per-sample averaging once both hold a
/// full chunk; single mode is the degenerate one-queue case. Shutdown is
/// non-blocking for the producers: a cleared flag plus one sentinel per
/// queue, after which the worker drains what already arrived, flushes the
/// zero-padded tail as one final short chunk, and exits.
pub(crate) struct ChunkEngine {
    active: Arc<AtomicBool>,
    senders: Vec<Sender<StreamMsg>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl ChunkEngine {
    pub(crate) fn start(
        chunk_samples: usize,
        queues: Vec<(Sender<StreamMsg>, Receiver<StreamMsg>)>,
        sink: Arc<dyn ChunkSink>,
    ) -> Self {
        let active = Arc::new(AtomicBool::new(true));
        let (senders, receivers): (Vec<_>, Vec<_>) = queues.into_iter().unzip();

        let worker_active = Arc::clone(&active);
        let worker = thread::Builder::new()
            .name("chunk-engine".into())
            .spawn(move || worker_loop(chunk_samples.max(1), receivers, worker_active, sink))
            .expect("failed to spawn chunk engine thread");

        Self {
            active,
            senders,
            worker: Some(worker),
        }
    }

    /// Signal the worker and wait for it to drain and exit. The signal is a
    /// cleared flag plus a sentinel on each queue — never a blocking queue
    /// operation — so the join is bounded by the poll timeout plus whatever
    /// the consumer is still doing. Idempotent.
    pub(crate) fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        for sender in &self.senders {
            let _ = sender.send(StreamMsg::Shutdown);
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("chunk engine worker panicked");
            }
        }
    }
}

impl Drop for ChunkEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    chunk_samples: usize,
    receivers: Vec<Receiver<StreamMsg>>,
    active: Arc<AtomicBool>,
    sink: Arc<dyn ChunkSink>,
) {
    let mut buffers: Vec<Vec<f32>> = receivers.iter().map(|_| Vec::new()).collect();
    let mut open: Vec<bool> = vec![true; receivers.len()];
    let mut index: u64 = 0;

    while active.load(Ordering::SeqCst) && open.iter().any(|&o| o) {
        for (i, receiver) in receivers.iter().enumerate() {
            if !open[i] {
                continue;
            }
            match receiver.recv_timeout(POLL_TIMEOUT) {
                Ok(StreamMsg::Frame(frame)) => buffers[i].extend_from_slice(&frame),
                Ok(StreamMsg::Shutdown) | Err(RecvTimeoutError::Disconnected) => open[i] = false,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
        emit_full_chunks(&mut buffers, chunk_samples, &mut index, &sink);
        log::trace!(
            "queue depths: {:?}",
            receivers.iter().map(Receiver::len).collect::<Vec<_>>()
        );
    }

    // Drain frames that were queued before the shutdown signal, then flush.
    for (i, receiver) in receivers.iter().enumerate() {
        while let Ok(msg) = receiver.try_recv() {
            if let StreamMsg::Frame(frame) = msg {
                buffers[i].extend_from_slice(&frame);
            }
        }
    }
    emit_full_chunks(&mut buffers, chunk_samples, &mut index, &sink);
    emit_tail(buffers, &mut index, &sink);
}

/// Slice exactly `chunk_samples` from the front of every buffer while all
/// of them hold at least that much, mixing when there are two streams.
fn emit_full_chunks(
    buffers: &mut [Vec<f32>],
    chunk_samples: usize,
    index: &mut u64,
    sink: &Arc<dyn ChunkSink>,
) {
    while !buffers.is_empty() && buffers.iter().all(|b| b.len() >= chunk_samples) {
        let samples = if buffers.len() == 2 {
            let mic: Vec<f32> = buffers[0].drain(..chunk_samples).collect();
            let system: Vec<f32> = buffers[1].drain(..chunk_samples).collect();
            mixer::mix_average(&mic, &system)
        } else {
            buffers[0].drain(..chunk_samples).collect()
        };
        deliver(
            sink,
            AudioChunk {
                samples,
                index: *index,
                is_final: false,
            },
        );
        *index += 1;
    }
}

/// Flush leftover partial buffers as one final short chunk: the shorter
/// remainder is zero-padded to the longer one before mixing.
fn emit_tail(mut buffers: Vec<Vec<f32>>, index: &mut u64, sink: &Arc<dyn ChunkSink>) {
    let longest = buffers.iter().map(Vec::len).max().unwrap_or(0);
    if longest == 0 {
        return;
    }
    let samples = if buffers.len() == 2 {
        mixer::mix_average(&buffers[0], &buffers[1])
    } else {
        std::mem::take(&mut buffers[0])
    };
    deliver(
        sink,
        AudioChunk {
            samples,
            index: *index,
            is_final: true,
        },
    );
    *index += 1;
}

/// Hand a chunk to the consumer. Errors are logged per-chunk and panics are
/// caught at this boundary — a failing consumer must never terminate the
/// worker or abort the recording.
fn deliver(sink: &Arc<dyn ChunkSink>, chunk: AudioChunk) {
    match catch_unwind(AssertUnwindSafe(|| sink.on_chunk(&chunk))) {
        Ok(Ok(())) => {
            log::trace!("chunk {} delivered ({} samples)", chunk.index, chunk.samples.len());
        }
        Ok(Err(err)) => log::warn!("chunk {} callback failed: {}", chunk.index, err),
        Err(_) => log::error!("chunk {} callback panicked", chunk.index),
    }
}

struct StreamShared {
    state: CaptureState,
    frames: Vec<Vec<f32>>,
}

/// Single-stream capture with incremental chunk delivery.
pub struct StreamingSession<A: StreamAdapter> {
    adapter: A,
    config: CaptureConfig,
    shared: Arc<Mutex<StreamShared>>,
    engine: Option<ChunkEngine>,
}

impl<A: StreamAdapter> StreamingSession<A> {
    pub fn new(adapter: A, config: CaptureConfig) -> Self {
        Self {
            adapter,
            config,
            shared: Arc::new(Mutex::new(StreamShared {
                state: CaptureState::Idle,
                frames: Vec::new(),
            })),
            engine: None,
        }
    }

    /// Open the device and start emitting fixed-size chunks to `sink`.
    pub fn start_streaming(&mut self, sink: Arc<dyn ChunkSink>) -> Result<(), CaptureError> {
        self.config.validate().map_err(CaptureError::Config)?;
        {
            let mut shared = self.shared.lock();
            if shared.state.is_active() {
                log::warn!("start_streaming ignored: session already active");
                return Ok(());
            }
            shared.frames.clear();
            shared.state = CaptureState::Recording;
        }

        let (tx, rx) = unbounded();
        let shared = Arc::clone(&self.shared);
        let frame_tx = tx.clone();
        let frame_sink: FrameSink = Arc::new(move |frame: &[f32]| {
            let mut shared = shared.lock();
            if shared.state.is_recording() {
                shared.frames.push(frame.to_vec());
                let _ = frame_tx.send(StreamMsg::Frame(frame.to_vec()));
            }
        });

        if let Err(err) = self.adapter.start(frame_sink) {
            self.shared.lock().state = CaptureState::Idle;
            return Err(err);
        }
        self.engine = Some(ChunkEngine::start(
            self.config.chunk_samples(),
            vec![(tx, rx)],
            sink,
        ));
        log::info!(
            "streaming started (chunks every {:.1}s)",
            self.config.chunk_duration_secs
        );
        Ok(())
    }

    /// Stop the device, drain the chunk worker, and return the complete
    /// recording. Effective even when no data ever arrived; idempotent.
    pub fn stop_streaming(&mut self) -> Vec<f32> {
        let was_active = {
            let mut shared = self.shared.lock();
            let active = shared.state.is_active();
            if active {
                shared.state = CaptureState::Stopping;
            }
            active
        };

        if was_active {
            if let Err(err) = self.adapter.stop() {
                log::warn!("input stream failed to close cleanly: {}", err);
            }
        }
        if let Some(mut engine) = self.engine.take() {
            engine.stop();
        }

        let mut shared = self.shared.lock();
        shared.state = CaptureState::Idle;
        let audio = concat_frames(&shared.frames);
        if audio.is_empty() {
            log::warn!("no audio captured");
        } else if was_active {
            log::info!(
                "streaming stopped ({:.2}s)",
                mixer::samples_to_secs(audio.len(), self.config.sample_rate, self.config.channels)
            );
        }
        audio
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.lock().state.is_recording()
    }
}

struct DualStreamShared {
    state: CaptureState,
    mic_frames: Vec<Vec<f32>>,
    system_frames: Vec<Vec<f32>>,
}

/// Dual-stream capture with incremental mixed-chunk delivery.
///
/// Chunks are emitted only once *both* local buffers hold a full chunk, so
/// the consumer always sees the two streams mixed over the same span.
pub struct StreamingDualSession<M: StreamAdapter, S: StreamAdapter> {
    mic: M,
    system: S,
    config: CaptureConfig,
    shared: Arc<Mutex<DualStreamShared>>,
    engine: Option<ChunkEngine>,
}

impl<M: StreamAdapter, S: StreamAdapter> StreamingDualSession<M, S> {
    pub fn new(mic: M, system: S, config: CaptureConfig) -> Self {
        Self {
            mic,
            system,
            config,
            shared: Arc::new(Mutex::new(DualStreamShared {
                state: CaptureState::Idle,
                mic_frames: Vec::new(),
                system_frames: Vec::new(),
            })),
            engine: None,
        }
    }

    pub fn start_streaming(&mut self, sink: Arc<dyn ChunkSink>) -> Result<(), CaptureError> {
        self.config.validate().map_err(CaptureError::Config)?;
        {
            let mut shared = self.shared.lock();
            if shared.state.is_active() {
                log::warn!("start_streaming ignored: session already active");
                return Ok(());
            }
            shared.mic_frames.clear();
            shared.system_frames.clear();
            shared.state = CaptureState::Recording;
        }

        let (mic_tx, mic_rx) = unbounded();
        let (system_tx, system_rx) = unbounded();

        let shared = Arc::clone(&self.shared);
        let frame_tx = mic_tx.clone();
        let mic_sink: FrameSink = Arc::new(move |frame: &[f32]| {
            let mut shared = shared.lock();
            if shared.state.is_recording() {
                shared.mic_frames.push(frame.to_vec());
                let _ = frame_tx.send(StreamMsg::Frame(frame.to_vec()));
            }
        });
        let shared = Arc::clone(&self.shared);
        let frame_tx = system_tx.clone();
        let system_sink: FrameSink = Arc::new(move |frame: &[f32]| {
            let mut shared = shared.lock();
            if shared.state.is_recording() {
                shared.system_frames.push(frame.to_vec());
                let _ = frame_tx.send(StreamMsg::Frame(frame.to_vec()));
            }
        });

        if let Err(err) = self.mic.start(mic_sink) {
            self.shared.lock().state = CaptureState::Idle;
            return Err(err);
        }
        if let Err(err) = self.system.start(system_sink) {
            if let Err(stop_err) = self.mic.stop() {
                log::warn!("mic stream failed to close cleanly: {}", stop_err);
            }
            self.shared.lock().state = CaptureState::Idle;
            return Err(err);
        }

        self.engine = Some(ChunkEngine::start(
            self.config.chunk_samples(),
            vec![(mic_tx, mic_rx), (system_tx, system_rx)],
            sink,
        ));
        log::info!(
            "dual streaming started (chunks every {:.1}s)",
            self.config.chunk_duration_secs
        );
        Ok(())
    }

    /// Stop both devices, drain the chunk worker, and return the equalized,
    /// mixed recording plus both originals. Idempotent.
    pub fn stop_streaming(&mut self) -> DualCapture {
        let was_active = {
            let mut shared = self.shared.lock();
            let active = shared.state.is_active();
            if active {
                shared.state = CaptureState::Stopping;
            }
            active
        };

        if was_active {
            if let Err(err) = self.mic.stop() {
                log::warn!("mic stream failed to close cleanly: {}", err);
            }
            if let Err(err) = self.system.stop() {
                log::warn!("system stream failed to close cleanly: {}", err);
            }
        }
        if let Some(mut engine) = self.engine.take() {
            engine.stop();
        }

        let mut shared = self.shared.lock();
        shared.state = CaptureState::Idle;
        collect_dual(&shared.mic_frames, &shared.system_frames)
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.lock().state.is_recording()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::{AdapterProbe, FakeAdapter};

    struct CollectSink {
        chunks: Mutex<Vec<AudioChunk>>,
    }

    impl CollectSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                chunks: Mutex::new(Vec::new()),
            })
        }

        fn chunks(&self) -> Vec<AudioChunk> {
            self.chunks.lock().clone()
        }
    }

    impl ChunkSink for CollectSink {
        fn on_chunk(&self, chunk: &AudioChunk) -> Result<(), String> {
            self.chunks.lock().push(chunk.clone());
            Ok(())
        }
    }

    fn config(sample_rate: u32, chunk_secs: f64) -> CaptureConfig {
        CaptureConfig {
            sample_rate,
            chunk_duration_secs: chunk_secs,
            ..Default::default()
        }
    }

    fn single_session(
        sample_rate: u32,
        chunk_secs: f64,
    ) -> (StreamingSession<FakeAdapter>, AdapterProbe) {
        let (adapter, probe) = FakeAdapter::new("test mic");
        (
            StreamingSession::new(adapter, config(sample_rate, chunk_secs)),
            probe,
        )
    }

    #[test]
    fn emits_exact_chunks_with_short_tail() {
        let (mut session, probe) = single_session(1000, 1.0);
        let sink = CollectSink::new();
        session.start_streaming(sink.clone()).unwrap();

        // 2500 samples at a 1000-sample chunk size.
        for _ in 0..5 {
            probe.feed(&[0.5; 500]);
        }
        let audio = session.stop_streaming();
        assert_eq!(audio.len(), 2500);

        let chunks = sink.chunks();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].samples.len(), 1000);
        assert_eq!(chunks[1].samples.len(), 1000);
        assert_eq!(chunks[2].samples.len(), 500);
        assert!(!chunks[0].is_final);
        assert!(chunks[2].is_final);
        assert_eq!(
            chunks.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn five_second_chunks_at_16k_hold_80000_samples() {
        let (mut session, probe) = single_session(16000, 5.0);
        let sink = CollectSink::new();
        session.start_streaming(sink.clone()).unwrap();

        // 10.5 s of audio in 100 ms blocks.
        for _ in 0..105 {
            probe.feed(&[0.1; 1600]);
        }
        session.stop_streaming();

        let chunks = sink.chunks();
        assert_eq!(chunks.len(), 3);
        assert!(chunks[..2].iter().all(|c| c.samples.len() == 80_000));
        assert_eq!(chunks[2].samples.len(), 8_000);
    }

    #[test]
    fn no_chunks_and_empty_buffer_when_nothing_arrived() {
        let (mut session, _probe) = single_session(1000, 1.0);
        let sink = CollectSink::new();
        session.start_streaming(sink.clone()).unwrap();

        let audio = session.stop_streaming();
        assert!(audio.is_empty());
        assert!(sink.chunks().is_empty());

        // A second stop is a quiet no-op.
        assert!(session.stop_streaming().is_empty());
    }

    #[test]
    fn consumer_errors_do_not_stop_the_worker() {
        struct FlakySink {
            chunks: Mutex<Vec<AudioChunk>>,
        }
        impl ChunkSink for FlakySink {
            fn on_chunk(&self, chunk: &AudioChunk) -> Result<(), String> {
                let mut chunks = self.chunks.lock();
                chunks.push(chunk.clone());
                if chunks.len() == 1 {
                    return Err("transient downstream failure".into());
                }
                Ok(())
            }
        }

        let (mut session, probe) = single_session(1000, 1.0);
        let sink = Arc::new(FlakySink {
            chunks: Mutex::new(Vec::new()),
        });
        session.start_streaming(sink.clone()).unwrap();

        probe.feed(&[0.5; 2000]);
        let audio = session.stop_streaming();

        // The failed first chunk did not abort the recording or the worker.
        assert_eq!(audio.len(), 2000);
        assert_eq!(sink.chunks.lock().len(), 2);
    }

    #[test]
    fn consumer_panics_are_contained() {
        struct PanickySink {
            delivered: Mutex<Vec<u64>>,
        }
        impl ChunkSink for PanickySink {
            fn on_chunk(&self, chunk: &AudioChunk) -> Result<(), String> {
                self.delivered.lock().push(chunk.index);
                if chunk.index == 0 {
                    panic!("consumer bug");
                }
                Ok(())
            }
        }

        let (mut session, probe) = single_session(1000, 1.0);
        let sink = Arc::new(PanickySink {
            delivered: Mutex::new(Vec::new()),
        });
        session.start_streaming(sink.clone()).unwrap();

        probe.feed(&[0.5; 2500]);
        let audio = session.stop_streaming();

        assert_eq!(audio.len(), 2500);
        assert_eq!(*sink.delivered.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn dual_chunks_wait_for_both_streams_and_mix() {
        let (mic, mic_probe) = FakeAdapter::new("test mic");
        let (system, system_probe) = FakeAdapter::new("loopback");
        let mut session = StreamingDualSession::new(mic, system, config(1000, 1.0));
        let sink = CollectSink::new();
        session.start_streaming(sink.clone()).unwrap();

        // Mic alone can never trigger a chunk.
        mic_probe.feed(&[0.4; 1500]);
        system_probe.feed(&[0.2; 1200]);

        let capture = session.stop_streaming();
        assert_eq!(capture.mic.len(), 1500);
        assert_eq!(capture.system.len(), 1500);
        assert!(capture.system[1200..].iter().all(|&s| s == 0.0));

        let chunks = sink.chunks();
        assert_eq!(chunks.len(), 2);
        // Full chunk: both streams present, averaged.
        assert_eq!(chunks[0].samples.len(), 1000);
        assert!((chunks[0].samples[0] - 0.3).abs() < 1e-6);
        // Tail: mic remainder 500, system remainder 200 zero-padded.
        assert!(chunks[1].is_final);
        assert_eq!(chunks[1].samples.len(), 500);
        assert!((chunks[1].samples[0] - 0.3).abs() < 1e-6);
        assert!((chunks[1].samples[300] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn dual_streaming_with_silent_loopback_returns_empty() {
        let (mic, mic_probe) = FakeAdapter::new("test mic");
        let (system, _system_probe) = FakeAdapter::new("loopback");
        let mut session = StreamingDualSession::new(mic, system, config(1000, 1.0));
        let sink = CollectSink::new();
        session.start_streaming(sink.clone()).unwrap();

        mic_probe.feed(&[0.4; 800]);
        let capture = session.stop_streaming();

        assert!(capture.is_empty());
        // No full chunk was ever possible; the tail still carries the mic
        // remainder mixed against silence.
        let chunks = sink.chunks();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].samples.len(), 800);
    }

    #[test]
    fn dual_open_failure_releases_the_mic() {
        let (mic, mic_probe) = FakeAdapter::new("test mic");
        let (system, _) = FakeAdapter::failing("loopback");
        let mut session = StreamingDualSession::new(mic, system, config(1000, 1.0));

        let result = session.start_streaming(CollectSink::new());
        assert!(matches!(result, Err(CaptureError::Device(_))));
        assert_eq!(mic_probe.stops(), 1);
        assert!(!session.is_streaming());
    }
}

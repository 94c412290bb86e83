use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use fl_convert::encode_frame;
use fl_core::{CaptureConfig, FrameDescriptor, FrameRate, OutputPixelFormat};
use fl_transport::Transport;
use tracing::{debug, error, info, warn};

use crate::queue::{FrameQueue, PushOutcome};
use crate::stats::{CaptureCounters, CaptureStats};
use crate::worker::SendWorker;
use crate::{CaptureError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
    Stopped,
    Error,
}

/// Per-frame information the engine passes with each readback.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureBaseData {
    pub frame_number: u64,
    pub timecode: Option<Duration>,
}

/// Capture-side half of a session, cheap to clone onto the render thread.
#[derive(Clone)]
pub struct FrameProducer {
    queue: Arc<FrameQueue>,
    counters: Arc<CaptureCounters>,
    accepting: Arc<AtomicBool>,
    format: OutputPixelFormat,
    frame_rate: FrameRate,
}

impl FrameProducer {
    /// Convert a readback and queue it for sending. Never waits on the
    /// network; only the `block` overflow policy may wait for queue space.
    pub fn on_frame_captured(
        &self,
        base: &CaptureBaseData,
        buffer: &[u8],
        width: u32,
        height: u32,
        bytes_per_row: u32,
    ) -> Result<PushOutcome> {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(CaptureError::NotCapturing);
        }

        CaptureCounters::bump(&self.counters.frames_captured);

        let frame = match encode_frame(self.format, buffer, width, height, bytes_per_row) {
            Ok(frame) => frame,
            Err(e) => {
                CaptureCounters::bump(&self.counters.conversion_failures);
                warn!("Dropping frame #{}: {}", base.frame_number, e);
                return Err(e.into());
            }
        };
        let frame = frame
            .with_frame_rate(self.frame_rate)
            .with_timecode(base.timecode);

        let outcome = self.queue.push(frame);
        match outcome {
            PushOutcome::Closed => {
                debug!("Frame #{} arrived after stop, discarded", base.frame_number);
                return Err(CaptureError::NotCapturing);
            }
            PushOutcome::Queued => CaptureCounters::bump(&self.counters.frames_enqueued),
            PushOutcome::DroppedOldest => {
                CaptureCounters::bump(&self.counters.frames_enqueued);
                CaptureCounters::bump(&self.counters.frames_dropped_overflow);
            }
            PushOutcome::Dropped => CaptureCounters::bump(&self.counters.frames_dropped_overflow),
        }

        debug!("Frame #{} {:?}, {} queued", base.frame_number, outcome, self.queue.len());
        Ok(outcome)
    }
}

/// Owns one announced sender and the worker feeding it.
pub struct CaptureSession {
    config: CaptureConfig,
    transport: Arc<dyn Transport>,
    producer: FrameProducer,
    worker: Option<SendWorker>,
    state: CaptureState,
}

impl CaptureSession {
    pub fn new(config: CaptureConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        // Closed until `start` so nothing is queued for a sender that does not exist.
        let queue = Arc::new(FrameQueue::new(&config.queue));
        queue.close();

        let producer = FrameProducer {
            queue,
            counters: Arc::new(CaptureCounters::default()),
            accepting: Arc::new(AtomicBool::new(false)),
            format: config.output_pixel_format,
            frame_rate: config.frame_rate,
        };

        Ok(Self {
            config,
            transport,
            producer,
            worker: None,
            state: CaptureState::Idle,
        })
    }

    pub fn start(&mut self) -> Result<()> {
        if self.state == CaptureState::Capturing {
            return Err(CaptureError::AlreadyRunning);
        }

        let sender = match self.transport.create_sender(&self.config.source_name) {
            Ok(sender) => sender,
            Err(e) => {
                error!("Failed to create sender {:?}: {}", self.config.source_name, e);
                self.state = CaptureState::Error;
                return Err(e.into());
            }
        };

        let stale = self.producer.queue.reopen();
        if stale > 0 {
            debug!("Released {} frames left from a previous run", stale);
        }

        for _ in 0..self.config.placeholder_frames {
            self.producer.queue.push(FrameDescriptor::placeholder());
        }

        let worker = SendWorker::start(
            self.producer.queue.clone(),
            sender,
            self.producer.counters.clone(),
            Duration::from_millis(self.config.idle_sleep_ms),
        );
        match worker {
            Ok(worker) => self.worker = Some(worker),
            Err(e) => {
                error!("Failed to start send worker: {}", e);
                self.producer.queue.close();
                self.state = CaptureState::Error;
                return Err(e);
            }
        }

        self.producer.accepting.store(true, Ordering::Release);
        self.state = CaptureState::Capturing;

        info!(
            "Capturing {:?} as {:?} at {} fps",
            self.config.source_name,
            self.config.output_pixel_format,
            self.config.frame_rate
        );
        Ok(())
    }

    pub fn on_frame_captured(
        &self,
        base: &CaptureBaseData,
        buffer: &[u8],
        width: u32,
        height: u32,
        bytes_per_row: u32,
    ) -> Result<PushOutcome> {
        self.producer
            .on_frame_captured(base, buffer, width, height, bytes_per_row)
    }

    pub fn producer(&self) -> FrameProducer {
        self.producer.clone()
    }

    /// Join the worker, destroy the sender and release queued frames.
    pub fn stop(&mut self) {
        self.producer.accepting.store(false, Ordering::Release);

        // Wakes producers blocked on a full queue; their frames are discarded.
        let released = self.producer.queue.close();

        let Some(mut worker) = self.worker.take() else {
            return;
        };
        worker.stop();

        let released = released + self.producer.queue.close();
        self.state = CaptureState::Stopped;
        info!("Capture of {:?} stopped, released {} queued frames", self.config.source_name, released);
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state == CaptureState::Capturing
    }

    pub fn queue_len(&self) -> usize {
        self.producer.queue.len()
    }

    pub fn stats(&self) -> CaptureStats {
        self.producer.counters.snapshot()
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

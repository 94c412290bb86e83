use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use fl_core::FrameDescriptor;
use fl_transport::VideoSender;
use tracing::{debug, error, info, trace, warn};

use crate::queue::FrameQueue;
use crate::stats::CaptureCounters;
use crate::{CaptureError, Result};

/// Background thread that drains the frame queue into a transport sender.
///
/// The thread owns the sender, so the transport handle is destroyed when
/// the thread exits.
pub struct SendWorker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SendWorker {
    pub fn start(
        queue: Arc<FrameQueue>,
        sender: Box<dyn VideoSender>,
        counters: Arc<CaptureCounters>,
        idle_sleep: Duration,
    ) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let name = format!("fl-send-{}", sender.name());

        let handle = {
            let running = running.clone();
            thread::Builder::new()
                .name(name)
                .spawn(move || run(queue, sender, counters, running, idle_sleep))
                .map_err(CaptureError::Worker)?
        };

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some() && self.running.load(Ordering::Acquire)
    }

    /// Clear the running flag and join. An in-flight send finishes first.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Send worker panicked");
            } else {
                debug!("Send worker joined");
            }
        }
    }
}

impl Drop for SendWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    queue: Arc<FrameQueue>,
    mut sender: Box<dyn VideoSender>,
    counters: Arc<CaptureCounters>,
    running: Arc<AtomicBool>,
    idle_sleep: Duration,
) {
    info!("Send worker started for {}", sender.name());

    while running.load(Ordering::Acquire) {
        let Some(frame) = queue.pop() else {
            thread::sleep(idle_sleep);
            continue;
        };

        if frame.is_placeholder() {
            trace!("Released placeholder frame");
            continue;
        }

        send_one(sender.as_mut(), &frame, &counters);
    }

    info!("Send worker stopping for {}", sender.name());
}

fn send_one(sender: &mut dyn VideoSender, frame: &FrameDescriptor, counters: &CaptureCounters) {
    match sender.send(frame) {
        Ok(()) => {
            CaptureCounters::bump(&counters.frames_sent);
            counters
                .bytes_sent
                .fetch_add(frame.size() as u64, Ordering::Relaxed);
            trace!("Sent {}x{} {} frame", frame.width, frame.height, frame.fourcc);
        }
        Err(e) => {
            CaptureCounters::bump(&counters.send_failures);
            warn!("Send failed: {}", e);
        }
    }
}

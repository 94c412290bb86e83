//! In-process transport: senders announce `HOST (NAME)` and every receiver
//! connected to that name gets its own bounded inbox of frames.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use fl_core::{FrameDescriptor, NetworkSource};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, trace};

use super::*;

#[derive(Default)]
struct NetworkState {
    announced: BTreeSet<String>,
    subscribers: HashMap<String, Vec<Weak<Inbox>>>,
}

impl NetworkState {
    /// Forget subscriptions whose receivers are gone.
    fn prune(&mut self) {
        self.subscribers.retain(|_, inboxes| {
            inboxes.retain(|inbox| inbox.strong_count() > 0);
            !inboxes.is_empty()
        });
    }
}

struct Inbox {
    frames: Mutex<VecDeque<FrameDescriptor>>,
    ready: Condvar,
    depth: usize,
}

impl Inbox {
    fn deliver(&self, frame: &FrameDescriptor) {
        let mut frames = self.frames.lock();
        while frames.len() >= self.depth {
            frames.pop_front();
        }
        frames.push_back(frame.clone());
        self.ready.notify_one();
    }
}

#[derive(Clone)]
pub struct LoopbackNetwork {
    host: String,
    state: Arc<Mutex<NetworkState>>,
}

impl LoopbackNetwork {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            state: Arc::new(Mutex::new(NetworkState::default())),
        }
    }

    /// Name a sender called `name` is announced under.
    pub fn full_name(&self, name: &str) -> String {
        format!("{} ({})", self.host, name)
    }
}

impl Default for LoopbackNetwork {
    fn default() -> Self {
        Self::new("LOOPBACK")
    }
}

impl Transport for LoopbackNetwork {
    fn create_sender(&self, name: &str) -> Result<Box<dyn VideoSender>> {
        if name.trim().is_empty() {
            return Err(TransportError::CreateFailed("sender name is empty".into()));
        }

        let full_name = self.full_name(name);
        {
            let mut state = self.state.lock();
            if !state.announced.insert(full_name.clone()) {
                return Err(TransportError::CreateFailed(format!("{} is already announced", full_name)));
            }
        }

        info!("Loopback source announced: {}", full_name);

        Ok(Box::new(LoopbackSender {
            name: name.to_string(),
            full_name,
            state: self.state.clone(),
        }))
    }

    fn create_receiver(&self, settings: &ReceiverSettings) -> Result<Box<dyn VideoReceiver>> {
        if settings.queue_depth == 0 {
            return Err(TransportError::CreateFailed("receiver queue depth must be at least 1".into()));
        }

        Ok(Box::new(LoopbackReceiver {
            depth: settings.queue_depth,
            state: self.state.clone(),
            inbox: None,
        }))
    }
}

impl SourceFinder for LoopbackNetwork {
    fn current_sources(&self) -> Vec<NetworkSource> {
        self.state
            .lock()
            .announced
            .iter()
            .map(NetworkSource::new)
            .collect()
    }
}

pub struct LoopbackSender {
    name: String,
    full_name: String,
    state: Arc<Mutex<NetworkState>>,
}

impl VideoSender for LoopbackSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, frame: &FrameDescriptor) -> Result<()> {
        let inboxes: Vec<Arc<Inbox>> = {
            let mut state = self.state.lock();
            match state.subscribers.get_mut(&self.full_name) {
                Some(subscribers) => {
                    subscribers.retain(|inbox| inbox.strong_count() > 0);
                    subscribers.iter().filter_map(Weak::upgrade).collect()
                }
                None => Vec::new(),
            }
        };

        for inbox in &inboxes {
            inbox.deliver(frame);
        }

        trace!("Loopback {} delivered {} bytes to {} receivers", self.full_name, frame.size(), inboxes.len());
        Ok(())
    }
}

impl Drop for LoopbackSender {
    fn drop(&mut self) {
        self.state.lock().announced.remove(&self.full_name);
        info!("Loopback source withdrawn: {}", self.full_name);
    }
}

pub struct LoopbackReceiver {
    depth: usize,
    state: Arc<Mutex<NetworkState>>,
    inbox: Option<Arc<Inbox>>,
}

impl VideoReceiver for LoopbackReceiver {
    fn connect(&mut self, source: &NetworkSource) -> Result<()> {
        // Drop the previous subscription before pruning.
        self.inbox = None;

        let inbox = Arc::new(Inbox {
            frames: Mutex::new(VecDeque::with_capacity(self.depth)),
            ready: Condvar::new(),
            depth: self.depth,
        });

        {
            let mut state = self.state.lock();
            state.prune();
            if !state.announced.contains(&source.name) {
                debug!("Connecting to {} before it is announced", source.name);
            }
            state
                .subscribers
                .entry(source.name.clone())
                .or_default()
                .push(Arc::downgrade(&inbox));
        }

        self.inbox = Some(inbox);
        info!("Loopback receiver connected to {}", source.name);
        Ok(())
    }

    fn poll_frame(&mut self, timeout: Duration) -> Result<Option<FrameDescriptor>> {
        let inbox = self.inbox.as_ref().ok_or(TransportError::NotConnected)?;
        let deadline = Instant::now() + timeout;

        let mut frames = inbox.frames.lock();
        loop {
            if let Some(frame) = frames.pop_front() {
                return Ok(Some(frame));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            inbox.ready.wait_until(&mut frames, deadline);
        }
    }
}

impl Drop for LoopbackReceiver {
    fn drop(&mut self) {
        if self.inbox.take().is_some() {
            self.state.lock().prune();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fl_core::FourCC;

    fn frame(tag: u8) -> FrameDescriptor {
        FrameDescriptor::new(1, 1, 4, FourCC::BGRA, vec![tag; 4])
    }

    #[test]
    fn test_sender_announces_and_withdraws() {
        let network = LoopbackNetwork::new("HOST");
        let sender = network.create_sender("cam").unwrap();

        assert_eq!(network.current_sources(), vec![NetworkSource::new("HOST (cam)")]);
        assert!(network.create_sender("cam").is_err());

        drop(sender);
        assert!(network.current_sources().is_empty());
    }

    #[test]
    fn test_frames_reach_connected_receiver() {
        let network = LoopbackNetwork::new("HOST");
        let mut sender = network.create_sender("cam").unwrap();
        let mut receiver = network.create_receiver(&ReceiverSettings::default()).unwrap();

        assert!(matches!(receiver.poll_frame(Duration::ZERO), Err(TransportError::NotConnected)));

        receiver.connect(&NetworkSource::new("HOST (cam)")).unwrap();
        assert!(receiver.poll_frame(Duration::ZERO).unwrap().is_none());

        sender.send(&frame(1)).unwrap();
        sender.send(&frame(2)).unwrap();

        assert_eq!(receiver.poll_frame(Duration::ZERO).unwrap().unwrap().data[0], 1);
        assert_eq!(receiver.poll_frame(Duration::ZERO).unwrap().unwrap().data[0], 2);
    }

    #[test]
    fn test_inbox_discards_oldest_when_full() {
        let network = LoopbackNetwork::new("HOST");
        let mut sender = network.create_sender("cam").unwrap();
        let settings = ReceiverSettings {
            queue_depth: 2,
            ..Default::default()
        };
        let mut receiver = network.create_receiver(&settings).unwrap();
        receiver.connect(&NetworkSource::new("HOST (cam)")).unwrap();

        for tag in 1..=3 {
            sender.send(&frame(tag)).unwrap();
        }

        assert_eq!(receiver.poll_frame(Duration::ZERO).unwrap().unwrap().data[0], 2);
        assert_eq!(receiver.poll_frame(Duration::ZERO).unwrap().unwrap().data[0], 3);
    }

    #[test]
    fn test_poll_waits_for_frame() {
        let network = LoopbackNetwork::new("HOST");
        let mut sender = network.create_sender("cam").unwrap();
        let mut receiver = network.create_receiver(&ReceiverSettings::default()).unwrap();
        receiver.connect(&NetworkSource::new("HOST (cam)")).unwrap();

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            sender.send(&frame(9)).unwrap();
            sender
        });

        let got = receiver.poll_frame(Duration::from_secs(5)).unwrap();
        assert_eq!(got.unwrap().data[0], 9);
        drop(handle.join().unwrap());
    }

    #[test]
    fn test_unannounced_subscriptions_are_forgotten() {
        let network = LoopbackNetwork::new("HOST");

        let mut receiver = network.create_receiver(&ReceiverSettings::default()).unwrap();
        receiver.connect(&NetworkSource::new("HOST (ghost)")).unwrap();
        receiver.connect(&NetworkSource::new("HOST (phantom)")).unwrap();
        {
            let state = network.state.lock();
            assert!(!state.subscribers.contains_key("HOST (ghost)"));
            assert_eq!(state.subscribers["HOST (phantom)"].len(), 1);
        }

        drop(receiver);
        assert!(network.state.lock().subscribers.is_empty());
    }
}

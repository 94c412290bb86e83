use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fl_convert::{decode_metadata, decode_video, ConvertError};
use fl_core::{FourCC, FrameDescriptor, NetworkSource, PlayerConfig};
use fl_transport::{ReceiverSettings, SourceFinder, Transport, VideoReceiver};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::sink::SampleSink;
use crate::source::{find_source, parse_url};
use crate::{PlayerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Closed,
    Preparing,
    Connecting,
    Playing,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    Connecting,
    Opened,
    OpenFailed,
    Closed,
    VideoSampleDropped,
    UnsupportedFormat(FourCC),
}

/// What a single tick did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub dropped_video: usize,
    pub video: bool,
    pub metadata: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlayerStats {
    pub frames_received: u64,
    pub video_samples: u64,
    pub metadata_samples: u64,
    pub unsupported_frames: u64,
    pub decode_failures: u64,
    pub video_samples_dropped: u64,
    pub poll_failures: u64,
}

/// Receives frames from one network source and feeds decoded samples to a sink.
///
/// Everything runs on the caller's thread: [`tick`](Self::tick) is expected
/// once per playback frame.
pub struct MediaPlayer<S: SampleSink> {
    config: PlayerConfig,
    transport: Arc<dyn Transport>,
    finder: Arc<dyn SourceFinder>,
    sink: S,
    receiver: Option<Box<dyn VideoReceiver>>,
    source: Option<NetworkSource>,
    state: PlayerState,
    events: VecDeque<PlayerEvent>,
    stats: PlayerStats,
    clock: Instant,
}

impl<S: SampleSink> MediaPlayer<S> {
    pub fn new(
        config: PlayerConfig,
        transport: Arc<dyn Transport>,
        finder: Arc<dyn SourceFinder>,
        sink: S,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            transport,
            finder,
            sink,
            receiver: None,
            source: None,
            state: PlayerState::Closed,
            events: VecDeque::new(),
            stats: PlayerStats::default(),
            clock: Instant::now(),
        })
    }

    /// Resolve `url` against the visible sources and connect to the match.
    pub fn open(&mut self, url: &str) -> Result<()> {
        self.receiver = None;
        self.source = None;
        self.state = PlayerState::Preparing;

        match self.connect(url) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Failed to open {:?}: {}", url, e);
                self.state = PlayerState::Error;
                self.events.push_back(PlayerEvent::OpenFailed);
                Err(e)
            }
        }
    }

    fn connect(&mut self, url: &str) -> Result<()> {
        let wanted = parse_url(url, &self.config.scheme)?;

        let sources = self.finder.current_sources();
        debug!("{} sources visible", sources.len());

        let source = find_source(&sources, wanted, self.config.source_match)
            .cloned()
            .ok_or_else(|| PlayerError::SourceNotFound(wanted.to_string()))?;

        let settings = ReceiverSettings {
            queue_depth: self.config.receiver_queue_depth,
            ..Default::default()
        };
        let mut receiver = self.transport.create_receiver(&settings)?;

        self.state = PlayerState::Connecting;
        self.events.push_back(PlayerEvent::Connecting);

        receiver.connect(&source)?;

        info!("Playing {}", source);
        self.receiver = Some(receiver);
        self.source = Some(source);
        self.state = PlayerState::Playing;
        self.events.push_back(PlayerEvent::Opened);
        Ok(())
    }

    /// Release the receive handle. Safe to call in any state.
    pub fn close(&mut self) {
        self.receiver = None;

        if let Some(source) = self.source.take() {
            info!("Closed {}", source);
        }
        if self.state != PlayerState::Closed {
            self.events.push_back(PlayerEvent::Closed);
        }
        self.state = PlayerState::Closed;
    }

    /// Poll once, trim the sink's backlog and hand any frame to the decoders.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        if self.state != PlayerState::Playing {
            return report;
        }

        let timeout = Duration::from_millis(self.config.poll_timeout_ms);
        let polled = match self.receiver.as_mut() {
            Some(receiver) => receiver.poll_frame(timeout),
            None => return report,
        };

        report.dropped_video = self.drain_backlog();

        match polled {
            Ok(Some(frame)) => self.deliver(&frame, &mut report),
            Ok(None) => trace!("No frame ready"),
            Err(e) => {
                self.stats.poll_failures += 1;
                warn!("Poll failed: {}", e);
            }
        }

        report
    }

    fn drain_backlog(&mut self) -> usize {
        let mut dropped = 0;
        while self.sink.pending_video_count() > self.config.max_pending_video {
            if !self.sink.pop_oldest_video() {
                break;
            }
            dropped += 1;
            self.events.push_back(PlayerEvent::VideoSampleDropped);
        }

        if dropped > 0 {
            self.stats.video_samples_dropped += dropped as u64;
            debug!("Video buffer underflow, dropped {} samples", dropped);
        }
        dropped
    }

    fn deliver(&mut self, frame: &FrameDescriptor, report: &mut TickReport) {
        self.stats.frames_received += 1;
        let time = self.clock.elapsed();

        if let Some(sample) = decode_metadata(frame, time) {
            self.sink.add_metadata_sample(sample);
            self.stats.metadata_samples += 1;
            report.metadata = true;
        }

        match decode_video(frame, time) {
            Ok(sample) => {
                trace!("{}x{} {:?} sample at {:?}", sample.width, sample.height, sample.format, time);
                self.sink.add_video_sample(sample);
                self.stats.video_samples += 1;
                report.video = true;
            }
            Err(ConvertError::Unsupported(fourcc)) => {
                self.stats.unsupported_frames += 1;
                warn!("Unsupported pixel format {}", fourcc);
                self.events.push_back(PlayerEvent::UnsupportedFormat(fourcc));
            }
            Err(e) => {
                self.stats.decode_failures += 1;
                warn!("Dropping {} frame: {}", frame.fourcc, e);
            }
        }
    }

    pub fn next_event(&mut self) -> Option<PlayerEvent> {
        self.events.pop_front()
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
    }

    pub fn has_receiver(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn source(&self) -> Option<&NetworkSource> {
        self.source.as_ref()
    }

    pub fn stats(&self) -> PlayerStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MediaSamples;
    use fl_core::{SampleFormat, SourceMatch, VideoSample};
    use fl_transport::LoopbackNetwork;

    fn player(network: &LoopbackNetwork, config: PlayerConfig) -> MediaPlayer<MediaSamples> {
        MediaPlayer::new(
            config,
            Arc::new(network.clone()),
            Arc::new(network.clone()),
            MediaSamples::new(),
        )
        .unwrap()
    }

    fn sample(tag: u8) -> VideoSample {
        VideoSample {
            data: vec![tag; 4].into(),
            stride: 4,
            width: 1,
            height: 1,
            format: SampleFormat::CharBgra,
            time: Duration::ZERO,
            frame_rate: Default::default(),
            timecode: None,
        }
    }

    fn events(player: &mut MediaPlayer<MediaSamples>) -> Vec<PlayerEvent> {
        std::iter::from_fn(|| player.next_event()).collect()
    }

    #[test]
    fn test_open_without_match_fails() {
        let network = LoopbackNetwork::new("HOST");
        let _sender = network.create_sender("other").unwrap();
        let mut player = player(&network, PlayerConfig::default());

        assert!(matches!(player.open("ndimediain://cam"), Err(PlayerError::SourceNotFound(_))));
        assert!(!player.is_playing());
        assert_eq!(player.state(), PlayerState::Error);
        assert!(!player.has_receiver());
        assert_eq!(events(&mut player), vec![PlayerEvent::OpenFailed]);
    }

    #[test]
    fn test_open_rejects_foreign_scheme() {
        let network = LoopbackNetwork::new("HOST");
        let _sender = network.create_sender("cam").unwrap();
        let mut player = player(&network, PlayerConfig::default());

        assert!(matches!(player.open("rtsp://cam"), Err(PlayerError::UnsupportedScheme(_))));
        assert!(!player.is_playing());
    }

    #[test]
    fn test_open_and_close() {
        let network = LoopbackNetwork::new("HOST");
        let _sender = network.create_sender("cam").unwrap();
        let mut player = player(&network, PlayerConfig::default());

        player.open("ndimediain://cam").unwrap();
        assert!(player.is_playing());
        assert_eq!(player.source().unwrap().name, "HOST (cam)");

        player.close();
        player.close();
        assert_eq!(player.state(), PlayerState::Closed);
        assert!(!player.has_receiver());
        assert_eq!(
            events(&mut player),
            vec![PlayerEvent::Connecting, PlayerEvent::Opened, PlayerEvent::Closed]
        );
        assert_eq!(player.tick(), TickReport::default());
    }

    #[test]
    fn test_full_name_policy() {
        let network = LoopbackNetwork::new("HOST");
        let _sender = network.create_sender("cam").unwrap();
        let config = PlayerConfig {
            source_match: SourceMatch::FullName,
            ..Default::default()
        };
        let mut player = player(&network, config);

        assert!(player.open("ndimediain://cam").is_err());
        player.open("ndimediain://HOST (cam)").unwrap();
        assert!(player.is_playing());
    }

    #[test]
    fn test_underflow_keeps_newest_sample() {
        let network = LoopbackNetwork::new("HOST");
        let _sender = network.create_sender("cam").unwrap();
        let mut player = player(&network, PlayerConfig::default());
        player.open("ndimediain://cam").unwrap();
        events(&mut player);

        for tag in 1..=3 {
            player.sink_mut().add_video_sample(sample(tag));
        }

        let report = player.tick();
        assert_eq!(report.dropped_video, 2);
        assert!(!report.video);
        assert_eq!(player.sink().pending_video_count(), 1);
        assert_eq!(player.sink_mut().fetch_video().unwrap().data[0], 3);
        assert_eq!(
            events(&mut player),
            vec![PlayerEvent::VideoSampleDropped, PlayerEvent::VideoSampleDropped]
        );
        assert_eq!(player.stats().video_samples_dropped, 2);
    }

    #[test]
    fn test_tick_decodes_frames_and_metadata() {
        let network = LoopbackNetwork::new("HOST");
        let mut sender = network.create_sender("cam").unwrap();
        let mut player = player(&network, PlayerConfig::default());
        player.open("ndimediain://cam").unwrap();

        assert_eq!(player.tick(), TickReport::default());

        let frame = FrameDescriptor::new(2, 1, 8, FourCC::BGRA, vec![9u8; 8]).with_metadata("<tally/>");
        sender.send(&frame).unwrap();

        let report = player.tick();
        assert!(report.video && report.metadata);

        let video = player.sink_mut().fetch_video().unwrap();
        assert_eq!(video.format, SampleFormat::CharBgra);
        assert_eq!(video.stride, 8);
        let metadata = player.sink_mut().fetch_metadata().unwrap();
        assert_eq!(&metadata.data[..], b"<tally/>");
    }

    #[test]
    fn test_unsupported_frame_still_delivers_metadata() {
        let network = LoopbackNetwork::new("HOST");
        let mut sender = network.create_sender("cam").unwrap();
        let mut player = player(&network, PlayerConfig::default());
        player.open("ndimediain://cam").unwrap();
        events(&mut player);

        let frame = FrameDescriptor::new(2, 2, 2, FourCC::NV12, vec![0u8; 6]).with_metadata("<x/>");
        sender.send(&frame).unwrap();

        let report = player.tick();
        assert!(!report.video);
        assert!(report.metadata);
        assert_eq!(player.stats().unsupported_frames, 1);
        assert_eq!(events(&mut player), vec![PlayerEvent::UnsupportedFormat(FourCC::NV12)]);
        assert!(player.is_playing());
    }

    #[test]
    fn test_reopen_replaces_receiver() {
        let network = LoopbackNetwork::new("HOST");
        let _a = network.create_sender("a").unwrap();
        let _b = network.create_sender("b").unwrap();
        let mut player = player(&network, PlayerConfig::default());

        player.open("ndimediain://a").unwrap();
        player.open("ndimediain://b").unwrap();
        assert_eq!(player.source().unwrap().name, "HOST (b)");

        assert!(player.open("ndimediain://c").is_err());
        assert!(!player.has_receiver());
        assert!(player.source().is_none());
    }
}

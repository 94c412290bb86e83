use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use fl_capture::{CaptureBaseData, CaptureSession};
use fl_player::{MediaPlayer, MediaSamples};
use fl_transport::{SourceFinder, Transport};

use crate::config::Config;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::pattern::PatternGenerator;

/// Drives capture and playback pipelines from tokio timers.
pub struct Bridge {
    config: Config,
    metrics: Arc<RwLock<MetricsCollector>>,
    shutdown_tx: broadcast::Sender<()>,
    pipelines: Vec<JoinHandle<()>>,
    reporter: Option<JoinHandle<()>>,
}

impl Bridge {
    pub fn new(config: Config) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            metrics: Arc::new(RwLock::new(MetricsCollector::new())),
            shutdown_tx,
            pipelines: Vec::new(),
            reporter: None,
        }
    }

    /// Start a capture session fed by the test pattern. Stops on its own
    /// after `limit` frames if given.
    pub fn start_sender(&mut self, transport: Arc<dyn Transport>, limit: Option<u64>) -> Result<()> {
        let mut session = CaptureSession::new(self.config.capture.clone(), transport)
            .context("Failed to create capture session")?;
        session.start().context("Failed to start capture")?;

        let generator = PatternGenerator::new(
            self.config.run.pattern,
            self.config.capture.output_pixel_format,
            self.config.run.width,
            self.config.run.height,
        );
        let period = self
            .config
            .capture
            .frame_rate
            .frame_duration()
            .unwrap_or(Duration::from_millis(16));

        info!(
            "✓ Sending {:?} pattern {}x{} every {:?}",
            self.config.run.pattern, self.config.run.width, self.config.run.height, period
        );

        let metrics = self.metrics.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        self.pipelines.push(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut frame_number = 0u64;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let readback = generator.frame(frame_number);
                        let base = CaptureBaseData {
                            frame_number,
                            timecode: Some(period.saturating_mul(frame_number as u32)),
                        };

                        if let Err(e) = session.on_frame_captured(
                            &base,
                            &readback.data,
                            readback.width,
                            readback.height,
                            readback.bytes_per_row,
                        ) {
                            warn!("Frame #{} rejected: {}", frame_number, e);
                        }

                        frame_number += 1;
                        metrics.write().await.capture = Some(session.stats());

                        if limit.is_some_and(|limit| frame_number >= limit) {
                            debug!("Sent {} frames, stopping", frame_number);
                            break;
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Sender shutting down");
                        break;
                    }
                }
            }

            // Let the worker drain what is already queued before stopping.
            let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
            while session.queue_len() > 0 && tokio::time::Instant::now() < deadline {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }

            session.stop();
            metrics.write().await.capture = Some(session.stats());
        }));

        Ok(())
    }

    /// Open `url` and tick a player against it. Stops on its own after
    /// `limit` video samples if given.
    pub fn start_receiver(
        &mut self,
        transport: Arc<dyn Transport>,
        finder: Arc<dyn SourceFinder>,
        url: &str,
        limit: Option<u64>,
    ) -> Result<()> {
        let mut player = MediaPlayer::new(self.config.player.clone(), transport, finder, MediaSamples::new())
            .context("Failed to create player")?;
        player.open(url).with_context(|| format!("Failed to open {}", url))?;

        info!("✓ Receiving from {}", url);

        let period = Duration::from_millis(self.config.run.tick_interval_ms);
        let metrics = self.metrics.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        self.pipelines.push(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut consumed = 0u64;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        player.tick();

                        while let Some(sample) = player.sink_mut().fetch_video() {
                            consumed += 1;
                            debug!("Sample {}x{} {:?} ({} bytes)", sample.width, sample.height, sample.format, sample.size());
                        }
                        while let Some(metadata) = player.sink_mut().fetch_metadata() {
                            debug!("Metadata ({} bytes)", metadata.data.len());
                        }
                        while let Some(event) = player.next_event() {
                            debug!("Player event {:?}", event);
                        }

                        {
                            let mut m = metrics.write().await;
                            m.player = Some(player.stats());
                            m.samples_consumed = consumed;
                        }

                        if limit.is_some_and(|limit| consumed >= limit) {
                            debug!("Received {} samples, stopping", consumed);
                            break;
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Receiver shutting down");
                        break;
                    }
                }
            }

            player.close();
        }));

        Ok(())
    }

    /// Periodically log statistics, or print them as JSON lines.
    pub fn start_reporter(&mut self, json: bool) {
        let metrics = self.metrics.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let every = Duration::from_secs(self.config.run.stats_interval_secs);

        self.reporter = Some(tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let snapshot = metrics.read().await.snapshot();
                        report(&snapshot, json);
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        }));
    }

    /// Wait for every pipeline to finish on its own.
    pub async fn wait(&mut self) {
        // Pop only after completion so a cancelled wait can be resumed.
        while let Some(pipeline) = self.pipelines.last_mut() {
            if let Err(e) = pipeline.await {
                warn!("Pipeline task failed: {}", e);
            }
            self.pipelines.pop();
        }
    }

    pub async fn stop(&mut self) -> MetricsSnapshot {
        info!("Stopping bridge...");

        let _ = self.shutdown_tx.send(());
        self.wait().await;
        if let Some(reporter) = self.reporter.take() {
            let _ = reporter.await;
        }

        self.metrics.read().await.snapshot()
    }
}

pub fn report(snapshot: &MetricsSnapshot, json: bool) {
    if json {
        println!("{}", snapshot.to_json());
        return;
    }

    if let Some(capture) = &snapshot.capture {
        info!(
            "📊 Capture: {:.1} fps sent, {} dropped, {} send failures, {} MB",
            snapshot.send_fps,
            capture.frames_dropped_overflow,
            capture.send_failures,
            capture.bytes_sent / 1_000_000
        );
    }
    if let Some(player) = &snapshot.player {
        info!(
            "📊 Player: {:.1} fps received, {} underflow drops, {} unsupported",
            snapshot.receive_fps, player.video_samples_dropped, player.unsupported_frames
        );
    }
}

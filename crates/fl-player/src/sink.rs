use std::collections::VecDeque;

use fl_core::{MetadataSample, VideoSample};

/// Where decoded samples go.
pub trait SampleSink {
    fn add_video_sample(&mut self, sample: VideoSample);
    fn add_metadata_sample(&mut self, sample: MetadataSample);

    /// Video samples added but not yet consumed.
    fn pending_video_count(&self) -> usize;

    /// Discard the oldest pending video sample. `false` when none was pending.
    fn pop_oldest_video(&mut self) -> bool;
}

/// Queue-backed sink the playback side fetches from.
#[derive(Debug, Default)]
pub struct MediaSamples {
    video: VecDeque<VideoSample>,
    metadata: VecDeque<MetadataSample>,
}

impl MediaSamples {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch_video(&mut self) -> Option<VideoSample> {
        self.video.pop_front()
    }

    pub fn fetch_metadata(&mut self) -> Option<MetadataSample> {
        self.metadata.pop_front()
    }

    pub fn pending_metadata_count(&self) -> usize {
        self.metadata.len()
    }

    pub fn flush(&mut self) {
        self.video.clear();
        self.metadata.clear();
    }
}

impl SampleSink for MediaSamples {
    fn add_video_sample(&mut self, sample: VideoSample) {
        self.video.push_back(sample);
    }

    fn add_metadata_sample(&mut self, sample: MetadataSample) {
        self.metadata.push_back(sample);
    }

    fn pending_video_count(&self) -> usize {
        self.video.len()
    }

    fn pop_oldest_video(&mut self) -> bool {
        self.video.pop_front().is_some()
    }
}

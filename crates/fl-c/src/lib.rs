use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_uint, c_void};
use std::ptr;
use std::sync::Arc;
use std::time::Duration;

use libc::size_t;

use fl_capture::{CaptureBaseData, CaptureError, CaptureSession, PushOutcome};
use fl_core::{
    CaptureConfig, FrameRate, MetadataSample, OutputPixelFormat, OverflowPolicy, PlayerConfig,
    QueueConfig, SampleFormat, SourceMatch, TransportConfig, VideoSample,
};
use fl_player::{MediaPlayer, PlayerError, SampleSink};
use fl_transport::{SourceFinder, Transport, TransportFactory};

static INIT: std::sync::Once = std::sync::Once::new();

fn init_logging() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        // The host may already own a global subscriber.
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}

// ============================================
// C-Compatible Types
// ============================================

/// Opaque handle to a transport and its source finder
pub struct FlTransport {
    transport: Arc<dyn Transport>,
    finder: Arc<dyn SourceFinder>,
}

/// Opaque handle to a capture session
pub struct FlCapture {
    session: CaptureSession,
}

/// Opaque handle to a media player
pub struct FlPlayer {
    player: MediaPlayer<CallbackSink>,
}

/// Status codes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlStatus {
    Success = 0,
    NullPointer = 1,
    InvalidArgument = 2,
    InvalidConfig = 3,
    CreateFailed = 4,
    AlreadyRunning = 5,
    NotRunning = 6,
    ConversionFailed = 7,
    FrameDropped = 8,
    OpenFailed = 9,
    TransportError = 10,
}

impl From<&CaptureError> for FlStatus {
    fn from(e: &CaptureError) -> Self {
        match e {
            CaptureError::AlreadyRunning => FlStatus::AlreadyRunning,
            CaptureError::NotCapturing => FlStatus::NotRunning,
            CaptureError::Worker(_) => FlStatus::CreateFailed,
            CaptureError::Config(_) => FlStatus::InvalidConfig,
            CaptureError::Convert(_) => FlStatus::ConversionFailed,
            CaptureError::Transport(_) => FlStatus::TransportError,
        }
    }
}

impl From<&PlayerError> for FlStatus {
    fn from(e: &PlayerError) -> Self {
        match e {
            PlayerError::Config(_) => FlStatus::InvalidConfig,
            PlayerError::Transport(_) => FlStatus::TransportError,
            PlayerError::MalformedUrl(_)
            | PlayerError::UnsupportedScheme(_)
            | PlayerError::SourceNotFound(_) => FlStatus::OpenFailed,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub enum FlPixelFormat {
    Rgb = 0,
    P210 = 1,
}

impl From<FlPixelFormat> for OutputPixelFormat {
    fn from(f: FlPixelFormat) -> Self {
        match f {
            FlPixelFormat::Rgb => OutputPixelFormat::Rgb,
            FlPixelFormat::P210 => OutputPixelFormat::P210,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub enum FlOverflow {
    DropOldest = 0,
    DropNewest = 1,
    Block = 2,
}

impl From<FlOverflow> for OverflowPolicy {
    fn from(o: FlOverflow) -> Self {
        match o {
            FlOverflow::DropOldest => OverflowPolicy::DropOldest,
            FlOverflow::DropNewest => OverflowPolicy::DropNewest,
            FlOverflow::Block => OverflowPolicy::Block,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub enum FlSourceMatch {
    SourceName = 0,
    FullName = 1,
}

impl From<FlSourceMatch> for SourceMatch {
    fn from(m: FlSourceMatch) -> Self {
        match m {
            FlSourceMatch::SourceName => SourceMatch::SourceName,
            FlSourceMatch::FullName => SourceMatch::FullName,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlSampleFormat {
    CharBgra = 0,
    CharUyvy = 1,
    Y416 = 2,
}

impl From<SampleFormat> for FlSampleFormat {
    fn from(f: SampleFormat) -> Self {
        match f {
            SampleFormat::CharBgra => FlSampleFormat::CharBgra,
            SampleFormat::CharUyvy => FlSampleFormat::CharUyvy,
            SampleFormat::Y416 => FlSampleFormat::Y416,
        }
    }
}

/// Capture configuration
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FlCaptureConfig {
    /// Name announced on the network (UTF-8, NUL terminated)
    pub source_name: *const c_char,
    pub output_pixel_format: FlPixelFormat,
    pub frame_rate_n: c_uint,
    pub frame_rate_d: c_uint,
    /// 0 means unbounded
    pub queue_capacity: c_uint,
    pub overflow: FlOverflow,
    pub block_timeout_ms: c_uint,
    pub placeholder_frames: c_uint,
}

impl Default for FlCaptureConfig {
    fn default() -> Self {
        Self {
            source_name: c"framelink".as_ptr(),
            output_pixel_format: FlPixelFormat::Rgb,
            frame_rate_n: 60,
            frame_rate_d: 1,
            queue_capacity: 8,
            overflow: FlOverflow::DropOldest,
            block_timeout_ms: 20,
            placeholder_frames: 4,
        }
    }
}

impl FlCaptureConfig {
    unsafe fn to_config(&self) -> Option<CaptureConfig> {
        if self.source_name.is_null() {
            return None;
        }
        let source_name = unsafe { CStr::from_ptr(self.source_name) }.to_str().ok()?;

        Some(CaptureConfig {
            source_name: source_name.to_string(),
            output_pixel_format: self.output_pixel_format.into(),
            frame_rate: FrameRate::new(self.frame_rate_n, self.frame_rate_d),
            queue: QueueConfig {
                capacity: (self.queue_capacity > 0).then_some(self.queue_capacity as usize),
                overflow: self.overflow.into(),
                block_timeout_ms: self.block_timeout_ms as u64,
            },
            placeholder_frames: self.placeholder_frames as usize,
            ..Default::default()
        })
    }
}

/// Player configuration
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FlPlayerConfig {
    pub source_match: FlSourceMatch,
    pub poll_timeout_ms: c_uint,
    pub max_pending_video: c_uint,
    pub receiver_queue_depth: c_uint,
}

impl Default for FlPlayerConfig {
    fn default() -> Self {
        let defaults = PlayerConfig::default();
        Self {
            source_match: FlSourceMatch::SourceName,
            poll_timeout_ms: defaults.poll_timeout_ms as c_uint,
            max_pending_video: defaults.max_pending_video as c_uint,
            receiver_queue_depth: defaults.receiver_queue_depth as c_uint,
        }
    }
}

impl From<FlPlayerConfig> for PlayerConfig {
    fn from(c: FlPlayerConfig) -> Self {
        PlayerConfig {
            source_match: c.source_match.into(),
            poll_timeout_ms: c.poll_timeout_ms as u64,
            max_pending_video: c.max_pending_video as usize,
            receiver_queue_depth: c.receiver_queue_depth as usize,
            ..Default::default()
        }
    }
}

/// Capture statistics
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FlCaptureStats {
    pub frames_captured: u64,
    pub frames_enqueued: u64,
    pub frames_sent: u64,
    pub send_failures: u64,
    pub frames_dropped_overflow: u64,
    pub conversion_failures: u64,
    pub bytes_sent: u64,
}

/// Player statistics
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FlPlayerStats {
    pub frames_received: u64,
    pub video_samples: u64,
    pub metadata_samples: u64,
    pub unsupported_frames: u64,
    pub decode_failures: u64,
    pub video_samples_dropped: u64,
    pub poll_failures: u64,
}

/// Result of one player tick
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FlTickReport {
    pub dropped_video: c_uint,
    pub video: c_int,
    pub metadata: c_int,
}

/// Decoded video handed to the host. Only valid during the callback.
#[repr(C)]
pub struct FlVideoSample {
    pub data: *const u8,
    pub size: size_t,
    pub stride: c_uint,
    pub width: c_uint,
    pub height: c_uint,
    pub format: FlSampleFormat,
    pub time_ns: u64,
    pub frame_rate_n: c_uint,
    pub frame_rate_d: c_uint,
    /// Negative when the frame carries no timecode
    pub timecode_ns: i64,
}

/// Metadata handed to the host. Only valid during the callback.
#[repr(C)]
pub struct FlMetadataSample {
    pub data: *const u8,
    pub size: size_t,
    pub time_ns: u64,
    pub timecode_ns: i64,
}

pub type FlVideoCallback = unsafe extern "C" fn(user_data: *mut c_void, sample: *const FlVideoSample);
pub type FlMetadataCallback = unsafe extern "C" fn(user_data: *mut c_void, sample: *const FlMetadataSample);
pub type FlPendingCountCallback = unsafe extern "C" fn(user_data: *mut c_void) -> size_t;
pub type FlPopOldestCallback = unsafe extern "C" fn(user_data: *mut c_void) -> c_int;

/// Host side of a player's sample sink. Any callback may be NULL.
///
/// When the host keeps decoded samples in its own queue it should provide
/// `pending_video_count` and `pop_oldest_video`, so each tick can trim that
/// queue to `max_pending_video` before a new sample is delivered.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FlSinkCallbacks {
    pub user_data: *mut c_void,
    pub on_video: Option<FlVideoCallback>,
    pub on_metadata: Option<FlMetadataCallback>,
    /// Video samples the host holds but has not consumed yet
    pub pending_video_count: Option<FlPendingCountCallback>,
    /// Discard the host's oldest pending video sample; nonzero if one was discarded
    pub pop_oldest_video: Option<FlPopOldestCallback>,
}

impl Default for FlSinkCallbacks {
    fn default() -> Self {
        Self {
            user_data: ptr::null_mut(),
            on_video: None,
            on_metadata: None,
            pending_video_count: None,
            pop_oldest_video: None,
        }
    }
}

fn timecode_ns(timecode: Option<Duration>) -> i64 {
    timecode.map_or(-1, |t| t.as_nanos() as i64)
}

/// Forwards samples to host callbacks as soon as they are decoded. Pending
/// samples live on the host side, if anywhere.
struct CallbackSink {
    callbacks: FlSinkCallbacks,
}

impl SampleSink for CallbackSink {
    fn add_video_sample(&mut self, sample: VideoSample) {
        let Some(callback) = self.callbacks.on_video else {
            return;
        };

        let c_sample = FlVideoSample {
            data: sample.data.as_ptr(),
            size: sample.data.len(),
            stride: sample.stride,
            width: sample.width,
            height: sample.height,
            format: sample.format.into(),
            time_ns: sample.time.as_nanos() as u64,
            frame_rate_n: sample.frame_rate.numerator,
            frame_rate_d: sample.frame_rate.denominator,
            timecode_ns: timecode_ns(sample.timecode),
        };
        unsafe { callback(self.callbacks.user_data, &c_sample) };
    }

    fn add_metadata_sample(&mut self, sample: MetadataSample) {
        let Some(callback) = self.callbacks.on_metadata else {
            return;
        };

        let c_sample = FlMetadataSample {
            data: sample.data.as_ptr(),
            size: sample.data.len(),
            time_ns: sample.time.as_nanos() as u64,
            timecode_ns: timecode_ns(sample.timecode),
        };
        unsafe { callback(self.callbacks.user_data, &c_sample) };
    }

    fn pending_video_count(&self) -> usize {
        match self.callbacks.pending_video_count {
            Some(callback) => unsafe { callback(self.callbacks.user_data) },
            None => 0,
        }
    }

    fn pop_oldest_video(&mut self) -> bool {
        match self.callbacks.pop_oldest_video {
            Some(callback) => unsafe { callback(self.callbacks.user_data) != 0 },
            None => false,
        }
    }
}

// ============================================
// Library Functions
// ============================================

/// Initialize logging (call once at startup)
#[unsafe(no_mangle)]
pub extern "C" fn fl_init() {
    init_logging();
    tracing::info!("framelink initialized");
}

/// Get library version
///
/// # Safety
/// - The returned string is static and must not be freed
#[unsafe(no_mangle)]
pub extern "C" fn fl_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

/// Get the message for a status code
///
/// # Safety
/// - The returned string is static and must not be freed
#[unsafe(no_mangle)]
pub extern "C" fn fl_status_string(status: FlStatus) -> *const c_char {
    let msg = match status {
        FlStatus::Success => c"Success",
        FlStatus::NullPointer => c"Null pointer",
        FlStatus::InvalidArgument => c"Invalid argument",
        FlStatus::InvalidConfig => c"Invalid configuration",
        FlStatus::CreateFailed => c"Failed to create handle",
        FlStatus::AlreadyRunning => c"Already running",
        FlStatus::NotRunning => c"Not running",
        FlStatus::ConversionFailed => c"Pixel conversion failed",
        FlStatus::FrameDropped => c"Frame dropped by the send queue",
        FlStatus::OpenFailed => c"Failed to open source",
        FlStatus::TransportError => c"Transport error",
    };

    msg.as_ptr()
}

// ============================================
// Transport
// ============================================

/// Create a transport from TOML text (NULL for the loopback default)
///
/// # Safety
/// - config_toml must be NULL or a valid NUL terminated string
/// - out_handle must be a valid pointer
/// - The returned handle must be freed with fl_transport_destroy()
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fl_transport_create(
    config_toml: *const c_char,
    out_handle: *mut *mut FlTransport,
) -> FlStatus {
    if out_handle.is_null() {
        return FlStatus::NullPointer;
    }

    let config = if config_toml.is_null() {
        TransportConfig::default()
    } else {
        let text = match unsafe { CStr::from_ptr(config_toml) }.to_str() {
            Ok(text) => text,
            Err(_) => return FlStatus::InvalidArgument,
        };
        match toml::from_str::<TransportConfig>(text) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Invalid transport config: {}", e);
                return FlStatus::InvalidConfig;
            }
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        return FlStatus::InvalidConfig;
    }

    let (transport, finder) = match TransportFactory::create(&config) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!("Failed to create transport: {}", e);
            return FlStatus::CreateFailed;
        }
    };

    let handle = Box::new(FlTransport { transport, finder });
    unsafe { *out_handle = Box::into_raw(handle) };
    FlStatus::Success
}

/// Destroy a transport. Sessions created from it keep working.
///
/// # Safety
/// - handle must be NULL or obtained from fl_transport_create()
/// - handle must not be used after this call
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fl_transport_destroy(handle: *mut FlTransport) {
    if !handle.is_null() {
        drop(unsafe { Box::from_raw(handle) });
    }
}

/// List the names of the sources currently visible
///
/// # Safety
/// - handle and out_count must be valid pointers
/// - Returns an array that must be freed with fl_free_string_array()
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fl_transport_list_sources(
    handle: *const FlTransport,
    out_count: *mut c_uint,
) -> *mut *mut c_char {
    if handle.is_null() || out_count.is_null() {
        return ptr::null_mut();
    }

    let handle = unsafe { &*handle };
    let names: Box<[*mut c_char]> = handle
        .finder
        .current_sources()
        .into_iter()
        .filter_map(|source| CString::new(source.name).ok())
        .map(CString::into_raw)
        .collect();

    unsafe { *out_count = names.len() as c_uint };

    Box::into_raw(names) as *mut *mut c_char
}

/// Free a string array returned by fl_transport_list_sources()
///
/// # Safety
/// - array must be obtained from fl_transport_list_sources()
/// - count must match the count it returned
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fl_free_string_array(array: *mut *mut c_char, count: c_uint) {
    if array.is_null() {
        return;
    }

    let names = unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(array, count as usize)) };
    for &name in names.iter() {
        if !name.is_null() {
            drop(unsafe { CString::from_raw(name) });
        }
    }
}

// ============================================
// Capture
// ============================================

/// Get the default capture configuration
#[unsafe(no_mangle)]
pub extern "C" fn fl_capture_default_config() -> FlCaptureConfig {
    FlCaptureConfig::default()
}

/// Create a capture session on a transport
///
/// # Safety
/// - transport, config and out_handle must be valid pointers
/// - The returned handle must be freed with fl_capture_destroy()
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fl_capture_create(
    transport: *const FlTransport,
    config: *const FlCaptureConfig,
    out_handle: *mut *mut FlCapture,
) -> FlStatus {
    if transport.is_null() || config.is_null() || out_handle.is_null() {
        return FlStatus::NullPointer;
    }

    let Some(config) = (unsafe { (*config).to_config() }) else {
        return FlStatus::InvalidArgument;
    };
    let transport = unsafe { &*transport };

    match CaptureSession::new(config, transport.transport.clone()) {
        Ok(session) => {
            unsafe { *out_handle = Box::into_raw(Box::new(FlCapture { session })) };
            FlStatus::Success
        }
        Err(e) => {
            tracing::error!("Failed to create capture: {}", e);
            FlStatus::from(&e)
        }
    }
}

/// Announce the sender and start the send worker
///
/// # Safety
/// - handle must be a valid pointer
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fl_capture_start(handle: *mut FlCapture) -> FlStatus {
    if handle.is_null() {
        return FlStatus::NullPointer;
    }

    match unsafe { &mut *handle }.session.start() {
        Ok(()) => FlStatus::Success,
        Err(e) => FlStatus::from(&e),
    }
}

/// Hand over a render-target readback
///
/// # Safety
/// - handle must be a valid pointer
/// - data must point to at least len readable bytes
/// - timecode_ns is ignored when negative
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fl_capture_on_frame(
    handle: *mut FlCapture,
    frame_number: u64,
    timecode_ns: i64,
    data: *const u8,
    len: size_t,
    width: c_uint,
    height: c_uint,
    bytes_per_row: c_uint,
) -> FlStatus {
    if handle.is_null() || data.is_null() {
        return FlStatus::NullPointer;
    }

    let buffer = unsafe { std::slice::from_raw_parts(data, len) };
    let base = CaptureBaseData {
        frame_number,
        timecode: (timecode_ns >= 0).then(|| Duration::from_nanos(timecode_ns as u64)),
    };

    match unsafe { &*handle }
        .session
        .on_frame_captured(&base, buffer, width, height, bytes_per_row)
    {
        Ok(PushOutcome::Dropped) => FlStatus::FrameDropped,
        Ok(_) => FlStatus::Success,
        Err(e) => FlStatus::from(&e),
    }
}

/// Stop the worker and release queued frames
///
/// # Safety
/// - handle must be a valid pointer
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fl_capture_stop(handle: *mut FlCapture) -> FlStatus {
    if handle.is_null() {
        return FlStatus::NullPointer;
    }

    unsafe { &mut *handle }.session.stop();
    FlStatus::Success
}

/// Get capture statistics
///
/// # Safety
/// - handle and out_stats must be valid pointers
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fl_capture_get_stats(
    handle: *const FlCapture,
    out_stats: *mut FlCaptureStats,
) -> FlStatus {
    if handle.is_null() || out_stats.is_null() {
        return FlStatus::NullPointer;
    }

    let stats = unsafe { &*handle }.session.stats();
    unsafe {
        *out_stats = FlCaptureStats {
            frames_captured: stats.frames_captured,
            frames_enqueued: stats.frames_enqueued,
            frames_sent: stats.frames_sent,
            send_failures: stats.send_failures,
            frames_dropped_overflow: stats.frames_dropped_overflow,
            conversion_failures: stats.conversion_failures,
            bytes_sent: stats.bytes_sent,
        }
    };

    FlStatus::Success
}

/// Destroy a capture session, stopping it first
///
/// # Safety
/// - handle must be NULL or obtained from fl_capture_create()
/// - handle must not be used after this call
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fl_capture_destroy(handle: *mut FlCapture) {
    if !handle.is_null() {
        drop(unsafe { Box::from_raw(handle) });
        tracing::info!("Capture destroyed");
    }
}

// ============================================
// Player
// ============================================

/// Get the default player configuration
#[unsafe(no_mangle)]
pub extern "C" fn fl_player_default_config() -> FlPlayerConfig {
    FlPlayerConfig::default()
}

/// Create a player that delivers samples through callbacks
///
/// # Safety
/// - transport and out_handle must be valid pointers
/// - config and callbacks may be NULL for defaults
/// - callbacks run on the thread calling fl_player_tick()
/// - The returned handle must be freed with fl_player_destroy()
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fl_player_create(
    transport: *const FlTransport,
    config: *const FlPlayerConfig,
    callbacks: *const FlSinkCallbacks,
    out_handle: *mut *mut FlPlayer,
) -> FlStatus {
    if transport.is_null() || out_handle.is_null() {
        return FlStatus::NullPointer;
    }

    let config = if config.is_null() {
        PlayerConfig::default()
    } else {
        unsafe { *config }.into()
    };
    let transport = unsafe { &*transport };
    let sink = CallbackSink {
        callbacks: if callbacks.is_null() {
            FlSinkCallbacks::default()
        } else {
            unsafe { *callbacks }
        },
    };

    match MediaPlayer::new(config, transport.transport.clone(), transport.finder.clone(), sink) {
        Ok(player) => {
            unsafe { *out_handle = Box::into_raw(Box::new(FlPlayer { player })) };
            FlStatus::Success
        }
        Err(e) => {
            tracing::error!("Failed to create player: {}", e);
            FlStatus::from(&e)
        }
    }
}

/// Open `<scheme>://<source name>`
///
/// # Safety
/// - handle must be a valid pointer
/// - url must be a valid NUL terminated string
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fl_player_open(handle: *mut FlPlayer, url: *const c_char) -> FlStatus {
    if handle.is_null() || url.is_null() {
        return FlStatus::NullPointer;
    }

    let Ok(url) = unsafe { CStr::from_ptr(url) }.to_str() else {
        return FlStatus::InvalidArgument;
    };

    match unsafe { &mut *handle }.player.open(url) {
        Ok(()) => FlStatus::Success,
        Err(e) => FlStatus::from(&e),
    }
}

/// Poll once and deliver any decoded samples
///
/// # Safety
/// - handle must be a valid pointer
/// - out_report may be NULL
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fl_player_tick(handle: *mut FlPlayer, out_report: *mut FlTickReport) -> FlStatus {
    if handle.is_null() {
        return FlStatus::NullPointer;
    }

    let report = unsafe { &mut *handle }.player.tick();

    if !out_report.is_null() {
        unsafe {
            *out_report = FlTickReport {
                dropped_video: report.dropped_video as c_uint,
                video: report.video as c_int,
                metadata: report.metadata as c_int,
            }
        };
    }

    FlStatus::Success
}

/// Release the receive handle
///
/// # Safety
/// - handle must be a valid pointer
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fl_player_close(handle: *mut FlPlayer) -> FlStatus {
    if handle.is_null() {
        return FlStatus::NullPointer;
    }

    unsafe { &mut *handle }.player.close();
    FlStatus::Success
}

/// Check if the player is playing
///
/// # Safety
/// - handle must be a valid pointer
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fl_player_is_playing(handle: *const FlPlayer) -> c_int {
    if handle.is_null() {
        return 0;
    }

    unsafe { &*handle }.player.is_playing() as c_int
}

/// Get player statistics
///
/// # Safety
/// - handle and out_stats must be valid pointers
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fl_player_get_stats(handle: *const FlPlayer, out_stats: *mut FlPlayerStats) -> FlStatus {
    if handle.is_null() || out_stats.is_null() {
        return FlStatus::NullPointer;
    }

    let stats = unsafe { &*handle }.player.stats();
    unsafe {
        *out_stats = FlPlayerStats {
            frames_received: stats.frames_received,
            video_samples: stats.video_samples,
            metadata_samples: stats.metadata_samples,
            unsupported_frames: stats.unsupported_frames,
            decode_failures: stats.decode_failures,
            video_samples_dropped: stats.video_samples_dropped,
            poll_failures: stats.poll_failures,
        }
    };

    FlStatus::Success
}

/// Destroy a player
///
/// # Safety
/// - handle must be NULL or obtained from fl_player_create()
/// - handle must not be used after this call
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fl_player_destroy(handle: *mut FlPlayer) {
    if !handle.is_null() {
        drop(unsafe { Box::from_raw(handle) });
        tracing::info!("Player destroyed");
    }
}

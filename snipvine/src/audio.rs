use std::path::Path;

use anyhow::{anyhow, Result};

#[cfg(feature = "audio")]
use std::{fs::File, io::BufReader};

#[cfg(feature = "audio")]
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

/// Manages audio playback for sound effects and music.
///
/// Owned by the engine context for the whole run, so background music keeps
/// playing while levels come and go. Built without the `audio` feature, or
/// without an output device, the system is unavailable and every playback
/// call returns an error instead.
pub struct AudioSystem {
    #[cfg(feature = "audio")]
    _stream: Option<OutputStream>,
    #[cfg(feature = "audio")]
    stream_handle: Option<OutputStreamHandle>,
    #[cfg(feature = "audio")]
    music_sink: Option<Sink>,
    available: bool,
}

impl AudioSystem {
    /// Open the default output device.
    ///
    /// Never fails: a missing device is logged and leaves the system
    /// unavailable.
    #[cfg(feature = "audio")]
    pub fn new() -> Self {
        match OutputStream::try_default() {
            Ok((stream, stream_handle)) => Self {
                _stream: Some(stream),
                stream_handle: Some(stream_handle),
                music_sink: None,
                available: true,
            },
            Err(e) => {
                log::warn!("Failed to initialize audio: {}. Audio will be unavailable.", e);
                Self::unavailable()
            }
        }
    }

    #[cfg(not(feature = "audio"))]
    pub fn new() -> Self {
        log::debug!("Built without the `audio` feature; audio is unavailable");
        Self::unavailable()
    }

    /// A system that plays nothing.
    pub fn unavailable() -> Self {
        Self {
            #[cfg(feature = "audio")]
            _stream: None,
            #[cfg(feature = "audio")]
            stream_handle: None,
            #[cfg(feature = "audio")]
            music_sink: None,
            available: false,
        }
    }

    /// Check if audio is available and working.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Play a sound effect once. Several may overlap.
    #[cfg(feature = "audio")]
    pub fn play_sound<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let stream_handle = self
            .stream_handle
            .as_ref()
            .ok_or_else(|| anyhow!("Audio system is not available"))?;

        let source = decode(path.as_ref())?;
        let sink = Sink::try_new(stream_handle)
            .map_err(|e| anyhow!("Failed to create audio sink: {}", e))?;
        sink.append(source);
        sink.detach();
        Ok(())
    }

    #[cfg(not(feature = "audio"))]
    pub fn play_sound<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        Err(anyhow!(
            "Audio system is not available (skipping {:?})",
            path.as_ref()
        ))
    }

    /// Play background music on a loop, replacing any music already playing.
    #[cfg(feature = "audio")]
    pub fn play_music_loop<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.stop_music();

        let stream_handle = self
            .stream_handle
            .as_ref()
            .ok_or_else(|| anyhow!("Audio system is not available"))?;

        let source = decode(path.as_ref())?.repeat_infinite();
        let sink = Sink::try_new(stream_handle)
            .map_err(|e| anyhow!("Failed to create audio sink: {}", e))?;
        sink.append(source);
        sink.set_volume(0.5);

        self.music_sink = Some(sink);
        Ok(())
    }

    #[cfg(not(feature = "audio"))]
    pub fn play_music_loop<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        Err(anyhow!(
            "Audio system is not available (skipping {:?})",
            path.as_ref()
        ))
    }

    /// Start background music unless some is already playing.
    pub fn ensure_music_loop<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        if self.is_music_playing() {
            return Ok(());
        }
        self.play_music_loop(path)
    }

    /// Stop the currently playing background music.
    pub fn stop_music(&mut self) {
        #[cfg(feature = "audio")]
        if let Some(sink) = self.music_sink.take() {
            sink.stop();
        }
    }

    /// Check if background music is currently playing.
    #[cfg(feature = "audio")]
    pub fn is_music_playing(&self) -> bool {
        self.music_sink.is_some()
    }

    #[cfg(not(feature = "audio"))]
    pub fn is_music_playing(&self) -> bool {
        false
    }

    /// Stop the music and release the output device.
    pub fn shutdown(&mut self) {
        self.stop_music();
        #[cfg(feature = "audio")]
        {
            self.stream_handle = None;
            self._stream = None;
        }
        if self.available {
            log::debug!("Audio shut down");
        }
        self.available = false;
    }
}

impl Default for AudioSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "audio")]
fn decode(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file =
        File::open(path).map_err(|e| anyhow!("Failed to open sound file {:?}: {}", path, e))?;
    Decoder::new(BufReader::new(file))
        .map_err(|e| anyhow!("Failed to decode sound file {:?}: {}", path, e))
}

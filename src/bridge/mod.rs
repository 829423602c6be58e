//! Acquisition bridge between the codec and an SDR backend.
//!
//! The bridge owns no device driver; it sequences calls on a [`RadioBackend`] and moves
//! samples between the backend's callback and the processing loop:
//!
//! - [`open_stream`]: open, program 4 Msps / channel frequency / gain, start streaming, and
//!   hand back a [`StreamGuard`] that stops and closes the device when dropped
//! - [`ScanSession`]: a single-producer single-consumer sample ring with an overrun
//!   counter and a cooperative shutdown flag
//! - [`run_scan_loop`] and [`transmit`]: blocking loops paced with
//!   `embedded_hal::delay::DelayNs`
//!
//! ## Example
//!
//! ```ignore
//! use btle_codec::bridge::{open_stream, run_scan_loop, ScanConfig, ScanSession};
//!
//! let config = ScanConfig::default().with_channel(37)?.with_gain(32);
//! let _stream = open_stream(&mut hackrf, &config)?;
//!
//! let mut session: ScanSession<i8, 4096> = ScanSession::new();
//! let (mut sink, mut source, shutdown) = session.split();
//! // hand `sink` to the driver's RX callback, `shutdown` to the signal handler
//! run_scan_loop(&mut source, shutdown, &mut delay, 100, |samples| decode(samples));
//! ```

mod backend;
mod delay;
mod ring;

pub use backend::{RadioBackend, StreamGuard, open_stream};
pub use delay::{SCAN_CHUNK, run_scan_loop, transmit};
pub use ring::{SampleSink, SampleSource, ScanSession, ShutdownFlag};

use core::fmt;

use thiserror::Error;

use crate::channel::Channel;
use crate::error::{BtleError, Result};

/// Configuration step that failed in [`open_stream`] or [`transmit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum ConfigStage {
    SampleRate,
    Frequency,
    Gain,
    StartStreaming,
}

/// Errors raised while driving a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RadioError<E: fmt::Debug> {
    /// The device could not be opened.
    #[error("failed to open device: {0:?}")]
    Open(E),
    /// The device rejected a configuration step. It has been closed again.
    #[error("failed to configure {stage:?}: {error:?}")]
    Configure {
        /// Step that failed.
        stage: ConfigStage,
        /// Backend diagnostic.
        error: E,
    },
    /// Sample streaming failed.
    #[error("streaming failed: {0:?}")]
    Stream(E),
    /// The requested gain exceeds what the backend supports.
    #[error("gain {gain} dB outside 0~{max} dB")]
    GainOutOfRange {
        /// Requested gain.
        gain: u8,
        /// Backend maximum.
        max: u8,
    },
    /// The packet was handed to [`transmit`] before being assembled.
    #[error("packet has not been assembled")]
    Unassembled,
    /// A codec error, e.g. an invalid channel or an oversized packet.
    #[error(transparent)]
    Codec(#[from] BtleError),
}

/// Receive configuration: channel and front-end gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct ScanConfig {
    channel: Channel,
    gain_db: Option<u8>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            channel: Channel::ADV_38,
            gain_db: None,
        }
    }
}

impl ScanConfig {
    /// Selects the channel to listen on.
    ///
    /// # Errors
    /// [`BtleError::InvalidChannel`] outside 0–39.
    pub fn with_channel(mut self, channel: i32) -> Result<Self> {
        self.channel = Channel::try_from(channel)?;
        Ok(self)
    }

    /// Overrides the backend's default gain. Checked against the backend in [`open_stream`].
    pub fn with_gain(mut self, gain_db: u8) -> Self {
        self.gain_db = Some(gain_db);
        self
    }

    /// The configured channel ([`DEFAULT_CHANNEL`](crate::consts::DEFAULT_CHANNEL) unless
    /// overridden).
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// The gain to program on `B`, falling back to its default.
    pub fn gain_for<B: RadioBackend>(&self) -> core::result::Result<u8, RadioError<B::Error>> {
        let gain = self.gain_db.unwrap_or(B::DEFAULT_GAIN_DB);
        if gain > B::MAX_GAIN_DB {
            return Err(RadioError::GainOutOfRange {
                gain,
                max: B::MAX_GAIN_DB,
            });
        }
        Ok(gain)
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{MockError, RecordingBackend};
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.channel(), Channel::ADV_38);
        assert_eq!(config.gain_for::<RecordingBackend>(), Ok(40));
    }

    #[test]
    fn test_config_builders() {
        let config = ScanConfig::default().with_channel(12).unwrap().with_gain(62);
        assert_eq!(config.channel().number(), 12);
        assert_eq!(config.gain_for::<RecordingBackend>(), Ok(62));
        assert_eq!(
            ScanConfig::default().with_channel(40),
            Err(BtleError::InvalidChannel(40))
        );
    }

    #[test]
    fn test_gain_out_of_range() {
        let config = ScanConfig::default().with_gain(63);
        assert_eq!(
            config.gain_for::<RecordingBackend>(),
            Err(RadioError::<MockError>::GainOutOfRange { gain: 63, max: 62 })
        );
    }
}

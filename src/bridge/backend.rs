use core::fmt;

use super::{ConfigStage, RadioError, ScanConfig};
use crate::consts::SAMPLE_RATE;
use crate::gfsk::IqSample;

/// An SDR front end the bridge can drive.
///
/// Implementations wrap a vendor driver (HackRF, bladeRF, ...). Every method maps to one
/// driver call; the bridge takes care of ordering and cleanup.
pub trait RadioBackend {
    /// Driver diagnostic returned by every call.
    type Error: fmt::Debug;
    /// Native IQ component type (`i8` for HackRF, SC16Q11 `i16` for bladeRF).
    type Sample: IqSample;

    /// Highest accepted gain setting, in dB.
    const MAX_GAIN_DB: u8;
    /// Gain used when the configuration does not set one.
    const DEFAULT_GAIN_DB: u8;

    /// Opens the device.
    fn open(&mut self) -> Result<(), Self::Error>;
    /// Closes the device.
    fn close(&mut self) -> Result<(), Self::Error>;
    /// Programs the sample rate in Hz.
    fn set_sample_rate(&mut self, hz: u32) -> Result<(), Self::Error>;
    /// Tunes the carrier frequency in Hz.
    fn set_frequency(&mut self, hz: u64) -> Result<(), Self::Error>;
    /// Programs the front-end gain in dB.
    fn set_gain(&mut self, gain_db: u8) -> Result<(), Self::Error>;
    /// Starts sample streaming.
    fn start_streaming(&mut self) -> Result<(), Self::Error>;
    /// Stops sample streaming.
    fn stop_streaming(&mut self) -> Result<(), Self::Error>;
    /// Sends one burst of interleaved IQ samples.
    fn write_samples(&mut self, samples: &[Self::Sample]) -> Result<(), Self::Error>;
}

/// A streaming device. Stops streaming and closes the device when dropped.
pub struct StreamGuard<'a, B: RadioBackend> {
    backend: &'a mut B,
}

impl<B: RadioBackend> fmt::Debug for StreamGuard<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamGuard").finish_non_exhaustive()
    }
}

impl<B: RadioBackend> StreamGuard<'_, B> {
    /// The streaming backend.
    pub fn backend(&mut self) -> &mut B {
        self.backend
    }
}

impl<B: RadioBackend> Drop for StreamGuard<'_, B> {
    fn drop(&mut self) {
        if let Err(_e) = self.backend.stop_streaming() {
            warn!("stop streaming failed");
        }
        if let Err(_e) = self.backend.close() {
            warn!("close failed");
        }
        debug!("stream closed");
    }
}

/// Opens `backend`, programs it for `config` and starts streaming.
///
/// # Arguments
/// * `backend`: the device to drive
/// * `config`: channel and gain; the gain is checked against `B::MAX_GAIN_DB` before the
///   device is touched
///
/// # Errors
/// - [`RadioError::GainOutOfRange`] before opening
/// - [`RadioError::Open`] if the device cannot be opened
/// - [`RadioError::Configure`] if any later step fails; the device is closed again first
pub fn open_stream<'a, B: RadioBackend>(
    backend: &'a mut B,
    config: &ScanConfig,
) -> Result<StreamGuard<'a, B>, RadioError<B::Error>> {
    let gain = config.gain_for::<B>()?;
    let freq = config.channel().frequency_hz();

    backend.open().map_err(RadioError::Open)?;

    let configured = backend
        .set_sample_rate(SAMPLE_RATE)
        .map_err(|e| (ConfigStage::SampleRate, e))
        .and_then(|()| backend.set_frequency(freq).map_err(|e| (ConfigStage::Frequency, e)))
        .and_then(|()| backend.set_gain(gain).map_err(|e| (ConfigStage::Gain, e)))
        .and_then(|()| backend.start_streaming().map_err(|e| (ConfigStage::StartStreaming, e)));

    if let Err((stage, error)) = configured {
        warn!("configuration failed, closing device");
        if let Err(_e) = backend.close() {
            warn!("close failed");
        }
        return Err(RadioError::Configure { stage, error });
    }

    debug!(
        "streaming on ch{} at {} Hz, gain {} dB",
        config.channel().number(),
        freq,
        gain
    );
    Ok(StreamGuard { backend })
}

#[cfg(test)]
mod tests {
    use super::super::mock::{Call, MockError, RecordingBackend};
    use super::*;

    #[test]
    fn test_open_stream_sequence() {
        let mut backend = RecordingBackend::default();
        let config = ScanConfig::default().with_channel(37).unwrap();
        {
            let _stream = open_stream(&mut backend, &config).unwrap();
        }
        assert_eq!(
            backend.calls,
            vec![
                Call::Open,
                Call::SampleRate(4_000_000),
                Call::Frequency(2_402_000_000),
                Call::Gain(40),
                Call::Start,
                Call::Stop,
                Call::Close,
            ]
        );
    }

    #[test]
    fn test_configure_failure_closes_device() {
        let mut backend = RecordingBackend::failing_on(|c| matches!(c, Call::Frequency(_)));
        let err = open_stream(&mut backend, &ScanConfig::default()).unwrap_err();
        assert_eq!(
            err,
            RadioError::Configure {
                stage: ConfigStage::Frequency,
                error: MockError
            }
        );
        assert_eq!(
            backend.calls,
            vec![
                Call::Open,
                Call::SampleRate(4_000_000),
                Call::Frequency(2_426_000_000),
                Call::Close
            ]
        );
    }

    #[test]
    fn test_start_failure_closes_device() {
        let mut backend = RecordingBackend::failing_on(|c| *c == Call::Start);
        let err = open_stream(&mut backend, &ScanConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            RadioError::Configure {
                stage: ConfigStage::StartStreaming,
                ..
            }
        ));
        assert_eq!(backend.calls.last(), Some(&Call::Close));
        assert!(!backend.calls.contains(&Call::Stop));
    }

    #[test]
    fn test_configure_error_survives_failed_close() {
        let mut backend = RecordingBackend::failing_on(|c| matches!(c, Call::Gain(_) | Call::Close));
        let err = open_stream(&mut backend, &ScanConfig::default()).unwrap_err();
        assert_eq!(
            err,
            RadioError::Configure {
                stage: ConfigStage::Gain,
                error: MockError
            }
        );
        assert_eq!(backend.calls.last(), Some(&Call::Close));
        assert_eq!(backend.calls.len(), 5);
    }

    #[test]
    fn test_open_failure_does_not_close() {
        let mut backend = RecordingBackend::failing_on(|c| *c == Call::Open);
        let err = open_stream(&mut backend, &ScanConfig::default()).unwrap_err();
        assert_eq!(err, RadioError::Open(MockError));
        assert_eq!(backend.calls, vec![Call::Open]);
    }

    #[test]
    fn test_gain_checked_before_open() {
        let mut backend = RecordingBackend::default();
        let config = ScanConfig::default().with_gain(70);
        let err = open_stream(&mut backend, &config).unwrap_err();
        assert_eq!(err, RadioError::GainOutOfRange { gain: 70, max: 62 });
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn test_guard_closes_even_if_stop_fails() {
        let mut backend = RecordingBackend::failing_on(|c| *c == Call::Stop);
        drop(open_stream(&mut backend, &ScanConfig::default()).unwrap());
        assert_eq!(&backend.calls[5..], &[Call::Stop, Call::Close]);
    }
}

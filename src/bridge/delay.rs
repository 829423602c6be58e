use embedded_hal::delay::DelayNs;

use super::{ConfigStage, RadioBackend, RadioError, SampleSource, ShutdownFlag, StreamGuard};
use crate::gfsk::{GfskModulator, IqSample};
use crate::packet::Packet;

/// Largest block handed to the scan callback at once.
pub const SCAN_CHUNK: usize = 256;

/// Drains `source` into `on_samples` until `shutdown` is requested.
///
/// The flag is checked once per iteration; when the ring is empty the loop sleeps for
/// `poll_us` microseconds. Returns the number of samples delivered.
///
/// # Arguments
/// - `source`: consumer side of a [`ScanSession`](super::ScanSession)
/// - `shutdown`: the session's stop flag
/// - `delay`: a delay provider implementing `DelayNs`, typically from the HAL
/// - `poll_us`: sleep between polls of an empty ring
/// - `on_samples`: receives at most [`SCAN_CHUNK`] interleaved IQ values per call
///
/// # Example
/// ```ignore
/// let total = run_scan_loop(&mut source, shutdown, &mut delay, 100, |iq| detector.feed(iq));
/// ```
pub fn run_scan_loop<S, const N: usize, D, F>(
    source: &mut SampleSource<'_, S, N>,
    shutdown: ShutdownFlag<'_>,
    delay: &mut D,
    poll_us: u32,
    mut on_samples: F,
) -> usize
where
    S: IqSample,
    D: DelayNs,
    F: FnMut(&[S]),
{
    let mut buf = [S::default(); SCAN_CHUNK];
    let mut total = 0;
    while !shutdown.is_requested() {
        let n = source.read_into(&mut buf);
        if n == 0 {
            delay.delay_us(poll_us);
            continue;
        }
        on_samples(&buf[..n]);
        total += n;
    }
    debug!("scan loop stopped: {} samples, {} overruns", total, source.overruns());
    total
}

/// Modulates an assembled packet, retunes to its channel, sends it, then waits its
/// inter-packet gap.
///
/// Returns the number of IQ pairs written.
///
/// # Errors
/// - [`RadioError::Unassembled`] if [`assemble`](crate::packet::assemble) has not run
/// - [`RadioError::Codec`] if the packet is too long to modulate
/// - [`RadioError::Configure`] if retuning fails, [`RadioError::Stream`] if the write fails
pub fn transmit<B, D>(
    stream: &mut StreamGuard<'_, B>,
    packet: &Packet,
    modulator: &GfskModulator,
    delay: &mut D,
) -> Result<usize, RadioError<B::Error>>
where
    B: RadioBackend,
    D: DelayNs,
{
    if !packet.is_assembled() {
        return Err(RadioError::Unassembled);
    }
    let iq = modulator.modulate::<B::Sample>(packet.phy_bits())?;

    let backend = stream.backend();
    backend
        .set_frequency(packet.channel().frequency_hz())
        .map_err(|error| RadioError::Configure {
            stage: ConfigStage::Frequency,
            error,
        })?;
    backend.write_samples(&iq).map_err(RadioError::Stream)?;
    debug!(
        "sent {} on ch{}, waiting {} ms",
        packet.pkt_type().name(),
        packet.channel().number(),
        packet.inter_packet_gap_ms()
    );

    delay.delay_ms(packet.inter_packet_gap_ms());
    Ok(iq.len() / 2)
}

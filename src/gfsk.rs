//! GFSK modulation of PHY bits into interleaved IQ samples.
//!
//! The modulator runs at [`SAMPLE_PER_SYMBOL`] samples per symbol with modulation index
//! [`MOD_IDX`]. Each bit becomes a `±1` impulse, the impulse train is shaped by a 16-tap
//! Gaussian FIR, and the shaped frequency is integrated into a phase:
//!
//! ```text
//! bits ─► ±1 impulses ─► Gaussian FIR ─► Σ π·h·f/sps ─► (A·cos φ, A·sin φ)
//! ```
//!
//! Every burst carries [`FILTER_SETTLING_SAMPLES`] extra samples for the filter tail, so a
//! packet of `n` bits yields `4·n + 16` IQ pairs. The first pair is always `(A, 0)`.

use core::f32::consts::PI;
use core::fmt;

use heapless::Vec;

use crate::consts::{
    FILTER_SETTLING_SAMPLES, GAUSS_FILTER_TAPS, MAX_NUM_IQ_VALUE, MAX_NUM_PHY_BIT, MAX_NUM_PHY_SAMPLE,
    MOD_IDX, SAMPLE_PER_SYMBOL,
};
use crate::error::{BtleError, Result};

/// Gaussian FIR taps (BT = 0.5, 4 samples per symbol, 4 symbols span).
pub const GAUSS_COEF: [f32; GAUSS_FILTER_TAPS] = [
    7.561773e-09,
    1.197935e-06,
    8.050684e-05,
    2.326833e-03,
    2.959908e-02,
    1.727474e-01,
    4.999195e-01,
    8.249246e-01,
    9.408018e-01,
    8.249246e-01,
    4.999195e-01,
    1.727474e-01,
    2.959908e-02,
    2.326833e-03,
    8.050684e-05,
    1.197935e-06,
];

/// A quantised IQ component as consumed by a radio backend.
pub trait IqSample: Copy + Default + fmt::Debug {
    /// Amplitude that maps to full scale.
    const FULL_SCALE: f32;

    /// Converts an already rounded value, saturating at the type limits.
    fn from_rounded(value: f32) -> Self;
}

impl IqSample for i8 {
    const FULL_SCALE: f32 = 127.0;

    fn from_rounded(value: f32) -> Self {
        value as i8
    }
}

/// SC16Q11: 12 significant bits in an `i16`.
impl IqSample for i16 {
    const FULL_SCALE: f32 = 2047.0;

    fn from_rounded(value: f32) -> Self {
        value as i16
    }
}

/// Shaped instantaneous frequency, one value per output sample.
pub type Shaped = Vec<f32, MAX_NUM_PHY_SAMPLE>;

/// Interleaved `I, Q, I, Q, ...` samples of one burst.
pub type IqBuffer<S> = Vec<S, MAX_NUM_IQ_VALUE>;

/// Number of IQ pairs produced for `num_bit` bits.
pub const fn num_phy_sample(num_bit: usize) -> usize {
    num_bit * SAMPLE_PER_SYMBOL + FILTER_SETTLING_SAMPLES
}

/// GFSK modulator with an optional amplitude override.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GfskModulator {
    amplitude: Option<f32>,
}

impl GfskModulator {
    /// A modulator that drives every sample type at its full scale.
    pub const fn new() -> Self {
        Self { amplitude: None }
    }

    /// Uses `amplitude` instead of the sample type's full scale.
    pub const fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = Some(amplitude);
        self
    }

    fn check_len(bits: &[u8]) -> Result<()> {
        if bits.len() > MAX_NUM_PHY_BIT {
            return Err(BtleError::PayloadTooLarge {
                len: bits.len(),
                max: MAX_NUM_PHY_BIT,
            });
        }
        Ok(())
    }

    /// Gaussian-filtered impulse train for `bits`, before phase integration.
    ///
    /// Sample `k` of the impulse train is `2·bit - 1` when `k - (taps - 1)` is a multiple of
    /// the oversampling factor, and zero elsewhere, including the padding on both sides.
    pub fn shape(&self, bits: &[u8]) -> Result<Shaped> {
        Self::check_len(bits)?;
        let taps = GAUSS_FILTER_TAPS;
        let impulse = |k: usize| -> f32 {
            if k < taps - 1 || (k - (taps - 1)) % SAMPLE_PER_SYMBOL != 0 {
                return 0.0;
            }
            match bits.get((k - (taps - 1)) / SAMPLE_PER_SYMBOL) {
                Some(&bit) if bit & 0x01 == 1 => 1.0,
                Some(_) => -1.0,
                None => 0.0,
            }
        };

        let mut shaped = Shaped::new();
        for i in 0..num_phy_sample(bits.len()) {
            let acc = (0..taps).fold(0.0f32, |acc, j| acc + GAUSS_COEF[taps - j - 1] * impulse(i + j));
            let _ = shaped.push(acc);
        }
        Ok(shaped)
    }

    /// Modulates `bits` into interleaved IQ samples of type `S`.
    ///
    /// # Errors
    /// [`BtleError::PayloadTooLarge`] if `bits` holds more than [`MAX_NUM_PHY_BIT`] bits; no
    /// samples are computed in that case.
    pub fn modulate<S: IqSample>(&self, bits: &[u8]) -> Result<IqBuffer<S>> {
        let shaped = self.shape(bits)?;
        let amplitude = self.amplitude.unwrap_or(S::FULL_SCALE);
        let step = PI * MOD_IDX / SAMPLE_PER_SYMBOL as f32;

        let mut iq = IqBuffer::new();
        let mut phase = 0.0f32;
        for i in 0..shaped.len() {
            if i > 0 {
                phase += step * shaped[i - 1];
                if phase > PI {
                    phase -= 2.0 * PI;
                } else if phase <= -PI {
                    phase += 2.0 * PI;
                }
            }
            let _ = iq.push(S::from_rounded(libm::roundf(amplitude * libm::cosf(phase))));
            let _ = iq.push(S::from_rounded(libm::roundf(amplitude * libm::sinf(phase))));
        }
        debug!("modulated {} bits into {} IQ pairs", bits.len(), shaped.len());
        Ok(iq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs<S: IqSample>(iq: &[S]) -> impl Iterator<Item = (S, S)> + '_ {
        iq.chunks(2).map(|p| (p[0], p[1]))
    }

    #[test]
    fn test_coefficients_sum_to_one_symbol() {
        let sum: f32 = GAUSS_COEF.iter().sum();
        assert!((sum - SAMPLE_PER_SYMBOL as f32).abs() < 1e-4);
    }

    #[test]
    fn test_output_length() {
        let modulator = GfskModulator::new();
        for n in [0usize, 1, 8, 128, MAX_NUM_PHY_BIT] {
            let bits: std::vec::Vec<u8> = (0..n).map(|i| (i % 3 == 0) as u8).collect();
            let iq = modulator.modulate::<i8>(&bits).unwrap();
            assert_eq!(iq.len(), 2 * num_phy_sample(n));
            assert_eq!(modulator.shape(&bits).unwrap().len(), num_phy_sample(n));
        }
        assert_eq!(num_phy_sample(MAX_NUM_PHY_BIT), MAX_NUM_PHY_SAMPLE);
    }

    #[test]
    fn test_rejects_too_many_bits() {
        let bits = [1u8; MAX_NUM_PHY_BIT + 1];
        assert_eq!(
            GfskModulator::new().modulate::<i16>(&bits),
            Err(BtleError::PayloadTooLarge {
                len: MAX_NUM_PHY_BIT + 1,
                max: MAX_NUM_PHY_BIT
            })
        );
    }

    #[test]
    fn test_first_samples_of_a_run_of_ones() {
        let iq = GfskModulator::new().modulate::<i8>(&[1; 16]).unwrap();
        let expected: [i8; 24] = [
            127, 0, 127, 0, 127, 0, 127, 0, 127, 0, 127, 2, 127, 10, 122, 35, 105, 72, 70, 106, 25, 125, -25, 125,
        ];
        assert_eq!(&iq[..24], &expected);
    }

    #[test]
    fn test_constant_envelope() {
        let bits = [1, 0, 1, 1, 0, 0, 1, 0, 0, 0, 1, 1, 1, 0, 1, 0];
        let iq = GfskModulator::new().modulate::<i16>(&bits).unwrap();
        for (i, q) in pairs(&iq) {
            let r = libm::sqrtf(f32::from(i) * f32::from(i) + f32::from(q) * f32::from(q));
            assert!((r - 2047.0).abs() < 1.5, "radius {r}");
        }
    }

    #[test]
    fn test_quarter_turn_per_symbol() {
        // ones rotate counter-clockwise, zeros clockwise
        for (bit, sign) in [(1u8, 1i16), (0, -1)] {
            let iq = GfskModulator::new().modulate::<i8>(&[bit; 16]).unwrap();
            let samples: std::vec::Vec<(i8, i8)> = pairs(&iq).collect();
            for k in 40..56 {
                let (i0, q0) = (i16::from(samples[k].0), i16::from(samples[k].1));
                let (i1, q1) = (i16::from(samples[k + 4].0), i16::from(samples[k + 4].1));
                assert!((i1 + sign * q0).abs() <= 1, "I at {k}");
                assert!((q1 - sign * i0).abs() <= 1, "Q at {k}");
            }
        }
    }

    #[test]
    fn test_amplitude_override() {
        let iq = GfskModulator::new()
            .with_amplitude(1000.0)
            .modulate::<i16>(&[0, 1])
            .unwrap();
        assert_eq!((iq[0], iq[1]), (1000, 0));
    }
}

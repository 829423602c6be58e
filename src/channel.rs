//! BTLE channel numbering and carrier frequencies.
//!
//! Logical channels 37, 38 and 39 are the advertising channels and sit at the
//! edges and middle of the band; channels 0–36 are data channels filling the gaps.

use crate::consts::NUM_BTLE_CHANNEL;
use crate::error::{BtleError, Result};

/// Carrier frequency in Hz of a BTLE channel number.
///
/// # Errors
/// [`BtleError::InvalidChannel`] for anything outside 0–39.
pub fn get_freq_by_channel_number(channel_number: i32) -> Result<u64> {
    Channel::try_from(channel_number).map(Channel::frequency_hz)
}

/// A validated BTLE logical channel (0–39).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Channel(u8);

impl Channel {
    /// Advertising channel at 2402 MHz.
    pub const ADV_37: Channel = Channel(37);
    /// Advertising channel at 2426 MHz.
    pub const ADV_38: Channel = Channel(38);
    /// Advertising channel at 2480 MHz.
    pub const ADV_39: Channel = Channel(39);

    /// Creates a channel, rejecting numbers above 39.
    pub const fn new(number: u8) -> Result<Self> {
        if number < NUM_BTLE_CHANNEL {
            Ok(Self(number))
        } else {
            Err(BtleError::InvalidChannel(number as i32))
        }
    }

    /// The channel number.
    pub const fn number(self) -> u8 {
        self.0
    }

    /// Whether this is one of the three advertising channels.
    pub const fn is_advertising(self) -> bool {
        self.0 >= 37
    }

    /// Carrier frequency in Hz.
    pub const fn frequency_hz(self) -> u64 {
        match self.0 {
            37 => 2_402_000_000,
            38 => 2_426_000_000,
            39 => 2_480_000_000,
            ch @ 0..=10 => 2_404_000_000 + ch as u64 * 2_000_000,
            ch => 2_428_000_000 + (ch as u64 - 11) * 2_000_000,
        }
    }
}

impl TryFrom<i32> for Channel {
    type Error = BtleError;

    fn try_from(value: i32) -> Result<Self> {
        match u8::try_from(value) {
            Ok(number) if number < NUM_BTLE_CHANNEL => Ok(Self(number)),
            _ => Err(BtleError::InvalidChannel(value)),
        }
    }
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> Self {
        channel.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advertising_frequencies() {
        assert_eq!(get_freq_by_channel_number(37), Ok(2_402_000_000));
        assert_eq!(get_freq_by_channel_number(38), Ok(2_426_000_000));
        assert_eq!(get_freq_by_channel_number(39), Ok(2_480_000_000));
    }

    #[test]
    fn test_data_channel_closed_form() {
        for ch in 0..=10 {
            assert_eq!(
                get_freq_by_channel_number(ch),
                Ok(2_404_000_000 + 2_000_000 * ch as u64)
            );
        }
        for ch in 11..=36 {
            assert_eq!(
                get_freq_by_channel_number(ch),
                Ok(2_428_000_000 + 2_000_000 * (ch as u64 - 11))
            );
        }
        assert_eq!(get_freq_by_channel_number(10), Ok(2_424_000_000));
        assert_eq!(get_freq_by_channel_number(11), Ok(2_428_000_000));
        assert_eq!(get_freq_by_channel_number(36), Ok(2_478_000_000));
    }

    #[test]
    fn test_invalid_channels() {
        assert_eq!(get_freq_by_channel_number(40), Err(BtleError::InvalidChannel(40)));
        assert_eq!(get_freq_by_channel_number(-1), Err(BtleError::InvalidChannel(-1)));
        assert_eq!(Channel::new(40), Err(BtleError::InvalidChannel(40)));
        assert_eq!(Channel::try_from(-1), Err(BtleError::InvalidChannel(-1)));
        assert_eq!(Channel::try_from(300), Err(BtleError::InvalidChannel(300)));
    }

    #[test]
    fn test_lookup_agrees_with_channel() {
        for number in -2..=42 {
            assert_eq!(
                get_freq_by_channel_number(number),
                Channel::try_from(number).map(|ch| ch.frequency_hz())
            );
        }
    }

    #[test]
    fn test_channel_accessors() {
        let ch = Channel::try_from(12).unwrap();
        assert_eq!(ch.number(), 12);
        assert_eq!(u8::from(ch), 12);
        assert!(!ch.is_advertising());
        assert!(Channel::ADV_38.is_advertising());
        assert_eq!(Channel::ADV_39.frequency_hz(), 2_480_000_000);
        assert_eq!(ch.frequency_hz(), 2_430_000_000);
    }
}

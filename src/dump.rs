//! `Display` adapters for bit, byte and sample dumps.
//!
//! None of them allocate; they format straight into the destination, so they work with
//! `log`, `write!` into a `heapless::String`, or a file writer alike.

use core::fmt;

use crate::encoding::bits_to_int;

/// Lower-case hex, two digits per byte, no separators.
#[derive(Debug, Clone, Copy)]
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|byte| write!(f, "{byte:02x}"))
    }
}

/// An LSB-first bit array, `-` between nibbles and a space between bytes.
#[derive(Debug, Clone, Copy)]
pub struct BitDump<'a>(pub &'a [u8]);

impl fmt::Display for BitDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, bit) in self.0.iter().enumerate() {
            if i != 0 && i % 8 == 0 {
                f.write_str(" ")?;
            } else if i != 0 && i % 4 == 0 {
                f.write_str("-")?;
            }
            write!(f, "{}", bit & 0x01)?;
        }
        Ok(())
    }
}

/// An LSB-first bit array rendered as lower-case hex, one octet per 8 bits.
///
/// A trailing partial octet is zero-padded.
#[derive(Debug, Clone, Copy)]
pub struct BitsAsHex<'a>(pub &'a [u8]);

impl fmt::Display for BitsAsHex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0
            .chunks(8)
            .try_for_each(|octet| write!(f, "{:02x}", bits_to_int(octet)))
    }
}

/// Bytes expanded LSB first, `xxxx-xxxx ` per byte.
#[derive(Debug, Clone, Copy)]
pub struct BytesAsBits<'a>(pub &'a [u8]);

impl fmt::Display for BytesAsBits<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            for k in 0..8 {
                if k == 4 {
                    f.write_str("-")?;
                }
                write!(f, "{}", (byte >> k) & 0x01)?;
            }
            f.write_str(" ")?;
        }
        Ok(())
    }
}

/// Layout of a [`SampleCsv`] dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum CsvFlavor {
    /// `v, ` separated, a line break before every 24 values.
    Plain,
    /// Space separated with `...` continuations, pasteable into a MATLAB array literal.
    Matlab,
}

/// Interleaved IQ samples as text, 24 values per line.
#[derive(Debug, Clone, Copy)]
pub struct SampleCsv<'a, S> {
    samples: &'a [S],
    flavor: CsvFlavor,
}

impl<'a, S> SampleCsv<'a, S> {
    /// Values per line.
    pub const LINE_LEN: usize = 24;

    /// Wraps `samples` for dumping in `flavor`.
    pub fn new(samples: &'a [S], flavor: CsvFlavor) -> Self {
        Self { samples, flavor }
    }
}

impl<S: fmt::Display> fmt::Display for SampleCsv<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (line_break, separator) = match self.flavor {
            CsvFlavor::Plain => ("\n", ", "),
            CsvFlavor::Matlab => ("...\n", " "),
        };
        for (i, value) in self.samples.iter().enumerate() {
            if i % Self::LINE_LEN == 0 {
                f.write_str(line_break)?;
            }
            write!(f, "{value}{separator}")?;
        }
        f.write_str("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_dump() {
        assert_eq!(format!("{}", HexDump(&[0xAA, 0xD6, 0x0B])), "aad60b");
        assert_eq!(format!("{}", HexDump(&[])), "");
    }

    #[test]
    fn test_bit_dump_separators() {
        let bits = [0, 1, 0, 1, 1, 1, 0, 0, 1, 0, 0, 0, 1];
        assert_eq!(format!("{}", BitDump(&bits)), "0101-1100 1000-1");
    }

    #[test]
    fn test_bits_as_hex_matches_bytes_as_bits() {
        let bits = [0, 1, 0, 1, 0, 1, 0, 1, 1, 1, 1, 1, 0, 0, 0, 0];
        assert_eq!(format!("{}", BitsAsHex(&bits)), "aa0f");
        assert_eq!(format!("{}", BytesAsBits(&[0xAA, 0x0F])), "0101-0101 1111-0000 ");
        assert_eq!(format!("{}", BitsAsHex(&[1, 1, 1])), "07");
    }

    #[test]
    fn test_sample_csv_plain() {
        let samples: Vec<i8> = (0..26).map(|v| v - 2).collect();
        let text = format!("{}", SampleCsv::new(&samples, CsvFlavor::Plain));
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "");
        assert!(lines[1].starts_with("-2, -1, 0, 1, "));
        assert!(lines[1].ends_with("21, "));
        assert_eq!(lines[2], "22, 23, ");
        assert_eq!(lines[3], "");
    }

    #[test]
    fn test_sample_csv_matlab() {
        let samples = [127i16, 0, -2047];
        let text = format!("{}", SampleCsv::new(&samples, CsvFlavor::Matlab));
        assert_eq!(text, "...\n127 0 -2047 \n");
        assert_eq!(format!("{}", SampleCsv::<i8>::new(&[], CsvFlavor::Matlab)), "\n");
    }
}

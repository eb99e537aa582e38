//! Response normalization: raw sampled integers → canonical response words.
//!
//! Variant differences between PUF designs live here and nowhere else:
//!
//! - **Sign**: comparator output read back as a signed 16-bit counter
//!   difference; the response is the single bit `raw > 0`.
//! - **CounterDiff**: an oscillator counter difference already formed by the
//!   measurement pipeline. Reinterpreted as an unsigned word, Gray-decoded,
//!   then optionally sliced.
//! - **Word**: multi-bit value passed through, optionally sliced.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bits::{BitSlice, MAX_WORD_WIDTH, gray_decode, word_mask};
use crate::error::{PufError, Result};

/// PUF response variant tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseVariant {
    #[default]
    #[serde(alias = "SIGN")]
    Sign,
    #[serde(alias = "COUNTER_DIFF", alias = "counter_diff")]
    CounterDiff,
    #[serde(alias = "WORD")]
    Word,
}

impl ResponseVariant {
    /// Raw machine-word width sampled for this variant.
    pub fn default_word_width(self) -> u32 {
        match self {
            Self::Sign | Self::CounterDiff => 16,
            Self::Word => 32,
        }
    }
}

impl fmt::Display for ResponseVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sign => write!(f, "sign"),
            Self::CounterDiff => write!(f, "counter-diff"),
            Self::Word => write!(f, "word"),
        }
    }
}

impl FromStr for ResponseVariant {
    type Err = PufError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sign" | "SIGN" => Ok(Self::Sign),
            "counter-diff" | "counter_diff" | "COUNTER_DIFF" => Ok(Self::CounterDiff),
            "word" | "WORD" => Ok(Self::Word),
            other => Err(PufError::UnsupportedVariant(other.to_string())),
        }
    }
}

/// Variant plus the raw word width it is sampled at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFormat {
    pub variant: ResponseVariant,
    pub word_width: u32,
}

impl Default for ResponseFormat {
    fn default() -> Self {
        Self::new(ResponseVariant::default())
    }
}

impl ResponseFormat {
    /// Format with the variant's default word width.
    pub fn new(variant: ResponseVariant) -> Self {
        Self {
            variant,
            word_width: variant.default_word_width(),
        }
    }

    pub fn with_word_width(variant: ResponseVariant, word_width: u32) -> Result<Self> {
        if word_width == 0 || word_width > MAX_WORD_WIDTH {
            return Err(PufError::InvalidWidth(word_width));
        }
        Ok(Self {
            variant,
            word_width,
        })
    }

    /// Width of the unsliced response word.
    pub fn response_width(&self) -> u32 {
        match self.variant {
            ResponseVariant::Sign => 1,
            ResponseVariant::CounterDiff | ResponseVariant::Word => self.word_width,
        }
    }

    /// Response bit-length used for distance normalization.
    pub fn response_bit_len(&self, slice: Option<&BitSlice>) -> Result<u32> {
        match slice {
            Some(slice) => {
                slice.validate(self.response_width())?;
                Ok(slice.len())
            }
            None => Ok(self.response_width()),
        }
    }

    /// Normalize one raw sample.
    pub fn normalize(&self, raw: i64, slice: Option<&BitSlice>) -> Result<u64> {
        let word = match self.variant {
            ResponseVariant::Sign => u64::from((raw as i16) > 0),
            ResponseVariant::CounterDiff => gray_decode(raw as u64 & word_mask(self.word_width)),
            ResponseVariant::Word => raw as u64 & word_mask(self.word_width),
        };
        match slice {
            Some(slice) => slice.apply(word, self.response_width()),
            None => Ok(word),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        assert_eq!("sign".parse::<ResponseVariant>(), Ok(ResponseVariant::Sign));
        assert_eq!(
            "COUNTER_DIFF".parse::<ResponseVariant>(),
            Ok(ResponseVariant::CounterDiff)
        );
        assert_eq!("word".parse::<ResponseVariant>(), Ok(ResponseVariant::Word));
    }

    #[test]
    fn test_parse_unknown_variant() {
        assert_eq!(
            "hybrid".parse::<ResponseVariant>(),
            Err(PufError::UnsupportedVariant("hybrid".to_string()))
        );
    }

    #[test]
    fn test_sign_uses_signed_16_bit() {
        let fmt = ResponseFormat::new(ResponseVariant::Sign);
        assert_eq!(fmt.normalize(5, None).unwrap(), 1);
        assert_eq!(fmt.normalize(0, None).unwrap(), 0);
        assert_eq!(fmt.normalize(-3, None).unwrap(), 0);
        // 0xFFFF is -1 as int16.
        assert_eq!(fmt.normalize(0xFFFF, None).unwrap(), 0);
        // 0x1_0001 truncates to 1.
        assert_eq!(fmt.normalize(0x1_0001, None).unwrap(), 1);
        assert_eq!(fmt.response_bit_len(None).unwrap(), 1);
    }

    #[test]
    fn test_counter_diff_gray_decodes_unsigned_word() {
        let fmt = ResponseFormat::new(ResponseVariant::CounterDiff);
        assert_eq!(fmt.normalize(0b0110, None).unwrap(), 0b0101);
        // -1 → 0xFFFF → 0xFFFF ^ 0x7FFF
        assert_eq!(fmt.normalize(-1, None).unwrap(), 0x8000);
        assert_eq!(fmt.response_bit_len(None).unwrap(), 16);
    }

    #[test]
    fn test_counter_diff_slice() {
        let fmt = ResponseFormat::new(ResponseVariant::CounterDiff);
        // -1 decodes to 0x8000: only the MSB (position 0) is set.
        let msb = BitSlice::single(0);
        let lsb = BitSlice::single(15);
        assert_eq!(fmt.normalize(-1, Some(&msb)).unwrap(), 1);
        assert_eq!(fmt.normalize(-1, Some(&lsb)).unwrap(), 0);
        assert_eq!(fmt.response_bit_len(Some(&msb)).unwrap(), 1);
    }

    #[test]
    fn test_word_passthrough_and_slice() {
        let fmt = ResponseFormat::with_word_width(ResponseVariant::Word, 8).unwrap();
        assert_eq!(fmt.normalize(0x1A5, None).unwrap(), 0xA5);
        let top = BitSlice::range(0, 4).unwrap();
        assert_eq!(fmt.normalize(0xA5, Some(&top)).unwrap(), 0xA);
        assert_eq!(fmt.response_bit_len(Some(&top)).unwrap(), 4);
    }

    #[test]
    fn test_slice_outside_word_fails() {
        let fmt = ResponseFormat::new(ResponseVariant::CounterDiff);
        let bad = BitSlice::single(16);
        assert_eq!(
            fmt.normalize(1, Some(&bad)),
            Err(PufError::InvalidSlice {
                position: 16,
                width: 16
            })
        );
        assert!(fmt.response_bit_len(Some(&bad)).is_err());
    }

    #[test]
    fn test_invalid_word_width() {
        assert_eq!(
            ResponseFormat::with_word_width(ResponseVariant::Word, 65),
            Err(PufError::InvalidWidth(65))
        );
    }

    #[test]
    fn test_variant_deserialize_tags() {
        let v: ResponseVariant = serde_json::from_str("\"COUNTER_DIFF\"").unwrap();
        assert_eq!(v, ResponseVariant::CounterDiff);
        let v: ResponseVariant = serde_json::from_str("\"word\"").unwrap();
        assert_eq!(v, ResponseVariant::Word);
    }
}

use std::fmt;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::Zero;

use crate::adder_terms::{STRUCTURAL_TERMS, WINDOW_BITS};

// 1024-bit squaring modulus of the reference unit, used when no modulus is
// supplied
pub const DEFAULT_MODULUS: &str = "124066695684124741398798927404814432744698427125735684128131855064976895337309138910015071214657674309443149407457493434579063840841220334555160125016331040933690674569571217337630239191517205721310197608387239846364360850220896772964978569683229449266819903414117058030106528073928633017118689826625594484331";

// Chunk indices the reference squarer looks up. A structural constant of
// the circuit, not derived from the word geometry.
pub const DEFAULT_TABLE_COUNT: usize = 33;

// Adder term index bound the reference circuit is sized for. Windows past
// the top of the representation are empty, so oversizing is harmless.
pub const DEFAULT_ADDER_TERM_COUNT: usize = 250;

// how an operand splits into fixed-width chunks
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordGeometry {
    pub word_len: usize,
    pub nonredundant_elements: usize,
    pub redundant_elements: usize,
    pub num_segments: usize,
    pub extra_elements: usize,
}

impl WordGeometry {
    // address width of one chunk lookup, half a word
    pub fn lookup_width(&self) -> usize {
        self.word_len / 2
    }

    pub fn lut8_size(&self) -> usize {
        1 << self.lookup_width()
    }

    // lut9 tables cover one extra high address bit
    pub fn lut9_size(&self) -> usize {
        1 << (self.lookup_width() + 1)
    }

    // bit width of one serialized table entry
    pub fn lut_width(&self) -> usize {
        self.word_len * self.nonredundant_elements
    }

    pub fn segment_elements(&self) -> usize {
        self.nonredundant_elements / self.num_segments
    }
}

impl Default for WordGeometry {
    fn default() -> Self {
        Self {
            word_len: 16,
            nonredundant_elements: 64,
            redundant_elements: 2,
            num_segments: 1,
            extra_elements: 2,
        }
    }
}

// The redundant signed-symbol representation: 2^(log_num_symbols+1)
// symbols, each log_radix magnitude bits plus a guard bit plus a sign bit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RadixGeometry {
    pub log_num_symbols: usize,
    pub log_radix: usize,
}

impl RadixGeometry {
    pub fn num_symbols(&self) -> usize {
        2 << self.log_num_symbols
    }

    pub fn symbol_width(&self) -> usize {
        self.log_radix + 2
    }

    pub fn sign_bit(&self) -> usize {
        self.log_radix + 1
    }

    // width of the canonical operand the symbols stand for
    pub fn mod_bit_width(&self) -> usize {
        self.log_radix << self.log_num_symbols
    }

    // width of the flattened symbol concatenation
    pub fn total_bits(&self) -> usize {
        self.num_symbols() * self.symbol_width()
    }

    // first flattened position whose weight reaches the modulus width, and
    // with it the start of the lookup term windows
    pub fn window_base(&self) -> usize {
        (self.symbol_width() << self.log_num_symbols) - 2
    }
}

impl Default for RadixGeometry {
    fn default() -> Self {
        Self {
            log_num_symbols: 5,
            log_radix: 33,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub modulus: BigUint,
    pub word: WordGeometry,
    pub radix: RadixGeometry,
    pub table_count: usize,
    pub adder_term_count: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            modulus: BigUint::parse_bytes(DEFAULT_MODULUS.as_bytes(), 10)
                .expect("default modulus parses"),
            word: WordGeometry::default(),
            radix: RadixGeometry::default(),
            table_count: DEFAULT_TABLE_COUNT,
            adder_term_count: DEFAULT_ADDER_TERM_COUNT,
        }
    }
}

impl GeneratorConfig {
    // Rejects a geometry the generators cannot work with. Runs before any
    // output is produced.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.modulus.is_zero() {
            return Err(ConfigError::ZeroModulus);
        }
        if !self.modulus.bit(0) {
            return Err(ConfigError::EvenModulus);
        }
        if self.word.word_len == 0 {
            return Err(ConfigError::ZeroWordLen);
        }
        if self.word.word_len % 2 != 0 {
            return Err(ConfigError::OddWordLen(self.word.word_len));
        }
        if self.word.num_segments == 0 {
            return Err(ConfigError::ZeroSegments);
        }
        if self.word.nonredundant_elements % self.word.num_segments != 0 {
            return Err(ConfigError::SegmentSplit {
                nonredundant_elements: self.word.nonredundant_elements,
                num_segments: self.word.num_segments,
            });
        }
        if self.table_count == 0 {
            return Err(ConfigError::ZeroTableCount);
        }
        if self.radix.log_num_symbols == 0 {
            return Err(ConfigError::LogNumSymbolsTooSmall(
                self.radix.log_num_symbols,
            ));
        }
        // With log_radix >= 2 the 3*mod_bit_width lift in the sign
        // correction dominates every mask it subtracts.
        if self.radix.log_radix < 2 {
            return Err(ConfigError::LogRadixTooSmall(self.radix.log_radix));
        }
        if self.adder_term_count < self.required_adder_terms() {
            return Err(ConfigError::AdderTermShortfall {
                configured: self.adder_term_count,
                required: self.required_adder_terms(),
            });
        }
        Ok(())
    }

    // smallest index bound whose windows still reach the top of the
    // representation
    pub fn required_adder_terms(&self) -> usize {
        let span = self.radix.total_bits() - self.radix.window_base();
        STRUCTURAL_TERMS + Integer::div_ceil(&span, &WINDOW_BITS)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    ZeroModulus,
    EvenModulus,
    ZeroWordLen,
    OddWordLen(usize),
    ZeroSegments,
    SegmentSplit {
        nonredundant_elements: usize,
        num_segments: usize,
    },
    ZeroTableCount,
    LogNumSymbolsTooSmall(usize),
    LogRadixTooSmall(usize),
    AdderTermShortfall {
        configured: usize,
        required: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroModulus => write!(f, "modulus must be nonzero"),
            ConfigError::EvenModulus => write!(f, "modulus must be odd"),
            ConfigError::ZeroWordLen => write!(f, "word_len must be nonzero"),
            ConfigError::OddWordLen(w) => {
                write!(f, "word_len must be even to split into lookup halves, got {}", w)
            }
            ConfigError::ZeroSegments => write!(f, "num_segments must be nonzero"),
            ConfigError::SegmentSplit {
                nonredundant_elements,
                num_segments,
            } => write!(
                f,
                "num_segments ({}) must divide nonredundant_elements ({}) exactly",
                num_segments, nonredundant_elements
            ),
            ConfigError::ZeroTableCount => write!(f, "table_count must be nonzero"),
            ConfigError::LogNumSymbolsTooSmall(v) => {
                write!(f, "log_num_symbols must be at least 1, got {}", v)
            }
            ConfigError::LogRadixTooSmall(v) => {
                write!(f, "log_radix must be at least 2, got {}", v)
            }
            ConfigError::AdderTermShortfall {
                configured,
                required,
            } => write!(
                f,
                "adder_term_count ({}) drops bit positions, geometry needs {}",
                configured, required
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = GeneratorConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.modulus.bits(), 1024);
    }

    #[test]
    fn reference_geometry_sizing() {
        let config = GeneratorConfig::default();
        assert_eq!(config.word.lookup_width(), 8);
        assert_eq!(config.word.lut8_size(), 256);
        assert_eq!(config.word.lut9_size(), 512);
        assert_eq!(config.word.lut_width(), 1024);
        assert_eq!(config.radix.num_symbols(), 64);
        assert_eq!(config.radix.symbol_width(), 35);
        assert_eq!(config.radix.mod_bit_width(), 1056);
        assert_eq!(config.radix.total_bits(), 2240);
        assert_eq!(config.radix.window_base(), 1118);
        // 190 windows cover the 1122 remaining positions; the reference
        // bound of 250 leaves the tail empty.
        assert_eq!(config.required_adder_terms(), 190);
    }

    #[test]
    fn rejects_bad_parameters() {
        let base = GeneratorConfig::default();

        let mut config = base.clone();
        config.modulus = BigUint::zero();
        assert_eq!(config.validate(), Err(ConfigError::ZeroModulus));

        let mut config = base.clone();
        config.modulus = BigUint::from(6u32);
        assert_eq!(config.validate(), Err(ConfigError::EvenModulus));

        let mut config = base.clone();
        config.word.word_len = 17;
        assert_eq!(config.validate(), Err(ConfigError::OddWordLen(17)));

        let mut config = base.clone();
        config.word.num_segments = 3;
        assert_eq!(
            config.validate(),
            Err(ConfigError::SegmentSplit {
                nonredundant_elements: 64,
                num_segments: 3,
            })
        );

        let mut config = base.clone();
        config.adder_term_count = 100;
        assert_eq!(
            config.validate(),
            Err(ConfigError::AdderTermShortfall {
                configured: 100,
                required: 190,
            })
        );
    }

    #[test]
    fn segment_split_follows_geometry() {
        let mut word = WordGeometry::default();
        word.num_segments = 4;
        assert_eq!(word.segment_elements(), 16);
    }
}

use std::error;
use std::fmt;

use log::debug;
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::bigmod::{pow2_mod, shift_reduce};
use crate::config::{GeneratorConfig, RadixGeometry};

// Flattened bit positions folded by one lookup term; the adder tree feeds
// six selector bits into each LUT.
pub const WINDOW_BITS: usize = 6;

// indices 0, 1 and 2 are structural, lookup windows start at 3
pub const STRUCTURAL_TERMS: usize = 3;

// a single '1' in the bit location of the sign bit of one symbol slot
pub fn sign_symbol(radix: &RadixGeometry) -> BigUint {
    BigUint::one() << radix.sign_bit()
}

// mask for all sign bit positions
pub fn all_sign_bits(radix: &RadixGeometry) -> BigUint {
    sign_mask(radix, radix.num_symbols())
}

fn sign_mask(radix: &RadixGeometry, slots: usize) -> BigUint {
    let sign = sign_symbol(radix);
    let mut mask = BigUint::zero();
    for _ in 0..slots {
        mask = (mask << radix.log_radix) + &sign;
    }
    mask
}

// contribution of one flattened bit position to a lookup term
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitContribution {
    pub symbol: usize,
    pub bit: usize,
    // 2^(symbol * log_radix + bit) mod M
    pub residue: BigUint,
    // sign positions subtract, so their selector is tested inverted
    pub negated: bool,
}

impl BitContribution {
    // position of the selector bit in the flattened operand
    pub fn flat_position(&self, radix: &RadixGeometry) -> usize {
        self.symbol * radix.symbol_width() + self.bit
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdderTerm {
    // fixed correction, independent of the operand
    Constant(BigUint),
    // Operand-dependent lookup window. The runtime value is the sum of the
    // residues whose selector picks them; the hardware bakes the residues
    // into a LUT and indexes it with the selectors.
    Window(Vec<BitContribution>),
}

// Correction for treating every sign bit as positive: subtract the full
// sign mask once, lifted by a multiple of M so the difference stays
// nonnegative.
fn sign_correction(config: &GeneratorConfig) -> BigUint {
    let radix = &config.radix;
    ((&config.modulus << (radix.mod_bit_width() * 3)) - all_sign_bits(radix)) % &config.modulus
}

// first flattened position of window `index`
fn window_offset(index: usize, radix: &RadixGeometry) -> usize {
    (index - STRUCTURAL_TERMS) * WINDOW_BITS + radix.window_base()
}

fn window_contributions(index: usize, config: &GeneratorConfig) -> Vec<BitContribution> {
    let radix = &config.radix;
    let offset = window_offset(index, radix);
    let mut contributions = Vec::with_capacity(WINDOW_BITS);
    for j in 0..WINDOW_BITS {
        let (symbol, bit) = (offset + j).div_rem(&radix.symbol_width());
        // positions past the top symbol fall off the representation
        if symbol >= radix.num_symbols() {
            break;
        }
        contributions.push(BitContribution {
            symbol,
            bit,
            residue: pow2_mod((symbol * radix.log_radix + bit) as u64, &config.modulus),
            negated: bit == radix.sign_bit(),
        });
    }
    contributions
}

pub fn generate_adder_term(index: usize, config: &GeneratorConfig) -> AdderTerm {
    match index {
        0 => AdderTerm::Constant(sign_correction(config)),
        // Low magnitude bits sit below the modulus width and pass through
        // uncorrected; the runtime value is operand data.
        1 => AdderTerm::Constant(BigUint::zero()),
        // Carry-in sign correction, one slot per symbol starting at symbol
        // 1.
        2 => {
            let mask = sign_mask(&config.radix, (1 << config.radix.log_num_symbols) - 1);
            AdderTerm::Constant(shift_reduce(&mask, &config.modulus))
        }
        _ => AdderTerm::Window(window_contributions(index, config)),
    }
}

pub fn generate_adder_terms(config: &GeneratorConfig) -> Vec<AdderTerm> {
    (0..config.adder_term_count)
        .map(|index| generate_adder_term(index, config))
        .collect()
}

// raw symbols of a flattened operand, low symbol first
fn split_symbols(x: &BigUint, radix: &RadixGeometry) -> Vec<BigUint> {
    let mask = (BigUint::one() << radix.symbol_width()) - BigUint::one();
    (0..radix.num_symbols())
        .map(|k| (x >> (k * radix.symbol_width())) & &mask)
        .collect()
}

// Replays the hardware's fold of a flattened operand: low magnitude bits
// in place, guard and inverted sign of the previous symbol one slot up,
// the fixed sign correction, and one lookup window per high-order term.
pub fn fold_operand(x: &BigUint, config: &GeneratorConfig) -> BigUint {
    let radix = &config.radix;
    let symbols = split_symbols(x, radix);
    let sign = sign_symbol(radix);
    let low_symbols = 1usize << radix.log_num_symbols;

    let magnitude_mask = (BigUint::one() << radix.log_radix) - BigUint::one();
    let mut sum = BigUint::zero();
    for (k, symbol) in symbols.iter().take(low_symbols).enumerate() {
        sum += (symbol & &magnitude_mask) << (k * radix.log_radix);
    }
    for k in 1..low_symbols {
        let carry = (&symbols[k - 1] ^ &sign) >> radix.log_radix;
        sum += carry << (k * radix.log_radix);
    }

    sum += sign_correction(config);

    for index in STRUCTURAL_TERMS..config.adder_term_count {
        let mut term = BigUint::zero();
        for c in window_contributions(index, config) {
            let selected = x.bit(c.flat_position(radix) as u64) != c.negated;
            if selected {
                term += c.residue;
            }
        }
        debug!("adderterm[{}] = {:#x}", index, term);
        sum += term;
    }

    sum % &config.modulus
}

// Residue of the value a flattened operand represents: per symbol,
// magnitude plus guard minus sign, at the symbol's radix weight.
pub fn direct_residue(x: &BigUint, config: &GeneratorConfig) -> BigUint {
    let radix = &config.radix;
    let body_mask = (BigUint::one() << (radix.log_radix + 1)) - BigUint::one();
    let mut positive = BigUint::zero();
    let mut negative = BigUint::zero();
    for (k, symbol) in split_symbols(x, radix).iter().enumerate() {
        positive += (symbol & &body_mask) << (k * radix.log_radix);
        if symbol.bit(radix.sign_bit() as u64) {
            negative += sign_symbol(radix) << (k * radix.log_radix);
        }
    }
    // same nonnegativity lift as the sign correction term
    ((&config.modulus << (radix.mod_bit_width() * 3)) + positive - negative) % &config.modulus
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdderTermError {
    // The folded sum disagrees with the direct residue. A defect in the
    // decomposition, not a runtime condition.
    Mismatch { folded: BigUint, direct: BigUint },
    // operand does not fit the configured representation
    OperandTooWide { bits: u64, capacity: usize },
}

impl fmt::Display for AdderTermError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdderTermError::Mismatch { folded, direct } => write!(
                f,
                "adder term fold diverges: folded {:#x}, direct {:#x}",
                folded, direct
            ),
            AdderTermError::OperandTooWide { bits, capacity } => write!(
                f,
                "operand is {} bits, representation holds {}",
                bits, capacity
            ),
        }
    }
}

impl error::Error for AdderTermError {}

// Replays the decomposition for `x` and checks the folded sum against the
// direct residue of the represented value.
pub fn verify_decomposition(x: &BigUint, config: &GeneratorConfig) -> Result<(), AdderTermError> {
    if x.bits() > config.radix.total_bits() as u64 {
        return Err(AdderTermError::OperandTooWide {
            bits: x.bits(),
            capacity: config.radix.total_bits(),
        });
    }
    let folded = fold_operand(x, config);
    let direct = direct_residue(x, config);
    debug!("fold check: folded {:#x}, direct {:#x}", folded, direct);
    if folded == direct {
        Ok(())
    } else {
        Err(AdderTermError::Mismatch { folded, direct })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 8 symbols of 4 magnitude bits keep the exhaustive checks cheap
    fn small_config() -> GeneratorConfig {
        let config = GeneratorConfig {
            modulus: BigUint::from(65521u32),
            radix: RadixGeometry {
                log_num_symbols: 2,
                log_radix: 4,
            },
            adder_term_count: 8,
            ..GeneratorConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
        config
    }

    fn constant(term: AdderTerm) -> BigUint {
        match term {
            AdderTerm::Constant(value) => value,
            AdderTerm::Window(_) => panic!("expected a constant term"),
        }
    }

    #[test]
    fn sign_correction_cancels_sign_mask() {
        for config in [small_config(), GeneratorConfig::default()] {
            let term = constant(generate_adder_term(0, &config));
            assert!(term < config.modulus);
            let restored = (term + all_sign_bits(&config.radix)) % &config.modulus;
            assert_eq!(restored, BigUint::zero());
        }
    }

    #[test]
    fn structural_terms_shape() {
        let config = small_config();
        assert_eq!(constant(generate_adder_term(1, &config)), BigUint::zero());

        // term 2 spans one slot fewer than the full sign mask
        let radix = &config.radix;
        let mut expected = BigUint::zero();
        for k in 0..((1 << radix.log_num_symbols) - 1) {
            expected += sign_symbol(radix) << (k * radix.log_radix);
        }
        assert_eq!(
            constant(generate_adder_term(2, &config)),
            expected % &config.modulus
        );
    }

    #[test]
    fn windows_tile_the_high_positions() {
        let config = small_config();
        let radix = &config.radix;
        let mut positions = Vec::new();
        for index in STRUCTURAL_TERMS..config.adder_term_count {
            match generate_adder_term(index, &config) {
                AdderTerm::Window(contributions) => {
                    for c in &contributions {
                        assert!(c.residue < config.modulus);
                        assert_eq!(c.negated, c.bit == radix.sign_bit());
                        positions.push(c.flat_position(radix));
                    }
                }
                AdderTerm::Constant(_) => panic!("expected a window term"),
            }
        }
        let expected: Vec<usize> = (radix.window_base()..radix.total_bits()).collect();
        assert_eq!(positions, expected);
    }

    #[test]
    fn oversized_bound_leaves_empty_windows() {
        let mut config = small_config();
        config.adder_term_count = 20;
        match generate_adder_term(19, &config) {
            AdderTerm::Window(contributions) => assert!(contributions.is_empty()),
            AdderTerm::Constant(_) => panic!("expected a window term"),
        }
    }

    #[test]
    fn fold_closes_on_small_geometry() {
        let config = small_config();
        let radix = &config.radix;
        let total_bits = radix.total_bits();

        // every symbol negated, magnitudes zero
        let mut all_negative = BigUint::zero();
        for k in 0..radix.num_symbols() {
            all_negative += BigUint::one() << (k * radix.symbol_width() + radix.sign_bit());
        }

        let operands = [
            BigUint::zero(),
            BigUint::from(4u32),
            all_negative,
            (BigUint::one() << total_bits) - BigUint::one(),
            BigUint::parse_bytes(b"2f9c81d3e6a45b07", 16).unwrap()
                & ((BigUint::one() << total_bits) - BigUint::one()),
        ];
        for x in &operands {
            assert_eq!(verify_decomposition(x, &config), Ok(()), "x = {:#x}", x);
        }
    }

    #[test]
    fn fold_closes_exhaustively_on_low_words() {
        let config = small_config();
        // sweep every pattern of the two lowest symbols, signs included
        for raw in 0u64..(1 << (2 * config.radix.symbol_width())) {
            let x = BigUint::from(raw);
            assert_eq!(verify_decomposition(&x, &config), Ok(()), "x = {:#x}", x);
        }
    }

    #[test]
    fn fold_closes_on_reference_geometry() {
        let config = GeneratorConfig::default();
        // the hardware model's sample operand, then a fixed full-width
        // pattern of alternating bits
        let x = BigUint::from(4u32);
        assert_eq!(verify_decomposition(&x, &config), Ok(()));

        let alternating =
            ((BigUint::one() << config.radix.total_bits()) - BigUint::one()) / BigUint::from(3u32);
        assert_eq!(verify_decomposition(&alternating, &config), Ok(()));
    }

    #[test]
    fn fold_closes_on_random_reference_operand() {
        use rand_core::{OsRng, RngCore};

        let config = GeneratorConfig::default();
        let mut bytes = vec![0u8; config.radix.total_bits() / 8];
        OsRng.fill_bytes(&mut bytes);
        let x = BigUint::from_bytes_le(&bytes);
        assert_eq!(verify_decomposition(&x, &config), Ok(()), "x = {:#x}", x);
    }

    #[test]
    fn dropped_windows_surface_as_mismatch() {
        let mut config = small_config();
        // cut the family short of the top positions; validate() would
        // reject this, which is exactly the defect the self-test must catch
        config.adder_term_count = config.required_adder_terms() - 2;
        let x = (BigUint::one() << config.radix.total_bits()) - BigUint::one();
        match verify_decomposition(&x, &config) {
            Err(AdderTermError::Mismatch { .. }) => {}
            other => panic!("expected a mismatch, got {:?}", other),
        }
    }

    #[test]
    fn rejects_oversized_operand() {
        let config = small_config();
        let x = BigUint::one() << config.radix.total_bits();
        assert_eq!(
            verify_decomposition(&x, &config),
            Err(AdderTermError::OperandTooWide {
                bits: config.radix.total_bits() as u64 + 1,
                capacity: config.radix.total_bits(),
            })
        );
    }
}

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use log::info;
use num_bigint::BigUint;
use num_traits::One;
use rand_core::{OsRng, RngCore};

use msu_precompute::adder_terms::{self, AdderTerm};
use msu_precompute::bigmod::pow2_mod;
use msu_precompute::config::{
    GeneratorConfig, RadixGeometry, WordGeometry, DEFAULT_ADDER_TERM_COUNT, DEFAULT_TABLE_COUNT,
};
use msu_precompute::reduction_lut;
use msu_precompute::sink::DirectorySink;

/// Precomputes the reduction tables and adder terms consumed by the modular
/// squaring unit.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Squaring modulus, decimal or 0x-prefixed hex.
    #[arg(short = 'M', long)]
    modulus: Option<String>,

    /// Redundant elements of the word geometry.
    #[arg(short = 'r', long, default_value_t = 2)]
    redundant: usize,

    /// Non-redundant elements of the word geometry.
    #[arg(short = 'n', long, default_value_t = 64)]
    nonredundant: usize,

    /// Bits per operand word.
    #[arg(short = 'w', long, default_value_t = 16)]
    wordlen: usize,

    /// Segments the non-redundant elements split into.
    #[arg(long, default_value_t = 1)]
    segments: usize,

    /// Extra elements of the word geometry.
    #[arg(long, default_value_t = 2)]
    extra: usize,

    /// Number of reduction table pairs.
    #[arg(long, default_value_t = DEFAULT_TABLE_COUNT)]
    tables: usize,

    /// log2 of half the symbol count of the redundant representation.
    #[arg(long, default_value_t = 5)]
    log_num_symbols: usize,

    /// log2 of the radix of the redundant representation.
    #[arg(long, default_value_t = 33)]
    log_radix: usize,

    /// Adder term index bound.
    #[arg(long, default_value_t = DEFAULT_ADDER_TERM_COUNT)]
    adder_terms: usize,

    /// Directory the table files land in.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Skip reduction table generation.
    #[arg(long)]
    skip_luts: bool,

    /// Skip adder term generation.
    #[arg(long)]
    skip_adder_terms: bool,

    /// Check the decomposition against a given operand, decimal or
    /// 0x-prefixed hex.
    #[arg(long)]
    verify: Option<String>,

    /// Check the decomposition against a random operand.
    #[arg(long)]
    selftest: bool,

    /// Print 2^i mod M over a half-open range, e.g. 1020..2048.
    #[arg(long)]
    dump_powers: Option<String>,
}

fn parse_big(s: &str) -> anyhow::Result<BigUint> {
    let parsed = if let Some(hex) = s.strip_prefix("0x") {
        BigUint::parse_bytes(hex.as_bytes(), 16)
    } else {
        BigUint::parse_bytes(s.as_bytes(), 10)
    };
    parsed.with_context(|| format!("not a valid integer: {}", s))
}

fn random_operand(radix: &RadixGeometry) -> BigUint {
    let mut bytes = vec![0u8; (radix.total_bits() + 7) / 8];
    OsRng.fill_bytes(&mut bytes);
    BigUint::from_bytes_le(&bytes) & ((BigUint::one() << radix.total_bits()) - BigUint::one())
}

fn report_adder_terms(config: &GeneratorConfig) {
    for (index, term) in adder_terms::generate_adder_terms(config).iter().enumerate() {
        match term {
            AdderTerm::Constant(value) => info!("adderterm[{}] = {:#x}", index, value),
            AdderTerm::Window(contributions) => {
                for c in contributions {
                    log::debug!(
                        "adderterm[{}]: sym {} bit {}{} = {:#x}",
                        index,
                        c.symbol,
                        c.bit,
                        if c.negated { " (sign)" } else { "" },
                        c.residue
                    );
                }
            }
        }
    }
}

fn run_verify(x: &BigUint, config: &GeneratorConfig) -> anyhow::Result<()> {
    adder_terms::verify_decomposition(x, config)?;
    info!(
        "decomposition closes for {:#x}: residue {:#x}",
        x,
        adder_terms::direct_residue(x, config)
    );
    Ok(())
}

fn dump_powers(range: &str, config: &GeneratorConfig) -> anyhow::Result<()> {
    let (lo, hi) = range
        .split_once("..")
        .with_context(|| format!("expected <lo>..<hi>, got {}", range))?;
    let (lo, hi): (u64, u64) = (lo.parse()?, hi.parse()?);
    if lo >= hi {
        bail!("empty power range {}..{}", lo, hi);
    }

    let width = config.word.lut_width() / 4;
    let mut acc = pow2_mod(lo, &config.modulus);
    for i in lo..hi {
        println!("{} 0x{:0width$x}", i, acc, width = width);
        acc <<= 1u32;
        if acc >= config.modulus {
            acc -= &config.modulus;
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let modulus = match &args.modulus {
        Some(s) => parse_big(s)?,
        None => GeneratorConfig::default().modulus,
    };
    let config = GeneratorConfig {
        modulus,
        word: WordGeometry {
            word_len: args.wordlen,
            nonredundant_elements: args.nonredundant,
            redundant_elements: args.redundant,
            num_segments: args.segments,
            extra_elements: args.extra,
        },
        radix: RadixGeometry {
            log_num_symbols: args.log_num_symbols,
            log_radix: args.log_radix,
        },
        table_count: args.tables,
        adder_term_count: args.adder_terms,
    };
    config.validate()?;

    if let Some(range) = &args.dump_powers {
        dump_powers(range, &config)?;
    }

    if !args.skip_luts {
        let mut sink = DirectorySink::new(&args.out_dir);
        reduction_lut::write_tables(&config, &mut sink)
            .context("writing reduction tables failed")?;
    }

    if !args.skip_adder_terms {
        report_adder_terms(&config);
    }

    if let Some(operand) = &args.verify {
        run_verify(&parse_big(operand)?, &config)?;
    }
    if args.selftest {
        run_verify(&random_operand(&config.radix), &config)?;
    }
    Ok(())
}

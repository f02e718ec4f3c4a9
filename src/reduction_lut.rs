use std::io;

use log::{debug, info};
use num_bigint::BigUint;

use crate::bigmod::pow2_mod;
use crate::config::GeneratorConfig;
use crate::sink::LineSink;

// Degree offset of the V7V6 partial-product column relative to its lut8
// sibling. Fixed by the squarer's port layout, not derived from the word
// geometry.
pub const LUT9_DEGREE_OFFSET: u64 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableKind {
    Lut8,
    Lut9,
}

impl TableKind {
    pub const ALL: [TableKind; 2] = [TableKind::Lut8, TableKind::Lut9];

    pub fn size(self, config: &GeneratorConfig) -> usize {
        match self {
            TableKind::Lut8 => config.word.lut8_size(),
            TableKind::Lut9 => config.word.lut9_size(),
        }
    }

    fn degree_offset(self) -> u64 {
        match self {
            TableKind::Lut8 => 0,
            TableKind::Lut9 => LUT9_DEGREE_OFFSET,
        }
    }

    pub fn file_name(self, index: usize) -> String {
        let tag = match self {
            TableKind::Lut8 => "lut8",
            TableKind::Lut9 => "lut9",
        };
        format!("precompute_{}_{:03}.dat", tag, index)
    }
}

// base reduction value for the chunk's coefficient degree,
// 2^((index + nonredundant_elements) * word_len), plus the kind's offset
pub fn table_base(kind: TableKind, index: usize, config: &GeneratorConfig) -> BigUint {
    let degree = (index + config.word.nonredundant_elements) * config.word.word_len;
    pow2_mod(degree as u64 + kind.degree_offset(), &config.modulus)
}

// entry j is the residue contribution of chunk value j
pub fn generate_table(kind: TableKind, index: usize, config: &GeneratorConfig) -> Vec<BigUint> {
    let base = table_base(kind, index, config);
    (0..kind.size(config))
        .map(|j| (&base * j) % &config.modulus)
        .collect()
}

pub fn format_entry(value: &BigUint, config: &GeneratorConfig) -> String {
    format!("{:0width$x}", value, width = config.word.lut_width() / 4)
}

// Each output unit carries the entry sequence twice, lut8 then lut9 per
// index; the squarer loads the two identical halves into separate RAM
// banks.
pub fn write_tables<S: LineSink>(config: &GeneratorConfig, sink: &mut S) -> io::Result<()> {
    info!("creating {} reduction table pairs", config.table_count);
    info!("  {}", TableKind::Lut8.file_name(0));
    info!("  ...");
    info!("  {}", TableKind::Lut9.file_name(config.table_count - 1));

    for index in 0..config.table_count {
        for kind in TableKind::ALL {
            let half: Vec<String> = generate_table(kind, index, config)
                .iter()
                .map(|entry| format_entry(entry, config))
                .collect();
            let mut lines = half.clone();
            lines.extend_from_slice(&half);
            debug!("{}: {} lines", kind.file_name(index), lines.len());
            sink.persist(&kind.file_name(index), &lines)?;
        }
    }
    Ok(())
}

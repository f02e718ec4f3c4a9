/*
    constant generation for the modular squaring unit

    the squarer never divides. an operand is split into word_len-wide chunks
    and every chunk above the non-redundant width is replaced by a lookup of
    its residue contribution, so one squaring step reduces with table reads
    and additions only. reduction_lut derives those tables.

    the wide sum coming out of the adder tree is kept in a signed symbol
    form where a set sign bit means the symbol subtracts. the hardware never
    subtracts either; every sign selector is inverted and one fixed
    correction removes the all-signs mask:

        -sum(s_k * W_k) = sum((1 - s_k) * W_k) - sum(W_k)

    adder_terms derives that correction, the pass-through terms for the bits
    below the modulus width, and one lookup term per 6-bit window above it.
    both generators reduce powers of two with the shift-and-reduce routines
    in bigmod, which never materialize 2^e.
*/

pub mod adder_terms;
pub mod bigmod;
pub mod config;
pub mod reduction_lut;
pub mod sink;

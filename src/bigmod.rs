use num_bigint::BigUint;
use num_traits::{One, Zero};

// double acc and bring it back below m
fn double_mod(acc: &mut BigUint, m: &BigUint) {
    *acc <<= 1u32;
    if &*acc >= m {
        *acc -= m;
    }
}

// 2^exp mod m, one doubling per exponent step. The exponents the generators
// feed in reach into the tens of thousands, so 2^exp itself is never built;
// the accumulator stays below m the whole way.
pub fn pow2_mod(exp: u64, m: &BigUint) -> BigUint {
    let mut acc = BigUint::one() % m;
    for _ in 0..exp {
        double_mod(&mut acc, m);
    }
    acc
}

// x mod m by scanning the bits of x against a running 2^i mod m
// accumulator. No division anywhere, just shifts and conditional
// subtractions.
pub fn shift_reduce(x: &BigUint, m: &BigUint) -> BigUint {
    let mut term = BigUint::zero();
    let mut two_pow = BigUint::one() % m;
    for i in 0..x.bits() {
        if x.bit(i) {
            term += &two_pow;
            if &term >= m {
                term -= m;
            }
        }
        double_mod(&mut two_pow, m);
    }
    term
}

#[test]
fn test_pow2_mod() {
    let m = BigUint::parse_bytes(b"302934307671667531413257853548643485645", 10).unwrap();
    let two = BigUint::from(2u32);
    for exp in [0u64, 1, 7, 64, 127, 128, 1024, 1552, 40_000] {
        assert_eq!(pow2_mod(exp, &m), two.modpow(&BigUint::from(exp), &m));
    }
}

#[test]
fn test_pow2_mod_trivial_modulus() {
    assert_eq!(pow2_mod(100, &BigUint::one()), BigUint::zero());
}

#[test]
fn test_shift_reduce() {
    let m = BigUint::parse_bytes(b"302934307671667531413257853548643485645", 10).unwrap();
    let samples = [
        BigUint::zero(),
        BigUint::from(4u32),
        &m - 1u32,
        &m + 1u32,
        (BigUint::one() << 2048u32) - 12345u32,
        BigUint::parse_bytes(b"deadbeefdeadbeefdeadbeefdeadbeefdeadbeef", 16).unwrap(),
    ];
    for x in samples {
        assert_eq!(shift_reduce(&x, &m), &x % &m);
    }
}

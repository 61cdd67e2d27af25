use crate::modulus::Modulus;

use super::number_theory::try_invert_u64_mod_u64;

/** `operand` must be at most modulus */
#[inline]
pub fn negate_u64_mod(operand: u64, modulus: &Modulus) -> u64 {
    if operand == 0 {0} else {modulus.value() - operand}
}

#[inline]
pub fn add_u64_mod(operand1: u64, operand2: u64, modulus: &Modulus) -> u64 {
    let sum = operand1 + operand2;
    if sum >= modulus.value() {sum - modulus.value()} else {sum}
}

#[inline]
pub fn sub_u64_mod(operand1: u64, operand2: u64, modulus: &Modulus) -> u64 {
    let (diff, borrow) = operand1.overflowing_sub(operand2);
    if borrow {diff.wrapping_add(modulus.value())} else {diff}
}

/// Base 2^64 Barrett reduction of a 128-bit input, using `floor(2^128 / q)`.
#[inline]
pub fn barrett_reduce_u128(input: u128, modulus: &Modulus) -> u64 {
    let [ratio_lo, ratio_hi, _] = *modulus.const_ratio();
    let lo = input as u64;
    let hi = (input >> 64) as u64;
    let carry = ((lo as u128 * ratio_lo as u128) >> 64) as u64;
    let round1 = lo as u128 * ratio_hi as u128 + carry as u128;
    let round2 = hi as u128 * ratio_lo as u128 + (round1 as u64) as u128;
    let quotient = hi.wrapping_mul(ratio_hi)
        .wrapping_add((round1 >> 64) as u64)
        .wrapping_add((round2 >> 64) as u64);
    let r = lo.wrapping_sub(quotient.wrapping_mul(modulus.value()));
    if r >= modulus.value() {r - modulus.value()} else {r}
}

#[inline]
pub fn barrett_reduce_u64(input: u64, modulus: &Modulus) -> u64 {
    let quotient = ((input as u128 * modulus.const_ratio()[1] as u128) >> 64) as u64;
    let r = input - quotient * modulus.value();
    if r >= modulus.value() {r - modulus.value()} else {r}
}

#[inline]
pub fn multiply_u64_mod(operand1: u64, operand2: u64, modulus: &Modulus) -> u64 {
    barrett_reduce_u128(operand1 as u128 * operand2 as u128, modulus)
}

/**
An operand together with the precomputed quotient `(operand << 64) / modulus`,
which lets [multiply_u64operand_mod] skip the full Barrett reduction.
Operand must be less than modulus.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MultiplyU64ModOperand {
    pub operand: u64,
    pub quotient: u64,
}

impl MultiplyU64ModOperand {

    pub fn new(operand: u64, modulus: &Modulus) -> Self {
        let quotient = (((operand as u128) << 64) / modulus.value() as u128) as u64;
        MultiplyU64ModOperand { operand, quotient }
    }

}

/** Returns x * y mod modulus. y.operand must be less than modulus. */
#[inline]
pub fn multiply_u64operand_mod(x: u64, y: &MultiplyU64ModOperand, modulus: &Modulus) -> u64 {
    let r = multiply_u64operand_mod_lazy(x, y, modulus);
    if r >= modulus.value() {r - modulus.value()} else {r}
}

/** Returns x * y mod modulus, possibly plus one modulus. */
#[inline]
pub fn multiply_u64operand_mod_lazy(x: u64, y: &MultiplyU64ModOperand, modulus: &Modulus) -> u64 {
    let estimate = ((x as u128 * y.quotient as u128) >> 64) as u64;
    y.operand.wrapping_mul(x).wrapping_sub(estimate.wrapping_mul(modulus.value()))
}

/** Returns (operand1 * operand2) + operand3 mod modulus. */
#[inline]
pub fn multiply_u64operand_add_u64_mod(
    operand1: u64,
    operand2: &MultiplyU64ModOperand,
    operand3: u64,
    modulus: &Modulus
) -> u64 {
    add_u64_mod(
        multiply_u64operand_mod(operand1, operand2, modulus),
        barrett_reduce_u64(operand3, modulus),
        modulus
    )
}

/** Reduces a little-endian multi-word integer modulo `modulus`. */
pub fn modulo_uint(value: &[u64], modulus: &Modulus) -> u64 {
    match value.len() {
        0 => 0,
        1 => barrett_reduce_u64(value[0], modulus),
        n => value[..n - 1].iter().rev().fold(
            barrett_reduce_u64(value[n - 1], modulus),
            |acc, &word| barrett_reduce_u128(((acc as u128) << 64) | word as u128, modulus)
        ),
    }
}

#[inline]
pub fn try_invert_u64_mod(operand: u64, modulus: &Modulus) -> Option<u64> {
    try_invert_u64_mod_u64(operand, modulus.value())
}

/** Returns operand^exponent mod modulus. */
pub fn exponentiate_u64_mod(operand: u64, mut exponent: u64, modulus: &Modulus) -> u64 {
    let mut power = barrett_reduce_u64(operand, modulus);
    let mut result = barrett_reduce_u64(1, modulus);
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = multiply_u64_mod(result, power, modulus);
        }
        exponent >>= 1;
        if exponent > 0 {
            power = multiply_u64_mod(power, power, modulus);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_mod_arith() {
        let m = Modulus::new(17).unwrap();
        assert_eq!(0, negate_u64_mod(0, &m));
        assert_eq!(16, negate_u64_mod(1, &m));
        assert_eq!(3, add_u64_mod(10, 10, &m));
        assert_eq!(15, sub_u64_mod(3, 5, &m));
        assert_eq!(2, multiply_u64_mod(6, 6, &m));
        assert_eq!(6, exponentiate_u64_mod(5, 3, &m));
        assert_eq!(1, exponentiate_u64_mod(5, 0, &m));
        assert_eq!(Some(7), try_invert_u64_mod(5, &m));
        assert_eq!(None, try_invert_u64_mod(0, &m));
    }

    #[test]
    fn test_barrett() {
        let m = Modulus::new(0xffffee001).unwrap();
        let big: u128 = 0xdeadbeef_cafebabe_12345678_9abcdef0;
        assert_eq!(barrett_reduce_u128(big, &m), (big % m.value() as u128) as u64);
        assert_eq!(barrett_reduce_u64(u64::MAX, &m), u64::MAX % m.value());

        let y = MultiplyU64ModOperand::new(123456789, &m);
        let x = 0xfffee0000;
        assert_eq!(multiply_u64operand_mod(x, &y, &m), ((x as u128 * 123456789) % m.value() as u128) as u64);
        assert_eq!(multiply_u64operand_add_u64_mod(x, &y, u64::MAX, &m),
            (((x as u128 * 123456789) + u64::MAX as u128) % m.value() as u128) as u64);

        let words = [0x1234, 0x5678, 0x9abc];
        let expected = ((((0x9abc_u128 % m.value() as u128) << 64 | 0x5678) % m.value() as u128) << 64 | 0x1234)
            % m.value() as u128;
        assert_eq!(modulo_uint(&words, &m), expected as u64);
    }

}

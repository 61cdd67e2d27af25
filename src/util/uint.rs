//! Constants and multi-precision helpers over little-endian `u64` words.

use std::cmp::Ordering;

pub const HE_MOD_BIT_COUNT_MAX: usize = 61;

pub const HE_POLY_MOD_DEGREE_MAX: usize = 131072;
pub const HE_POLY_MOD_DEGREE_MIN: usize = 2;

pub const HE_COEFF_MOD_COUNT_MAX: usize = 64;
pub const HE_COEFF_MOD_COUNT_MIN: usize = 1;

pub const HE_USER_MOD_BIT_COUNT_MAX: usize = 60;
pub const HE_USER_MOD_BIT_COUNT_MIN: usize = 2;

pub const HE_CIPHERTEXT_SIZE_MIN: usize = 2;
pub const HE_CIPHERTEXT_SIZE_MAX: usize = 3;

pub const HE_PRNG_SEED_BYTES: usize = 64;

#[inline]
pub fn get_significant_bit_count(value: u64) -> usize {
    64 - value.leading_zeros() as usize
}

/// Bit length of a multi-word integer.
pub fn get_significant_bit_count_uint(value: &[u64]) -> usize {
    match value.iter().rposition(|&w| w != 0) {
        Some(top) => 64 * top + get_significant_bit_count(value[top]),
        None => 0,
    }
}

/// Returns `log2(value)` when `value` is a power of two.
#[inline]
pub fn get_power_of_two(value: u64) -> Option<usize> {
    if value.is_power_of_two() {Some(value.trailing_zeros() as usize)} else {None}
}

#[inline]
pub fn reverse_bits_u64(operand: u64, bit_count: usize) -> u64 {
    if bit_count == 0 {0} else {operand.reverse_bits() >> (64 - bit_count)}
}

/// Relative closeness test used for comparing scales.
pub fn are_close_f64(value1: f64, value2: f64) -> bool {
    let scale_factor = value1.max(value2).max(1.0);
    (value1 - value2).abs() < f64::EPSILON * scale_factor
}

#[inline]
pub fn hamming_weight(x: u8) -> i32 {
    x.count_ones() as i32
}

#[inline]
pub fn divide_round_up(value: usize, divisor: usize) -> usize {
    (value + divisor - 1) / divisor
}

/// `operand1 += operand2`, returning the carry out of the top word.
pub fn add_uint_inplace(operand1: &mut [u64], operand2: &[u64]) -> bool {
    let mut carry = false;
    for (i, x) in operand1.iter_mut().enumerate() {
        let y = operand2.get(i).copied().unwrap_or(0);
        let (s1, c1) = x.overflowing_add(y);
        let (s2, c2) = s1.overflowing_add(carry as u64);
        *x = s2;
        carry = c1 || c2;
    }
    carry
}

/// `result = operand1 - operand2`, returning the borrow out of the top word.
pub fn sub_uint(operand1: &[u64], operand2: &[u64], result: &mut [u64]) -> bool {
    let mut borrow = false;
    for (i, r) in result.iter_mut().enumerate() {
        let x = operand1.get(i).copied().unwrap_or(0);
        let y = operand2.get(i).copied().unwrap_or(0);
        let (d1, b1) = x.overflowing_sub(y);
        let (d2, b2) = d1.overflowing_sub(borrow as u64);
        *r = d2;
        borrow = b1 || b2;
    }
    borrow
}

pub fn sub_uint_inplace(operand1: &mut [u64], operand2: &[u64]) -> bool {
    let copied = operand1.to_vec();
    sub_uint(&copied, operand2, operand1)
}

/// `result = operand1 * operand2`, truncated to the length of `result`.
pub fn multiply_uint_u64(operand1: &[u64], operand2: u64, result: &mut [u64]) {
    let mut carry = 0u64;
    for (i, r) in result.iter_mut().enumerate() {
        let x = operand1.get(i).copied().unwrap_or(0);
        let wide = (x as u128) * (operand2 as u128) + carry as u128;
        *r = wide as u64;
        carry = (wide >> 64) as u64;
    }
}

/// Product of all operands; `result` needs one word per operand.
pub fn multiply_many_u64(operands: &[u64], result: &mut [u64]) {
    result.fill(0);
    if operands.is_empty() {return;}
    result[0] = operands[0];
    let mut temp = vec![0; result.len()];
    for (i, &x) in operands.iter().enumerate().skip(1) {
        multiply_uint_u64(&result[..i], x, &mut temp[..=i]);
        result[..=i].copy_from_slice(&temp[..=i]);
    }
}

pub fn compare_uint(operand1: &[u64], operand2: &[u64]) -> Ordering {
    let n = operand1.len().max(operand2.len());
    for i in (0..n).rev() {
        let x = operand1.get(i).copied().unwrap_or(0);
        let y = operand2.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

#[inline]
pub fn is_greater_than_or_equal_uint(operand1: &[u64], operand2: &[u64]) -> bool {
    compare_uint(operand1, operand2) != Ordering::Less
}

/// `operand1 = (operand1 + operand2) mod modulus`, both operands already reduced.
pub fn add_uint_mod_inplace(operand1: &mut [u64], operand2: &[u64], modulus: &[u64]) {
    let carry = add_uint_inplace(operand1, operand2);
    if carry || is_greater_than_or_equal_uint(operand1, modulus) {
        sub_uint_inplace(operand1, modulus);
    }
}

/// Long division by a single word. Leaves the quotient in `numerator` and returns the remainder.
pub fn divide_uint_u64_inplace(numerator: &mut [u64], divisor: u64) -> u64 {
    let mut remainder = 0u128;
    for word in numerator.iter_mut().rev() {
        let current = (remainder << 64) | *word as u128;
        *word = (current / divisor as u128) as u64;
        remainder = current % divisor as u128;
    }
    remainder as u64
}

/// `ceil(value / 2)`, used for the centering thresholds.
pub fn half_round_up_uint(value: &[u64]) -> Vec<u64> {
    let mut ret = value.to_vec();
    let mut one = vec![0; value.len()];
    if let Some(first) = one.first_mut() {*first = 1;}
    let carry = add_uint_inplace(&mut ret, &one);
    for i in 0..ret.len() {
        let next = if i + 1 < ret.len() {ret[i + 1]} else {carry as u64};
        ret[i] = (ret[i] >> 1) | (next << 63);
    }
    ret
}

/// Lossy conversion of a multi-word integer to `f64`.
pub fn uint_to_f64(value: &[u64]) -> f64 {
    let two_pow_64 = 2.0_f64.powi(64);
    value.iter().rev().fold(0.0, |acc, &w| acc * two_pow_64 + w as f64)
}

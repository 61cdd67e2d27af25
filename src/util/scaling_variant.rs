//! Adding a plaintext polynomial scaled by `Delta = floor(Q / t)` into a ciphertext
//! component, with the rounding correction that keeps `Delta * m` equal to `round(Q * m / t)`.

use crate::{context::ExactContextData, util};

/// `round(Q * m / t)` modulo limb `j`, computed as `floor(Q / t) * m + floor(((Q mod t) * m + (t + 1) / 2) / t)`.
#[inline]
fn scaled_coefficient(m: u64, j: usize, data: &ExactContextData, coeff_modulus: &[crate::Modulus]) -> u64 {
    let t = data.plain_modulus().value();
    let numerator = m as u128 * data.coeff_modulus_mod_plain_modulus() as u128
        + data.plain_upper_half_threshold() as u128;
    let fix = (numerator / t as u128) as u64;
    util::multiply_u64operand_add_u64_mod(m, &data.coeff_div_plain_modulus()[j], fix, &coeff_modulus[j])
}

/// `destination += Delta * plain` over every limb of the coefficient modulus.
pub fn multiply_add_plain(plain: &[u64], data: &ExactContextData, coeff_modulus: &[crate::Modulus], degree: usize, destination: &mut [u64]) {
    for (j, (component, modulus)) in destination.chunks_exact_mut(degree).zip(coeff_modulus).enumerate() {
        for (x, &m) in component.iter_mut().zip(plain) {
            *x = util::add_u64_mod(*x, scaled_coefficient(m, j, data, coeff_modulus), modulus);
        }
    }
}

/// `destination -= Delta * plain` over every limb of the coefficient modulus.
pub fn multiply_sub_plain(plain: &[u64], data: &ExactContextData, coeff_modulus: &[crate::Modulus], degree: usize, destination: &mut [u64]) {
    for (j, (component, modulus)) in destination.chunks_exact_mut(degree).zip(coeff_modulus).enumerate() {
        for (x, &m) in component.iter_mut().zip(plain) {
            *x = util::sub_u64_mod(*x, scaled_coefficient(m, j, data, coeff_modulus), modulus);
        }
    }
}

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::{
    error::{Error, Result},
    parameters::SecurityLevel,
    util,
};

/// An integer modulus of up to 61 bits with its Barrett reduction constants.
///
/// The primes of the coefficient modulus and the plain modulus are all represented
/// by instances of Modulus. It serializes as its plain `u64` value.
#[derive(Debug, Eq, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Modulus {
    value: u64,
    const_ratio: [u64; 3],
    bit_count: usize,
    is_prime: bool,
}

impl Ord for Modulus {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl PartialOrd for Modulus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Modulus {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl std::hash::Hash for Modulus {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl Modulus {

    /// Create a new Modulus. The value must have between 2 and 61 bits.
    pub fn new(value: u64) -> Result<Self> {
        if value < 2 || value >> util::HE_MOD_BIT_COUNT_MAX != 0 {
            return Err(Error::invalid_parameters(format!(
                "modulus {} must have between 2 and {} bits", value, util::HE_MOD_BIT_COUNT_MAX
            )));
        }
        // const_ratio = floor(2^128 / value) in two words, then the remainder.
        let wide = value as u128;
        let mut quotient = u128::MAX / wide;
        let mut remainder = u128::MAX % wide + 1;
        if remainder == wide {
            quotient += 1;
            remainder = 0;
        }
        let mut ret = Modulus {
            value,
            const_ratio: [quotient as u64, (quotient >> 64) as u64, remainder as u64],
            bit_count: util::get_significant_bit_count(value),
            is_prime: false,
        };
        ret.is_prime = util::is_prime(&ret);
        Ok(ret)
    }

    #[inline]
    pub fn reduce(&self, value: u64) -> u64 {
        util::barrett_reduce_u64(value, self)
    }

    #[inline]
    pub fn reduce_u128(&self, value: u128) -> u64 {
        util::barrett_reduce_u128(value, self)
    }

    /// `floor(2^128 / value)` as two words followed by `2^128 mod value`.
    pub fn const_ratio(&self) -> &[u64; 3] {&self.const_ratio}
    pub fn value(&self) -> u64 {self.value}
    pub fn is_prime(&self) -> bool {self.is_prime}
    pub fn bit_count(&self) -> usize {self.bit_count}

}

impl TryFrom<u64> for Modulus {
    type Error = Error;
    fn try_from(value: u64) -> Result<Self> {
        Modulus::new(value)
    }
}

impl From<Modulus> for u64 {
    fn from(modulus: Modulus) -> u64 {
        modulus.value
    }
}

impl std::fmt::Display for Modulus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Modulus ({})", self.value)
    }
}

/// Static helpers for building a coefficient modulus.
///
/// The primes returned are only secure for the ring degree they were requested for.
pub struct CoeffModulus;

impl CoeffModulus {

    /// Largest total bit count of the coefficient modulus that keeps the given security
    /// level at this ring degree, per the HomomorphicEncryption.org standard.
    pub fn max_bit_count(poly_modulus_degree: usize, sec_level: SecurityLevel) -> usize {
        util::he_standard_params::max_coeff_modulus_bit_count(poly_modulus_degree, sec_level)
    }

    /// The default coefficient modulus for exact (batched) arithmetic at a standard degree.
    pub fn bfv_default(poly_modulus_degree: usize, sec_level: SecurityLevel) -> Result<Vec<Modulus>> {
        let moduli: &[u64] = match (sec_level, poly_modulus_degree) {
            (SecurityLevel::Tc128, 1024) => &[0x7e00001],
            (SecurityLevel::Tc128, 2048) => &[0x3fffffff000001],
            (SecurityLevel::Tc128, 4096) => &[0xffffee001, 0xffffc4001, 0x1ffffe0001],
            (SecurityLevel::Tc128, 8192) => &[0x7fffffd8001, 0x7fffffc8001, 0xfffffffc001, 0xffffff6c001, 0xfffffebc001],
            (SecurityLevel::Tc128, 16384) => &[
                0xfffffffd8001, 0xfffffffa0001, 0xfffffff00001, 0x1fffffff68001, 0x1fffffff50001,
                0x1ffffffee8001, 0x1ffffffea0001, 0x1ffffffe88001, 0x1ffffffe48001],
            (SecurityLevel::Tc192, 1024) => &[0x7f001],
            (SecurityLevel::Tc192, 2048) => &[0x1ffffc0001],
            (SecurityLevel::Tc192, 4096) => &[0x1ffc001, 0x1fce001, 0x1fc0001],
            (SecurityLevel::Tc192, 8192) => &[0x3ffffac001, 0x3ffff54001, 0x3ffff48001, 0x3ffff28001],
            (SecurityLevel::Tc256, 1024) => &[0x3001],
            (SecurityLevel::Tc256, 2048) => &[0x1ffc0001],
            (SecurityLevel::Tc256, 4096) => &[0x3ffffffff040001],
            (SecurityLevel::Tc256, 8192) => &[0x7ffffec001, 0x7ffffb0001, 0xfffffdc001],
            _ => return Err(Error::invalid_parameters(format!(
                "no default coefficient modulus for degree {} at {:?}", poly_modulus_degree, sec_level
            ))),
        };
        moduli.iter().map(|&x| Modulus::new(x)).collect()
    }

    /// Distinct primes with the requested bit sizes (at most 60 bits each), all
    /// congruent to 1 modulo `2 * poly_modulus_degree`.
    pub fn create(poly_modulus_degree: usize, bit_sizes: &[usize]) -> Result<Vec<Modulus>> {
        if !(util::HE_POLY_MOD_DEGREE_MIN..=util::HE_POLY_MOD_DEGREE_MAX).contains(&poly_modulus_degree)
            || util::get_power_of_two(poly_modulus_degree as u64).is_none()
        {
            return Err(Error::invalid_parameters(format!("invalid ring degree {}", poly_modulus_degree)));
        }
        if !(util::HE_COEFF_MOD_COUNT_MIN..=util::HE_COEFF_MOD_COUNT_MAX).contains(&bit_sizes.len()) {
            return Err(Error::invalid_parameters(format!("{} coefficient moduli requested", bit_sizes.len())));
        }
        if bit_sizes.iter().any(|b| !(util::HE_USER_MOD_BIT_COUNT_MIN..=util::HE_USER_MOD_BIT_COUNT_MAX).contains(b)) {
            return Err(Error::invalid_parameters("coefficient modulus bit sizes must be between 2 and 60"));
        }
        let mut count_table: HashMap<usize, usize> = HashMap::new();
        for &size in bit_sizes {
            *count_table.entry(size).or_insert(0) += 1;
        }
        let factor = 2 * poly_modulus_degree as u64;
        let mut prime_table = HashMap::new();
        for (size, count) in count_table {
            prime_table.insert(size, util::get_primes(factor, size, count)?);
        }
        bit_sizes.iter().map(|size| {
            prime_table.get_mut(size)
                .and_then(|primes| primes.pop())
                .ok_or_else(|| Error::invalid_parameters("ran out of primes"))
        }).collect()
    }

}

/// Static helpers for building a plain modulus.
pub struct PlainModulus;

impl PlainModulus {

    /// A prime plain modulus that supports batching at this ring degree.
    pub fn batching(poly_modulus_degree: usize, bit_size: usize) -> Result<Modulus> {
        let mut primes = CoeffModulus::create(poly_modulus_degree, &[bit_size])?;
        primes.pop().ok_or_else(|| Error::invalid_parameters("no batching prime found"))
    }

}

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    modulus::{CoeffModulus, Modulus, PlainModulus},
    util,
};

/// Describes which kind of arithmetic the encrypted data supports.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash, Serialize, Deserialize)]
pub enum SchemeType {
    /// Exact arithmetic modulo a plain modulus `t`, with values packed into `N` slots
    /// (Brakerski/Fan-Vercauteren).
    #[default]
    Exact,
    /// Approximate arithmetic on real or complex numbers scaled to integers
    /// (Cheon-Kim-Kim-Song).
    Approximate,
}

impl From<SchemeType> for u64 {
    fn from(value: SchemeType) -> Self {
        match value {
            SchemeType::Exact => 1,
            SchemeType::Approximate => 2,
        }
    }
}

/// A standard security level according to the HomomorphicEncryption.org security standard.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash, Serialize, Deserialize)]
pub enum SecurityLevel {
    /// No security guaranteed. Only meant for tests and toy parameters.
    None,
    /// 128-bit classical security level.
    #[default]
    Tc128,
    /// 192-bit classical security level.
    Tc192,
    /// 256-bit classical security level.
    Tc256,
}

/// The distribution of the error terms in fresh encryptions and keys.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash, Serialize, Deserialize)]
pub enum NoiseDistribution {
    #[default]
    CenteredBinomial,
    ClippedNormal,
}

/// A unique identifier for a set of security parameters.
pub type ParmsID = util::hash::HashBlock;

pub const PARMS_ID_ZERO: ParmsID = util::hash::HASH_ZERO_BLOCK;

pub const DEFAULT_DECOMPOSITION_BITS: usize = 20;

fn default_decomposition_bits() -> usize {
    DEFAULT_DECOMPOSITION_BITS
}

/// Everything that defines an encryption setting: scheme, ring degree `N`, coefficient
/// modulus `Q = q_0 * ... * q_{k-1}` and, for exact arithmetic, the plain modulus `t`.
///
/// Parameters are plain data and get validated once, by [crate::HeContext::new].
/// ```rust
/// # use cipherformula::*;
/// let degree = 8192;
/// let parms = SecurityParameters::new(SchemeType::Exact)
///     .set_ring_degree(degree)
///     .set_coeff_modulus(&CoeffModulus::bfv_default(degree, SecurityLevel::Tc128).unwrap())
///     .set_plain_modulus(&PlainModulus::batching(degree, 20).unwrap());
/// let context = HeContext::new(parms).unwrap();
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SecurityParameters {
    scheme: SchemeType,
    ring_degree: usize,
    coeff_modulus: Vec<Modulus>,
    #[serde(default)]
    plain_modulus: Option<Modulus>,
    #[serde(default)]
    security_level: SecurityLevel,
    #[serde(default = "default_decomposition_bits")]
    decomposition_bits: usize,
    #[serde(default)]
    noise_distribution: NoiseDistribution,
}

impl SecurityParameters {

    pub fn new(scheme: SchemeType) -> Self {
        SecurityParameters {
            scheme,
            ring_degree: 0,
            coeff_modulus: vec![],
            plain_modulus: None,
            security_level: SecurityLevel::default(),
            decomposition_bits: DEFAULT_DECOMPOSITION_BITS,
            noise_distribution: NoiseDistribution::default(),
        }
    }

    /// Exact arithmetic at `N = 8192` with the default 218-bit coefficient modulus and
    /// a 20-bit batching prime.
    pub fn exact_default() -> Result<Self> {
        let degree = 8192;
        Ok(Self::new(SchemeType::Exact)
            .set_ring_degree(degree)
            .set_coeff_modulus(&CoeffModulus::bfv_default(degree, SecurityLevel::Tc128)?)
            .set_plain_modulus(&PlainModulus::batching(degree, 20)?))
    }

    /// Approximate arithmetic at `N = 8192` over primes of 60, 40, 40 and 60 bits.
    pub fn approximate_default() -> Result<Self> {
        let degree = 8192;
        Ok(Self::new(SchemeType::Approximate)
            .set_ring_degree(degree)
            .set_coeff_modulus(&CoeffModulus::create(degree, &[60, 40, 40, 60])?))
    }

    pub fn scheme(&self) -> SchemeType {self.scheme}

    /// Ring degree `N`; the scheme works in `Z_Q[X]/(X^N + 1)`.
    pub fn ring_degree(&self) -> usize {self.ring_degree}

    pub fn coeff_modulus(&self) -> &[Modulus] {&self.coeff_modulus}

    pub fn plain_modulus(&self) -> Option<&Modulus> {self.plain_modulus.as_ref()}

    pub fn security_level(&self) -> SecurityLevel {self.security_level}

    /// Digit width `w` of the relinearization gadget.
    pub fn decomposition_bits(&self) -> usize {self.decomposition_bits}

    pub fn noise_distribution(&self) -> NoiseDistribution {self.noise_distribution}

    pub fn set_ring_degree(mut self, ring_degree: usize) -> Self {
        self.ring_degree = ring_degree;
        self
    }

    pub fn set_coeff_modulus(mut self, coeff_modulus: &[Modulus]) -> Self {
        self.coeff_modulus = coeff_modulus.to_vec();
        self
    }

    pub fn set_plain_modulus(mut self, plain_modulus: &Modulus) -> Self {
        self.plain_modulus = Some(*plain_modulus);
        self
    }

    pub fn set_security_level(mut self, security_level: SecurityLevel) -> Self {
        self.security_level = security_level;
        self
    }

    pub fn set_decomposition_bits(mut self, decomposition_bits: usize) -> Self {
        self.decomposition_bits = decomposition_bits;
        self
    }

    pub fn set_noise_distribution(mut self, noise_distribution: NoiseDistribution) -> Self {
        self.noise_distribution = noise_distribution;
        self
    }

    /// SHA-256 over scheme, degree, coefficient moduli and plain modulus (0 when absent).
    pub fn parms_id(&self) -> ParmsID {
        let mut data = Vec::with_capacity(3 + self.coeff_modulus.len());
        data.push(u64::from(self.scheme));
        data.push(self.ring_degree as u64);
        data.extend(self.coeff_modulus.iter().map(|x| x.value()));
        data.push(self.plain_modulus.map_or(0, |t| t.value()));
        util::hash::hash(&data)
    }

    pub fn total_coeff_modulus_bit_count(&self) -> usize {
        self.coeff_modulus.iter().map(|x| x.bit_count()).sum()
    }

    /// Checks every constraint a usable parameter set has to satisfy.
    pub fn validate(&self) -> Result<()> {
        let degree = self.ring_degree;
        if !(util::HE_POLY_MOD_DEGREE_MIN..=util::HE_POLY_MOD_DEGREE_MAX).contains(&degree)
            || util::get_power_of_two(degree as u64).is_none()
        {
            return Err(Error::invalid_parameters(format!("ring degree {} is not a supported power of two", degree)));
        }
        if self.security_level != SecurityLevel::None && degree < 1024 {
            return Err(Error::invalid_parameters(format!(
                "ring degree {} is below 1024, which requires SecurityLevel::None", degree
            )));
        }

        let k = self.coeff_modulus.len();
        if !(util::HE_COEFF_MOD_COUNT_MIN..=util::HE_COEFF_MOD_COUNT_MAX).contains(&k) {
            return Err(Error::invalid_parameters(format!("{} coefficient moduli given", k)));
        }
        let factor = 2 * degree as u64;
        for (i, q) in self.coeff_modulus.iter().enumerate() {
            if q.bit_count() > util::HE_USER_MOD_BIT_COUNT_MAX {
                return Err(Error::invalid_parameters(format!("coefficient modulus {} exceeds 60 bits", q.value())));
            }
            if !q.is_prime() || q.value() % factor != 1 {
                return Err(Error::invalid_parameters(format!(
                    "coefficient modulus {} is not a prime congruent to 1 mod {}", q.value(), factor
                )));
            }
            if self.coeff_modulus[..i].contains(q) {
                return Err(Error::invalid_parameters(format!("coefficient modulus {} repeats", q.value())));
            }
        }

        let total_bits = self.total_coeff_modulus_bit_count();
        let max_bits = CoeffModulus::max_bit_count(degree, self.security_level);
        if total_bits > max_bits {
            return Err(Error::invalid_parameters(format!(
                "coefficient modulus has {} bits, {:?} allows {} at degree {}",
                total_bits, self.security_level, max_bits, degree
            )));
        }

        match (self.scheme, self.plain_modulus) {
            (SchemeType::Exact, None) => {
                return Err(Error::invalid_parameters("exact arithmetic needs a plain modulus"));
            }
            (SchemeType::Exact, Some(t)) => {
                if !t.is_prime() || t.value() % factor != 1 {
                    return Err(Error::invalid_parameters(format!(
                        "plain modulus {} does not support batching at degree {}", t.value(), degree
                    )));
                }
                if t.bit_count() >= total_bits || self.coeff_modulus.contains(&t) {
                    return Err(Error::invalid_parameters(format!(
                        "plain modulus {} must be smaller than and coprime to the coefficient modulus", t.value()
                    )));
                }
            }
            (SchemeType::Approximate, Some(_)) => {
                return Err(Error::invalid_parameters("approximate arithmetic takes no plain modulus"));
            }
            (SchemeType::Approximate, None) => {}
        }

        let min_bits = self.coeff_modulus.iter().map(|x| x.bit_count()).min().unwrap_or(0);
        if self.decomposition_bits == 0 || self.decomposition_bits + 1 > min_bits {
            return Err(Error::invalid_parameters(format!(
                "decomposition width {} must be between 1 and {}", self.decomposition_bits, min_bits.saturating_sub(1)
            )));
        }
        Ok(())
    }

}

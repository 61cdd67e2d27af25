use std::sync::Arc;

use crate::{
    error::{Error, Result},
    modulus::Modulus,
    parameters::{ParmsID, SchemeType, SecurityParameters},
    ring::PolyRing,
    text::{Ciphertext, Plaintext},
    util::{
        self,
        he_standard_params::HE_STANDARD_PARAMS_NOISE_MAX_DEVIATION,
        rlwe::sample::NoiseSampler,
        BlakeRNG, BlakeRNGFactory, MultiplyU64ModOperand, NTTTables, RNSBase,
    },
};

const AUX_PRIME_BIT_SIZE: usize = 60;

/**
Precomputation only exact (plain modulus) arithmetic needs.

Besides the constants for embedding and extracting plaintexts, this holds an
auxiliary base `P` large enough that the tensor product of two ciphertexts can be
computed exactly over `Q * P` before being scaled down by `t / Q`.
*/
#[derive(Debug)]
pub struct ExactContextData {
    plain_modulus: Modulus,
    plain_ntt_tables: NTTTables,
    coeff_div_plain_modulus: Vec<MultiplyU64ModOperand>,
    coeff_modulus_mod_plain_modulus: u64,
    plain_upper_half_threshold: u64,
    inv_coeff_modulus_mod_plain_modulus: MultiplyU64ModOperand,
    aux_ring: PolyRing,
    extended_ring: PolyRing,
    inv_coeff_modulus_mod_aux: Vec<MultiplyU64ModOperand>,
}

impl ExactContextData {

    fn new(parms: &SecurityParameters, plain_modulus: &Modulus, base_q: &RNSBase) -> Result<Self> {
        let degree = parms.ring_degree();
        let log_degree = util::get_power_of_two(degree as u64)
            .ok_or_else(|| Error::invalid_parameters("ring degree is not a power of two"))?;
        let plain_ntt_tables = NTTTables::new(log_degree, plain_modulus)?;

        // floor(Q / t) mod q_i
        let mut quotient = base_q.base_prod().to_vec();
        let coeff_modulus_mod_plain_modulus = util::divide_uint_u64_inplace(&mut quotient, plain_modulus.value());
        let coeff_div_plain_modulus = base_q.base().iter()
            .map(|q| MultiplyU64ModOperand::new(util::modulo_uint(&quotient, q), q))
            .collect();
        let inv_q_mod_t = util::try_invert_u64_mod(coeff_modulus_mod_plain_modulus, plain_modulus)
            .ok_or_else(|| Error::invalid_parameters("coefficient modulus is not invertible modulo the plain modulus"))?;

        // bits(P) >= bits(Q) + bits(t) + log2(N) + 2
        let q_bits = util::get_significant_bit_count_uint(base_q.base_prod());
        let required_bits = q_bits + plain_modulus.bit_count() + log_degree + 2;
        let candidates = util::get_primes(2 * degree as u64, AUX_PRIME_BIT_SIZE,
            util::divide_round_up(required_bits, AUX_PRIME_BIT_SIZE - 1) + base_q.len() + 1)?;
        let mut aux_primes = vec![];
        let mut aux_bits = 0;
        for p in candidates.into_iter().filter(|p| !base_q.contains(p) && p != plain_modulus) {
            if aux_bits >= required_bits {break;}
            aux_bits += p.bit_count() - 1;
            aux_primes.push(p);
        }
        if aux_bits < required_bits {
            return Err(Error::invalid_parameters("not enough auxiliary primes for exact multiplication"));
        }

        let aux_ring = PolyRing::new(degree, &aux_primes)?;
        let mut extended_moduli = base_q.base().to_vec();
        extended_moduli.extend_from_slice(&aux_primes);
        let extended_ring = PolyRing::new(degree, &extended_moduli)?;
        let mut inv_coeff_modulus_mod_aux = Vec::with_capacity(aux_primes.len());
        for p in &aux_primes {
            let q_mod_p = util::modulo_uint(base_q.base_prod(), p);
            let inv = util::try_invert_u64_mod(q_mod_p, p)
                .ok_or_else(|| Error::invalid_parameters("coefficient modulus is not invertible modulo an auxiliary prime"))?;
            inv_coeff_modulus_mod_aux.push(MultiplyU64ModOperand::new(inv, p));
        }
        log::debug!("exact multiplication uses {} auxiliary primes ({} bits)", aux_primes.len(), aux_bits);

        Ok(ExactContextData {
            plain_modulus: *plain_modulus,
            plain_ntt_tables,
            coeff_div_plain_modulus,
            coeff_modulus_mod_plain_modulus,
            plain_upper_half_threshold: (plain_modulus.value() + 1) >> 1,
            inv_coeff_modulus_mod_plain_modulus: MultiplyU64ModOperand::new(inv_q_mod_t, plain_modulus),
            aux_ring,
            extended_ring,
            inv_coeff_modulus_mod_aux,
        })
    }

    pub fn plain_modulus(&self) -> &Modulus {&self.plain_modulus}
    pub fn plain_ntt_tables(&self) -> &NTTTables {&self.plain_ntt_tables}
    /// `floor(Q / t) mod q_i` for every limb.
    pub fn coeff_div_plain_modulus(&self) -> &[MultiplyU64ModOperand] {&self.coeff_div_plain_modulus}
    /// `Q mod t`
    pub fn coeff_modulus_mod_plain_modulus(&self) -> u64 {self.coeff_modulus_mod_plain_modulus}
    /// `(t + 1) / 2`
    pub fn plain_upper_half_threshold(&self) -> u64 {self.plain_upper_half_threshold}
    /// `Q^{-1} mod t`
    pub fn inv_coeff_modulus_mod_plain_modulus(&self) -> &MultiplyU64ModOperand {&self.inv_coeff_modulus_mod_plain_modulus}
    /// The auxiliary base `P`.
    pub fn aux_ring(&self) -> &PolyRing {&self.aux_ring}
    /// The base `Q` followed by `P`.
    pub fn extended_ring(&self) -> &PolyRing {&self.extended_ring}
    /// `Q^{-1} mod p_j` for every auxiliary prime.
    pub fn inv_coeff_modulus_mod_aux(&self) -> &[MultiplyU64ModOperand] {&self.inv_coeff_modulus_mod_aux}

}

/**
Shared, read-only precomputation for one [SecurityParameters] set.

Construction validates the parameters; afterwards the context is immutable and is
passed around as `Arc<HeContext>` to encoders, encryptors and evaluators, possibly
on several threads at once.
*/
#[derive(Debug)]
pub struct HeContext {
    parms: SecurityParameters,
    parms_id: ParmsID,
    ring: PolyRing,
    total_coeff_modulus_bit_count: usize,
    digits_per_limb: Vec<usize>,
    random_generator_factory: BlakeRNGFactory,
    noise_sampler: NoiseSampler,
    exact: Option<ExactContextData>,
}

impl HeContext {

    /// Validates `parms` and precomputes everything the scheme needs.
    /// Randomness from [HeContext::create_random_generator] comes from the OS.
    pub fn new(parms: SecurityParameters) -> Result<Arc<Self>> {
        Self::with_random_generator_factory(parms, BlakeRNGFactory::new())
    }

    /// As [HeContext::new], with a caller-provided source for [HeContext::create_random_generator].
    pub fn with_random_generator_factory(parms: SecurityParameters, factory: BlakeRNGFactory) -> Result<Arc<Self>> {
        parms.validate()?;
        let degree = parms.ring_degree();
        let ring = PolyRing::new(degree, parms.coeff_modulus())?;
        let total_coeff_modulus_bit_count = util::get_significant_bit_count_uint(ring.base().base_prod());
        let w = parms.decomposition_bits();
        let digits_per_limb = parms.coeff_modulus().iter()
            .map(|q| util::divide_round_up(q.bit_count(), w))
            .collect();
        let exact = match (parms.scheme(), parms.plain_modulus()) {
            (SchemeType::Exact, Some(t)) => Some(ExactContextData::new(&parms, t, ring.base())?),
            (SchemeType::Exact, None) => return Err(Error::invalid_parameters("exact arithmetic needs a plain modulus")),
            (SchemeType::Approximate, _) => None,
        };
        let noise_sampler = NoiseSampler::new(parms.noise_distribution())?;
        let parms_id = parms.parms_id();
        log::debug!(
            "created {:?} context: degree {}, {} limbs, {} bit coefficient modulus, deterministic rng: {}",
            parms.scheme(), degree, ring.coeff_modulus_size(), total_coeff_modulus_bit_count,
            factory.is_deterministic()
        );
        Ok(Arc::new(HeContext {
            parms,
            parms_id,
            ring,
            total_coeff_modulus_bit_count,
            digits_per_limb,
            random_generator_factory: factory,
            noise_sampler,
            exact,
        }))
    }

    pub fn parms(&self) -> &SecurityParameters {&self.parms}
    pub fn parms_id(&self) -> &ParmsID {&self.parms_id}
    pub fn scheme(&self) -> SchemeType {self.parms.scheme()}
    pub fn is_exact(&self) -> bool {self.exact.is_some()}
    pub fn ring(&self) -> &PolyRing {&self.ring}
    pub fn degree(&self) -> usize {self.ring.degree()}
    pub fn coeff_modulus(&self) -> &[Modulus] {self.ring.moduli()}
    pub fn coeff_modulus_size(&self) -> usize {self.ring.coeff_modulus_size()}
    pub fn total_coeff_modulus_bit_count(&self) -> usize {self.total_coeff_modulus_bit_count}
    pub fn decomposition_bits(&self) -> usize {self.parms.decomposition_bits()}
    /// Number of base-`2^w` digits of each limb in the relinearization gadget.
    pub fn digits_per_limb(&self) -> &[usize] {&self.digits_per_limb}
    pub fn decomposition_count(&self) -> usize {self.digits_per_limb.iter().sum()}
    pub fn noise_sampler(&self) -> &NoiseSampler {&self.noise_sampler}

    /// Exact-mode precomputation, or `InvalidParameters` for an approximate context.
    pub fn exact(&self) -> Result<&ExactContextData> {
        self.exact.as_ref().ok_or_else(|| Error::invalid_parameters("operation needs an exact (plain modulus) context"))
    }

    /// A cryptographically secure generator, seeded as configured at construction.
    pub fn create_random_generator(&self) -> BlakeRNG {
        self.random_generator_factory.get_rng()
    }

    /// Checks that `ct` was created under this context and has a usable shape.
    pub fn check_ciphertext(&self, ct: &Ciphertext) -> Result<()> {
        if ct.parms_id() != &self.parms_id {
            return Err(Error::modulus_mismatch("ciphertext belongs to another parameter set"));
        }
        if ct.poly_modulus_degree() != self.degree()
            || ct.coeff_modulus_size() != self.coeff_modulus_size()
            || ct.data().len() != ct.size() * self.ring.poly_len()
        {
            return Err(Error::modulus_mismatch("ciphertext buffer does not match the ring of this context"));
        }
        if !(util::HE_CIPHERTEXT_SIZE_MIN..=util::HE_CIPHERTEXT_SIZE_MAX).contains(&ct.size()) {
            return Err(Error::InvalidComponentCount { expected: "2 or 3".to_string(), found: ct.size() });
        }
        Ok(())
    }

    /// Checks that `plain` was encoded under this context: exact plaintexts hold `N`
    /// coefficients and no scale, approximate ones a full RNS polynomial and a scale.
    pub fn check_plaintext(&self, plain: &Plaintext) -> Result<()> {
        if plain.parms_id() != &self.parms_id {
            return Err(Error::modulus_mismatch("plaintext belongs to another parameter set"));
        }
        let expected_len = if self.is_exact() {self.degree()} else {self.ring.poly_len()};
        if plain.is_exact() != self.is_exact() || plain.len() != expected_len {
            return Err(Error::modulus_mismatch("plaintext buffer does not match this context"));
        }
        Ok(())
    }

    fn log_degree(&self) -> i64 {
        self.degree().trailing_zeros() as i64
    }

    /// Bits of the bound `6 * sigma * (1 + 2 * sqrt(N))` on fresh encryption noise.
    fn fresh_noise_bits(&self) -> i64 {
        let bound = (HE_STANDARD_PARAMS_NOISE_MAX_DEVIATION * (1.0 + 2.0 * (self.degree() as f64).sqrt())).ceil();
        util::get_significant_bit_count(bound as u64) as i64
    }

    fn plain_bits(&self) -> i64 {
        self.exact.as_ref().map_or(0, |e| e.plain_modulus.bit_count() as i64)
    }

    /// `bits(Q) - 1 - ceil(log2(scale)) - B`: room left above a value at this scale.
    fn scale_headroom(&self, scale: f64) -> i64 {
        let log_scale = if scale > 1.0 {scale.log2().ceil() as i64} else {0};
        self.total_coeff_modulus_bit_count as i64 - 1 - log_scale - self.fresh_noise_bits()
    }

    fn clamp(estimate: i64, cap: u32) -> u32 {
        estimate.clamp(0, cap as i64) as u32
    }

    /// Estimated budget of a fresh encryption at `scale` (ignored in exact mode).
    pub fn fresh_noise_budget(&self, scale: f64) -> u32 {
        let estimate = if self.is_exact() {
            self.total_coeff_modulus_bit_count as i64 - self.plain_bits() - self.fresh_noise_bits() - 1
        } else {
            self.scale_headroom(scale)
        };
        Self::clamp(estimate, u32::MAX)
    }

    pub fn noise_budget_after_add(&self, a: u32, b: u32) -> u32 {
        a.min(b).saturating_sub(1)
    }

    pub fn noise_budget_after_multiply(&self, a: u32, b: u32, result_scale: f64) -> u32 {
        let input = a.min(b);
        let estimate = if self.is_exact() {
            input as i64 - (self.plain_bits() + self.log_degree() + 2)
        } else {
            (input as i64 - 1).min(self.scale_headroom(result_scale) - self.log_degree())
        };
        Self::clamp(estimate, input)
    }

    pub fn noise_budget_after_multiply_plain(&self, a: u32, result_scale: f64) -> u32 {
        let estimate = if self.is_exact() {
            a as i64 - (self.plain_bits() + self.log_degree())
        } else {
            (a as i64 - 1).min(self.scale_headroom(result_scale) - self.log_degree())
        };
        Self::clamp(estimate, a)
    }

    /// Relinearization adds noise independent of the input, so the estimate is capped
    /// by what a key-switched ciphertext can hold.
    pub fn noise_budget_after_relinearize(&self, a: u32, scale: f64) -> u32 {
        let cap = if self.is_exact() {
            let w = self.decomposition_bits() as i64;
            let digits = util::get_significant_bit_count(self.decomposition_count() as u64) as i64;
            let sigma_bits = util::get_significant_bit_count(HE_STANDARD_PARAMS_NOISE_MAX_DEVIATION.ceil() as u64) as i64;
            self.total_coeff_modulus_bit_count as i64 - self.plain_bits()
                - (w + self.log_degree() / 2 + digits + sigma_bits) - 1
        } else {
            self.scale_headroom(scale)
        };
        Self::clamp(cap, a)
    }

}

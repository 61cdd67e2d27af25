use std::sync::Arc;

use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::{
    context::HeContext,
    parameters::ParmsID,
    util::{self, rlwe},
};

/// Struct to store a secret key.
///
/// The key is a ternary polynomial, kept over every limb of the coefficient modulus
/// both in coefficient form and in NTT form. Its buffers are wiped when it is dropped,
/// and it is deliberately not serializable.
///
/// - See [KeyGenerator] for the class that generates the secret key.
/// - See [PublicKey] for the class that stores the public key.
/// - See [RelinKeys] for the class that stores the relinearization keys.
#[derive(Clone)]
pub struct SecretKey {
    parms_id: ParmsID,
    data: Vec<u64>,
    data_ntt: Vec<u64>,
}

impl SecretKey {

    /// The [ParmsID] of the secret key.
    pub fn parms_id(&self) -> &ParmsID {
        &self.parms_id
    }

    /// The key in coefficient form.
    pub fn data(&self) -> &[u64] {
        &self.data
    }

    /// The key in NTT form.
    pub fn data_ntt(&self) -> &[u64] {
        &self.data_ntt
    }

}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.data.zeroize();
        self.data_ntt.zeroize();
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey").field("parms_id", &self.parms_id).finish_non_exhaustive()
    }
}

/// Struct to store a public key.
///
/// Mathematically the public key is a symmetric encryption of zero,
/// `(-(a * s + e), a)`. Both polynomials are kept in NTT form.
#[derive(Clone, Debug, PartialEq)]
pub struct PublicKey {
    parms_id: ParmsID,
    data: Vec<u64>,
}

impl PublicKey {

    /// The [ParmsID] of the public key.
    pub fn parms_id(&self) -> &ParmsID {
        &self.parms_id
    }

    /// Both polynomials, concatenated.
    pub fn data(&self) -> &[u64] {
        &self.data
    }

    /// Polynomial `index` (0 or 1) in NTT form.
    pub fn poly(&self, index: usize) -> &[u64] {
        let len = self.data.len() / 2;
        &self.data[index * len..(index + 1) * len]
    }

}

/// Struct to store relinearization keys.
///
/// There is one key-switching key per gadget digit: for RNS limb `i` and base-`2^w`
/// digit `j` the key is `(-(a * s + e) + 2^(w * j) * s^2 * [limb == i], a)`, both
/// polynomials in NTT form. Keys are stored limb-major, digits of limb `i` consecutive.
#[derive(Clone, Debug, PartialEq)]
pub struct RelinKeys {
    parms_id: ParmsID,
    decomposition_bits: usize,
    digits_per_limb: Vec<usize>,
    keys: Vec<Vec<u64>>,
}

impl RelinKeys {

    /// The [ParmsID] of the relinearization keys.
    pub fn parms_id(&self) -> &ParmsID {
        &self.parms_id
    }

    /// Gadget digit width `w`.
    pub fn decomposition_bits(&self) -> usize {
        self.decomposition_bits
    }

    pub fn digits_per_limb(&self) -> &[usize] {
        &self.digits_per_limb
    }

    /// Total number of key-switching keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The key for limb `limb` and digit `digit`, as its two NTT-form polynomials.
    pub fn key(&self, limb: usize, digit: usize) -> (&[u64], &[u64]) {
        let offset = self.digits_per_limb[..limb].iter().sum::<usize>();
        let key = &self.keys[offset + digit];
        key.split_at(key.len() / 2)
    }

}

/// The secret, public and relinearization keys of one session.
#[derive(Clone, Debug)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
    pub relin_keys: RelinKeys,
}

/// Generates matching secret, public and relinearization keys.
///
/// Randomness is always supplied by the caller, so generation is reproducible
/// with a seeded generator.
/// ```rust
/// # use cipherformula::*;
/// # use rand::SeedableRng;
/// let context = HeContext::new(SecurityParameters::exact_default().unwrap()).unwrap();
/// let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(0);
/// let keys = KeyGenerator::new(context).generate(&mut rng);
/// assert_eq!(15, keys.relin_keys.len());
/// ```
pub struct KeyGenerator {
    context: Arc<HeContext>,
}

impl KeyGenerator {

    /// Create a new KeyGenerator.
    pub fn new(context: Arc<HeContext>) -> Self {
        Self { context }
    }

    /// The [HeContext] used by the KeyGenerator.
    pub fn context(&self) -> &Arc<HeContext> {
        &self.context
    }

    /// Generates a fresh secret key together with its public and relinearization keys.
    pub fn generate<R: RngCore + CryptoRng>(&self, rng: &mut R) -> KeyPair {
        let secret_key = self.create_secret_key(rng);
        let public_key = self.create_public_key(&secret_key, rng);
        let relin_keys = self.generate_relin_keys(&secret_key, rng);
        KeyPair { secret_key, public_key, relin_keys }
    }

    /// Samples a ternary secret key.
    pub fn create_secret_key<R: RngCore + CryptoRng>(&self, rng: &mut R) -> SecretKey {
        let ring = self.context.ring();
        let mut data = ring.zero();
        rlwe::sample::ternary(rng, ring.degree(), ring.moduli(), &mut data);
        let mut data_ntt = data.clone();
        ring.ntt_inplace(&mut data_ntt);
        log::debug!("generated secret key");
        SecretKey { parms_id: *self.context.parms_id(), data, data_ntt }
    }

    /// Creates a public key for `secret_key`.
    pub fn create_public_key<R: RngCore + CryptoRng>(&self, secret_key: &SecretKey, rng: &mut R) -> PublicKey {
        let ring = self.context.ring();
        let mut data = rlwe::encrypt_zero::symmetric(secret_key, &self.context, rng);
        for poly in data.chunks_exact_mut(ring.poly_len()) {
            ring.ntt_inplace(poly);
        }
        log::debug!("generated public key");
        PublicKey { parms_id: *self.context.parms_id(), data }
    }

    /// Creates gadget key-switching keys from `s^2` to `s`.
    pub fn generate_relin_keys<R: RngCore + CryptoRng>(&self, secret_key: &SecretKey, rng: &mut R) -> RelinKeys {
        let context = &self.context;
        let ring = context.ring();
        let degree = ring.degree();
        let moduli = ring.moduli();
        let w = context.decomposition_bits();
        let noise = context.noise_sampler();

        let mut secret_squared = secret_key.data_ntt().to_vec();
        ring.dyadic_product_inplace(&mut secret_squared, secret_key.data_ntt());

        let mut keys = Vec::with_capacity(context.decomposition_count());
        let mut e = ring.zero();
        for (limb, (&digits, modulus)) in context.digits_per_limb().iter().zip(moduli).enumerate() {
            let limb_range = limb * degree..(limb + 1) * degree;
            for digit in 0..digits {
                let mut key = vec![0; 2 * ring.poly_len()];
                let (key0, key1) = key.split_at_mut(ring.poly_len());
                // a is uniform, so it can be sampled directly in NTT form
                rlwe::sample::uniform(rng, degree, moduli, key1);
                key0.copy_from_slice(key1);
                ring.dyadic_product_inplace(key0, secret_key.data_ntt());
                noise.sample(rng, degree, moduli, &mut e);
                ring.ntt_inplace(&mut e);
                ring.add_inplace(key0, &e);
                ring.negate_inplace(key0);

                let factor = util::exponentiate_u64_mod(2, (w * digit) as u64, modulus);
                let factor = util::MultiplyU64ModOperand::new(factor, modulus);
                for (x, &y) in key0[limb_range.clone()].iter_mut().zip(&secret_squared[limb_range.clone()]) {
                    let term = util::multiply_u64operand_mod(y, &factor, modulus);
                    *x = util::add_u64_mod(*x, term, modulus);
                }
                keys.push(key);
            }
        }
        e.zeroize();
        secret_squared.zeroize();
        log::debug!("generated {} relinearization keys with {} bit digits", keys.len(), w);
        RelinKeys {
            parms_id: *context.parms_id(),
            decomposition_bits: w,
            digits_per_limb: context.digits_per_limb().to_vec(),
            keys,
        }
    }

}

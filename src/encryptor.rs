use std::sync::Arc;

use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::{
    context::HeContext,
    error::{Error, Result},
    key::{PublicKey, SecretKey},
    text::{Ciphertext, Plaintext},
    util::{self, rlwe, scaling_variant},
};

/// Encrypts [Plaintext] objects into [Ciphertext] objects.
///
/// An Encryptor holds the public key and encrypts asymmetrically; symmetric
/// encryption under a secret key is available through [Encryptor::encrypt_symmetric].
/// Every call draws fresh randomness from the caller's generator, so two encryptions
/// of the same plaintext differ.
///
/// In exact mode the plaintext `m` enters the ciphertext as `round(Q * m / t)`; in
/// approximate mode it is added as is and its scale is carried over. Ciphertexts
/// are produced in coefficient form.
pub struct Encryptor {
    context: Arc<HeContext>,
    public_key: PublicKey,
}

impl Encryptor {

    /// Fails with `ModulusMismatch` if the key was generated under another context.
    pub fn new(context: Arc<HeContext>, public_key: PublicKey) -> Result<Self> {
        if public_key.parms_id() != context.parms_id() {
            return Err(Error::modulus_mismatch("public key belongs to another parameter set"));
        }
        Ok(Self { context, public_key })
    }

    /// Get the public key used by the encryptor.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn context(&self) -> &Arc<HeContext> {
        &self.context
    }

    /// Adds the encoded plaintext into component 0 and wraps the result.
    fn finish(&self, plain: &Plaintext, mut data: Vec<u64>) -> Result<Ciphertext> {
        let context = &self.context;
        let ring = context.ring();
        let c0 = &mut data[..ring.poly_len()];
        match plain.scale() {
            None => scaling_variant::multiply_add_plain(plain.data(), context.exact()?, ring.moduli(), ring.degree(), c0),
            Some(_) => ring.add_inplace(c0, plain.data()),
        }
        let scale = plain.scale().unwrap_or(1.0);
        let noise_budget = context.fresh_noise_budget(scale);
        log::trace!("encrypted plaintext at scale {}, noise budget {} bits", scale, noise_budget);
        Ok(Ciphertext::new(
            *context.parms_id(), 2, ring.coeff_modulus_size(), ring.degree(), scale, noise_budget, data
        ))
    }

    /// Encrypts a plaintext with the public key.
    pub fn encrypt<R: RngCore + CryptoRng>(&self, plain: &Plaintext, rng: &mut R) -> Result<Ciphertext> {
        self.context.check_plaintext(plain)?;
        let data = rlwe::encrypt_zero::asymmetric(&self.public_key, &self.context, rng);
        self.finish(plain, data)
    }

    /// Encrypts every plaintext of a batch, failing on the first invalid one.
    pub fn encrypt_batch<R: RngCore + CryptoRng>(&self, plains: &[Plaintext], rng: &mut R) -> Result<Vec<Ciphertext>> {
        plains.iter().map(|plain| self.encrypt(plain, rng)).collect()
    }

    /// Encrypts a plaintext directly under the secret key. The result is
    /// indistinguishable in use from a public-key encryption.
    pub fn encrypt_symmetric<R: RngCore + CryptoRng>(
        &self, plain: &Plaintext, secret_key: &SecretKey, rng: &mut R
    ) -> Result<Ciphertext> {
        if secret_key.parms_id() != self.context.parms_id() {
            return Err(Error::modulus_mismatch("secret key belongs to another parameter set"));
        }
        self.context.check_plaintext(plain)?;
        let data = rlwe::encrypt_zero::symmetric(secret_key, &self.context, rng);
        self.finish(plain, data)
    }

}

/// Decrypts [Ciphertext] objects into [Plaintext] objects.
///
/// Decryption computes `x = c0 + c1 * s (+ c2 * s^2)`. In exact mode the message is
/// `round(t * x / Q) mod t`, which is obtained without division as
/// `-[t * x]_Q * Q^(-1) mod t`; the size of the remainder `[t * x]_Q` also gives the
/// true noise budget. In approximate mode `x` itself is the plaintext.
pub struct Decryptor {
    context: Arc<HeContext>,
    secret_key: SecretKey,
}

impl Decryptor {

    /// Fails with `ModulusMismatch` if the key was generated under another context.
    pub fn new(context: Arc<HeContext>, secret_key: SecretKey) -> Result<Self> {
        if secret_key.parms_id() != context.parms_id() {
            return Err(Error::modulus_mismatch("secret key belongs to another parameter set"));
        }
        Ok(Self { context, secret_key })
    }

    pub fn context(&self) -> &Arc<HeContext> {
        &self.context
    }

    /// `s^power` in NTT form, wiped when dropped.
    fn secret_key_power(&self, power: usize) -> Zeroizing<Vec<u64>> {
        let ring = self.context.ring();
        let secret_ntt = self.secret_key.data_ntt();
        let mut result = Zeroizing::new(secret_ntt.to_vec());
        for _ in 1..power {
            ring.dyadic_product_inplace(&mut result, secret_ntt);
        }
        result
    }

    /// `c0 + c1 * s + c2 * s^2` in coefficient form.
    fn dot_product_with_secret_key(&self, encrypted: &Ciphertext) -> Vec<u64> {
        let ring = self.context.ring();
        let mut accumulated = ring.zero();
        let mut component = ring.zero();
        for (i, poly) in encrypted.polys().enumerate().skip(1) {
            let secret_power = self.secret_key_power(i);
            component.copy_from_slice(poly);
            ring.ntt_inplace(&mut component);
            ring.dyadic_product_accumulate(&component, &secret_power, &mut accumulated);
        }
        ring.intt_inplace(&mut accumulated);
        ring.add_inplace(&mut accumulated, encrypted.poly(0));
        accumulated
    }

    /// The message modulo `t` and the bit size of the largest `|[t * x]_Q|`.
    fn exact_message(&self, x: &mut [u64]) -> Result<(Vec<u64>, usize)> {
        let exact = self.context.exact()?;
        let ring = self.context.ring();
        let base = ring.base();
        let degree = ring.degree();
        let plain_modulus = exact.plain_modulus();

        ring.multiply_scalar_inplace(x, plain_modulus.value());
        let mut word = vec![0; base.len()];
        let mut message = Vec::with_capacity(degree);
        let mut max_bits = 0;
        for j in 0..degree {
            base.compose_into((0..base.len()).map(|i| x[i * degree + j]), &mut word);
            let is_negative = base.center(&mut word);
            max_bits = max_bits.max(util::get_significant_bit_count_uint(&word));
            let remainder = util::modulo_uint(&word, plain_modulus);
            // -r mod t
            let negated = if is_negative {remainder} else {util::negate_u64_mod(remainder, plain_modulus)};
            message.push(util::multiply_u64operand_mod(negated, exact.inv_coeff_modulus_mod_plain_modulus(), plain_modulus));
        }
        Ok((message, max_bits))
    }

    /// Decrypts a ciphertext of size 2 or 3. A ciphertext whose estimated budget is
    /// exhausted still decrypts, to an unreliable plaintext, and a warning is logged.
    pub fn decrypt(&self, encrypted: &Ciphertext) -> Result<Plaintext> {
        self.context.check_ciphertext(encrypted)?;
        if encrypted.noise_budget() == 0 {
            log::warn!("decrypting a ciphertext with exhausted noise budget, the result is unreliable");
        }
        let mut x = self.dot_product_with_secret_key(encrypted);
        let parms_id = *self.context.parms_id();
        if self.context.is_exact() {
            let (message, _) = self.exact_message(&mut x)?;
            Ok(Plaintext::new(parms_id, None, message))
        } else {
            Ok(Plaintext::new(parms_id, Some(encrypted.scale()), x))
        }
    }

    /// The true remaining noise budget in bits, `bits(Q) - bits(|[t * x]_Q|) - 1`
    /// clamped at zero. Exact mode only.
    pub fn invariant_noise_budget(&self, encrypted: &Ciphertext) -> Result<u32> {
        self.context.check_ciphertext(encrypted)?;
        self.context.exact()?;
        let mut x = self.dot_product_with_secret_key(encrypted);
        let (_, max_bits) = self.exact_message(&mut x)?;
        let budget = self.context.total_coeff_modulus_bit_count() as i64 - max_bits as i64 - 1;
        Ok(budget.max(0) as u32)
    }

}

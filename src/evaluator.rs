use std::sync::Arc;

use crate::{
    context::{ExactContextData, HeContext},
    error::{Error, Result},
    key::RelinKeys,
    text::{Ciphertext, Plaintext},
    util::{self, polymod, scaling_variant},
};

/**
Provides operations on ciphertexts.

Every operation takes its operands by shared reference and returns a fresh
[Ciphertext]; inputs are never modified, including when an error is returned.
Besides the polynomial data each result carries an updated scale and noise budget
estimate (see [HeContext::noise_budget_after_multiply] and friends). An input whose
estimate has reached zero is rejected with [Error::NoiseBudgetExhausted].

## Exact arithmetic
Multiplying two exact ciphertexts computes the tensor product of their centered
lifts over the extended base `Q * P`, where `P` is large enough that no coefficient
wraps, and then scales it by `t / Q` with rounding, moving back to `Q`.

## Approximate arithmetic
Products are plain ring products modulo `Q`; the scale of the result is the product
of the input scales. There is no rescaling, so the number of multiplications is
bounded by the headroom left above the scale.

## Relinearization
A product has three components. [Evaluator::relinearize] brings it back to two by
decomposing the last component into `w`-bit digits per limb and combining them with
the [RelinKeys].

```rust
# use cipherformula::*;
# use rand::SeedableRng;
let context = HeContext::new(SecurityParameters::exact_default().unwrap()).unwrap();
let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(1);
let keys = KeyGenerator::new(context.clone()).generate(&mut rng);
let encoder = BatchEncoder::new(context.clone()).unwrap();
let encryptor = Encryptor::new(context.clone(), keys.public_key.clone()).unwrap();
let decryptor = Decryptor::new(context.clone(), keys.secret_key.clone()).unwrap();
let evaluator = Evaluator::new(context);

let encrypted = encryptor.encrypt(&encoder.encode(&[1, 2, 3, 4]).unwrap(), &mut rng).unwrap();
let squared = evaluator.square(&encrypted).unwrap();
assert_eq!(3, squared.size());
let relinearized = evaluator.relinearize(&squared, &keys.relin_keys).unwrap();
assert_eq!(2, relinearized.size());
let decoded = encoder.decode(&decryptor.decrypt(&relinearized).unwrap()).unwrap();
assert_eq!(&[1, 4, 9, 16], &decoded[..4]);
```
*/
pub struct Evaluator {
    context: Arc<HeContext>,
}

impl Evaluator {

    /// Creates an Evaluator instance initialized with the specified [HeContext].
    pub fn new(context: Arc<HeContext>) -> Self {
        Self { context }
    }

    /// Returns a reference to the [HeContext] used by the evaluator.
    pub fn context(&self) -> &Arc<HeContext> {
        &self.context
    }

    fn check_operand(&self, encrypted: &Ciphertext, operation: &'static str) -> Result<()> {
        self.context.check_ciphertext(encrypted)?;
        if encrypted.noise_budget() == 0 {
            return Err(Error::NoiseBudgetExhausted { operation });
        }
        Ok(())
    }

    fn match_scale(left: f64, right: f64) -> Result<()> {
        if !util::are_close_f64(left, right) {
            return Err(Error::ScaleMismatch { left, right });
        }
        Ok(())
    }

    fn require_size(encrypted: &Ciphertext, size: usize) -> Result<()> {
        if encrypted.size() != size {
            return Err(Error::InvalidComponentCount { expected: size.to_string(), found: encrypted.size() });
        }
        Ok(())
    }

    fn is_scale_within_bounds(&self, scale: f64) -> bool {
        scale > 0.0 && scale.log2() + 1.0 < self.context.total_coeff_modulus_bit_count() as f64
    }

    fn ciphertext_with(&self, template: &Ciphertext, size: usize, scale: f64, noise_budget: u32, data: Vec<u64>) -> Ciphertext {
        Ciphertext::new(
            *template.parms_id(), size, template.coeff_modulus_size(), template.poly_modulus_degree(),
            scale, noise_budget, data,
        )
    }

    /// Negates every component. Scale and noise budget are unchanged.
    pub fn negate(&self, encrypted: &Ciphertext) -> Result<Ciphertext> {
        self.check_operand(encrypted, "negate")?;
        let ring = self.context.ring();
        let mut destination = encrypted.clone();
        for poly in destination.polys_mut() {
            ring.negate_inplace(poly);
        }
        log::trace!("negate: size {}", destination.size());
        Ok(destination)
    }

    fn add_or_sub(&self, encrypted1: &Ciphertext, encrypted2: &Ciphertext, subtract: bool, operation: &'static str) -> Result<Ciphertext> {
        self.check_operand(encrypted1, operation)?;
        self.check_operand(encrypted2, operation)?;
        Self::match_scale(encrypted1.scale(), encrypted2.scale())?;

        let ring = self.context.ring();
        let poly_len = ring.poly_len();
        let size = encrypted1.size().max(encrypted2.size());
        let mut data = vec![0; size * poly_len];
        data[..encrypted1.data().len()].copy_from_slice(encrypted1.data());
        for (destination, operand) in data.chunks_exact_mut(poly_len).zip(encrypted2.polys()) {
            if subtract {
                ring.sub_inplace(destination, operand);
            } else {
                ring.add_inplace(destination, operand);
            }
        }
        let noise_budget = self.context.noise_budget_after_add(encrypted1.noise_budget(), encrypted2.noise_budget());
        log::trace!("{}: size {}, noise budget {}", operation, size, noise_budget);
        Ok(self.ciphertext_with(encrypted1, size, encrypted1.scale(), noise_budget, data))
    }

    /// Adds two ciphertexts of the same scale. Either may have two or three
    /// components; the result has the larger size.
    pub fn add(&self, encrypted1: &Ciphertext, encrypted2: &Ciphertext) -> Result<Ciphertext> {
        self.add_or_sub(encrypted1, encrypted2, false, "add")
    }

    /// Computes `encrypted1 - encrypted2`, see [Evaluator::add].
    pub fn sub(&self, encrypted1: &Ciphertext, encrypted2: &Ciphertext) -> Result<Ciphertext> {
        self.add_or_sub(encrypted1, encrypted2, true, "sub")
    }

    fn add_or_sub_plain(&self, encrypted: &Ciphertext, plain: &Plaintext, subtract: bool, operation: &'static str) -> Result<Ciphertext> {
        self.check_operand(encrypted, operation)?;
        self.context.check_plaintext(plain)?;
        if let Some(scale) = plain.scale() {
            Self::match_scale(encrypted.scale(), scale)?;
        }

        let ring = self.context.ring();
        let mut destination = encrypted.clone();
        let c0 = destination.poly_mut(0);
        if self.context.is_exact() {
            let exact = self.context.exact()?;
            if subtract {
                scaling_variant::multiply_sub_plain(plain.data(), exact, ring.moduli(), ring.degree(), c0);
            } else {
                scaling_variant::multiply_add_plain(plain.data(), exact, ring.moduli(), ring.degree(), c0);
            }
        } else if subtract {
            ring.sub_inplace(c0, plain.data());
        } else {
            ring.add_inplace(c0, plain.data());
        }
        log::trace!("{}: noise budget {}", operation, destination.noise_budget());
        Ok(destination)
    }

    /// Adds a plaintext into the first component. In approximate mode the plaintext
    /// must have the ciphertext's scale.
    pub fn add_plain(&self, encrypted: &Ciphertext, plain: &Plaintext) -> Result<Ciphertext> {
        self.add_or_sub_plain(encrypted, plain, false, "add_plain")
    }

    /// Subtracts a plaintext, see [Evaluator::add_plain].
    pub fn sub_plain(&self, encrypted: &Ciphertext, plain: &Plaintext) -> Result<Ciphertext> {
        self.add_or_sub_plain(encrypted, plain, true, "sub_plain")
    }

    /// Lifts every component into NTT form over `ring`, centered from `Q` when the
    /// target ring is the extended one.
    fn ntt_components(&self, encrypted: &Ciphertext, exact: Option<&ExactContextData>) -> Vec<Vec<u64>> {
        let ring = self.context.ring();
        encrypted.polys().map(|poly| {
            let mut lifted = match exact {
                Some(exact) => ring.lift_centered(poly, exact.extended_ring()),
                None => poly.to_vec(),
            };
            match exact {
                Some(exact) => exact.extended_ring().ntt_inplace(&mut lifted),
                None => ring.ntt_inplace(&mut lifted),
            }
            lifted
        }).collect()
    }

    /// `(a0 b0, a0 b1 + a1 b0, a1 b1)` in NTT form. With `b` absent the cross term
    /// is computed once and doubled.
    fn tensor(ring: &crate::ring::PolyRing, a: &[Vec<u64>], b: Option<&[Vec<u64>]>) -> [Vec<u64>; 3] {
        let (a0, a1) = (&a[0], &a[1]);
        match b {
            Some(b) => {
                let (b0, b1) = (&b[0], &b[1]);
                let mut x0 = a0.clone();
                ring.dyadic_product_inplace(&mut x0, b0);
                let mut x1 = a0.clone();
                ring.dyadic_product_inplace(&mut x1, b1);
                ring.dyadic_product_accumulate(a1, b0, &mut x1);
                let mut x2 = a1.clone();
                ring.dyadic_product_inplace(&mut x2, b1);
                [x0, x1, x2]
            }
            None => {
                let mut x0 = a0.clone();
                ring.dyadic_product_inplace(&mut x0, a0);
                let mut x1 = a0.clone();
                ring.dyadic_product_inplace(&mut x1, a1);
                ring.multiply_scalar_inplace(&mut x1, 2);
                let mut x2 = a1.clone();
                ring.dyadic_product_inplace(&mut x2, a1);
                [x0, x1, x2]
            }
        }
    }

    /// Writes `round(t * x / Q)` into `destination` over `Q`, where `x` is an exact
    /// product in coefficient form over the extended base.
    ///
    /// With `r = [t x]_Q` centered, `y = (t x - r) / Q` is an integer which is
    /// computed modulo every auxiliary prime and then converted back to `Q`.
    fn scale_down_to_coeff_modulus(&self, exact: &ExactContextData, x: &[u64], destination: &mut [u64]) {
        let ring = self.context.ring();
        let aux = exact.aux_ring();
        let t = exact.plain_modulus().value();
        let (x_q, x_p) = x.split_at(ring.poly_len());

        let r = ring.multiply_scalar(x_q, t);
        let r_p = ring.lift_centered(&r, aux);

        let mut y = aux.multiply_scalar(x_p, t);
        aux.sub_inplace(&mut y, &r_p);
        polymod::multiply_operands_inplace_p(&mut y, exact.inv_coeff_modulus_mod_aux(), aux.degree(), aux.moduli());
        aux.base().convert_centered_array(&y, aux.degree(), ring.moduli(), destination);
    }

    fn tensor_product(&self, encrypted1: &Ciphertext, encrypted2: Option<&Ciphertext>) -> Result<Vec<u64>> {
        let ring = self.context.ring();
        let poly_len = ring.poly_len();
        let mut data = vec![0; 3 * poly_len];
        if self.context.is_exact() {
            let exact = self.context.exact()?;
            let extended = exact.extended_ring();
            let a = self.ntt_components(encrypted1, Some(exact));
            let b = encrypted2.map(|b| self.ntt_components(b, Some(exact)));
            let products = Self::tensor(extended, &a, b.as_deref());
            for (mut x, destination) in products.into_iter().zip(data.chunks_exact_mut(poly_len)) {
                extended.intt_inplace(&mut x);
                self.scale_down_to_coeff_modulus(exact, &x, destination);
            }
        } else {
            let a = self.ntt_components(encrypted1, None);
            let b = encrypted2.map(|b| self.ntt_components(b, None));
            let products = Self::tensor(ring, &a, b.as_deref());
            for (mut x, destination) in products.into_iter().zip(data.chunks_exact_mut(poly_len)) {
                ring.intt_inplace(&mut x);
                destination.copy_from_slice(&x);
            }
        }
        Ok(data)
    }

    fn multiply_internal(&self, encrypted1: &Ciphertext, encrypted2: Option<&Ciphertext>, operation: &'static str) -> Result<Ciphertext> {
        let other = encrypted2.unwrap_or(encrypted1);
        self.check_operand(encrypted1, operation)?;
        self.check_operand(other, operation)?;
        Self::require_size(encrypted1, 2)?;
        Self::require_size(other, 2)?;
        let scale = encrypted1.scale() * other.scale();
        if !self.context.is_exact() && !self.is_scale_within_bounds(scale) {
            return Err(Error::invalid_parameters(format!("product scale 2^{:.1} is out of bounds", scale.log2())));
        }

        let data = self.tensor_product(encrypted1, encrypted2)?;
        let noise_budget = self.context.noise_budget_after_multiply(encrypted1.noise_budget(), other.noise_budget(), scale);
        log::trace!("{}: scale {}, noise budget {}", operation, scale, noise_budget);
        Ok(self.ciphertext_with(encrypted1, 3, scale, noise_budget, data))
    }

    /// Multiplies two size 2 ciphertexts into a size 3 one whose scale is the
    /// product of the input scales.
    pub fn multiply(&self, encrypted1: &Ciphertext, encrypted2: &Ciphertext) -> Result<Ciphertext> {
        self.multiply_internal(encrypted1, Some(encrypted2), "multiply")
    }

    /// Same as `multiply(encrypted, encrypted)` with one fewer product.
    pub fn square(&self, encrypted: &Ciphertext) -> Result<Ciphertext> {
        self.multiply_internal(encrypted, None, "square")
    }

    /// The plaintext as a polynomial over `Q`. Exact plaintexts are lifted centered
    /// from `[0, t)`.
    fn plain_over_coeff_modulus(&self, plain: &Plaintext) -> Result<Vec<u64>> {
        if !self.context.is_exact() {
            return Ok(plain.data().to_vec());
        }
        let exact = self.context.exact()?;
        let ring = self.context.ring();
        let t = exact.plain_modulus().value();
        let threshold = exact.plain_upper_half_threshold();
        let mut lifted = ring.zero();
        for (component, modulus) in lifted.chunks_exact_mut(ring.degree()).zip(ring.moduli()) {
            for (x, &m) in component.iter_mut().zip(plain.data()) {
                *x = if m >= threshold {
                    util::negate_u64_mod(modulus.reduce(t - m), modulus)
                } else {
                    modulus.reduce(m)
                };
            }
        }
        Ok(lifted)
    }

    /// Multiplies every component by a plaintext polynomial. The size is unchanged.
    ///
    /// ```rust
    /// # use cipherformula::*;
    /// # use rand::SeedableRng;
    /// let context = HeContext::new(SecurityParameters::exact_default().unwrap()).unwrap();
    /// let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(2);
    /// let keys = KeyGenerator::new(context.clone()).generate(&mut rng);
    /// let encoder = BatchEncoder::new(context.clone()).unwrap();
    /// let encryptor = Encryptor::new(context.clone(), keys.public_key).unwrap();
    /// let decryptor = Decryptor::new(context.clone(), keys.secret_key).unwrap();
    /// let evaluator = Evaluator::new(context);
    ///
    /// let encrypted = encryptor.encrypt(&encoder.encode_integer(37).unwrap(), &mut rng).unwrap();
    /// let product = evaluator.multiply_plain(&encrypted, &encoder.encode_integer(49).unwrap()).unwrap();
    /// assert_eq!(1813, encoder.decode_integer(&decryptor.decrypt(&product).unwrap()).unwrap());
    /// ```
    pub fn multiply_plain(&self, encrypted: &Ciphertext, plain: &Plaintext) -> Result<Ciphertext> {
        self.check_operand(encrypted, "multiply_plain")?;
        self.context.check_plaintext(plain)?;
        let scale = encrypted.scale() * plain.scale().unwrap_or(1.0);
        if !self.context.is_exact() && !self.is_scale_within_bounds(scale) {
            return Err(Error::invalid_parameters(format!("product scale 2^{:.1} is out of bounds", scale.log2())));
        }

        let ring = self.context.ring();
        let mut plain_ntt = self.plain_over_coeff_modulus(plain)?;
        ring.ntt_inplace(&mut plain_ntt);
        let mut destination = encrypted.clone();
        for poly in destination.polys_mut() {
            ring.ntt_inplace(poly);
            ring.dyadic_product_inplace(poly, &plain_ntt);
            ring.intt_inplace(poly);
        }
        let noise_budget = self.context.noise_budget_after_multiply_plain(encrypted.noise_budget(), scale);
        destination.set_scale(scale);
        destination.set_noise_budget(noise_budget);
        log::trace!("multiply_plain: scale {}, noise budget {}", scale, noise_budget);
        Ok(destination)
    }

    /// Brings a size 3 ciphertext back to size 2.
    ///
    /// For every limb `i` and digit `j` the `w`-bit digit `d_ij` of the last component
    /// is multiplied with the matching key, which encrypts `2^(w j) s^2` on limb `i`.
    pub fn relinearize(&self, encrypted: &Ciphertext, relin_keys: &RelinKeys) -> Result<Ciphertext> {
        self.check_operand(encrypted, "relinearize")?;
        if relin_keys.parms_id() != self.context.parms_id() {
            return Err(Error::modulus_mismatch("relinearization keys belong to another parameter set"));
        }
        Self::require_size(encrypted, 3)?;

        let ring = self.context.ring();
        let degree = ring.degree();
        let w = relin_keys.decomposition_bits();
        let mask = (1u64 << w) - 1;
        let c2 = encrypted.poly(2);

        let mut accumulated0 = ring.zero();
        let mut accumulated1 = ring.zero();
        let mut digit = ring.zero();
        for (i, &digits) in relin_keys.digits_per_limb().iter().enumerate() {
            let limb = &c2[i * degree..(i + 1) * degree];
            for j in 0..digits {
                for (component, modulus) in digit.chunks_exact_mut(degree).zip(ring.moduli()) {
                    for (d, &c) in component.iter_mut().zip(limb) {
                        *d = modulus.reduce((c >> (w * j)) & mask);
                    }
                }
                ring.ntt_inplace(&mut digit);
                let (key0, key1) = relin_keys.key(i, j);
                ring.dyadic_product_accumulate(&digit, key0, &mut accumulated0);
                ring.dyadic_product_accumulate(&digit, key1, &mut accumulated1);
            }
        }
        ring.intt_inplace(&mut accumulated0);
        ring.intt_inplace(&mut accumulated1);

        let mut data = encrypted.data()[..2 * ring.poly_len()].to_vec();
        let (c0, c1) = data.split_at_mut(ring.poly_len());
        ring.add_inplace(c0, &accumulated0);
        ring.add_inplace(c1, &accumulated1);
        let noise_budget = self.context.noise_budget_after_relinearize(encrypted.noise_budget(), encrypted.scale());
        log::trace!("relinearize: {} digits, noise budget {}", relin_keys.len(), noise_budget);
        Ok(self.ciphertext_with(encrypted, 2, encrypted.scale(), noise_budget, data))
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        batch_encoder::BatchEncoder,
        ckks_encoder::CKKSEncoder,
        context::tests::toy_exact_parms,
        encryptor::{Decryptor, Encryptor},
        key::{KeyGenerator, KeyPair},
        modulus::CoeffModulus,
        parameters::{SchemeType, SecurityLevel, SecurityParameters},
    };
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    struct Suite {
        context: Arc<HeContext>,
        keys: KeyPair,
        encryptor: Encryptor,
        decryptor: Decryptor,
        evaluator: Evaluator,
        rng: ChaCha20Rng,
    }

    impl Suite {
        fn new(parms: SecurityParameters, seed: u64) -> Self {
            let context = HeContext::new(parms).unwrap();
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let keys = KeyGenerator::new(context.clone()).generate(&mut rng);
            let encryptor = Encryptor::new(context.clone(), keys.public_key.clone()).unwrap();
            let decryptor = Decryptor::new(context.clone(), keys.secret_key.clone()).unwrap();
            let evaluator = Evaluator::new(context.clone());
            Suite { context, keys, encryptor, decryptor, evaluator, rng }
        }

        fn encrypt(&mut self, plain: &Plaintext) -> Ciphertext {
            self.encryptor.encrypt(plain, &mut self.rng).unwrap()
        }
    }

    fn toy_approximate_parms() -> SecurityParameters {
        SecurityParameters::new(SchemeType::Approximate)
            .set_ring_degree(64)
            .set_coeff_modulus(&CoeffModulus::create(64, &[60, 40, 60]).unwrap())
            .set_security_level(SecurityLevel::None)
    }

    fn random_values(rng: &mut impl Rng, count: usize, bound: u64) -> Vec<u64> {
        (0..count).map(|_| rng.gen_range(0..bound)).collect()
    }

    fn assert_close(expected: &[f64], actual: &[f64], tolerance: f64) {
        for (i, (e, a)) in expected.iter().zip(actual).enumerate() {
            assert!((e - a).abs() < tolerance, "slot {}: expected {}, got {}", i, e, a);
        }
    }

    #[test]
    fn test_exact_add_sub_negate() {
        let mut suite = Suite::new(toy_exact_parms(), 20);
        let encoder = BatchEncoder::new(suite.context.clone()).unwrap();
        let t = encoder.plain_modulus();
        let x = random_values(&mut suite.rng, 64, t);
        let y = random_values(&mut suite.rng, 64, t);
        let ex = suite.encrypt(&encoder.encode(&x).unwrap());
        let ey = suite.encrypt(&encoder.encode(&y).unwrap());
        let decode = |suite: &Suite, ct: &Ciphertext| encoder.decode(&suite.decryptor.decrypt(ct).unwrap()).unwrap();

        let sum = suite.evaluator.add(&ex, &ey).unwrap();
        assert_eq!(ex.noise_budget() - 1, sum.noise_budget());
        let expected = x.iter().zip(&y).map(|(a, b)| (a + b) % t).collect::<Vec<_>>();
        assert_eq!(expected, decode(&suite, &sum));

        let difference = suite.evaluator.sub(&ex, &ey).unwrap();
        let expected = x.iter().zip(&y).map(|(a, b)| (a + t - b) % t).collect::<Vec<_>>();
        assert_eq!(expected, decode(&suite, &difference));

        let negated = suite.evaluator.negate(&ex).unwrap();
        assert_eq!(ex.noise_budget(), negated.noise_budget());
        let expected = x.iter().map(|a| (t - a) % t).collect::<Vec<_>>();
        assert_eq!(expected, decode(&suite, &negated));

        let py = encoder.encode(&y).unwrap();
        let plain_sum = suite.evaluator.add_plain(&ex, &py).unwrap();
        assert_eq!(ex.noise_budget(), plain_sum.noise_budget());
        assert_eq!(decode(&suite, &sum), decode(&suite, &plain_sum));
        let plain_difference = suite.evaluator.sub_plain(&ex, &py).unwrap();
        assert_eq!(decode(&suite, &difference), decode(&suite, &plain_difference));
    }

    #[test]
    fn test_add_mixed_sizes() {
        let mut suite = Suite::new(toy_exact_parms(), 21);
        let encoder = BatchEncoder::new(suite.context.clone()).unwrap();
        let ex = suite.encrypt(&encoder.encode(&[3, 4]).unwrap());
        let ey = suite.encrypt(&encoder.encode(&[5, 6]).unwrap());
        let product = suite.evaluator.multiply(&ex, &ey).unwrap();
        let sum = suite.evaluator.add(&ey, &product).unwrap();
        assert_eq!(3, sum.size());
        let decoded = encoder.decode(&suite.decryptor.decrypt(&sum).unwrap()).unwrap();
        assert_eq!(&[20, 30], &decoded[..2]);
        let relinearized = suite.evaluator.relinearize(&sum, &suite.keys.relin_keys).unwrap();
        let decoded = encoder.decode(&suite.decryptor.decrypt(&relinearized).unwrap()).unwrap();
        assert_eq!(&[20, 30], &decoded[..2]);
    }

    #[test]
    fn test_exact_multiply() {
        let mut suite = Suite::new(toy_exact_parms(), 22);
        let encoder = BatchEncoder::new(suite.context.clone()).unwrap();
        let t = encoder.plain_modulus();
        let x = random_values(&mut suite.rng, 64, t);
        let y = random_values(&mut suite.rng, 64, t);
        let ex = suite.encrypt(&encoder.encode(&x).unwrap());
        let ey = suite.encrypt(&encoder.encode(&y).unwrap());

        let product = suite.evaluator.multiply(&ex, &ey).unwrap();
        assert_eq!(3, product.size());
        assert_eq!(suite.context.noise_budget_after_multiply(ex.noise_budget(), ey.noise_budget(), 1.0), product.noise_budget());
        let expected = x.iter().zip(&y).map(|(a, b)| a * b % t).collect::<Vec<_>>();
        assert_eq!(expected, encoder.decode(&suite.decryptor.decrypt(&product).unwrap()).unwrap());

        let relinearized = suite.evaluator.relinearize(&product, &suite.keys.relin_keys).unwrap();
        assert_eq!(2, relinearized.size());
        assert!(relinearized.noise_budget() <= product.noise_budget());
        assert_eq!(expected, encoder.decode(&suite.decryptor.decrypt(&relinearized).unwrap()).unwrap());

        let squared = suite.evaluator.square(&ex).unwrap();
        let expected = x.iter().map(|a| a * a % t).collect::<Vec<_>>();
        assert_eq!(expected, encoder.decode(&suite.decryptor.decrypt(&squared).unwrap()).unwrap());
        let same = suite.evaluator.multiply(&ex, &ex).unwrap();
        assert_eq!(squared, same);
    }

    #[test]
    fn test_exact_multiply_plain() {
        let mut suite = Suite::new(toy_exact_parms(), 23);
        let encoder = BatchEncoder::new(suite.context.clone()).unwrap();

        let encrypted = suite.encrypt(&encoder.encode_polynomial(&[1, 2, 3]).unwrap());
        let product = suite.evaluator.multiply_plain(&encrypted, &encoder.encode_polynomial(&[4, 5, 6]).unwrap()).unwrap();
        let decoded = encoder.decode_polynomial(&suite.decryptor.decrypt(&product).unwrap()).unwrap();
        assert_eq!(&[4, 13, 28, 27, 18], &decoded[..5]);
        assert!(decoded[5..].iter().all(|&c| c == 0));

        // coefficients above t / 2 are lifted as negatives
        let t = encoder.plain_modulus();
        let product = suite.evaluator.multiply_plain(&encrypted, &encoder.encode_polynomial(&[t - 1]).unwrap()).unwrap();
        let decoded = encoder.decode_polynomial(&suite.decryptor.decrypt(&product).unwrap()).unwrap();
        assert_eq!(&[t - 1, t - 2, t - 3], &decoded[..3]);

        let x = random_values(&mut suite.rng, 64, t);
        let y = random_values(&mut suite.rng, 64, t);
        let encrypted = suite.encrypt(&encoder.encode(&x).unwrap());
        let product = suite.evaluator.multiply_plain(&encrypted, &encoder.encode(&y).unwrap()).unwrap();
        assert_eq!(suite.context.noise_budget_after_multiply_plain(encrypted.noise_budget(), 1.0), product.noise_budget());
        let expected = x.iter().zip(&y).map(|(a, b)| a * b % t).collect::<Vec<_>>();
        assert_eq!(expected, encoder.decode(&suite.decryptor.decrypt(&product).unwrap()).unwrap());
    }

    #[test]
    fn test_exact_default_scenario() {
        let mut suite = Suite::new(SecurityParameters::exact_default().unwrap(), 24);
        let encoder = BatchEncoder::new(suite.context.clone()).unwrap();
        assert_eq!(2, encoder.row_count());
        let row_size = encoder.slot_count() / encoder.row_count();
        let mut matrix = vec![0; encoder.slot_count()];
        matrix[..4].copy_from_slice(&[0, 1, 2, 3]);
        matrix[row_size..row_size + 4].copy_from_slice(&[4, 5, 6, 7]);
        let encrypted = suite.encrypt(&encoder.encode(&matrix).unwrap());
        assert_eq!(185, encrypted.noise_budget());

        let ones_and_twos = (0..encoder.slot_count()).map(|i| if i % 2 == 0 {1} else {2}).collect::<Vec<_>>();
        let ones_and_twos = encoder.encode(&ones_and_twos).unwrap();
        let shifted = suite.evaluator.add_plain(&encrypted, &ones_and_twos).unwrap();
        assert_eq!(185, shifted.noise_budget());
        let squared = suite.evaluator.square(&shifted).unwrap();
        assert_eq!(150, squared.noise_budget());
        let relinearized = suite.evaluator.relinearize(&squared, &suite.keys.relin_keys).unwrap();
        assert_eq!(150, relinearized.noise_budget());

        let decoded = encoder.decode(&suite.decryptor.decrypt(&relinearized).unwrap()).unwrap();
        assert_eq!(&[1, 9, 9, 25], &decoded[..4]);
        assert_eq!(&[25, 49, 49, 81], &decoded[row_size..row_size + 4]);
        let budget = suite.decryptor.invariant_noise_budget(&relinearized).unwrap();
        assert!(budget >= relinearized.noise_budget(), "{} < {}", budget, relinearized.noise_budget());
    }

    #[test]
    fn test_integer_product() {
        let mut suite = Suite::new(SecurityParameters::exact_default().unwrap(), 25);
        let encoder = BatchEncoder::new(suite.context.clone()).unwrap();
        let e37 = suite.encrypt(&encoder.encode_integer(37).unwrap());
        let e49 = suite.encrypt(&encoder.encode_integer(49).unwrap());
        let product = suite.evaluator.multiply(&e37, &e49).unwrap();
        let product = suite.evaluator.relinearize(&product, &suite.keys.relin_keys).unwrap();
        assert_eq!(1813, encoder.decode_integer(&suite.decryptor.decrypt(&product).unwrap()).unwrap());
    }

    #[test]
    fn test_approximate_arithmetic() {
        let mut suite = Suite::new(toy_approximate_parms(), 26);
        let encoder = CKKSEncoder::new(suite.context.clone()).unwrap();
        let scale = 2f64.powi(30);
        let x = (0..encoder.slot_count()).map(|_| suite.rng.gen_range(-8.0..8.0)).collect::<Vec<f64>>();
        let y = (0..encoder.slot_count()).map(|_| suite.rng.gen_range(-8.0..8.0)).collect::<Vec<f64>>();
        let px = encoder.encode_f64(&x, scale).unwrap();
        let py = encoder.encode_f64(&y, scale).unwrap();
        let ex = suite.encrypt(&px);
        let ey = suite.encrypt(&py);
        let decode = |suite: &Suite, ct: &Ciphertext| encoder.decode_f64(&suite.decryptor.decrypt(ct).unwrap()).unwrap();

        let sum = suite.evaluator.add(&ex, &ey).unwrap();
        assert_eq!(scale, sum.scale());
        let expected = x.iter().zip(&y).map(|(a, b)| a + b).collect::<Vec<_>>();
        assert_close(&expected, &decode(&suite, &sum), 1e-2);
        assert_close(&expected, &decode(&suite, &suite.evaluator.add_plain(&ex, &py).unwrap()), 1e-2);

        let expected = x.iter().zip(&y).map(|(a, b)| a - b).collect::<Vec<_>>();
        assert_close(&expected, &decode(&suite, &suite.evaluator.sub(&ex, &ey).unwrap()), 1e-2);
        assert_close(&expected, &decode(&suite, &suite.evaluator.sub_plain(&ex, &py).unwrap()), 1e-2);

        let expected = x.iter().map(|a| -a).collect::<Vec<_>>();
        assert_close(&expected, &decode(&suite, &suite.evaluator.negate(&ex).unwrap()), 1e-2);

        let product = suite.evaluator.multiply(&ex, &ey).unwrap();
        assert_eq!(scale * scale, product.scale());
        let expected = x.iter().zip(&y).map(|(a, b)| a * b).collect::<Vec<_>>();
        assert_close(&expected, &decode(&suite, &product), 1e-2);
        let relinearized = suite.evaluator.relinearize(&product, &suite.keys.relin_keys).unwrap();
        assert_close(&expected, &decode(&suite, &relinearized), 1e-2);

        let squared = suite.evaluator.square(&ex).unwrap();
        let expected = x.iter().map(|a| a * a).collect::<Vec<_>>();
        assert_close(&expected, &decode(&suite, &squared), 1e-2);

        let product = suite.evaluator.multiply_plain(&ex, &py).unwrap();
        assert_eq!(scale * scale, product.scale());
        let expected = x.iter().zip(&y).map(|(a, b)| a * b).collect::<Vec<_>>();
        assert_close(&expected, &decode(&suite, &product), 1e-2);
    }

    #[test]
    fn test_approximate_default_product() {
        let mut suite = Suite::new(SecurityParameters::approximate_default().unwrap(), 27);
        let encoder = CKKSEncoder::new(suite.context.clone()).unwrap();
        let scale = 2f64.powi(40);
        let e37 = suite.encrypt(&encoder.encode_f64(&[37.0], scale).unwrap());
        let e49 = suite.encrypt(&encoder.encode_f64(&[49.0], scale).unwrap());
        assert_eq!(147, e37.noise_budget());
        let product = suite.evaluator.multiply(&e37, &e49).unwrap();
        assert_eq!(2f64.powi(80), product.scale());
        assert_eq!(94, product.noise_budget());
        let product = suite.evaluator.relinearize(&product, &suite.keys.relin_keys).unwrap();
        let decoded = encoder.decode_f64(&suite.decryptor.decrypt(&product).unwrap()).unwrap();
        assert!((decoded[0] - 1813.0).abs() < 1e-3, "{}", decoded[0]);
        assert!(decoded[1..].iter().all(|v| v.abs() < 1e-3));
    }

    #[test]
    fn test_scale_mismatch() {
        let mut suite = Suite::new(toy_approximate_parms(), 28);
        let encoder = CKKSEncoder::new(suite.context.clone()).unwrap();
        let px = encoder.encode_f64(&[1.0, 2.0], 2f64.powi(20)).unwrap();
        let py = encoder.encode_f64(&[3.0, 4.0], 2f64.powi(21)).unwrap();
        let ex = suite.encrypt(&px);
        let ey = suite.encrypt(&py);
        let (ex_copy, ey_copy) = (ex.clone(), ey.clone());

        let expected = Error::ScaleMismatch { left: 2f64.powi(20), right: 2f64.powi(21) };
        assert_eq!(Err(expected.clone()), suite.evaluator.add(&ex, &ey));
        assert_eq!(Err(expected.clone()), suite.evaluator.sub(&ex, &ey));
        assert_eq!(Err(expected), suite.evaluator.add_plain(&ex, &py));
        assert!(matches!(suite.evaluator.sub_plain(&ey, &px), Err(Error::ScaleMismatch { .. })));
        assert_eq!(ex_copy, ex);
        assert_eq!(ey_copy, ey);

        // a product scale above the coefficient modulus is refused
        let big = suite.encrypt(&encoder.encode_f64(&[1.0], 2f64.powi(100)).unwrap());
        assert!(matches!(suite.evaluator.square(&big), Err(Error::InvalidParameters { .. })));
    }

    #[test]
    fn test_invalid_operands() {
        let mut suite = Suite::new(toy_exact_parms(), 29);
        let encoder = BatchEncoder::new(suite.context.clone()).unwrap();
        let encrypted = suite.encrypt(&encoder.encode(&[1, 2, 3]).unwrap());
        let product = suite.evaluator.square(&encrypted).unwrap();

        assert_eq!(
            Err(Error::InvalidComponentCount { expected: "2".to_string(), found: 3 }),
            suite.evaluator.multiply(&product, &encrypted)
        );
        assert!(matches!(suite.evaluator.square(&product), Err(Error::InvalidComponentCount { found: 3, .. })));
        assert_eq!(
            Err(Error::InvalidComponentCount { expected: "3".to_string(), found: 2 }),
            suite.evaluator.relinearize(&encrypted, &suite.keys.relin_keys)
        );

        let mut other = Suite::new(
            toy_exact_parms().set_coeff_modulus(&CoeffModulus::create(64, &[50]).unwrap()), 30);
        let other_encoder = BatchEncoder::new(other.context.clone()).unwrap();
        let foreign = other.encrypt(&other_encoder.encode(&[1]).unwrap());
        assert!(matches!(suite.evaluator.add(&encrypted, &foreign), Err(Error::ModulusMismatch { .. })));
        assert!(matches!(suite.evaluator.negate(&foreign), Err(Error::ModulusMismatch { .. })));
        let foreign_plain = other_encoder.encode(&[1]).unwrap();
        assert!(matches!(suite.evaluator.multiply_plain(&encrypted, &foreign_plain), Err(Error::ModulusMismatch { .. })));
        assert!(matches!(
            suite.evaluator.relinearize(&product, &other.keys.relin_keys),
            Err(Error::ModulusMismatch { .. })
        ));
    }

    #[test]
    fn test_noise_budget_exhaustion() {
        let mut suite = Suite::new(toy_exact_parms(), 31);
        let encoder = BatchEncoder::new(suite.context.clone()).unwrap();
        let values = random_values(&mut suite.rng, 64, encoder.plain_modulus());
        let encrypted = suite.encrypt(&encoder.encode(&values).unwrap());
        assert_eq!(33, encrypted.noise_budget());

        let squared = suite.evaluator.square(&encrypted).unwrap();
        let squared = suite.evaluator.relinearize(&squared, &suite.keys.relin_keys).unwrap();
        assert_eq!(8, squared.noise_budget());
        let t = encoder.plain_modulus();
        let expected = values.iter().map(|a| a * a % t).collect::<Vec<_>>();
        assert_eq!(expected, encoder.decode(&suite.decryptor.decrypt(&squared).unwrap()).unwrap());

        let exhausted = suite.evaluator.square(&squared).unwrap();
        assert_eq!(0, exhausted.noise_budget());
        assert_eq!(0, suite.decryptor.invariant_noise_budget(&exhausted).unwrap());
        let garbage = encoder.decode(&suite.decryptor.decrypt(&exhausted).unwrap()).unwrap();
        let fourth_powers = expected.iter().map(|a| a * a % t).collect::<Vec<_>>();
        assert_ne!(fourth_powers, garbage);
        assert_eq!(
            Err(Error::NoiseBudgetExhausted { operation: "relinearize" }),
            suite.evaluator.relinearize(&exhausted, &suite.keys.relin_keys)
        );
        assert!(matches!(suite.evaluator.add(&exhausted, &exhausted), Err(Error::NoiseBudgetExhausted { .. })));
        assert!(matches!(suite.evaluator.negate(&exhausted), Err(Error::NoiseBudgetExhausted { .. })));
    }

    #[test]
    fn test_shared_across_threads() {
        let mut suite = Suite::new(toy_exact_parms(), 32);
        let encoder = BatchEncoder::new(suite.context.clone()).unwrap();
        let inputs = (1..=4u64)
            .map(|i| suite.encrypt(&encoder.encode(&[i, i + 1]).unwrap()))
            .collect::<Vec<_>>();
        let evaluator = &suite.evaluator;
        let relin_keys = &suite.keys.relin_keys;
        let results = std::thread::scope(|scope| {
            let handles = inputs.iter()
                .map(|ct| scope.spawn(move || {
                    let squared = evaluator.square(ct).unwrap();
                    evaluator.relinearize(&squared, relin_keys).unwrap()
                }))
                .collect::<Vec<_>>();
            handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
        });
        for (i, result) in (1..=4u64).zip(&results) {
            let decoded = encoder.decode(&suite.decryptor.decrypt(result).unwrap()).unwrap();
            assert_eq!(&[i * i, (i + 1) * (i + 1)], &decoded[..2]);
        }
    }

}

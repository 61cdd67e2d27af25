use std::sync::Arc;

use num_complex::Complex64;

use crate::{
    context::HeContext,
    error::{Error, Result},
    text::Plaintext,
    util::{self, dwthandler::{Arithmetic, DWTHandler}, RNSBase, GALOIS_GENERATOR},
};

#[derive(Clone, Copy, Default)]
struct ComplexArith;
type FFTHandler = DWTHandler<ComplexArith>;

impl Arithmetic for ComplexArith {
    type Value = Complex64;
    type Root = Complex64;
    type Scalar = f64;

    #[inline]
    fn add(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        a + b
    }

    #[inline]
    fn sub(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        a - b
    }

    #[inline]
    fn mul_root(&self, a: &Self::Value, r: &Self::Root) -> Self::Value {
        a * r
    }

    #[inline]
    fn mul_scalar(&self, a: &Self::Value, s: &Self::Scalar) -> Self::Value {
        a * s
    }

    #[inline]
    fn guard(&self, a: &Self::Value) -> Self::Value {
        *a
    }
}

/// The `m`-th roots of unity, computed for one eighth of the circle and
/// extended by symmetry.
struct ComplexRoots {
    roots: Vec<Complex64>,
    degree_of_roots: usize,
}

#[inline]
fn mirror(a: Complex64) -> Complex64 {
    Complex64::new(a.im, a.re)
}

impl ComplexRoots {

    fn new(degree_of_roots: usize) -> Self {
        let roots = (0..=degree_of_roots / 8).map(|i| {
            Complex64::from_polar(1.0, 2.0 * std::f64::consts::PI * (i as f64) / (degree_of_roots as f64))
        }).collect();
        Self { roots, degree_of_roots }
    }

    fn get_root(&self, mut index: usize) -> Complex64 {
        index &= self.degree_of_roots - 1;
        if index <= self.degree_of_roots / 8 {
            self.roots[index]
        } else if index <= self.degree_of_roots / 4 {
            mirror(self.roots[self.degree_of_roots / 4 - index])
        } else if index < self.degree_of_roots / 2 {
            -self.get_root(self.degree_of_roots / 2 - index).conj()
        } else if index <= 3 * self.degree_of_roots / 4 {
            -self.get_root(index - self.degree_of_roots / 2)
        } else {
            self.get_root(self.degree_of_roots - index).conj()
        }
    }

}

/// Writes `round(value)` into coefficient `index` of every limb.
fn write_rounded(value: f64, base: &RNSBase, degree: usize, index: usize, destination: &mut [u64]) {
    let rounded = value.round();
    let is_negative = rounded < 0.0;
    let magnitude = rounded.abs();
    let bit_count = if magnitude < 1.0 {0} else {magnitude.log2() as usize + 1};
    let two_pow_64 = 2.0_f64.powi(64);
    let residues: Vec<u64> = if bit_count <= 64 {
        let word = magnitude as u64;
        base.base().iter().map(|q| q.reduce(word)).collect()
    } else if bit_count <= 128 {
        let word = magnitude as u128;
        base.base().iter().map(|q| q.reduce_u128(word)).collect()
    } else {
        let mut words = vec![0; base.len()];
        let mut rest = magnitude;
        for word in words.iter_mut() {
            if rest < 1.0 {break;}
            *word = (rest % two_pow_64) as u64;
            rest = (rest / two_pow_64).floor();
        }
        base.decompose(&mut words);
        words
    };
    for (j, (residue, modulus)) in residues.into_iter().zip(base.base()).enumerate() {
        destination[index + j * degree] = if is_negative {util::negate_u64_mod(residue, modulus)} else {residue};
    }
}

/// Provides SIMD encoding and decoding for approximate contexts.
///
/// If the ring degree is N, the encoder turns vectors of up to N/2 complex numbers
/// into plaintext polynomials. It implements an approximation of the canonical
/// embedding of Z\[X\]/(X^N+1) into C^(N/2): slot `i` is the evaluation of the
/// polynomial at a primitive 2N-th root of unity, and slots are ordered along the
/// orbit of the Galois generator 3 so that slot-wise products of vectors become
/// products of polynomials.
///
/// Values are multiplied by the scale and rounded, so the precision of a round trip
/// is roughly `N / scale`. The plaintext remembers the scale, and the evaluator
/// multiplies scales along with the values.
pub struct CKKSEncoder {
    context: Arc<HeContext>,
    slots: usize,
    root_powers: Vec<Complex64>,
    inv_root_powers: Vec<Complex64>,
    matrix_reps_index_map: Vec<usize>,
    fft_handler: FFTHandler,
}

impl CKKSEncoder {

    /// Creates a CKKSEncoder for an approximate context; an exact context gives `InvalidParameters`.
    pub fn new(context: Arc<HeContext>) -> Result<Self> {
        if context.is_exact() {
            return Err(Error::invalid_parameters("the complex encoder needs an approximate context"));
        }
        let coeff_count = context.degree();
        let slots = coeff_count / 2;
        let logn = util::get_power_of_two(coeff_count as u64)
            .ok_or_else(|| Error::invalid_parameters("ring degree must be a power of two"))?;

        let m = coeff_count * 2;
        let mut matrix_reps_index_map = vec![0; coeff_count];
        let mut pos = 1;
        for i in 0..slots {
            let index1 = (pos - 1) >> 1;
            let index2 = (m - pos - 1) >> 1;
            matrix_reps_index_map[i] = util::reverse_bits_u64(index1 as u64, logn) as usize;
            matrix_reps_index_map[i | slots] = util::reverse_bits_u64(index2 as u64, logn) as usize;
            pos = (pos * GALOIS_GENERATOR) & (m - 1);
        }

        // powers 1..n-1 of the primitive m-th root, in the order the butterflies consume them
        let mut root_powers = vec![Complex64::default(); coeff_count];
        let mut inv_root_powers = vec![Complex64::default(); coeff_count];
        if m >= 8 {
            let complex_roots = ComplexRoots::new(m);
            for i in 1..coeff_count {
                root_powers[i] = complex_roots.get_root(util::reverse_bits_u64(i as u64, logn) as usize);
                inv_root_powers[i] = complex_roots.get_root(util::reverse_bits_u64((i - 1) as u64, logn) as usize + 1).conj();
            }
        } else if m == 4 {
            root_powers[1] = Complex64::new(0.0, 1.0);
            inv_root_powers[1] = Complex64::new(0.0, -1.0);
        }

        Ok(Self {
            context,
            slots,
            root_powers,
            inv_root_powers,
            matrix_reps_index_map,
            fft_handler: FFTHandler::new(ComplexArith),
        })
    }

    /// Return the number of slots (complex values) available for batching.
    pub fn slot_count(&self) -> usize {
        self.slots
    }

    fn check_scale(&self, scale: f64) -> Result<()> {
        let total_bits = self.context.total_coeff_modulus_bit_count() as f64;
        if !scale.is_finite() || scale <= 0.0 || scale.log2() + 1.0 >= total_bits {
            return Err(Error::invalid_parameters(format!("scale {} is out of bounds", scale)));
        }
        Ok(())
    }

    fn check_magnitude(&self, max_coeff: f64) -> Result<()> {
        // one extra bit for the sign
        let max_coeff_bit_count = max_coeff.max(1.0).log2().ceil() as usize + 1;
        if !max_coeff.is_finite() || max_coeff_bit_count >= self.context.total_coeff_modulus_bit_count() {
            return Err(Error::invalid_parameters("values are too large to encode"));
        }
        Ok(())
    }

    /// Encodes up to [Self::slot_count()] complex numbers; missing slots are zero.
    pub fn encode_c64(&self, values: &[Complex64], scale: f64) -> Result<Plaintext> {
        if values.len() > self.slots {
            return Err(Error::invalid_parameters(format!(
                "{} values do not fit into {} slots", values.len(), self.slots
            )));
        }
        self.check_scale(scale)?;
        if values.iter().any(|x| !x.is_finite()) {
            return Err(Error::invalid_parameters("values must be finite"));
        }

        let n = self.slots * 2;
        let mut conj_values = vec![Complex64::default(); n];
        for (i, value) in values.iter().enumerate() {
            conj_values[self.matrix_reps_index_map[i]] = *value;
            conj_values[self.matrix_reps_index_map[i + self.slots]] = value.conj();
        }
        let fix = scale / (n as f64);
        let logn = self.context.degree().trailing_zeros() as usize;
        self.fft_handler.inverse(&mut conj_values, logn, &self.inv_root_powers, Some(&fix));

        let max_coeff = conj_values.iter().map(|x| x.re.abs()).fold(0.0, f64::max);
        self.check_magnitude(max_coeff)?;

        let ring = self.context.ring();
        let mut destination = ring.zero();
        for (i, value) in conj_values.iter().enumerate() {
            write_rounded(value.re, ring.base(), n, i, &mut destination);
        }
        Ok(Plaintext::new(*self.context.parms_id(), Some(scale), destination))
    }

    /// Encodes up to [Self::slot_count()] real numbers; missing slots are zero.
    /// ```rust
    /// # use cipherformula::*;
    /// let context = HeContext::new(SecurityParameters::approximate_default().unwrap()).unwrap();
    /// let encoder = CKKSEncoder::new(context).unwrap();
    /// let plain = encoder.encode_f64(&[1.5, -2.25], 2.0_f64.powi(40)).unwrap();
    /// let decoded = encoder.decode_f64(&plain).unwrap();
    /// assert!((decoded[0] - 1.5).abs() < 1e-6);
    /// assert!((decoded[1] + 2.25).abs() < 1e-6);
    /// ```
    pub fn encode_f64(&self, values: &[f64], scale: f64) -> Result<Plaintext> {
        let values = values.iter().map(|&x| Complex64::new(x, 0.0)).collect::<Vec<_>>();
        self.encode_c64(&values, scale)
    }

    /// Encodes `value` into every slot, as the constant polynomial `round(value * scale)`.
    pub fn encode_f64_single(&self, value: f64, scale: f64) -> Result<Plaintext> {
        self.check_scale(scale)?;
        let scaled = value * scale;
        self.check_magnitude(scaled.abs())?;
        let ring = self.context.ring();
        let mut destination = ring.zero();
        write_rounded(scaled, ring.base(), ring.degree(), 0, &mut destination);
        Ok(Plaintext::new(*self.context.parms_id(), Some(scale), destination))
    }

    /// Decodes a plaintext into [Self::slot_count()] complex numbers.
    pub fn decode_c64(&self, plain: &Plaintext) -> Result<Vec<Complex64>> {
        if plain.parms_id() != self.context.parms_id() {
            return Err(Error::modulus_mismatch("plaintext belongs to another parameter set"));
        }
        let ring = self.context.ring();
        let scale = match plain.scale() {
            Some(scale) if plain.len() == ring.poly_len() => scale,
            _ => return Err(Error::modulus_mismatch("plaintext is not an approximate plaintext of this context")),
        };
        self.check_scale(scale)?;
        let inv_scale = 1.0 / scale;

        let coeff_count = ring.degree();
        let base = ring.base();
        let data = plain.data();
        let mut word = vec![0; base.len()];
        let mut res = Vec::with_capacity(coeff_count);
        for i in 0..coeff_count {
            base.compose_into((0..base.len()).map(|j| data[i + j * coeff_count]), &mut word);
            let is_negative = base.center(&mut word);
            let magnitude = util::uint_to_f64(&word) * inv_scale;
            res.push(Complex64::new(if is_negative {-magnitude} else {magnitude}, 0.0));
        }

        let logn = coeff_count.trailing_zeros() as usize;
        self.fft_handler.forward(&mut res, logn, &self.root_powers, None);
        Ok((0..self.slots).map(|i| res[self.matrix_reps_index_map[i]]).collect())
    }

    /// Decodes a plaintext into the real parts of its [Self::slot_count()] slots.
    pub fn decode_f64(&self, plain: &Plaintext) -> Result<Vec<f64>> {
        Ok(self.decode_c64(plain)?.into_iter().map(|x| x.re).collect())
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::tests::toy_exact_parms,
        modulus::CoeffModulus,
        parameters::{SchemeType, SecurityLevel, SecurityParameters},
    };
    use rand::{Rng, SeedableRng};

    fn encoder(degree: usize, bits: &[usize]) -> CKKSEncoder {
        let parms = SecurityParameters::new(SchemeType::Approximate)
            .set_ring_degree(degree)
            .set_coeff_modulus(&CoeffModulus::create(degree, bits).unwrap())
            .set_security_level(SecurityLevel::None);
        CKKSEncoder::new(HeContext::new(parms).unwrap()).unwrap()
    }

    #[test]
    fn test_vector() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(9);
        for (degree, bits) in [(64, vec![40, 40]), (256, vec![60, 60, 60]), (1024, vec![60, 50, 60])] {
            let encoder = encoder(degree, &bits);
            assert_eq!(degree / 2, encoder.slot_count());
            for log_scale in [20, 30, 40] {
                let scale = 2.0_f64.powi(log_scale);
                let values = (0..encoder.slot_count())
                    .map(|_| Complex64::new(rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0)))
                    .collect::<Vec<_>>();
                let plain = encoder.encode_c64(&values, scale).unwrap();
                assert_eq!(Some(scale), plain.scale());
                let decoded = encoder.decode_c64(&plain).unwrap();
                for (a, b) in values.iter().zip(&decoded) {
                    assert!((a - b).norm() < 1e-3, "{} vs {}", a, b);
                }
            }
        }
    }

    #[test]
    fn test_partial_vector_is_zero_padded() {
        let encoder = encoder(64, &[50, 50]);
        let values = [3.25, -1.0, 0.5];
        let decoded = encoder.decode_f64(&encoder.encode_f64(&values, 2.0_f64.powi(30)).unwrap()).unwrap();
        for (a, b) in values.iter().zip(&decoded) {
            assert!((a - b).abs() < 1e-3);
        }
        assert!(decoded[3..].iter().all(|x| x.abs() < 1e-3));
    }

    #[test]
    fn test_single() {
        let encoder = encoder(64, &[40, 40]);
        let plain = encoder.encode_f64_single(-7.5, 2.0_f64.powi(20)).unwrap();
        assert!(plain.data()[1..64].iter().all(|&x| x == 0));
        let decoded = encoder.decode_f64(&plain).unwrap();
        assert!(decoded.iter().all(|x| (x + 7.5).abs() < 1e-3));
    }

    #[test]
    fn test_large_coefficients() {
        // the rounded coefficients need more than 128 bits
        let encoder = encoder(64, &[60, 60, 60]);
        let scale = 2.0_f64.powi(130);
        let values = [1.0, -2.0, 3.0];
        let decoded = encoder.decode_f64(&encoder.encode_f64(&values, scale).unwrap()).unwrap();
        for (a, b) in values.iter().zip(&decoded) {
            assert!((a - b).abs() < 1e-3);
        }
        let plain = encoder.encode_f64_single(12.0, 2.0_f64.powi(100)).unwrap();
        assert!((encoder.decode_f64(&plain).unwrap()[0] - 12.0).abs() < 1e-3);
    }

    #[test]
    fn test_invalid_inputs() {
        let encoder = encoder(64, &[40, 40]);
        assert!(matches!(encoder.encode_f64(&[1.0], 0.0), Err(Error::InvalidParameters { .. })));
        assert!(matches!(encoder.encode_f64(&[1.0], -4.0), Err(Error::InvalidParameters { .. })));
        assert!(matches!(encoder.encode_f64(&[1.0], 2.0_f64.powi(80)), Err(Error::InvalidParameters { .. })));
        assert!(matches!(encoder.encode_f64(&[1e10], 2.0_f64.powi(70)), Err(Error::InvalidParameters { .. })));
        assert!(matches!(encoder.encode_f64(&[0.0; 33], 2.0_f64.powi(20)), Err(Error::InvalidParameters { .. })));
        assert!(matches!(encoder.encode_f64_single(f64::NAN, 2.0_f64.powi(20)), Err(Error::InvalidParameters { .. })));
        assert!(matches!(encoder.encode_f64(&[f64::INFINITY], 2.0_f64.powi(20)), Err(Error::InvalidParameters { .. })));

        let other = self::encoder(64, &[50, 50]);
        let foreign = other.encode_f64(&[1.0], 2.0_f64.powi(20)).unwrap();
        assert!(matches!(encoder.decode_f64(&foreign), Err(Error::ModulusMismatch { .. })));

        let exact = HeContext::new(toy_exact_parms()).unwrap();
        assert!(matches!(CKKSEncoder::new(exact), Err(Error::InvalidParameters { .. })));
    }

}

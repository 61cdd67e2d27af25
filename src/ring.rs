use crate::{
    error::{Error, Result},
    modulus::Modulus,
    util::{self, polymod, NTTTables, RNSBase},
};

/// The ring `Z_Q[X]/(X^N + 1)` over an RNS base `Q = q_0 * ... * q_{k-1}`.
///
/// Elements are flat buffers of `k * N` words, limb-major: limb `i` holds the `N`
/// coefficients reduced modulo `q_i`. Unless a method says otherwise inputs and
/// outputs are in coefficient form.
#[derive(Clone, Debug)]
pub struct PolyRing {
    degree: usize,
    base: RNSBase,
    ntt_tables: Vec<NTTTables>,
}

impl PolyRing {

    /// Every modulus must be an NTT-friendly prime for `degree`.
    pub fn new(degree: usize, moduli: &[Modulus]) -> Result<Self> {
        let log_degree = util::get_power_of_two(degree as u64)
            .ok_or_else(|| Error::invalid_parameters(format!("ring degree {} is not a power of two", degree)))?;
        Ok(PolyRing {
            degree,
            base: RNSBase::new(moduli)?,
            ntt_tables: NTTTables::create_ntt_tables(log_degree, moduli)?,
        })
    }

    pub fn degree(&self) -> usize {self.degree}
    pub fn base(&self) -> &RNSBase {&self.base}
    pub fn moduli(&self) -> &[Modulus] {self.base.base()}
    pub fn ntt_tables(&self) -> &[NTTTables] {&self.ntt_tables}
    pub fn coeff_modulus_size(&self) -> usize {self.base.len()}
    /// Number of words in one ring element.
    pub fn poly_len(&self) -> usize {self.degree * self.base.len()}

    pub fn zero(&self) -> Vec<u64> {
        vec![0; self.poly_len()]
    }

    pub fn add_inplace(&self, a: &mut [u64], b: &[u64]) {
        polymod::add_inplace_p(a, b, self.degree, self.moduli());
    }

    pub fn sub_inplace(&self, a: &mut [u64], b: &[u64]) {
        polymod::sub_inplace_p(a, b, self.degree, self.moduli());
    }

    pub fn negate_inplace(&self, a: &mut [u64]) {
        polymod::negate_inplace_p(a, self.degree, self.moduli());
    }

    pub fn multiply_scalar_inplace(&self, a: &mut [u64], scalar: u64) {
        polymod::multiply_scalar_inplace_p(a, scalar, self.degree, self.moduli());
    }

    pub fn add(&self, a: &[u64], b: &[u64]) -> Vec<u64> {
        let mut ret = a.to_vec();
        self.add_inplace(&mut ret, b);
        ret
    }

    pub fn sub(&self, a: &[u64], b: &[u64]) -> Vec<u64> {
        let mut ret = a.to_vec();
        self.sub_inplace(&mut ret, b);
        ret
    }

    pub fn negate(&self, a: &[u64]) -> Vec<u64> {
        let mut ret = a.to_vec();
        self.negate_inplace(&mut ret);
        ret
    }

    pub fn multiply_scalar(&self, a: &[u64], scalar: u64) -> Vec<u64> {
        let mut ret = a.to_vec();
        self.multiply_scalar_inplace(&mut ret, scalar);
        ret
    }

    pub fn ntt_inplace(&self, a: &mut [u64]) {
        polymod::ntt_p(a, self.degree, &self.ntt_tables);
    }

    pub fn intt_inplace(&self, a: &mut [u64]) {
        polymod::intt_p(a, self.degree, &self.ntt_tables);
    }

    /// Pointwise product; meaningful on NTT-form operands.
    pub fn dyadic_product_inplace(&self, a: &mut [u64], b: &[u64]) {
        polymod::dyadic_product_inplace_p(a, b, self.degree, self.moduli());
    }

    /// `destination += a * b` pointwise; meaningful on NTT-form operands.
    pub fn dyadic_product_accumulate(&self, a: &[u64], b: &[u64], destination: &mut [u64]) {
        polymod::dyadic_product_accumulate_p(a, b, self.degree, self.moduli(), destination);
    }

    /// Negacyclic product through the NTT.
    pub fn multiply(&self, a: &[u64], b: &[u64]) -> Vec<u64> {
        let mut x = a.to_vec();
        let mut y = b.to_vec();
        self.ntt_inplace(&mut x);
        self.ntt_inplace(&mut y);
        self.dyadic_product_inplace(&mut x, &y);
        self.intt_inplace(&mut x);
        x
    }

    /// Schoolbook negacyclic product, quadratic in the degree.
    pub fn multiply_naive(&self, a: &[u64], b: &[u64]) -> Vec<u64> {
        let n = self.degree;
        let mut ret = self.zero();
        for (limb, modulus) in self.moduli().iter().enumerate() {
            let offset = limb * n;
            let (x, y) = (&a[offset..offset + n], &b[offset..offset + n]);
            let out = &mut ret[offset..offset + n];
            for (i, &xi) in x.iter().enumerate() {
                for (j, &yj) in y.iter().enumerate() {
                    let product = util::multiply_u64_mod(xi, yj, modulus);
                    let k = i + j;
                    if k < n {
                        out[k] = util::add_u64_mod(out[k], product, modulus);
                    } else {
                        out[k - n] = util::sub_u64_mod(out[k - n], product, modulus);
                    }
                }
            }
        }
        ret
    }

    /// Reinterprets every coefficient as the representative in `(-Q/2, Q/2]` and
    /// writes it into `target`'s base.
    pub fn lift_centered(&self, a: &[u64], target: &PolyRing) -> Vec<u64> {
        let mut ret = target.zero();
        self.base.convert_centered_array(a, self.degree, target.moduli(), &mut ret);
        ret
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulus::CoeffModulus;
    use rand::{Rng, SeedableRng};

    fn random_poly(ring: &PolyRing, rng: &mut impl Rng) -> Vec<u64> {
        let mut ret = ring.zero();
        for (component, modulus) in ret.chunks_exact_mut(ring.degree()).zip(ring.moduli()) {
            for x in component.iter_mut() {
                *x = rng.gen_range(0..modulus.value());
            }
        }
        ret
    }

    #[test]
    fn test_ntt_multiply_matches_naive() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(3);
        for (degree, bits) in [(8, vec![20]), (64, vec![40, 50]), (256, vec![60, 30, 45])] {
            let moduli = CoeffModulus::create(degree, &bits).unwrap();
            let ring = PolyRing::new(degree, &moduli).unwrap();
            let a = random_poly(&ring, &mut rng);
            let b = random_poly(&ring, &mut rng);
            assert_eq!(ring.multiply(&a, &b), ring.multiply_naive(&a, &b));
        }
    }

    #[test]
    fn test_negacyclic_wrap() {
        let moduli = CoeffModulus::create(4, &[20]).unwrap();
        let q = moduli[0].value();
        let ring = PolyRing::new(4, &moduli).unwrap();
        // X^3 * X = X^4 = -1
        let x3 = vec![0, 0, 0, 1];
        let x = vec![0, 1, 0, 0];
        assert_eq!(ring.multiply(&x3, &x), vec![q - 1, 0, 0, 0]);
        assert_eq!(ring.multiply_naive(&x3, &x), vec![q - 1, 0, 0, 0]);
    }

    #[test]
    fn test_add_sub_negate() {
        let moduli = CoeffModulus::create(4, &[20, 30]).unwrap();
        let ring = PolyRing::new(4, &moduli).unwrap();
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(4);
        let a = random_poly(&ring, &mut rng);
        let b = random_poly(&ring, &mut rng);
        assert_eq!(ring.sub(&ring.add(&a, &b), &b), a);
        assert_eq!(ring.add(&a, &ring.negate(&a)), ring.zero());
        assert_eq!(ring.multiply_scalar(&a, 2), ring.add(&a, &a));
    }

    #[test]
    fn test_lift_centered() {
        let small = PolyRing::new(2, &CoeffModulus::create(2, &[10]).unwrap()).unwrap();
        let large = PolyRing::new(2, &CoeffModulus::create(2, &[30, 40]).unwrap()).unwrap();
        let q = small.moduli()[0].value();
        let lifted = small.lift_centered(&[q - 3, 5], &large);
        let (p0, p1) = (large.moduli()[0].value(), large.moduli()[1].value());
        assert_eq!(lifted, vec![p0 - 3, 5, p1 - 3, 5]);
        assert!(PolyRing::new(6, &CoeffModulus::create(2, &[10]).unwrap()).is_err());
    }

}

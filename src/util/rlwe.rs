pub mod sample {
    //! Samplers writing one polynomial in `[limb][coefficient]` layout: every
    //! coefficient is drawn once as a small signed integer and reduced into each limb.

    use rand::{distributions::Uniform, prelude::Distribution, Rng, RngCore};

    use crate::{
        error::{Error, Result},
        modulus::Modulus,
        parameters::NoiseDistribution,
        util::{self, he_standard_params},
    };

    pub const NOISE_STANDARD_DEVIATION: f64 = he_standard_params::HE_STANDARD_PARAMS_ERROR_STD_DEV;
    pub const NOISE_MAX_DEVIATION: f64 = he_standard_params::HE_STANDARD_PARAMS_NOISE_MAX_DEVIATION;

    #[derive(Clone, Copy, Debug)]
    pub struct ClippedNormal {
        normal: rand_distr::Normal<f64>,
        max_deviation: f64,
    }

    impl ClippedNormal {
        pub fn new(standard_deviation: f64, max_deviation: f64) -> Result<Self> {
            let normal = rand_distr::Normal::new(0.0, standard_deviation)
                .map_err(|e| Error::invalid_parameters(format!("noise distribution: {}", e)))?;
            if !(max_deviation > 0.0) {
                return Err(Error::invalid_parameters("noise clipping bound must be positive"));
            }
            Ok(Self { normal, max_deviation })
        }
    }

    impl Distribution<f64> for ClippedNormal {
        fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
            loop {
                let sample = self.normal.sample(rng);
                if sample.abs() <= self.max_deviation {
                    break sample;
                }
            }
        }
    }

    fn write_signed(sampled: i64, index: usize, degree: usize, moduli: &[Modulus], destination: &mut [u64]) {
        for (j, modulus) in moduli.iter().enumerate() {
            destination[index + j * degree] = if sampled >= 0 {
                sampled as u64
            } else {
                modulus.value() - sampled.unsigned_abs()
            };
        }
    }

    /// Coefficients uniform in {-1, 0, 1}.
    pub fn ternary<R: Rng + ?Sized>(rng: &mut R, degree: usize, moduli: &[Modulus], destination: &mut [u64]) {
        let distribution = Uniform::new_inclusive(-1i64, 1);
        for i in 0..degree {
            let sampled = distribution.sample(rng);
            write_signed(sampled, i, degree, moduli, destination);
        }
    }

    /// Centered binomial with 21 coin pairs, standard deviation close to 3.2.
    pub fn centered_binomial<R: RngCore + ?Sized>(rng: &mut R, degree: usize, moduli: &[Modulus], destination: &mut [u64]) {
        for i in 0..degree {
            let mut x = [0u8; 6];
            rng.fill_bytes(&mut x);
            x[2] &= 0x1f;
            x[5] &= 0x1f;
            let sampled = (util::hamming_weight(x[0]) + util::hamming_weight(x[1]) + util::hamming_weight(x[2])
                - util::hamming_weight(x[3]) - util::hamming_weight(x[4]) - util::hamming_weight(x[5])) as i64;
            write_signed(sampled, i, degree, moduli, destination);
        }
    }

    /// Rounded samples of `distribution`.
    pub fn clipped_normal<R: Rng + ?Sized>(
        rng: &mut R, distribution: &ClippedNormal,
        degree: usize, moduli: &[Modulus], destination: &mut [u64]
    ) {
        for i in 0..degree {
            let sampled = distribution.sample(rng).round() as i64;
            write_signed(sampled, i, degree, moduli, destination);
        }
    }

    /// The error sampler of a parameter set, built once per context.
    #[derive(Clone, Copy, Debug)]
    pub enum NoiseSampler {
        CenteredBinomial,
        /// Rounded normal with standard deviation 3.2, rejected beyond six deviations.
        ClippedNormal(ClippedNormal),
    }

    impl NoiseSampler {
        pub fn new(distribution: NoiseDistribution) -> Result<Self> {
            Ok(match distribution {
                NoiseDistribution::CenteredBinomial => NoiseSampler::CenteredBinomial,
                NoiseDistribution::ClippedNormal =>
                    NoiseSampler::ClippedNormal(ClippedNormal::new(NOISE_STANDARD_DEVIATION, NOISE_MAX_DEVIATION)?),
            })
        }

        pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, degree: usize, moduli: &[Modulus], destination: &mut [u64]) {
            match self {
                NoiseSampler::CenteredBinomial => centered_binomial(rng, degree, moduli, destination),
                NoiseSampler::ClippedNormal(normal) => clipped_normal(rng, normal, degree, moduli, destination),
            }
        }
    }

    /// Independent uniform residues modulo every limb.
    pub fn uniform<R: Rng + ?Sized>(rng: &mut R, degree: usize, moduli: &[Modulus], destination: &mut [u64]) {
        for (component, modulus) in destination.chunks_exact_mut(degree).zip(moduli) {
            let distribution = Uniform::new(0, modulus.value());
            for x in component.iter_mut() {
                *x = distribution.sample(rng);
            }
        }
    }

}

pub mod encrypt_zero {
    //! Encryptions of zero in coefficient form, as two concatenated polynomials over Q.

    use rand::{CryptoRng, RngCore};

    use super::sample;
    use crate::{context::HeContext, key::{PublicKey, SecretKey}};

    /// `(c0, c1) = (pk0 * u + e0, pk1 * u + e1)` with ternary `u`.
    pub fn asymmetric<R: RngCore + CryptoRng>(public_key: &PublicKey, context: &HeContext, rng: &mut R) -> Vec<u64> {
        let ring = context.ring();
        let degree = ring.degree();
        let moduli = ring.moduli();
        let poly_len = ring.poly_len();
        let noise = context.noise_sampler();

        let mut u = ring.zero();
        sample::ternary(rng, degree, moduli, &mut u);
        ring.ntt_inplace(&mut u);

        let mut destination = vec![0; 2 * poly_len];
        let mut e = ring.zero();
        for (j, c) in destination.chunks_exact_mut(poly_len).enumerate() {
            c.copy_from_slice(&u);
            ring.dyadic_product_inplace(c, public_key.poly(j));
            ring.intt_inplace(c);
            noise.sample(rng, degree, moduli, &mut e);
            ring.add_inplace(c, &e);
        }
        destination
    }

    /// `(c0, c1) = (-(a * s + e), a)` with uniform `a`.
    pub fn symmetric<R: RngCore + CryptoRng>(secret_key: &SecretKey, context: &HeContext, rng: &mut R) -> Vec<u64> {
        let ring = context.ring();
        let degree = ring.degree();
        let moduli = ring.moduli();
        let poly_len = ring.poly_len();

        let mut destination = vec![0; 2 * poly_len];
        let (c0, c1) = destination.split_at_mut(poly_len);
        sample::uniform(rng, degree, moduli, c1);

        c0.copy_from_slice(c1);
        ring.ntt_inplace(c0);
        ring.dyadic_product_inplace(c0, secret_key.data_ntt());
        ring.intt_inplace(c0);
        let mut e = ring.zero();
        context.noise_sampler().sample(rng, degree, moduli, &mut e);
        ring.add_inplace(c0, &e);
        ring.negate_inplace(c0);
        destination
    }

}

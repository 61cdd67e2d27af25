use super::dwthandler::{Arithmetic, DWTHandler};
use crate::{
    error::{Error, Result},
    modulus::Modulus,
    util::{self, MultiplyU64ModOperand},
};

/// Harvey's lazy butterflies: values stay in `[0, 4q)` between layers.
#[derive(Clone, Copy)]
struct LazyModArith {
    modulus: Modulus,
    two_times_modulus: u64,
}

impl LazyModArith {
    fn new(modulus: &Modulus) -> Self {
        LazyModArith { modulus: *modulus, two_times_modulus: modulus.value() << 1 }
    }
}

impl Arithmetic for LazyModArith {
    type Value = u64;
    type Root = MultiplyU64ModOperand;
    type Scalar = MultiplyU64ModOperand;

    #[inline]
    fn add(&self, a: &u64, b: &u64) -> u64 {
        a + b
    }

    #[inline]
    fn sub(&self, a: &u64, b: &u64) -> u64 {
        a + self.two_times_modulus - b
    }

    #[inline]
    fn mul_root(&self, a: &u64, r: &MultiplyU64ModOperand) -> u64 {
        util::multiply_u64operand_mod_lazy(*a, r, &self.modulus)
    }

    #[inline]
    fn mul_scalar(&self, a: &u64, s: &MultiplyU64ModOperand) -> u64 {
        util::multiply_u64operand_mod_lazy(*a, s, &self.modulus)
    }

    #[inline]
    fn guard(&self, a: &u64) -> u64 {
        if *a >= self.two_times_modulus {*a - self.two_times_modulus} else {*a}
    }
}

/// Precomputed negacyclic NTT of size `2^coeff_count_power` modulo one NTT-friendly prime.
#[derive(Clone)]
pub struct NTTTables {
    root: u64,
    coeff_count_power: usize,
    coeff_count: usize,
    modulus: Modulus,
    inv_degree_modulo: MultiplyU64ModOperand,
    root_powers: Vec<MultiplyU64ModOperand>,
    inv_root_powers: Vec<MultiplyU64ModOperand>,
    handler: DWTHandler<LazyModArith>,
}

impl std::fmt::Debug for NTTTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NTTTables")
            .field("modulus", &self.modulus.value())
            .field("coeff_count", &self.coeff_count)
            .field("root", &self.root)
            .finish()
    }
}

impl NTTTables {

    /// Fails when the modulus has no primitive `2^(coeff_count_power + 1)`-th root of unity.
    pub fn new(coeff_count_power: usize, modulus: &Modulus) -> Result<Self> {
        let coeff_count = 1usize << coeff_count_power;
        let root = util::try_minimal_primitive_root(2 * coeff_count as u64, modulus)
            .ok_or_else(|| Error::invalid_parameters(format!(
                "{} is not congruent to 1 modulo {}", modulus.value(), 2 * coeff_count
            )))?;
        let inv_root = util::try_invert_u64_mod(root, modulus)
            .ok_or_else(|| Error::invalid_parameters("NTT root is not invertible"))?;
        let inv_degree = util::try_invert_u64_mod(coeff_count as u64, modulus)
            .ok_or_else(|| Error::invalid_parameters("ring degree is not invertible"))?;

        let power_table = |generator: u64, slot: &dyn Fn(usize) -> usize| {
            let mut table = vec![MultiplyU64ModOperand::new(1, modulus); coeff_count];
            let step = MultiplyU64ModOperand::new(generator, modulus);
            let mut power = generator;
            for i in 1..coeff_count {
                table[slot(i)] = MultiplyU64ModOperand::new(power, modulus);
                power = util::multiply_u64operand_mod(power, &step, modulus);
            }
            table
        };
        let root_powers = power_table(root,
            &|i| util::reverse_bits_u64(i as u64, coeff_count_power) as usize);
        let inv_root_powers = power_table(inv_root,
            &|i| util::reverse_bits_u64((i - 1) as u64, coeff_count_power) as usize + 1);

        Ok(NTTTables {
            root,
            coeff_count_power,
            coeff_count,
            modulus: *modulus,
            inv_degree_modulo: MultiplyU64ModOperand::new(inv_degree, modulus),
            root_powers,
            inv_root_powers,
            handler: DWTHandler::new(LazyModArith::new(modulus)),
        })
    }

    /// One table per modulus, all of the same size.
    pub fn create_ntt_tables(coeff_count_power: usize, moduli: &[Modulus]) -> Result<Vec<NTTTables>> {
        if moduli.is_empty() {
            return Err(Error::invalid_parameters("no moduli to build NTT tables for"));
        }
        moduli.iter().map(|m| Self::new(coeff_count_power, m)).collect()
    }

    pub fn root(&self) -> u64 {self.root}
    pub fn modulus(&self) -> &Modulus {&self.modulus}
    pub fn root_powers(&self) -> &[MultiplyU64ModOperand] {&self.root_powers}
    pub fn inv_root_powers(&self) -> &[MultiplyU64ModOperand] {&self.inv_root_powers}
    pub fn coeff_count_power(&self) -> usize {self.coeff_count_power}
    pub fn coeff_count(&self) -> usize {self.coeff_count}

    /// Forward transform with outputs in `[0, 4q)`.
    pub fn ntt_negacyclic_harvey_lazy(&self, operand: &mut [u64]) {
        self.handler.forward(operand, self.coeff_count_power, &self.root_powers, None);
    }

    pub fn ntt_negacyclic_harvey(&self, operand: &mut [u64]) {
        self.ntt_negacyclic_harvey_lazy(operand);
        let modulus = self.modulus.value();
        let two_times_modulus = modulus << 1;
        for x in operand.iter_mut() {
            if *x >= two_times_modulus {*x -= two_times_modulus}
            if *x >= modulus {*x -= modulus}
        }
    }

    /// Inverse transform with outputs in `[0, 2q)`.
    pub fn inverse_ntt_negacyclic_harvey_lazy(&self, operand: &mut [u64]) {
        self.handler.inverse(operand, self.coeff_count_power, &self.inv_root_powers, Some(&self.inv_degree_modulo));
    }

    pub fn inverse_ntt_negacyclic_harvey(&self, operand: &mut [u64]) {
        self.inverse_ntt_negacyclic_harvey_lazy(operand);
        let modulus = self.modulus.value();
        for x in operand.iter_mut() {
            if *x >= modulus {*x -= modulus}
        }
    }

}

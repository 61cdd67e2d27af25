//! Coefficient-wise arithmetic on RNS polynomials stored as `[limb][coefficient]`.
//! The `_p` variants walk all limbs of one polynomial, one modulus per limb.

use crate::modulus::Modulus;
use crate::util::{self, MultiplyU64ModOperand, NTTTables};

pub fn add_inplace(component1: &mut [u64], component2: &[u64], modulus: &Modulus) {
    for (x, &y) in component1.iter_mut().zip(component2) {
        *x = util::add_u64_mod(*x, y, modulus);
    }
}

pub fn add_inplace_p(poly1: &mut [u64], poly2: &[u64], degree: usize, moduli: &[Modulus]) {
    for ((c1, c2), modulus) in poly1.chunks_exact_mut(degree).zip(poly2.chunks_exact(degree)).zip(moduli) {
        add_inplace(c1, c2, modulus);
    }
}

pub fn sub_inplace(component1: &mut [u64], component2: &[u64], modulus: &Modulus) {
    for (x, &y) in component1.iter_mut().zip(component2) {
        *x = util::sub_u64_mod(*x, y, modulus);
    }
}

pub fn sub_inplace_p(poly1: &mut [u64], poly2: &[u64], degree: usize, moduli: &[Modulus]) {
    for ((c1, c2), modulus) in poly1.chunks_exact_mut(degree).zip(poly2.chunks_exact(degree)).zip(moduli) {
        sub_inplace(c1, c2, modulus);
    }
}

pub fn negate_inplace_p(poly: &mut [u64], degree: usize, moduli: &[Modulus]) {
    for (component, modulus) in poly.chunks_exact_mut(degree).zip(moduli) {
        for x in component.iter_mut() {
            *x = util::negate_u64_mod(*x, modulus);
        }
    }
}

/// Multiplies by a small integer scalar, reduced separately modulo each limb.
pub fn multiply_scalar_inplace_p(poly: &mut [u64], scalar: u64, degree: usize, moduli: &[Modulus]) {
    for (component, modulus) in poly.chunks_exact_mut(degree).zip(moduli) {
        let operand = MultiplyU64ModOperand::new(modulus.reduce(scalar), modulus);
        for x in component.iter_mut() {
            *x = util::multiply_u64operand_mod(*x, &operand, modulus);
        }
    }
}

/// Multiplies limb `i` by the precomputed operand `operands[i]`.
pub fn multiply_operands_inplace_p(poly: &mut [u64], operands: &[MultiplyU64ModOperand], degree: usize, moduli: &[Modulus]) {
    for ((component, operand), modulus) in poly.chunks_exact_mut(degree).zip(operands).zip(moduli) {
        for x in component.iter_mut() {
            *x = util::multiply_u64operand_mod(*x, operand, modulus);
        }
    }
}

pub fn dyadic_product_inplace_p(poly1: &mut [u64], poly2: &[u64], degree: usize, moduli: &[Modulus]) {
    for ((c1, c2), modulus) in poly1.chunks_exact_mut(degree).zip(poly2.chunks_exact(degree)).zip(moduli) {
        for (x, &y) in c1.iter_mut().zip(c2) {
            *x = util::multiply_u64_mod(*x, y, modulus);
        }
    }
}

/// `destination += poly1 * poly2` pointwise.
pub fn dyadic_product_accumulate_p(poly1: &[u64], poly2: &[u64], degree: usize, moduli: &[Modulus], destination: &mut [u64]) {
    let limbs = poly1.chunks_exact(degree).zip(poly2.chunks_exact(degree));
    for ((d, (c1, c2)), modulus) in destination.chunks_exact_mut(degree).zip(limbs).zip(moduli) {
        for ((z, &x), &y) in d.iter_mut().zip(c1).zip(c2) {
            let product = util::multiply_u64_mod(x, y, modulus);
            *z = util::add_u64_mod(*z, product, modulus);
        }
    }
}

pub fn ntt_p(poly: &mut [u64], degree: usize, tables: &[NTTTables]) {
    for (component, table) in poly.chunks_exact_mut(degree).zip(tables) {
        table.ntt_negacyclic_harvey(component);
    }
}

pub fn intt_p(poly: &mut [u64], degree: usize, tables: &[NTTTables]) {
    for (component, table) in poly.chunks_exact_mut(degree).zip(tables) {
        table.inverse_ntt_negacyclic_harvey(component);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limbwise_arith() {
        let moduli = [Modulus::new(7).unwrap(), Modulus::new(11).unwrap()];
        let mut a = vec![1, 6, 3, 10];
        add_inplace_p(&mut a, &[6, 6, 9, 9], 2, &moduli);
        assert_eq!(a, vec![0, 5, 1, 8]);
        sub_inplace_p(&mut a, &[1, 0, 2, 0], 2, &moduli);
        assert_eq!(a, vec![6, 5, 10, 8]);
        negate_inplace_p(&mut a, 2, &moduli);
        assert_eq!(a, vec![1, 2, 1, 3]);
        multiply_scalar_inplace_p(&mut a, 15, 2, &moduli);
        assert_eq!(a, vec![1, 2, 4, 1]);
        dyadic_product_inplace_p(&mut a, &[3, 3, 3, 3], 2, &moduli);
        assert_eq!(a, vec![3, 6, 1, 3]);

        let mut acc = vec![1, 1, 1, 1];
        dyadic_product_accumulate_p(&a, &[2, 2, 2, 2], 2, &moduli, &mut acc);
        assert_eq!(acc, vec![0, 6, 3, 7]);
    }

    #[test]
    fn test_ntt_p() {
        let moduli = crate::modulus::CoeffModulus::create(8, &[30, 40]).unwrap();
        let tables = NTTTables::create_ntt_tables(3, &moduli).unwrap();
        let original = (0..16u64).collect::<Vec<_>>();
        let mut poly = original.clone();
        ntt_p(&mut poly, 8, &tables);
        intt_p(&mut poly, 8, &tables);
        assert_eq!(poly, original);
    }
}

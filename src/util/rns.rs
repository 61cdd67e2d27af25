use crate::{
    error::{Error, Result},
    modulus::Modulus,
    util::{self, MultiplyU64ModOperand},
};

/// `result = prod_{i != except} operands[i]`, as a little-endian multi-word integer.
fn multiply_many_u64_except(operands: &[u64], except: usize, result: &mut [u64]) {
    let kept = operands.iter().enumerate()
        .filter(|(i, _)| *i != except)
        .map(|(_, &x)| x)
        .collect::<Vec<_>>();
    if kept.is_empty() {
        result.fill(0);
        result[0] = 1;
    } else {
        util::multiply_many_u64(&kept, result);
    }
}

/// A residue number system base: pairwise coprime moduli together with the
/// constants needed to move between residues and multi-word integers (CRT).
#[derive(Clone, Debug)]
pub struct RNSBase {
    base: Vec<Modulus>,
    base_prod: Vec<u64>,
    upper_half_threshold: Vec<u64>,
    punctured_prod: Vec<Vec<u64>>,
    inv_punctured_prod_mod_base: Vec<MultiplyU64ModOperand>,
}

impl RNSBase {

    pub fn new(moduli: &[Modulus]) -> Result<Self> {
        if moduli.is_empty() {
            return Err(Error::invalid_parameters("RNS base cannot be empty"));
        }
        for (i, x) in moduli.iter().enumerate() {
            if moduli[..i].iter().any(|y| !util::are_coprime(x.value(), y.value())) {
                return Err(Error::invalid_parameters("RNS base moduli must be pairwise coprime"));
            }
        }
        let n = moduli.len();
        let values = moduli.iter().map(|x| x.value()).collect::<Vec<_>>();
        let mut base_prod = vec![0; n];
        util::multiply_many_u64(&values, &mut base_prod);
        let mut punctured_prod = vec![vec![0; n]; n];
        let mut inv_punctured_prod_mod_base = Vec::with_capacity(n);
        for (i, modulus) in moduli.iter().enumerate() {
            multiply_many_u64_except(&values, i, &mut punctured_prod[i]);
            let reduced = util::modulo_uint(&punctured_prod[i], modulus);
            let inv = util::try_invert_u64_mod(reduced, modulus)
                .ok_or_else(|| Error::invalid_parameters("RNS base product is not invertible"))?;
            inv_punctured_prod_mod_base.push(MultiplyU64ModOperand::new(inv, modulus));
        }
        Ok(RNSBase {
            base: moduli.to_vec(),
            upper_half_threshold: util::half_round_up_uint(&base_prod),
            base_prod,
            punctured_prod,
            inv_punctured_prod_mod_base,
        })
    }

    pub fn contains(&self, modulus: &Modulus) -> bool {
        self.base.iter().any(|x| x == modulus)
    }

    /// The base made of this one's moduli followed by `other`'s.
    pub fn extend(&self, other: &Self) -> Result<Self> {
        let mut moduli = self.base.clone();
        moduli.extend_from_slice(&other.base);
        Self::new(&moduli)
    }

    /// Replaces a multi-word integer (one word per modulus) by its residues.
    pub fn decompose(&self, value: &mut [u64]) {
        if self.base.len() > 1 {
            let copied = value.to_vec();
            for (v, modulus) in value.iter_mut().zip(&self.base) {
                *v = util::modulo_uint(&copied, modulus);
            }
        }
    }

    /// Decomposes `count` consecutive multi-word integers into `[limb][coefficient]` layout.
    pub fn decompose_array(&self, value: &mut [u64]) {
        let size = self.base.len();
        if size > 1 {
            let count = value.len() / size;
            let copied = value.to_vec();
            for (i, modulus) in self.base.iter().enumerate() {
                for (j, word) in copied.chunks_exact(size).enumerate() {
                    value[i * count + j] = util::modulo_uint(word, modulus);
                }
            }
        }
    }

    /// CRT-composes residues into `destination`, which must hold one word per modulus.
    pub fn compose_into(&self, mut residues: impl Iterator<Item = u64>, destination: &mut [u64]) {
        let size = self.base.len();
        destination.fill(0);
        if size == 1 {
            destination[0] = residues.next().unwrap_or(0);
            return;
        }
        let mut temp = vec![0; size];
        for (((residue, inv), punctured), modulus) in residues
            .zip(&self.inv_punctured_prod_mod_base)
            .zip(&self.punctured_prod)
            .zip(&self.base)
        {
            let scaled = util::multiply_u64operand_mod(residue, inv, modulus);
            util::multiply_uint_u64(punctured, scaled, &mut temp);
            util::add_uint_mod_inplace(destination, &temp, &self.base_prod);
        }
    }

    /// Inverse of [RNSBase::decompose].
    pub fn compose(&self, value: &mut [u64]) {
        if self.base.len() > 1 {
            let residues = value.to_vec();
            self.compose_into(residues.into_iter(), value);
        }
    }

    /// Inverse of [RNSBase::decompose_array].
    pub fn compose_array(&self, value: &mut [u64]) {
        let size = self.base.len();
        if size > 1 {
            let count = value.len() / size;
            let residues = value.to_vec();
            for (j, destination) in value.chunks_exact_mut(size).enumerate() {
                self.compose_into((0..size).map(|i| residues[i * count + j]), destination);
            }
        }
    }

    /// Composes and maps the result into `(-Q/2, Q/2]`. The magnitude is left in
    /// `value` and the returned flag tells whether it is negative.
    pub fn compose_centered(&self, value: &mut [u64]) -> bool {
        self.compose(value);
        self.center(value)
    }

    /// Centers an already composed value, see [RNSBase::compose_centered].
    pub fn center(&self, value: &mut [u64]) -> bool {
        if util::is_greater_than_or_equal_uint(value, &self.upper_half_threshold) {
            let copied = value.to_vec();
            util::sub_uint(&self.base_prod, &copied, value);
            true
        } else {
            false
        }
    }

    /// Converts a polynomial in `[limb][coefficient]` layout over this base to the
    /// `target` moduli, interpreting every coefficient as a centered integer.
    pub fn convert_centered_array(&self, input: &[u64], degree: usize, target: &[Modulus], output: &mut [u64]) {
        let size = self.base.len();
        let mut word = vec![0; size];
        for j in 0..degree {
            self.compose_into((0..size).map(|i| input[i * degree + j]), &mut word);
            let negative = self.center(&mut word);
            for (k, modulus) in target.iter().enumerate() {
                let magnitude = util::modulo_uint(&word, modulus);
                output[k * degree + j] = if negative {util::negate_u64_mod(magnitude, modulus)} else {magnitude};
            }
        }
    }

    pub fn len(&self) -> usize {self.base.len()}
    pub fn is_empty(&self) -> bool {self.base.is_empty()}
    pub fn base(&self) -> &[Modulus] {&self.base}
    pub fn base_prod(&self) -> &[u64] {&self.base_prod}
    /// `ceil(Q / 2)`
    pub fn upper_half_threshold(&self) -> &[u64] {&self.upper_half_threshold}
    pub fn punctured_prod(&self) -> &[Vec<u64>] {&self.punctured_prod}
    pub fn inv_punctured_prod_mod_base(&self) -> &[MultiplyU64ModOperand] {&self.inv_punctured_prod_mod_base}

}

impl std::ops::Index<usize> for RNSBase {
    type Output = Modulus;
    fn index(&self, index: usize) -> &Self::Output {
        &self.base[index]
    }
}

use crate::parameters::ParmsID;

/// Struct to store a plaintext element.
///
/// In exact mode the data is one polynomial of `N` coefficients modulo the plain
/// modulus `t` and the scale is `None`. In approximate mode the data is an RNS
/// polynomial of `k * N` words, limb `i` reduced modulo `q_i`, and the scale records
/// the factor the encoder multiplied the values by.
///
/// See [Ciphertext] for the class that stores ciphertexts.
#[derive(Clone, Debug, PartialEq)]
pub struct Plaintext {
    parms_id: ParmsID,
    scale: Option<f64>,
    data: Vec<u64>,
}

impl Plaintext {

    pub(crate) fn new(parms_id: ParmsID, scale: Option<f64>, data: Vec<u64>) -> Self {
        Plaintext { parms_id, scale, data }
    }

    /// The [ParmsID] of the context the plaintext was encoded under.
    pub fn parms_id(&self) -> &ParmsID {
        &self.parms_id
    }

    /// The scale of an approximate plaintext, `None` for an exact one.
    pub fn scale(&self) -> Option<f64> {
        self.scale
    }

    pub fn is_exact(&self) -> bool {
        self.scale.is_none()
    }

    pub fn data(&self) -> &[u64] {
        &self.data
    }

    pub fn data_at(&self, index: usize) -> u64 {
        self.data[index]
    }

    /// Number of stored words.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether every coefficient is zero.
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&x| x == 0)
    }

}

/// Struct to store a ciphertext element.
///
/// A ciphertext consists of `size` polynomials over the coefficient modulus, each
/// of `coeff_modulus_size * poly_modulus_degree` words, laid out
/// `[component][limb][coefficient]` and always in coefficient form. Fresh and
/// relinearized ciphertexts have two components, a product has three until it is
/// relinearized.
///
/// Besides the data a ciphertext carries its scale (1.0 in exact mode) and an
/// estimate of its remaining noise budget in bits.
#[derive(Clone, Debug)]
pub struct Ciphertext {
    parms_id: ParmsID,
    size: usize,
    coeff_modulus_size: usize,
    poly_modulus_degree: usize,
    scale: f64,
    noise_budget: u32,
    data: Vec<u64>,
}

impl PartialEq for Ciphertext {
    fn eq(&self, other: &Self) -> bool {
        self.parms_id == other.parms_id
            && self.size == other.size
            && self.coeff_modulus_size == other.coeff_modulus_size
            && self.poly_modulus_degree == other.poly_modulus_degree
            && self.scale.to_bits() == other.scale.to_bits()
            && self.noise_budget == other.noise_budget
            && self.data == other.data
    }
}

impl Ciphertext {

    /// Wraps `data`, which must hold `size` polynomials of `coeff_modulus_size * poly_modulus_degree` words.
    pub(crate) fn new(
        parms_id: ParmsID, size: usize, coeff_modulus_size: usize, poly_modulus_degree: usize,
        scale: f64, noise_budget: u32, data: Vec<u64>
    ) -> Self {
        debug_assert_eq!(data.len(), size * coeff_modulus_size * poly_modulus_degree);
        Ciphertext { parms_id, size, coeff_modulus_size, poly_modulus_degree, scale, noise_budget, data }
    }

    /// The [ParmsID] of the context the ciphertext was created under.
    pub fn parms_id(&self) -> &ParmsID {
        &self.parms_id
    }

    /// Number of polynomial components.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn coeff_modulus_size(&self) -> usize {
        self.coeff_modulus_size
    }

    pub fn poly_modulus_degree(&self) -> usize {
        self.poly_modulus_degree
    }

    /// Words in one component.
    pub fn poly_len(&self) -> usize {
        self.coeff_modulus_size * self.poly_modulus_degree
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Estimated remaining noise budget in bits. Zero means decryption is no longer
    /// expected to be correct.
    pub fn noise_budget(&self) -> u32 {
        self.noise_budget
    }

    pub fn data(&self) -> &[u64] {
        &self.data
    }

    /// The `index`-th polynomial component.
    pub fn poly(&self, index: usize) -> &[u64] {
        let len = self.poly_len();
        &self.data[index * len..(index + 1) * len]
    }

    pub(crate) fn poly_mut(&mut self, index: usize) -> &mut [u64] {
        let len = self.poly_len();
        &mut self.data[index * len..(index + 1) * len]
    }

    /// Iterates over the polynomial components in order.
    pub fn polys(&self) -> std::slice::ChunksExact<'_, u64> {
        self.data.chunks_exact(self.poly_len())
    }

    pub(crate) fn polys_mut(&mut self) -> std::slice::ChunksExactMut<'_, u64> {
        let len = self.poly_len();
        self.data.chunks_exact_mut(len)
    }

    pub(crate) fn set_noise_budget(&mut self, noise_budget: u32) {
        self.noise_budget = noise_budget;
    }

    pub(crate) fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

}

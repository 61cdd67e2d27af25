use std::sync::Arc;

use crate::{
    context::{ExactContextData, HeContext},
    error::{Error, Result},
    text::Plaintext,
    util::{self, GALOIS_GENERATOR},
};

/// Base of the integer encoding: every coefficient holds one hexadecimal digit.
const INTEGER_BASE: i128 = 16;

/// Provides SIMD encoding and decoding for exact (plain modulus) contexts.
///
/// If the ring degree is N and the plain modulus is a prime t congruent to 1 modulo
/// 2N, then X^N+1 splits into N distinct linear factors modulo t and the plaintext
/// space Z_t\[X\]/(X^N+1) is isomorphic to the N-fold product of Z_t. The encoder
/// computes this isomorphism with a negacyclic NTT modulo t. Slots are ordered along
/// the orbits of the Galois generator 3, so that a plaintext reads as a 2-by-(N/2)
/// matrix and ciphertext additions and multiplications act slot-wise.
///
/// Besides slots the encoder offers two coefficient-level encodings: raw polynomial
/// coefficients, and integers written as base-16 digit polynomials.
pub struct BatchEncoder {
    context: Arc<HeContext>,
    slots: usize,
    matrix_reps_index_map: Vec<usize>,
}

impl BatchEncoder {

    /// Creates a BatchEncoder for an exact context; an approximate context gives `InvalidParameters`.
    pub fn new(context: Arc<HeContext>) -> Result<Self> {
        context.exact()?;
        let slots = context.degree();
        let logn = util::get_power_of_two(slots as u64)
            .ok_or_else(|| Error::invalid_parameters("slot count must be a power of two"))?;
        let row_size = slots >> 1;
        let m = slots << 1;
        let mut matrix_reps_index_map = vec![0; slots];
        let mut pos = 1;
        for i in 0..row_size {
            let index1 = (pos - 1) >> 1;
            let index2 = (m - pos - 1) >> 1;
            matrix_reps_index_map[i] = util::reverse_bits_u64(index1 as u64, logn) as usize;
            matrix_reps_index_map[i + row_size] = util::reverse_bits_u64(index2 as u64, logn) as usize;
            pos = (pos * GALOIS_GENERATOR) & (m - 1);
        }
        Ok(BatchEncoder { context, slots, matrix_reps_index_map })
    }

    fn exact(&self) -> Result<&ExactContextData> {
        self.context.exact()
    }

    /// Return the number of slots available for batching. Equals the ring degree.
    pub fn slot_count(&self) -> usize {
        self.slots
    }

    /// Return the number of rows in the matrix that is encoded in a plaintext.
    /// Equals to 2.
    pub fn row_count(&self) -> usize {
        2
    }

    /// Return the number of columns in the matrix that is encoded in a plaintext.
    /// Equals to [Self::slot_count()] / 2.
    pub fn column_count(&self) -> usize {
        self.slots / 2
    }

    /// The plain modulus `t`.
    pub fn plain_modulus(&self) -> u64 {
        self.exact().map_or(0, |e| e.plain_modulus().value())
    }

    fn check_values(&self, values: &[u64]) -> Result<()> {
        if values.len() > self.slots {
            return Err(Error::invalid_parameters(format!(
                "{} values do not fit into {} slots", values.len(), self.slots
            )));
        }
        let t = self.plain_modulus();
        if let Some(v) = values.iter().find(|&&v| v >= t) {
            return Err(Error::invalid_parameters(format!("value {} is not below the plain modulus {}", v, t)));
        }
        Ok(())
    }

    fn check_plaintext(&self, plain: &Plaintext) -> Result<()> {
        if plain.parms_id() != self.context.parms_id() {
            return Err(Error::modulus_mismatch("plaintext belongs to another parameter set"));
        }
        if !plain.is_exact() || plain.len() != self.slots {
            return Err(Error::modulus_mismatch("plaintext is not an exact plaintext of this context"));
        }
        Ok(())
    }

    fn plaintext(&self, data: Vec<u64>) -> Plaintext {
        Plaintext::new(*self.context.parms_id(), None, data)
    }

    /// Encodes integers modulo `t` into the slots, top row first. Missing values are zero.
    /// ```rust
    /// # use cipherformula::*;
    /// let context = HeContext::new(SecurityParameters::exact_default().unwrap()).unwrap();
    /// let encoder = BatchEncoder::new(context).unwrap();
    /// let values = vec![1, 2, 3, 4];
    /// let plain = encoder.encode(&values).unwrap();
    /// let decoded = encoder.decode(&plain).unwrap();
    /// assert_eq!(&values, &decoded[..4]);
    /// assert_eq!(&vec![0; 8192 - 4], &decoded[4..]);
    /// ```
    pub fn encode(&self, values: &[u64]) -> Result<Plaintext> {
        self.check_values(values)?;
        let mut destination = vec![0; self.slots];
        for (&value, &index) in values.iter().zip(&self.matrix_reps_index_map) {
            destination[index] = value;
        }
        // the index map already applied the bit reversal
        self.exact()?.plain_ntt_tables().inverse_ntt_negacyclic_harvey(&mut destination);
        Ok(self.plaintext(destination))
    }

    /// Decodes a plaintext into [Self::slot_count()] integers modulo `t`.
    pub fn decode(&self, plain: &Plaintext) -> Result<Vec<u64>> {
        self.check_plaintext(plain)?;
        let mut temp = plain.data().to_vec();
        self.exact()?.plain_ntt_tables().ntt_negacyclic_harvey(&mut temp);
        Ok(self.matrix_reps_index_map.iter().map(|&index| temp[index]).collect())
    }

    /// Encodes raw polynomial coefficients, lowest degree first.
    pub fn encode_polynomial(&self, coefficients: &[u64]) -> Result<Plaintext> {
        self.check_values(coefficients)?;
        let mut destination = coefficients.to_vec();
        destination.resize(self.slots, 0);
        Ok(self.plaintext(destination))
    }

    /// The raw polynomial coefficients of a plaintext.
    pub fn decode_polynomial(&self, plain: &Plaintext) -> Result<Vec<u64>> {
        self.check_plaintext(plain)?;
        Ok(plain.data().to_vec())
    }

    /// Encodes an integer as the polynomial of its hexadecimal digits, so that evaluating
    /// the polynomial at 16 gives the value back. Sums and products of such polynomials
    /// decode to sums and products of the integers while no coefficient wraps modulo `t`.
    pub fn encode_integer(&self, value: u64) -> Result<Plaintext> {
        let mut digits = vec![];
        let mut rest = value;
        while rest > 0 {
            digits.push(rest % INTEGER_BASE as u64);
            rest /= INTEGER_BASE as u64;
        }
        self.encode_polynomial(&digits)
    }

    /// Evaluates the plaintext polynomial at 16, reading coefficients above `t / 2`
    /// as negative. Fails with `InvalidParameters` if the value is negative or does
    /// not fit in 64 bits.
    pub fn decode_integer(&self, plain: &Plaintext) -> Result<u64> {
        self.check_plaintext(plain)?;
        let exact = self.exact()?;
        let t = exact.plain_modulus().value();
        let threshold = exact.plain_upper_half_threshold();
        let overflow = || Error::invalid_parameters("decoded integer does not fit in 64 bits");
        let mut value: i128 = 0;
        for &coefficient in plain.data().iter().rev() {
            let digit = if coefficient >= threshold {
                coefficient as i128 - t as i128
            } else {
                coefficient as i128
            };
            value = value.checked_mul(INTEGER_BASE)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(overflow)?;
        }
        u64::try_from(value).map_err(|_| overflow())
    }

}

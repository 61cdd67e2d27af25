//! Weighted sums of encrypted inputs with public weights.

use serde::{Deserialize, Serialize};

use crate::{
    ckks_encoder::CKKSEncoder,
    error::{Error, Result},
    evaluator::Evaluator,
    text::Ciphertext,
};

/// `constant + sum(weight_i * x_i)` over approximate ciphertexts.
///
/// The weights and the constant are public; only the inputs are encrypted. Every
/// addend ends up at the same scale, so the sum never hits a scale mismatch as long
/// as the inputs share one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearFormula {
    pub terms: Vec<(String, f64)>,
    pub constant: f64,
}

impl LinearFormula {

    pub fn new(constant: f64) -> Self {
        Self { terms: vec![], constant }
    }

    /// Appends the term `weight * name`.
    pub fn with_term(mut self, name: impl Into<String>, weight: f64) -> Self {
        self.terms.push((name.into(), weight));
        self
    }

    /// Basal metabolic rate, `13.397 W + 4.799 H - 5.677 A + 88.362` for weight in
    /// kilograms, height in centimetres and age in years.
    pub fn basal_metabolic_rate() -> Self {
        Self::new(88.362)
            .with_term("weight", 13.397)
            .with_term("height", 4.799)
            .with_term("age", -5.677)
    }

    /// The input names, in the order [LinearFormula::evaluate] expects the inputs.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|(name, _)| name.as_str())
    }

    fn check_input_count(&self, count: usize) -> Result<()> {
        if self.terms.is_empty() {
            return Err(Error::invalid_parameters("formula has no terms"));
        }
        if count != self.terms.len() {
            return Err(Error::invalid_parameters(format!(
                "formula has {} terms but {} inputs were given", self.terms.len(), count)));
        }
        Ok(())
    }

    /// Evaluates the formula homomorphically.
    ///
    /// Each input is multiplied by its weight encoded at `scale`, the products are
    /// summed (negative weights are subtracted) and the constant is added at the
    /// resulting scale, `input scale * scale`.
    ///
    /// ```rust
    /// # use cipherformula::*;
    /// # use rand::SeedableRng;
    /// let context = HeContext::new(SecurityParameters::approximate_default().unwrap()).unwrap();
    /// let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(3);
    /// let keys = KeyGenerator::new(context.clone()).generate(&mut rng);
    /// let encoder = CKKSEncoder::new(context.clone()).unwrap();
    /// let encryptor = Encryptor::new(context.clone(), keys.public_key).unwrap();
    /// let decryptor = Decryptor::new(context.clone(), keys.secret_key).unwrap();
    ///
    /// let scale = 2f64.powi(40);
    /// let formula = LinearFormula::new(1.0).with_term("x", 2.0).with_term("y", -3.0);
    /// let inputs = [4.0, 0.5].iter()
    ///     .map(|&v| encryptor.encrypt(&encoder.encode_f64_single(v, scale).unwrap(), &mut rng).unwrap())
    ///     .collect::<Vec<_>>();
    /// let result = formula.evaluate(&Evaluator::new(context), &encoder, &inputs, scale).unwrap();
    /// let decoded = encoder.decode_f64(&decryptor.decrypt(&result).unwrap()).unwrap();
    /// assert!((decoded[0] - 7.5).abs() < 1e-3);
    /// ```
    pub fn evaluate(&self, evaluator: &Evaluator, encoder: &CKKSEncoder, inputs: &[Ciphertext], scale: f64) -> Result<Ciphertext> {
        self.check_input_count(inputs.len())?;
        let mut accumulated: Option<Ciphertext> = None;
        for ((name, weight), input) in self.terms.iter().zip(inputs) {
            let plain_weight = encoder.encode_f64_single(weight.abs(), scale)?;
            let weighted = evaluator.multiply_plain(input, &plain_weight)?;
            log::trace!("formula term {} with weight {}", name, weight);
            accumulated = Some(match (accumulated, *weight < 0.0) {
                (None, false) => weighted,
                (None, true) => evaluator.negate(&weighted)?,
                (Some(sum), false) => evaluator.add(&sum, &weighted)?,
                (Some(sum), true) => evaluator.sub(&sum, &weighted)?,
            });
        }
        let accumulated = accumulated.ok_or_else(|| Error::invalid_parameters("formula has no terms"))?;

        let plain_constant = encoder.encode_f64_single(self.constant.abs(), accumulated.scale())?;
        if self.constant < 0.0 {
            evaluator.sub_plain(&accumulated, &plain_constant)
        } else {
            evaluator.add_plain(&accumulated, &plain_constant)
        }
    }

    /// The cleartext value of the formula for `values` in term order.
    pub fn evaluate_plain(&self, values: &[f64]) -> Result<f64> {
        self.check_input_count(values.len())?;
        Ok(self.terms.iter().zip(values).fold(self.constant, |acc, ((_, w), x)| acc + w * x))
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::HeContext,
        encryptor::{Decryptor, Encryptor},
        key::KeyGenerator,
        modulus::CoeffModulus,
        parameters::{SchemeType, SecurityLevel, SecurityParameters},
    };
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn encrypt_all(parms: SecurityParameters, values: &[f64], scale: f64, seed: u64)
        -> (Evaluator, CKKSEncoder, Decryptor, Vec<Ciphertext>)
    {
        let context = HeContext::new(parms).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let keys = KeyGenerator::new(context.clone()).generate(&mut rng);
        let encoder = CKKSEncoder::new(context.clone()).unwrap();
        let encryptor = Encryptor::new(context.clone(), keys.public_key).unwrap();
        let decryptor = Decryptor::new(context.clone(), keys.secret_key).unwrap();
        let plains = values.iter().map(|&v| encoder.encode_f64_single(v, scale).unwrap()).collect::<Vec<_>>();
        let inputs = encryptor.encrypt_batch(&plains, &mut rng).unwrap();
        (Evaluator::new(context), encoder, decryptor, inputs)
    }

    #[test]
    fn test_basal_metabolic_rate() {
        let formula = LinearFormula::basal_metabolic_rate();
        assert_eq!(vec!["weight", "height", "age"], formula.names().collect::<Vec<_>>());
        let values = [70.0, 175.0, 30.0];
        let expected = formula.evaluate_plain(&values).unwrap();
        assert!((expected - 1695.667).abs() < 1e-9);

        let scale = 2f64.powi(40);
        let (evaluator, encoder, decryptor, inputs) =
            encrypt_all(SecurityParameters::approximate_default().unwrap(), &values, scale, 50);
        let result = formula.evaluate(&evaluator, &encoder, &inputs, scale).unwrap();
        assert_eq!(scale * scale, result.scale());
        assert_eq!(2, result.size());
        let decoded = encoder.decode_f64(&decryptor.decrypt(&result).unwrap()).unwrap();
        assert!((decoded[0] - expected).abs() < 1e-2, "{} vs {}", decoded[0], expected);
        assert!((decoded[100] - expected).abs() < 1e-2);
    }

    #[test]
    fn test_signs() {
        let parms = SecurityParameters::new(SchemeType::Approximate)
            .set_ring_degree(64)
            .set_coeff_modulus(&CoeffModulus::create(64, &[60, 40, 60]).unwrap())
            .set_security_level(SecurityLevel::None);
        let formula = LinearFormula::new(-2.5).with_term("a", -1.5).with_term("b", 0.25);
        let values = [3.0, 8.0];
        let scale = 2f64.powi(30);
        let (evaluator, encoder, decryptor, inputs) = encrypt_all(parms, &values, scale, 51);
        let result = formula.evaluate(&evaluator, &encoder, &inputs, scale).unwrap();
        let decoded = encoder.decode_f64(&decryptor.decrypt(&result).unwrap()).unwrap();
        let expected = formula.evaluate_plain(&values).unwrap();
        assert_eq!(-5.0, expected);
        assert!((decoded[0] - expected).abs() < 1e-3, "{}", decoded[0]);
    }

    #[test]
    fn test_invalid_inputs() {
        let formula = LinearFormula::basal_metabolic_rate();
        assert!(matches!(formula.evaluate_plain(&[1.0]), Err(Error::InvalidParameters { .. })));
        assert!(matches!(LinearFormula::new(1.0).evaluate_plain(&[]), Err(Error::InvalidParameters { .. })));

        let parms = SecurityParameters::new(SchemeType::Approximate)
            .set_ring_degree(64)
            .set_coeff_modulus(&CoeffModulus::create(64, &[60, 40, 60]).unwrap())
            .set_security_level(SecurityLevel::None);
        let (evaluator, encoder, _, inputs) = encrypt_all(parms, &[1.0, 2.0, 3.0], 2f64.powi(30), 52);
        assert!(matches!(
            formula.evaluate(&evaluator, &encoder, &inputs[..2], 2f64.powi(30)),
            Err(Error::InvalidParameters { .. })
        ));
    }

    #[test]
    fn test_json() {
        let formula = LinearFormula::new(1.0).with_term("x", 2.0);
        let json = serde_json::to_string(&formula).unwrap();
        assert_eq!(r#"{"terms":[["x",2.0]],"constant":1.0}"#, json);
        assert_eq!(formula, serde_json::from_str(&json).unwrap());
    }

}

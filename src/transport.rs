//! Moving serialized ciphertexts to an evaluating party and back.
//!
//! The evaluating party never sees a secret key: it receives a batch of
//! ciphertexts in the wire format of [crate::serialize], evaluates a
//! [LinearFormula] and answers with the serialized result.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    ckks_encoder::CKKSEncoder,
    context::HeContext,
    error::{Error, Result},
    evaluator::Evaluator,
    formula::LinearFormula,
    serialize,
};

/// A request/response channel carrying serialized payloads.
#[async_trait]
pub trait TransportChannel {
    /// Delivers `payload` and waits for the answer.
    async fn send(&self, payload: Vec<u8>) -> Result<Vec<u8>>;
}

/// The evaluating side: decodes a ciphertext batch, applies its formula and encodes
/// the result.
pub struct EvaluationService {
    context: Arc<HeContext>,
    evaluator: Evaluator,
    encoder: CKKSEncoder,
    formula: LinearFormula,
    scale: f64,
}

impl EvaluationService {

    /// `scale` is the scale the formula weights are encoded at.
    pub fn new(context: Arc<HeContext>, formula: LinearFormula, scale: f64) -> Result<Self> {
        let encoder = CKKSEncoder::new(context.clone())?;
        let evaluator = Evaluator::new(context.clone());
        Ok(Self { context, evaluator, encoder, formula, scale })
    }

    pub fn formula(&self) -> &LinearFormula {
        &self.formula
    }

    /// Handles one request synchronously.
    pub fn handle(&self, request: &[u8]) -> Result<Vec<u8>> {
        let inputs = serialize::deserialize_batch(request, &self.context).map_err(|e| {
            log::warn!("rejected request of {} bytes: {}", request.len(), e);
            e
        })?;
        log::debug!("evaluating formula over {} ciphertexts ({} bytes)", inputs.len(), request.len());
        let result = self.formula.evaluate(&self.evaluator, &self.encoder, &inputs, self.scale)?;
        serialize::serialize(&result, &self.context)
    }

}

/// Runs an [EvaluationService] in-process on the blocking thread pool of the
/// current tokio runtime.
#[derive(Clone)]
pub struct LoopbackChannel {
    service: Arc<EvaluationService>,
}

impl LoopbackChannel {

    pub fn new(service: EvaluationService) -> Self {
        Self { service: Arc::new(service) }
    }

}

#[async_trait]
impl TransportChannel for LoopbackChannel {

    async fn send(&self, payload: Vec<u8>) -> Result<Vec<u8>> {
        let service = self.service.clone();
        tokio::task::spawn_blocking(move || service.handle(&payload))
            .await
            .map_err(|e| Error::Transport { reason: e.to_string() })?
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        encryptor::{Decryptor, Encryptor},
        key::KeyGenerator,
        modulus::CoeffModulus,
        parameters::{SchemeType, SecurityLevel, SecurityParameters},
    };
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn toy_context() -> Arc<HeContext> {
        HeContext::new(SecurityParameters::new(SchemeType::Approximate)
            .set_ring_degree(64)
            .set_coeff_modulus(&CoeffModulus::create(64, &[60, 40, 60]).unwrap())
            .set_security_level(SecurityLevel::None)).unwrap()
    }

    #[tokio::test]
    async fn loopback_evaluates_formula() {
        let context = toy_context();
        let scale = 2f64.powi(30);
        let mut rng = ChaCha20Rng::seed_from_u64(60);
        let keys = KeyGenerator::new(context.clone()).generate(&mut rng);
        let encoder = CKKSEncoder::new(context.clone()).unwrap();
        let encryptor = Encryptor::new(context.clone(), keys.public_key).unwrap();
        let decryptor = Decryptor::new(context.clone(), keys.secret_key).unwrap();

        let formula = LinearFormula::new(10.0).with_term("x", 3.0).with_term("y", -1.0);
        let values = [2.0, 4.5];
        let plains = values.iter().map(|&v| encoder.encode_f64_single(v, scale).unwrap()).collect::<Vec<_>>();
        let inputs = encryptor.encrypt_batch(&plains, &mut rng).unwrap();
        let request = serialize::serialize_batch(&inputs, &context).unwrap();

        let channel = LoopbackChannel::new(EvaluationService::new(context.clone(), formula.clone(), scale).unwrap());
        let response = channel.send(request).await.unwrap();
        let result = serialize::deserialize(&response, &context).unwrap();
        let decoded = encoder.decode_f64(&decryptor.decrypt(&result).unwrap()).unwrap();
        assert!((decoded[0] - formula.evaluate_plain(&values).unwrap()).abs() < 1e-3, "{}", decoded[0]);
    }

    #[tokio::test]
    async fn loopback_reports_errors() {
        let context = toy_context();
        let service = EvaluationService::new(context.clone(), LinearFormula::basal_metabolic_rate(), 2f64.powi(30)).unwrap();
        assert_eq!(3, service.formula().terms.len());
        let channel = LoopbackChannel::new(service);
        let result = channel.send(vec![1, 0, 0]).await;
        assert!(matches!(result, Err(Error::MalformedPayload { .. })));
        let empty = serialize::serialize_batch(&[], &context).unwrap();
        assert!(matches!(channel.send(empty).await, Err(Error::InvalidParameters { .. })));
    }

    #[test]
    fn service_requires_approximate_context() {
        let context = HeContext::new(crate::context::tests::toy_exact_parms()).unwrap();
        assert!(EvaluationService::new(context, LinearFormula::new(0.0), 1.0).is_err());
    }

}

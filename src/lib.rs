//! Homomorphic evaluation of arithmetic over encrypted data.
//!
//! Values are encoded into [Plaintext]s, either exactly modulo a plain modulus
//! ([BatchEncoder]) or approximately at a scale ([CKKSEncoder]), encrypted into
//! [Ciphertext]s and combined with an [Evaluator] by a party that never holds the
//! secret key. Only the holder of the [SecretKey] can [Decryptor::decrypt] the result.
//!
//! ```rust
//! use cipherformula::*;
//! use rand::SeedableRng;
//!
//! let parms = SecurityParameters::new(SchemeType::Exact)
//!     .set_ring_degree(4096)
//!     .set_coeff_modulus(&CoeffModulus::bfv_default(4096, SecurityLevel::Tc128).unwrap())
//!     .set_plain_modulus(&PlainModulus::batching(4096, 20).unwrap());
//! let context = HeContext::new(parms).unwrap();
//! let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(0);
//! let keys = KeyGenerator::new(context.clone()).generate(&mut rng);
//!
//! let encoder = BatchEncoder::new(context.clone()).unwrap();
//! let encryptor = Encryptor::new(context.clone(), keys.public_key).unwrap();
//! let decryptor = Decryptor::new(context.clone(), keys.secret_key).unwrap();
//! let evaluator = Evaluator::new(context.clone());
//!
//! let x = encryptor.encrypt(&encoder.encode(&[1, 2, 3]).unwrap(), &mut rng).unwrap();
//! let y = encryptor.encrypt(&encoder.encode(&[4, 5, 6]).unwrap(), &mut rng).unwrap();
//! let product = evaluator.relinearize(&evaluator.multiply(&x, &y).unwrap(), &keys.relin_keys).unwrap();
//!
//! // ship it and back
//! let bytes = serialize::serialize(&product, &context).unwrap();
//! let product = serialize::deserialize(&bytes, &context).unwrap();
//! let decoded = encoder.decode(&decryptor.decrypt(&product).unwrap()).unwrap();
//! assert_eq!(&[4, 10, 18], &decoded[..3]);
//! ```

pub mod util;

mod error;
mod modulus;
mod parameters;
mod ring;
mod context;
mod text;
mod key;
mod batch_encoder;
mod ckks_encoder;
mod encryptor;
mod evaluator;

pub mod serialize;
pub mod formula;
pub mod transport;

pub use error::{Error, Result};
pub use modulus::{Modulus, CoeffModulus, PlainModulus};
pub use parameters::{
    SchemeType, SecurityLevel, NoiseDistribution, SecurityParameters,
    ParmsID, PARMS_ID_ZERO, DEFAULT_DECOMPOSITION_BITS,
};
pub use ring::PolyRing;
pub use context::{HeContext, ExactContextData};
pub use text::{Plaintext, Ciphertext};
pub use key::{SecretKey, PublicKey, RelinKeys, KeyPair, KeyGenerator};
pub use batch_encoder::BatchEncoder;
pub use ckks_encoder::CKKSEncoder;
pub use encryptor::{Encryptor, Decryptor};
pub use evaluator::Evaluator;
pub use serialize::{Serializable, SerializableWithHeContext};
pub use formula::LinearFormula;
pub use transport::{TransportChannel, EvaluationService, LoopbackChannel};

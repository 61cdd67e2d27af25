pub mod uint;
pub mod uintsmallmod;
pub mod number_theory;
pub mod dwthandler;
pub mod ntt;
pub mod polymod;
pub mod rns;
pub mod hash;
pub mod he_standard_params;
pub mod random_generator;
pub mod rlwe;
pub mod scaling_variant;

pub use uint::*;
pub use uintsmallmod::*;
pub use number_theory::*;
pub use ntt::NTTTables;
pub use rns::RNSBase;
pub use random_generator::{BlakeRNG, BlakeRNGFactory, PRNGSeed};

/// Generator of the cyclic subgroup used to lay out batching slots.
pub const GALOIS_GENERATOR: usize = 3;

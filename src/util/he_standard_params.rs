//! Largest coefficient modulus bit counts allowed by the HomomorphicEncryption.org
//! security standard, for a secret key sampled from the ternary distribution {-1, 0, 1}.

use crate::parameters::SecurityLevel;

/// Standard deviation of the error distribution.
pub const HE_STANDARD_PARAMS_ERROR_STD_DEV: f64 = 3.2;

/// Clipped normal samples are cut at this many standard deviations.
pub const HE_STANDARD_PARAMS_NOISE_MAX_DEVIATION: f64 = 6.0 * HE_STANDARD_PARAMS_ERROR_STD_DEV;

fn classical_128(poly_modulus_degree: usize) -> usize {
    match poly_modulus_degree {
         1024 =>  27,
         2048 =>  54,
         4096 => 109,
         8192 => 218,
        16384 => 438,
        32768 => 881,
            _ => 0
    }
}

fn classical_192(poly_modulus_degree: usize) -> usize {
    match poly_modulus_degree {
         1024 =>  19,
         2048 =>  37,
         4096 =>  75,
         8192 => 152,
        16384 => 305,
        32768 => 611,
            _ => 0
    }
}

fn classical_256(poly_modulus_degree: usize) -> usize {
    match poly_modulus_degree {
         1024 =>  14,
         2048 =>  29,
         4096 =>  58,
         8192 => 118,
        16384 => 237,
        32768 => 476,
            _ => 0
    }
}

/// Zero means the degree is not covered at that level. [SecurityLevel::None] imposes no bound.
pub fn max_coeff_modulus_bit_count(poly_modulus_degree: usize, sec_level: SecurityLevel) -> usize {
    match sec_level {
        SecurityLevel::None => usize::MAX,
        SecurityLevel::Tc128 => classical_128(poly_modulus_degree),
        SecurityLevel::Tc192 => classical_192(poly_modulus_degree),
        SecurityLevel::Tc256 => classical_256(poly_modulus_degree),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert_eq!(218, max_coeff_modulus_bit_count(8192, SecurityLevel::Tc128));
        assert_eq!(118, max_coeff_modulus_bit_count(8192, SecurityLevel::Tc256));
        assert_eq!(0, max_coeff_modulus_bit_count(64, SecurityLevel::Tc128));
        assert_eq!(usize::MAX, max_coeff_modulus_bit_count(64, SecurityLevel::None));
    }
}

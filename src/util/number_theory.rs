use rand::Rng;

use crate::{
    error::{Error, Result},
    modulus::Modulus,
    util,
};

const IS_PRIME_NUM_ROUNDS: usize = 40;
const TRY_PRIMITIVE_ROOT_NUM_ROUNDS: usize = 100;

pub fn gcd(mut x: u64, mut y: u64) -> u64 {
    while y != 0 {
        let r = x % y;
        x = y;
        y = r;
    }
    x
}

/** Extended GCD: returns (g, a, b) with g = x * a + y * b. */
pub fn xgcd(mut x: u64, mut y: u64) -> (u64, i64, i64) {
    let (mut prev_a, mut a) = (1i64, 0i64);
    let (mut prev_b, mut b) = (0i64, 1i64);
    while y != 0 {
        let q = (x / y) as i64;
        (x, y) = (y, x % y);
        (prev_a, a) = (a, prev_a - q * a);
        (prev_b, b) = (b, prev_b - q * b);
    }
    (x, prev_a, prev_b)
}

pub fn are_coprime(x: u64, y: u64) -> bool {
    gcd(x, y) <= 1
}

pub fn try_invert_u64_mod_u64(value: u64, modulus: u64) -> Option<u64> {
    if value == 0 {return None;}
    let (g, a, _) = xgcd(value, modulus);
    if g != 1 {
        None
    } else if a < 0 {
        Some((modulus as i64 + a) as u64)
    } else {
        Some(a as u64)
    }
}

/// Miller-Rabin with a fixed witness 2 followed by random witnesses.
pub fn is_prime(modulus: &Modulus) -> bool {
    let value = modulus.value();
    if value < 2 {return false;}
    for small in [2u64, 3, 5, 7, 11, 13] {
        if value == small {return true;}
        if value % small == 0 {return false;}
    }
    let mut d = value - 1;
    let mut r = 0;
    while d & 1 == 0 {d >>= 1; r += 1;}
    let mut rng = rand::thread_rng();
    for round in 0..IS_PRIME_NUM_ROUNDS {
        let a = if round == 0 {2} else {rng.gen_range(3..value)};
        let mut x = util::exponentiate_u64_mod(a, d, modulus);
        if x == 1 || x == value - 1 {continue;}
        let mut witness = true;
        for _ in 1..r {
            x = util::multiply_u64_mod(x, x, modulus);
            if x == value - 1 {witness = false; break;}
        }
        if witness {return false;}
    }
    true
}

/// Largest `count` primes of exactly `bit_size` bits congruent to 1 modulo `factor`, descending.
pub fn get_primes(factor: u64, bit_size: usize, count: usize) -> Result<Vec<Modulus>> {
    if !(util::HE_USER_MOD_BIT_COUNT_MIN..=util::HE_MOD_BIT_COUNT_MAX).contains(&bit_size) {
        return Err(Error::invalid_parameters(format!("cannot search {}-bit primes", bit_size)));
    }
    let mut destination = Vec::with_capacity(count);
    let mut value = ((1u64 << bit_size) - 1) / factor * factor + 1;
    let lower_bound = 1u64 << (bit_size - 1);
    while destination.len() < count && value > lower_bound {
        let candidate = Modulus::new(value)?;
        if candidate.is_prime() {
            destination.push(candidate);
        }
        value -= factor;
    }
    if destination.len() < count {
        return Err(Error::invalid_parameters(format!(
            "only {} of {} primes with {} bits are congruent to 1 mod {}",
            destination.len(), count, bit_size, factor
        )));
    }
    Ok(destination)
}

pub fn get_prime(factor: u64, bit_size: usize) -> Result<Modulus> {
    get_primes(factor, bit_size, 1).map(|mut primes| primes.remove(0))
}

/// Checks that `root` is a primitive `degree`-th root of unity, `degree` a power of two.
pub fn is_primitive_root(root: u64, degree: u64, modulus: &Modulus) -> bool {
    root != 0 && util::exponentiate_u64_mod(root, degree >> 1, modulus) == modulus.value() - 1
}

pub fn try_primitive_root(degree: u64, modulus: &Modulus) -> Option<u64> {
    let size_entire_group = modulus.value() - 1;
    if size_entire_group % degree != 0 {
        return None;
    }
    let size_quotient_group = size_entire_group / degree;
    let mut rng = rand::thread_rng();
    (0..TRY_PRIMITIVE_ROOT_NUM_ROUNDS)
        .map(|_| {
            let candidate = util::barrett_reduce_u64(rng.gen::<u64>(), modulus);
            util::exponentiate_u64_mod(candidate, size_quotient_group, modulus)
        })
        .find(|&root| is_primitive_root(root, degree, modulus))
}

/// The smallest primitive `degree`-th root of unity, so tables are reproducible.
pub fn try_minimal_primitive_root(degree: u64, modulus: &Modulus) -> Option<u64> {
    let root = try_primitive_root(degree, modulus)?;
    let generator_sq = util::multiply_u64_mod(root, root, modulus);
    let mut current = root;
    let mut minimal = root;
    for _ in 0..((degree + 1) / 2) {
        minimal = minimal.min(current);
        current = util::multiply_u64_mod(current, generator_sq, modulus);
    }
    Some(minimal)
}

#[cfg(test)]
mod tests {

    use super::*;

    fn m(value: u64) -> Modulus {
        Modulus::new(value).unwrap()
    }

    #[test]
    fn test_gcd() {
        assert_eq!(1, gcd(1, 1));
        assert_eq!(1, gcd(2, 1));
        assert_eq!(2, gcd(2, 2));
        assert_eq!(3, gcd(6, 15));
        assert_eq!(3, gcd(15, 6));
        assert_eq!(1, gcd(7, 15));
        assert_eq!(3, gcd(11112, 44445));

        assert_eq!(xgcd(5, 6), (1, -1, 1));
        assert_eq!(xgcd(13, 19), (1, 3, -2));
        assert_eq!(xgcd(14, 21), (7, -1, 1));
        assert_eq!(xgcd(19, 13), (1, -2, 3));
        assert!(are_coprime(13, 19));
        assert!(!are_coprime(14, 21));
    }

    #[test]
    fn test_try_invert() {
        assert_eq!(Some(1), try_invert_u64_mod_u64(1, 2));
        assert_eq!(None, try_invert_u64_mod_u64(2, 2));
        assert_eq!(Some(1), try_invert_u64_mod_u64(0xffffff, 2));
        assert_eq!(None, try_invert_u64_mod_u64(12345, 3));
        assert_eq!(Some(4), try_invert_u64_mod_u64(5, 19));
        assert_eq!(Some(5), try_invert_u64_mod_u64(4, 19));
    }

    #[test]
    fn test_is_prime() {
        assert!(is_prime(&m(2)));
        assert!(is_prime(&m(3)));
        assert!(!is_prime(&m(4)));
        assert!(!is_prime(&m(221)));
        assert!(is_prime(&m(65537)));
        assert!(!is_prime(&m(65536)));
        assert!(is_prime(&m(72307)));
        assert!(!is_prime(&m(72307 * 59399)));
        assert!(is_prime(&m(36893488147419103)));
        assert!(!is_prime(&m(36893488147419107)));
    }

    #[test]
    fn test_get_primes() {
        let primes = get_primes(128, 17, 3).unwrap();
        assert_eq!(3, primes.len());
        for p in &primes {
            assert_eq!(1, p.value() % 128);
            assert_eq!(17, p.bit_count());
        }
        assert!(primes[0] > primes[1] && primes[1] > primes[2]);
        assert!(get_primes(1 << 20, 10, 1).is_err());
    }

    #[test]
    fn test_primitive_root() {
        assert!(is_primitive_root(10, 2, &m(11)));
        assert!(!is_primitive_root(9, 2, &m(11)));
        assert!(is_primitive_root(12, 4, &m(29)));
        assert!(!is_primitive_root(12, 8, &m(29)));
        assert!(is_primitive_root(960907033, 8, &m(1234565441)));
        assert!(!is_primitive_root(1180581915, 32, &m(1234565441)));

        let root = try_primitive_root(4, &m(29)).unwrap();
        assert!(root == 12 || root == 17);

        assert_eq!(Some(10), try_minimal_primitive_root(2, &m(11)));
        assert_eq!(Some(12), try_minimal_primitive_root(4, &m(29)));
        assert_eq!(Some(249725733), try_minimal_primitive_root(8, &m(1234565441)));
        assert_eq!(None, try_minimal_primitive_root(16, &m(29)));
    }

}

/// Arithmetic a [DWTHandler] is specialized with: lazy modular arithmetic for the
/// number-theoretic transform, complex floating point arithmetic for the slot encoder.
pub trait Arithmetic: Clone {

    type Value;
    type Root;
    type Scalar;

    fn add(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;
    fn sub(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;
    fn mul_root(&self, a: &Self::Value, r: &Self::Root) -> Self::Value;
    fn mul_scalar(&self, a: &Self::Value, s: &Self::Scalar) -> Self::Value;
    /// Brings a lazily reduced value back into the range the butterflies accept.
    fn guard(&self, a: &Self::Value) -> Self::Value;

}

/**
Discrete weighted transform over an arbitrary [Arithmetic].

The forward transform evaluates a polynomial at the odd powers of a primitive
2n-th root of unity `psi` with Cooley-Tukey butterflies and leaves the result in
bit-reversed order. The inverse takes bit-reversed input back to natural order
with Gentleman-Sande butterflies. Negacyclic convolution then becomes a pointwise
product between the two.

Root tables are laid out the way the butterflies consume them: forward roots are
the powers of `psi` in bit-reversed order, inverse roots hold at slot `i` the
`(reverse_bits(i - 1) + 1)`-th power of `psi^{-1}`. The optional scalar is applied
to every output, which is how the inverse folds in its `1/n` factor.
*/
#[derive(Clone, Default)]
pub struct DWTHandler<A: Arithmetic> {
    arithmetic: A,
}

impl<A: Arithmetic> DWTHandler<A> {

    pub fn new(arithmetic: A) -> Self {
        Self { arithmetic }
    }

    pub fn arithmetic(&self) -> &A {
        &self.arithmetic
    }

    /// Natural order in, bit-reversed order out.
    pub fn forward(&self, values: &mut [A::Value], log_n: usize, roots: &[A::Root], scalar: Option<&A::Scalar>) {
        let n = 1usize << log_n;
        let arith = &self.arithmetic;
        let mut gap = n >> 1;
        let mut m = 1;
        while m < n {
            for (block, root) in values.chunks_exact_mut(gap << 1).zip(&roots[m..m << 1]) {
                let (left, right) = block.split_at_mut(gap);
                for (x, y) in left.iter_mut().zip(right.iter_mut()) {
                    let u = arith.guard(x);
                    let v = arith.mul_root(y, root);
                    *x = arith.add(&u, &v);
                    *y = arith.sub(&u, &v);
                }
            }
            m <<= 1;
            gap >>= 1;
        }
        self.apply_scalar(values, scalar);
    }

    /// Bit-reversed order in, natural order out.
    pub fn inverse(&self, values: &mut [A::Value], log_n: usize, roots: &[A::Root], scalar: Option<&A::Scalar>) {
        let n = 1usize << log_n;
        let arith = &self.arithmetic;
        let mut gap = 1;
        let mut m = n >> 1;
        while m >= 1 {
            let layer_roots = &roots[n - (m << 1) + 1..n - m + 1];
            for (block, root) in values.chunks_exact_mut(gap << 1).zip(layer_roots) {
                let (left, right) = block.split_at_mut(gap);
                for (x, y) in left.iter_mut().zip(right.iter_mut()) {
                    let u = arith.guard(&arith.add(x, y));
                    let v = arith.sub(x, y);
                    *x = u;
                    *y = arith.mul_root(&v, root);
                }
            }
            m >>= 1;
            gap <<= 1;
        }
        self.apply_scalar(values, scalar);
    }

    fn apply_scalar(&self, values: &mut [A::Value], scalar: Option<&A::Scalar>) {
        if let Some(scalar) = scalar {
            for value in values.iter_mut() {
                *value = self.arithmetic.mul_scalar(value, scalar);
            }
        }
    }

}

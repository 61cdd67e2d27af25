//! Versioned binary encoding of ciphertexts.
//!
//! A serialized ciphertext is, all little-endian:
//!
//! | field | encoding |
//! |---|---|
//! | format version | `u8`, currently [FORMAT_VERSION] |
//! | parameter set id | 4 x `u64` |
//! | component count | `u8` |
//! | scale | `f64` bits |
//! | noise budget | `u32` |
//! | data | per component, per limb `j`, `N` coefficients of `ceil(bits(q_j) / 8)` bytes |

use std::io::{Read, Write};

use crate::{
    context::HeContext,
    error::{Error, Result},
    parameters::ParmsID,
    text::Ciphertext,
    util,
};

/// Version byte written in front of every ciphertext.
pub const FORMAT_VERSION: u8 = 1;

/// Provide serialization and deserialization methods for
/// values without context information.
pub trait Serializable {
    /// Serialize the object into a stream.
    fn serialize<T: Write>(&self, stream: &mut T) -> Result<usize>;
    /// Deserialize the object from a stream.
    fn deserialize<T: Read>(stream: &mut T) -> Result<Self> where Self: Sized;
    /// Get the size (bytes) of the object if serialized.
    fn serialized_size(&self) -> usize;
}

/// Provide serialization and deserialization methods for
/// HE objects relative to an HE context.
pub trait SerializableWithHeContext {
    /// Serialize the object into a stream.
    fn serialize<T: Write>(&self, context: &HeContext, stream: &mut T) -> Result<usize>;
    /// Deserialize the object from a stream.
    fn deserialize<T: Read>(context: &HeContext, stream: &mut T) -> Result<Self> where Self: Sized;
    /// Get the size (bytes) of the object if serialized.
    fn serialized_size(&self, context: &HeContext) -> usize;
}

macro_rules! impl_serializable_le {
    ($($t:ty),*) => {$(
        impl Serializable for $t {
            fn serialize<T: Write>(&self, stream: &mut T) -> Result<usize> {
                stream.write_all(&self.to_le_bytes())?;
                Ok(std::mem::size_of::<$t>())
            }
            fn deserialize<T: Read>(stream: &mut T) -> Result<Self> {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                stream.read_exact(&mut buf)?;
                Ok(<$t>::from_le_bytes(buf))
            }
            fn serialized_size(&self) -> usize {
                std::mem::size_of::<$t>()
            }
        }
    )*};
}

impl_serializable_le!(u8, u32, u64);

impl Serializable for f64 {
    fn serialize<T: Write>(&self, stream: &mut T) -> Result<usize> {
        self.to_bits().serialize(stream)
    }
    fn deserialize<T: Read>(stream: &mut T) -> Result<Self> {
        Ok(f64::from_bits(u64::deserialize(stream)?))
    }
    fn serialized_size(&self) -> usize {
        std::mem::size_of::<f64>()
    }
}

impl Serializable for ParmsID {

    fn serialize<T: Write>(&self, stream: &mut T) -> Result<usize> {
        let mut bytes_written = 0;
        for word in self {
            bytes_written += word.serialize(stream)?;
        }
        Ok(bytes_written)
    }

    fn deserialize<T: Read>(stream: &mut T) -> Result<ParmsID> {
        let mut data = [0u64; 4];
        for word in &mut data {
            *word = u64::deserialize(stream)?;
        }
        Ok(data)
    }

    fn serialized_size(&self) -> usize {
        std::mem::size_of::<ParmsID>()
    }

}

/// Bytes needed to store any residue below `value`.
fn get_u64_limit(value: u64) -> usize {
    util::divide_round_up(util::get_significant_bit_count(value), 8)
}

#[inline]
fn write_u64_limited<T: Write>(stream: &mut T, value: u64, limit: usize) -> Result<usize> {
    stream.write_all(&value.to_le_bytes()[..limit])?;
    Ok(limit)
}

#[inline]
fn read_u64_limited<T: Read>(stream: &mut T, limit: usize) -> Result<u64> {
    let mut buf = [0u8; 8];
    stream.read_exact(&mut buf[..limit])?;
    Ok(u64::from_le_bytes(buf))
}

fn data_size(context: &HeContext, size: usize) -> usize {
    let bytes_per_coefficient = context.coeff_modulus().iter()
        .map(|q| get_u64_limit(q.value()))
        .sum::<usize>();
    size * context.degree() * bytes_per_coefficient
}

const HEADER_SIZE: usize = 1 + std::mem::size_of::<ParmsID>() + 1 + 8 + 4;

impl SerializableWithHeContext for Ciphertext {

    fn serialize<T: Write>(&self, context: &HeContext, stream: &mut T) -> Result<usize> {
        context.check_ciphertext(self)?;
        let mut bytes_written = 0;
        bytes_written += FORMAT_VERSION.serialize(stream)?;
        bytes_written += self.parms_id().serialize(stream)?;
        bytes_written += (self.size() as u8).serialize(stream)?;
        bytes_written += self.scale().serialize(stream)?;
        bytes_written += self.noise_budget().serialize(stream)?;

        let degree = context.degree();
        for poly in self.polys() {
            for (component, modulus) in poly.chunks_exact(degree).zip(context.coeff_modulus()) {
                let limit = get_u64_limit(modulus.value());
                for &c in component {
                    bytes_written += write_u64_limited(stream, c, limit)?;
                }
            }
        }
        Ok(bytes_written)
    }

    fn deserialize<T: Read>(context: &HeContext, stream: &mut T) -> Result<Ciphertext> {
        let version = u8::deserialize(stream)?;
        if version != FORMAT_VERSION {
            return Err(Error::incompatible(format!("format version {} is not supported", version)));
        }
        let parms_id = ParmsID::deserialize(stream)?;
        if &parms_id != context.parms_id() {
            return Err(Error::incompatible("ciphertext was produced under another parameter set"));
        }
        let size = u8::deserialize(stream)? as usize;
        if !(util::HE_CIPHERTEXT_SIZE_MIN..=util::HE_CIPHERTEXT_SIZE_MAX).contains(&size) {
            return Err(Error::malformed(format!("component count {} is out of range", size)));
        }
        let scale = f64::deserialize(stream)?;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::malformed(format!("scale {} is not a positive finite number", scale)));
        }
        let noise_budget = u32::deserialize(stream)?;

        let degree = context.degree();
        let poly_len = context.ring().poly_len();
        let mut data = vec![0; size * poly_len];
        for poly in data.chunks_exact_mut(poly_len) {
            for (component, modulus) in poly.chunks_exact_mut(degree).zip(context.coeff_modulus()) {
                let limit = get_u64_limit(modulus.value());
                for c in component.iter_mut() {
                    *c = read_u64_limited(stream, limit)?;
                    if *c >= modulus.value() {
                        return Err(Error::malformed("coefficient is not reduced modulo its prime"));
                    }
                }
            }
        }
        Ok(Ciphertext::new(parms_id, size, context.coeff_modulus_size(), degree, scale, noise_budget, data))
    }

    fn serialized_size(&self, context: &HeContext) -> usize {
        HEADER_SIZE + data_size(context, self.size())
    }

}

/// A `u32` count followed by every item behind its `u32` length.
fn serialize_items<I: SerializableWithHeContext, T: Write>(items: &[I], context: &HeContext, stream: &mut T) -> Result<usize> {
    let count = u32::try_from(items.len())
        .map_err(|_| Error::invalid_parameters("too many items for one batch"))?;
    let mut bytes_written = count.serialize(stream)?;
    for item in items {
        let len = u32::try_from(item.serialized_size(context))
            .map_err(|_| Error::invalid_parameters("item is too large for one batch"))?;
        bytes_written += len.serialize(stream)?;
        bytes_written += item.serialize(context, stream)?;
    }
    Ok(bytes_written)
}

fn items_serialized_size<I: SerializableWithHeContext>(items: &[I], context: &HeContext) -> usize {
    4 + items.iter().map(|item| 4 + item.serialized_size(context)).sum::<usize>()
}

impl<I: SerializableWithHeContext> SerializableWithHeContext for Vec<I> {

    fn serialize<T: Write>(&self, context: &HeContext, stream: &mut T) -> Result<usize> {
        serialize_items(self, context, stream)
    }

    fn deserialize<T: Read>(context: &HeContext, stream: &mut T) -> Result<Vec<I>> {
        let count = u32::deserialize(stream)?;
        let mut ret = Vec::new();
        for _ in 0..count {
            let len = u32::deserialize(stream)? as u64;
            let mut item_stream = stream.by_ref().take(len);
            ret.push(I::deserialize(context, &mut item_stream)?);
            if item_stream.limit() != 0 {
                return Err(Error::malformed("length prefix does not match the item"));
            }
        }
        Ok(ret)
    }

    fn serialized_size(&self, context: &HeContext) -> usize {
        items_serialized_size(self, context)
    }

}

fn ensure_consumed(rest: &[u8]) -> Result<()> {
    if !rest.is_empty() {
        return Err(Error::malformed(format!("{} trailing bytes", rest.len())));
    }
    Ok(())
}

/// Serializes one ciphertext into a fresh buffer.
pub fn serialize(encrypted: &Ciphertext, context: &HeContext) -> Result<Vec<u8>> {
    let mut stream = Vec::with_capacity(encrypted.serialized_size(context));
    encrypted.serialize(context, &mut stream)?;
    Ok(stream)
}

/// Rebuilds a ciphertext written by [serialize]. The whole buffer must be consumed.
pub fn deserialize(bytes: &[u8], context: &HeContext) -> Result<Ciphertext> {
    let mut stream = bytes;
    let ret = Ciphertext::deserialize(context, &mut stream)?;
    ensure_consumed(stream)?;
    Ok(ret)
}

/// Serializes several ciphertexts with a count and per-item length prefixes.
pub fn serialize_batch(ciphertexts: &[Ciphertext], context: &HeContext) -> Result<Vec<u8>> {
    let mut stream = Vec::with_capacity(items_serialized_size(ciphertexts, context));
    serialize_items(ciphertexts, context, &mut stream)?;
    Ok(stream)
}

/// Inverse of [serialize_batch].
pub fn deserialize_batch(bytes: &[u8], context: &HeContext) -> Result<Vec<Ciphertext>> {
    let mut stream = bytes;
    let ret = Vec::<Ciphertext>::deserialize(context, &mut stream)?;
    ensure_consumed(stream)?;
    Ok(ret)
}

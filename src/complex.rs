use num_complex::Complex;
use num_traits::AsPrimitive;

/// The type of raw channel data out of the beamformer
pub type ComplexByte = Complex<i8>;

/// What we do the maths in
pub type Complex32 = Complex<f32>;

/// Interpret interleaved `[re, im, re, im, ..]` values as complex samples.
/// A trailing odd value is ignored.
pub fn interleaved<T>(values: &[T]) -> impl Iterator<Item = Complex<T>> + '_
where
    T: Copy,
{
    values.chunks_exact(2).map(|pair| Complex::new(pair[0], pair[1]))
}

/// Widen a complex byte into floating point, without scaling
pub fn widen<T: AsPrimitive<f32>>(c: Complex<T>) -> Complex32 {
    Complex::new(c.re.as_(), c.im.as_())
}

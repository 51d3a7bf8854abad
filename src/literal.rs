//! Literal tensor values embedded in constant nodes.
//!
//! This is the only place the crate touches array data: the input normalizer
//! needs the element type and shape of a literal, and an explicit dtype
//! override needs a cast.

use crate::dtype::{DType, DTypeError, DTypeOfPrimitive};
use crate::shape::Shape;
use half::{bf16, f16};
use ndarray::{ArcArray, Array, Dimension, IxDyn};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, thiserror::Error)]
pub enum LiteralError {
    #[error(transparent)]
    ShapeError(#[from] ndarray::ShapeError),
    #[error(transparent)]
    DTypeError(#[from] DTypeError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralTensor {
    F64(ArcArray<f64, IxDyn>),
    F32(ArcArray<f32, IxDyn>),
    BF16(ArcArray<bf16, IxDyn>),
    F16(ArcArray<f16, IxDyn>),
    U64(ArcArray<u64, IxDyn>),
    I64(ArcArray<i64, IxDyn>),
    U32(ArcArray<u32, IxDyn>),
    I32(ArcArray<i32, IxDyn>),
    U16(ArcArray<u16, IxDyn>),
    I16(ArcArray<i16, IxDyn>),
    U8(ArcArray<u8, IxDyn>),
    I8(ArcArray<i8, IxDyn>),
    BOOL(ArcArray<bool, IxDyn>),
}

/// Primitive element types that can be stored in a [`LiteralTensor`].
pub trait LiteralElement: Sized + Clone + DTypeOfPrimitive {
    fn wrap(value: ArcArray<Self, IxDyn>) -> LiteralTensor;
    fn inner(tensor: &LiteralTensor) -> Option<&ArcArray<Self, IxDyn>>;
    fn to_f64(&self) -> f64;
    fn from_f64(value: f64) -> Self;
    /// The exact value of an integer or boolean element, `None` for floats.
    fn to_i128(&self) -> Option<i128>;
}

macro_rules! impl_literal_element {
    ($t:ident, $variant:ident, $integral:expr) => {
        impl LiteralElement for $t {
            fn wrap(value: ArcArray<Self, IxDyn>) -> LiteralTensor {
                LiteralTensor::$variant(value)
            }
            fn inner(tensor: &LiteralTensor) -> Option<&ArcArray<Self, IxDyn>> {
                if let LiteralTensor::$variant(x) = tensor {
                    Some(x)
                } else {
                    None
                }
            }
            fn to_f64(&self) -> f64 {
                *self as f64
            }
            fn from_f64(value: f64) -> Self {
                value as $t
            }
            fn to_i128(&self) -> Option<i128> {
                $integral.then_some(*self as i128)
            }
        }
    };
}

impl_literal_element!(f64, F64, false);
impl_literal_element!(f32, F32, false);
impl_literal_element!(u64, U64, true);
impl_literal_element!(i64, I64, true);
impl_literal_element!(u32, U32, true);
impl_literal_element!(i32, I32, true);
impl_literal_element!(u16, U16, true);
impl_literal_element!(i16, I16, true);
impl_literal_element!(u8, U8, true);
impl_literal_element!(i8, I8, true);

impl LiteralElement for bf16 {
    fn wrap(value: ArcArray<Self, IxDyn>) -> LiteralTensor {
        LiteralTensor::BF16(value)
    }
    fn inner(tensor: &LiteralTensor) -> Option<&ArcArray<Self, IxDyn>> {
        if let LiteralTensor::BF16(x) = tensor { Some(x) } else { None }
    }
    fn to_f64(&self) -> f64 {
        bf16::to_f64(*self)
    }
    fn from_f64(value: f64) -> Self {
        bf16::from_f64(value)
    }
    fn to_i128(&self) -> Option<i128> {
        None
    }
}

impl LiteralElement for f16 {
    fn wrap(value: ArcArray<Self, IxDyn>) -> LiteralTensor {
        LiteralTensor::F16(value)
    }
    fn inner(tensor: &LiteralTensor) -> Option<&ArcArray<Self, IxDyn>> {
        if let LiteralTensor::F16(x) = tensor { Some(x) } else { None }
    }
    fn to_f64(&self) -> f64 {
        f16::to_f64(*self)
    }
    fn from_f64(value: f64) -> Self {
        f16::from_f64(value)
    }
    fn to_i128(&self) -> Option<i128> {
        None
    }
}

impl LiteralElement for bool {
    fn wrap(value: ArcArray<Self, IxDyn>) -> LiteralTensor {
        LiteralTensor::BOOL(value)
    }
    fn inner(tensor: &LiteralTensor) -> Option<&ArcArray<Self, IxDyn>> {
        if let LiteralTensor::BOOL(x) = tensor { Some(x) } else { None }
    }
    fn to_f64(&self) -> f64 {
        if *self { 1.0 } else { 0.0 }
    }
    fn from_f64(value: f64) -> Self {
        value != 0.0
    }
    fn to_i128(&self) -> Option<i128> {
        Some(*self as i128)
    }
}

macro_rules! map_literal {
    ($value:expr, $x:ident => $body:expr) => {
        match $value {
            LiteralTensor::F64($x) => $body,
            LiteralTensor::F32($x) => $body,
            LiteralTensor::BF16($x) => $body,
            LiteralTensor::F16($x) => $body,
            LiteralTensor::U64($x) => $body,
            LiteralTensor::I64($x) => $body,
            LiteralTensor::U32($x) => $body,
            LiteralTensor::I32($x) => $body,
            LiteralTensor::U16($x) => $body,
            LiteralTensor::I16($x) => $body,
            LiteralTensor::U8($x) => $body,
            LiteralTensor::I8($x) => $body,
            LiteralTensor::BOOL($x) => $body,
        }
    };
}

fn cast_array<S: LiteralElement, T: LiteralElement>(x: &ArcArray<S, IxDyn>) -> LiteralTensor {
    T::wrap(x.map(|v| T::from_f64(v.to_f64())).into_shared())
}

fn cast_to<T: LiteralElement>(value: &LiteralTensor) -> LiteralTensor {
    map_literal!(value, x => cast_array::<_, T>(x))
}

#[derive(Debug, Clone, Copy)]
enum ExactValue {
    Int(i128),
    Float(f64),
}

impl ExactValue {
    fn of<T: LiteralElement>(value: &T) -> Self {
        match value.to_i128() {
            Some(x) => ExactValue::Int(x),
            None => ExactValue::Float(value.to_f64()),
        }
    }

    fn same(self, other: ExactValue) -> bool {
        match (self, other) {
            (ExactValue::Int(a), ExactValue::Int(b)) => a == b,
            (ExactValue::Float(a), ExactValue::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (ExactValue::Int(i), ExactValue::Float(f)) | (ExactValue::Float(f), ExactValue::Int(i)) => {
                // integral f64 below 2^127 in magnitude converts to i128 exactly
                f.fract() == 0.0 && f.abs() < 2f64.powi(127) && f as i128 == i
            }
        }
    }
}

impl LiteralTensor {
    pub fn scalar<T: LiteralElement>(value: T) -> Self {
        T::wrap(ArcArray::from_elem(IxDyn(&[]), value))
    }

    pub fn from_vec<T: LiteralElement>(value: Vec<T>) -> Self {
        T::wrap(ArcArray::from_vec(value).into_dyn())
    }

    pub fn from_vec_shape<T: LiteralElement>(value: Vec<T>, shape: &[usize]) -> Result<Self, LiteralError> {
        Ok(T::wrap(ArcArray::from_shape_vec(IxDyn(shape), value)?))
    }

    pub fn dtype(&self) -> DType {
        match self {
            LiteralTensor::F64(_) => DType::F64,
            LiteralTensor::F32(_) => DType::F32,
            LiteralTensor::BF16(_) => DType::BF16,
            LiteralTensor::F16(_) => DType::F16,
            LiteralTensor::U64(_) => DType::U64,
            LiteralTensor::I64(_) => DType::I64,
            LiteralTensor::U32(_) => DType::U32,
            LiteralTensor::I32(_) => DType::I32,
            LiteralTensor::U16(_) => DType::U16,
            LiteralTensor::I16(_) => DType::I16,
            LiteralTensor::U8(_) => DType::U8,
            LiteralTensor::I8(_) => DType::I8,
            LiteralTensor::BOOL(_) => DType::BOOL,
        }
    }

    pub fn dims(&self) -> Vec<usize> {
        map_literal!(self, x => x.shape().to_vec())
    }

    pub fn shape(&self) -> Shape {
        Shape::from(self.dims().as_slice())
    }

    pub fn rank(&self) -> usize {
        map_literal!(self, x => x.ndim())
    }

    pub fn len(&self) -> usize {
        map_literal!(self, x => x.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_inner<T: LiteralElement>(&self) -> Result<&ArcArray<T, IxDyn>, DTypeError> {
        T::inner(self).ok_or(DTypeError::UnsupportedCast(self.dtype(), T::DTYPE))
    }

    /// Element-wise conversion to another element type. Values pass through
    /// `f64`, so integer casts saturate the way `as` does.
    pub fn cast(&self, dtype: DType) -> Self {
        if dtype == self.dtype() {
            return self.clone();
        }
        match dtype {
            DType::F64 => cast_to::<f64>(self),
            DType::F32 => cast_to::<f32>(self),
            DType::BF16 => cast_to::<bf16>(self),
            DType::F16 => cast_to::<f16>(self),
            DType::U64 => cast_to::<u64>(self),
            DType::I64 => cast_to::<i64>(self),
            DType::U32 => cast_to::<u32>(self),
            DType::I32 => cast_to::<i32>(self),
            DType::U16 => cast_to::<u16>(self),
            DType::I16 => cast_to::<i16>(self),
            DType::U8 => cast_to::<u8>(self),
            DType::I8 => cast_to::<i8>(self),
            DType::BOOL => cast_to::<bool>(self),
        }
    }

    /// Cast that only succeeds when every element keeps its exact value.
    pub fn cast_exact(&self, dtype: DType) -> Option<Self> {
        let cast = self.cast(dtype);
        let before = self.exact_values();
        let after = cast.exact_values();
        before.iter().zip(after).all(|(a, b)| a.same(b)).then_some(cast)
    }

    fn exact_values(&self) -> Vec<ExactValue> {
        map_literal!(self, x => x.iter().map(ExactValue::of).collect())
    }

    /// Flattened values as `f64`, in logical (row-major) order.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        map_literal!(self, x => x.iter().map(|v| v.to_f64()).collect())
    }
}

impl Display for LiteralTensor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        map_literal!(self, x => x.fmt(f))
    }
}

impl<T: LiteralElement, D: Dimension> From<Array<T, D>> for LiteralTensor {
    fn from(value: Array<T, D>) -> Self {
        T::wrap(value.into_dyn().into_shared())
    }
}

impl<T: LiteralElement, D: Dimension> From<ArcArray<T, D>> for LiteralTensor {
    fn from(value: ArcArray<T, D>) -> Self {
        T::wrap(value.into_dyn())
    }
}

impl<T: LiteralElement> From<Vec<T>> for LiteralTensor {
    fn from(value: Vec<T>) -> Self {
        LiteralTensor::from_vec(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_literal() {
        let x = LiteralTensor::scalar(3i64);
        assert_eq!(x.dtype(), DType::I64);
        assert_eq!(x.rank(), 0);
        assert_eq!(x.shape(), Shape::scalar());
        assert_eq!(x.to_f64_vec(), vec![3.0]);
    }

    #[test]
    fn test_from_ndarray_keeps_shape() {
        let x = LiteralTensor::from(ndarray::arr2(&[[1.0f32, 2.0], [3.0, 4.0]]));
        assert_eq!(x.dtype(), DType::F32);
        assert_eq!(x.dims(), vec![2, 2]);
        assert_eq!(x.to_f64_vec(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_cast() {
        let x = LiteralTensor::from(vec![1.5f32, -2.0, 0.0]);
        let y = x.cast(DType::I32);
        assert_eq!(y.dtype(), DType::I32);
        assert_eq!(y.as_inner::<i32>().unwrap().iter().copied().collect::<Vec<_>>(), vec![1, -2, 0]);
        let z = x.cast(DType::BOOL);
        assert_eq!(z.to_f64_vec(), vec![1.0, 1.0, 0.0]);
        assert_eq!(x.cast(DType::F32), x);
    }

    #[test]
    fn test_cast_exact() {
        let x = LiteralTensor::from(vec![1.0f64, -2.0, 0.0]);
        assert_eq!(x.cast_exact(DType::I32).map(|x| x.dtype()), Some(DType::I32));
        assert!(LiteralTensor::scalar(1.5f64).cast_exact(DType::I32).is_none());
        assert!(LiteralTensor::scalar(3_000_000_000i64).cast_exact(DType::I32).is_none());
        assert!(LiteralTensor::scalar(-1i64).cast_exact(DType::U64).is_none());
        assert!(LiteralTensor::scalar(i64::MAX).cast_exact(DType::U64).is_none());
        assert!(LiteralTensor::scalar(0.1f64).cast_exact(DType::F32).is_none());
        assert!(LiteralTensor::scalar(0.5f64).cast_exact(DType::F16).is_some());
        assert!(LiteralTensor::scalar(f64::NAN).cast_exact(DType::F32).is_some());
        assert!(LiteralTensor::scalar(2i64).cast_exact(DType::BOOL).is_none());
    }

    #[test]
    fn test_from_vec_shape_mismatch() {
        assert!(LiteralTensor::from_vec_shape(vec![1u8, 2, 3], &[2, 2]).is_err());
    }
}

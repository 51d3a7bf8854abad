use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest rank inferred from a shape-valued input.
pub const MAX_RANK: usize = 64;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ShapeError {
    #[error("Invalid dimension value {0}, expected a size or -1 for dynamic")]
    InvalidDimension(i64),
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    Known(u64),
    Dynamic,
}

impl Dimension {
    pub fn value(&self) -> Option<u64> {
        match self {
            Dimension::Known(x) => Some(*x),
            Dimension::Dynamic => None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Dimension::Dynamic)
    }

    /// `-1` is the conventional marker for a dynamic dimension.
    pub fn from_raw(value: i64) -> Result<Self, ShapeError> {
        match value {
            -1 => Ok(Dimension::Dynamic),
            x if x >= 0 => Ok(Dimension::Known(x as u64)),
            x => Err(ShapeError::InvalidDimension(x)),
        }
    }
}

impl From<u64> for Dimension {
    fn from(value: u64) -> Self {
        Dimension::Known(value)
    }
}

impl From<usize> for Dimension {
    fn from(value: usize) -> Self {
        Dimension::Known(value as u64)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Known(x) => write!(f, "{}", x),
            Dimension::Dynamic => write!(f, "?"),
        }
    }
}

/// Dimensionality of a tensor: either a known rank with possibly-dynamic
/// dimensions, or an unknown rank.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    Ranked(Vec<Dimension>),
    DynamicRank,
}

impl Shape {
    pub fn new(dims: impl IntoIterator<Item = Dimension>) -> Self {
        Shape::Ranked(dims.into_iter().collect())
    }

    pub fn scalar() -> Self {
        Shape::Ranked(vec![])
    }

    pub fn from_raw(dims: &[i64]) -> Result<Self, ShapeError> {
        let mut out = Vec::with_capacity(dims.len());
        for dim in dims {
            out.push(Dimension::from_raw(*dim)?);
        }
        Ok(Shape::Ranked(out))
    }

    /// A shape of the given rank with every dimension dynamic.
    pub fn dynamic_of_rank(rank: usize) -> Self {
        Shape::Ranked(vec![Dimension::Dynamic; rank])
    }

    pub fn rank(&self) -> Option<usize> {
        match self {
            Shape::Ranked(dims) => Some(dims.len()),
            Shape::DynamicRank => None,
        }
    }

    pub fn dims(&self) -> Option<&[Dimension]> {
        match self {
            Shape::Ranked(dims) => Some(dims),
            Shape::DynamicRank => None,
        }
    }

    pub fn dim(&self, index: usize) -> Dimension {
        self.dims()
            .and_then(|dims| dims.get(index).copied())
            .unwrap_or(Dimension::Dynamic)
    }

    pub fn is_static(&self) -> bool {
        match self {
            Shape::Ranked(dims) => dims.iter().all(|x| !x.is_dynamic()),
            Shape::DynamicRank => false,
        }
    }

    pub fn resolve(&self) -> Option<Vec<u64>> {
        self.dims()?.iter().map(|x| x.value()).collect()
    }

    /// `None` for dynamic shapes and for element counts beyond `u64`.
    pub fn num_elements(&self) -> Option<u64> {
        self.resolve()?.iter().try_fold(1u64, |acc, x| acc.checked_mul(*x))
    }
}

impl From<&[usize]> for Shape {
    fn from(value: &[usize]) -> Self {
        Shape::new(value.iter().map(|x| Dimension::from(*x)))
    }
}

impl From<Vec<u64>> for Shape {
    fn from(value: Vec<u64>) -> Self {
        Shape::new(value.into_iter().map(Dimension::Known))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Ranked(dims) => write!(
                f,
                "[{}]",
                dims.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(",")
            ),
            Shape::DynamicRank => write!(f, "[...]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_dims() {
        let shape = Shape::from_raw(&[2, -1, 4]).unwrap();
        assert_eq!(shape.rank(), Some(3));
        assert_eq!(shape.dim(1), Dimension::Dynamic);
        assert!(!shape.is_static());
        assert_eq!(shape.to_string(), "[2,?,4]");
        assert!(matches!(Shape::from_raw(&[3, -2]), Err(ShapeError::InvalidDimension(-2))));
    }

    #[test]
    fn test_num_elements() {
        assert_eq!(Shape::from(vec![2, 3, 4]).num_elements(), Some(24));
        assert_eq!(Shape::scalar().num_elements(), Some(1));
        assert_eq!(Shape::DynamicRank.num_elements(), None);
        assert_eq!(Shape::from_raw(&[i64::MAX, 3]).unwrap().num_elements(), None);
    }
}

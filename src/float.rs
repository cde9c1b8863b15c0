use std::fmt::{Debug, Display};

use num_traits::{Float as NumFloat, FloatConst, FromPrimitive};

/// Marker trait for base floating-point types (`f32`, `f64`).
///
/// Bundles the numeric and utility traits needed throughout trisolve.
/// Only primitive float types implement this, AD wrapper types do not.
pub trait Float:
    NumFloat + FloatConst + FromPrimitive + Copy + Send + Sync + Default + Debug + Display + 'static
{
    /// Short dtype tag, part of every compiled-program cache key.
    const DTYPE: &'static str;

    /// Lossy conversion used when reporting values in errors.
    #[inline]
    fn to_f64_lossy(self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }
}

impl Float for f32 {
    const DTYPE: &'static str = "f32";
}

impl Float for f64 {
    const DTYPE: &'static str = "f64";
}

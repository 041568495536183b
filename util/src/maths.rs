//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::{Float, FloatConst};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A piecewise linear lookup table.
///
/// Values between two breakpoints are linearly interpolated. Values outside
/// the table are clamped to the first or last breakpoint, the table never
/// extrapolates.
#[derive(Debug, Clone, Default)]
pub struct InterpTable<T> {
    /// Breakpoints as (key, value) pairs, sorted by key.
    points: Vec<(T, T)>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T> InterpTable<T>
where
    T: Float
{
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Build a table from a set of breakpoints in any order.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (T, T)>
    {
        let mut table = Self::new();
        for (k, v) in points {
            table.put(k, v);
        }
        table
    }

    /// Insert a breakpoint, replacing any existing breakpoint with the same
    /// key.
    pub fn put(&mut self, key: T, value: T) {
        match self.points.iter().position(|p| p.0 >= key) {
            Some(i) if self.points[i].0 == key => self.points[i].1 = value,
            Some(i) => self.points.insert(i, (key, value)),
            None => self.points.push((key, value))
        }
    }

    /// Look up the value for `key`, or `None` if the table is empty or the
    /// key is NaN.
    pub fn get(&self, key: T) -> Option<T> {
        if key.is_nan() {
            return None
        }

        let first = self.points.first()?;
        let last = self.points.last()?;

        if key <= first.0 {
            return Some(first.1)
        }
        if key >= last.0 {
            return Some(last.1)
        }

        // Find the segment containing the key, guaranteed to exist as the
        // key is strictly inside the table.
        let upper = self.points.iter().position(|p| p.0 >= key)?;
        let (k0, v0) = self.points[upper - 1];
        let (k1, v1) = self.points[upper];

        Some(lin_map((k0, k1), (v0, v1), key))
    }

    /// The breakpoints of the table, sorted by key.
    pub fn points(&self) -> &[(T, T)] {
        &self.points
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Wrap an angle into the range (-pi, pi].
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float + FloatConst
{
    let pi_t = T::PI();
    let tau_t = pi_t + pi_t;

    let wrapped = pi_t - rem_euclid(pi_t - angle, tau_t);

    // rem_euclid may round to tau, which maps onto -pi
    if wrapped <= -pi_t {
        wrapped + tau_t
    }
    else {
        wrapped
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

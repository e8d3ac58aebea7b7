//! Atomic metric cells
//!
//! A [`Metric<T>`] is a named numeric cell whose value is only ever touched
//! through atomics. The numeric kind is fixed by `T`, which must implement the
//! sealed [`Numeric`] trait; anything else is rejected at compile time.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};
use std::sync::atomic::{
    AtomicI32, AtomicI64, AtomicIsize, AtomicU32, AtomicU64, AtomicUsize, Ordering,
};

/// Formatting family of a metric value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Plain decimal
    Integer,
    /// Fixed-point, three decimals
    Float,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Integer => f.write_str("integer"),
            MetricKind::Float => f.write_str("float"),
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Numeric kinds a [`Metric`] can hold.
///
/// Sealed: the supported set is `i32`, `i64`, `isize`, `u32`, `u64`, `usize`,
/// `f32` and `f64`.
pub trait Numeric: Copy + Send + Sync + fmt::Debug + 'static + sealed::Sealed {
    /// Atomic storage for this kind
    type Atomic: Send + Sync;

    /// Value a drain resets to
    const ZERO: Self;

    /// Formatting family
    const KIND: MetricKind;

    #[doc(hidden)]
    fn new_atomic(value: Self) -> Self::Atomic;
    #[doc(hidden)]
    fn load(cell: &Self::Atomic) -> Self;
    #[doc(hidden)]
    fn store(cell: &Self::Atomic, value: Self);
    #[doc(hidden)]
    fn fetch_add(cell: &Self::Atomic, delta: Self) -> Self;
    #[doc(hidden)]
    fn swap(cell: &Self::Atomic, value: Self) -> Self;

    /// Append the kind-specific rendering of `self` to `out`.
    fn write_value(self, out: &mut String);
}

macro_rules! impl_integer {
    ($($ty:ty => $atomic:ty),* $(,)?) => {$(
        impl sealed::Sealed for $ty {}

        impl Numeric for $ty {
            type Atomic = $atomic;
            const ZERO: Self = 0;
            const KIND: MetricKind = MetricKind::Integer;

            #[inline]
            fn new_atomic(value: Self) -> Self::Atomic {
                <$atomic>::new(value)
            }

            #[inline]
            fn load(cell: &Self::Atomic) -> Self {
                cell.load(Ordering::Relaxed)
            }

            #[inline]
            fn store(cell: &Self::Atomic, value: Self) {
                cell.store(value, Ordering::Relaxed);
            }

            #[inline]
            fn fetch_add(cell: &Self::Atomic, delta: Self) -> Self {
                cell.fetch_add(delta, Ordering::Relaxed)
            }

            #[inline]
            fn swap(cell: &Self::Atomic, value: Self) -> Self {
                cell.swap(value, Ordering::Relaxed)
            }

            fn write_value(self, out: &mut String) {
                let _ = write!(out, "{}", self);
            }
        }
    )*};
}

impl_integer! {
    i32 => AtomicI32,
    i64 => AtomicI64,
    isize => AtomicIsize,
    u32 => AtomicU32,
    u64 => AtomicU64,
    usize => AtomicUsize,
}

// Floats live in an unsigned atomic of the same width as their bit pattern.
// `add` is a CAS loop since there is no native float fetch-add.
macro_rules! impl_float {
    ($($ty:ty => $atomic:ty),* $(,)?) => {$(
        impl sealed::Sealed for $ty {}

        impl Numeric for $ty {
            type Atomic = $atomic;
            const ZERO: Self = 0.0;
            const KIND: MetricKind = MetricKind::Float;

            #[inline]
            fn new_atomic(value: Self) -> Self::Atomic {
                <$atomic>::new(value.to_bits())
            }

            #[inline]
            fn load(cell: &Self::Atomic) -> Self {
                <$ty>::from_bits(cell.load(Ordering::Relaxed))
            }

            #[inline]
            fn store(cell: &Self::Atomic, value: Self) {
                cell.store(value.to_bits(), Ordering::Relaxed);
            }

            #[inline]
            fn fetch_add(cell: &Self::Atomic, delta: Self) -> Self {
                let mut current = cell.load(Ordering::Relaxed);
                loop {
                    let next = (<$ty>::from_bits(current) + delta).to_bits();
                    match cell.compare_exchange_weak(
                        current,
                        next,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        Ok(prev) => return <$ty>::from_bits(prev),
                        Err(actual) => current = actual,
                    }
                }
            }

            #[inline]
            fn swap(cell: &Self::Atomic, value: Self) -> Self {
                <$ty>::from_bits(cell.swap(value.to_bits(), Ordering::Relaxed))
            }

            fn write_value(self, out: &mut String) {
                let _ = write!(out, "{:.3}", self);
            }
        }
    )*};
}

impl_float! {
    f32 => AtomicU32,
    f64 => AtomicU64,
}

/// A named, atomically mutable numeric cell.
///
/// Handles are normally obtained from
/// [`MetricRegistry::create_metric`](crate::MetricRegistry::create_metric)
/// and shared freely across threads. Only numeric kinds are accepted:
///
/// ```compile_fail
/// use tally_metrics::MetricRegistry;
///
/// let registry = MetricRegistry::new();
/// let name = registry.create_metric::<String>("name");
/// ```
///
/// ```compile_fail
/// use tally_metrics::MetricRegistry;
///
/// let registry = MetricRegistry::new();
/// let requests = registry.create_metric::<u64>("requests");
/// requests.add(1.5);
/// ```
pub struct Metric<T: Numeric> {
    name: String,
    value: T::Atomic,
}

impl<T: Numeric> Metric<T> {
    /// Create a detached metric.
    ///
    /// A detached metric is not part of any snapshot; use the registry to
    /// create metrics that should be drained.
    pub fn new(name: impl Into<String>, initial: T) -> Self {
        Self {
            name: name.into(),
            value: T::new_atomic(initial),
        }
    }

    /// Replace the current value
    #[inline]
    pub fn set(&self, value: T) {
        T::store(&self.value, value);
    }

    /// Atomically add `delta` to the current value.
    ///
    /// Integer kinds wrap on overflow.
    #[inline]
    pub fn add(&self, delta: T) {
        T::fetch_add(&self.value, delta);
    }

    /// Current value without resetting it
    #[inline]
    pub fn get(&self) -> T {
        T::load(&self.value)
    }

    /// Atomically swap the value with zero, returning what was there.
    #[inline]
    pub fn get_and_reset(&self) -> T {
        T::swap(&self.value, T::ZERO)
    }

    /// Atomically swap the value with zero and render what was there.
    pub fn get_and_reset_as_string(&self) -> String {
        let mut out = String::new();
        self.get_and_reset().write_value(&mut out);
        out
    }

    /// Metric name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Formatting family
    pub fn kind(&self) -> MetricKind {
        T::KIND
    }
}

impl<T: Numeric> fmt::Debug for Metric<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metric")
            .field("name", &self.name)
            .field("kind", &T::KIND)
            .field("value", &self.get())
            .finish()
    }
}

/// Type-erased view of a [`Metric`], used by the registry to hold cells of
/// different numeric kinds in one ordered collection.
pub trait DynMetric: Send + Sync {
    /// Metric name
    fn name(&self) -> &str;

    /// Formatting family
    fn kind(&self) -> MetricKind;

    /// Atomically reset to zero and append the previous value to `out`.
    fn drain_into(&self, out: &mut String);

    /// Atomically reset to zero and render the previous value.
    fn get_and_reset_as_string(&self) -> String {
        let mut out = String::new();
        self.drain_into(&mut out);
        out
    }
}

impl<T: Numeric> DynMetric for Metric<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> MetricKind {
        T::KIND
    }

    fn drain_into(&self, out: &mut String) {
        self.get_and_reset().write_value(out);
    }
}

//! Build statistics with atomic counters.
//!
//! This module provides [`BuildStats`] for counting work as concurrent
//! dispatch tasks finish, and [`StatsSnapshot`] for point-in-time views.
//!
//! # Thread Safety
//!
//! All counters use [`AtomicU64`] with [`Relaxed`](std::sync::atomic::Ordering::Relaxed)
//! ordering. Statistics are for reporting and don't require strict ordering.
//!
//! # Examples
//!
//! ```
//! use rp_build::BuildStats;
//!
//! let stats = BuildStats::new();
//! stats.increment_compiled();
//! stats.increment_compile_failures();
//!
//! let snapshot = stats.snapshot();
//! assert_eq!(snapshot.compiled, 1);
//! assert_eq!(snapshot.file_failures(), 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters for one `process()` run.
#[derive(Debug, Default)]
pub struct BuildStats {
    /// Output files compiled.
    compiled: AtomicU64,
    /// Files whose compilation failed.
    compile_failures: AtomicU64,
    /// Files copied verbatim.
    copied: AtomicU64,
    /// Declaration files written.
    declarations: AtomicU64,
    /// Files whose declaration emission failed.
    declaration_failures: AtomicU64,
    /// Formats that completed.
    formats_completed: AtomicU64,
    /// Formats that failed.
    formats_failed: AtomicU64,
}

impl BuildStats {
    /// Creates a new [`BuildStats`] with all counters at zero.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the compiled files counter.
    #[inline]
    pub fn increment_compiled(&self) {
        self.compiled.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the compile failure counter.
    #[inline]
    pub fn increment_compile_failures(&self) {
        self.compile_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the copied files counter.
    #[inline]
    pub fn increment_copied(&self) {
        self.copied.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds to the written declarations counter.
    #[inline]
    pub fn add_declarations(&self, count: u64) {
        self.declarations.fetch_add(count, Ordering::Relaxed);
    }

    /// Adds to the declaration failure counter.
    #[inline]
    pub fn add_declaration_failures(&self, count: u64) {
        self.declaration_failures.fetch_add(count, Ordering::Relaxed);
    }

    /// Increments the completed formats counter.
    #[inline]
    pub fn increment_formats_completed(&self) {
        self.formats_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the failed formats counter.
    #[inline]
    pub fn increment_formats_failed(&self) {
        self.formats_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of all statistics.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            compiled: self.compiled.load(Ordering::Relaxed),
            compile_failures: self.compile_failures.load(Ordering::Relaxed),
            copied: self.copied.load(Ordering::Relaxed),
            declarations: self.declarations.load(Ordering::Relaxed),
            declaration_failures: self.declaration_failures.load(Ordering::Relaxed),
            formats_completed: self.formats_completed.load(Ordering::Relaxed),
            formats_failed: self.formats_failed.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of build statistics.
///
/// # Examples
///
/// ```
/// use rp_build::StatsSnapshot;
///
/// let snap = StatsSnapshot {
///     compiled: 18,
///     compile_failures: 2,
///     ..Default::default()
/// };
///
/// assert!(!snap.is_clean());
/// assert!((snap.success_rate() - 90.0).abs() < 0.1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// Output files compiled.
    pub compiled: u64,
    /// Files whose compilation failed.
    pub compile_failures: u64,
    /// Files copied verbatim.
    pub copied: u64,
    /// Declaration files written.
    pub declarations: u64,
    /// Files whose declaration emission failed.
    pub declaration_failures: u64,
    /// Formats that completed.
    pub formats_completed: u64,
    /// Formats that failed.
    pub formats_failed: u64,
}

impl StatsSnapshot {
    /// Returns the number of per-file failures (compile and declaration).
    #[inline]
    #[must_use]
    pub const fn file_failures(&self) -> u64 {
        self.compile_failures + self.declaration_failures
    }

    /// Returns `true` if nothing failed.
    #[inline]
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.file_failures() == 0 && self.formats_failed == 0
    }

    /// Returns the compile success rate as a percentage.
    ///
    /// Returns 100.0 if nothing was compiled.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Acceptable for statistics display
    pub fn success_rate(&self) -> f64 {
        let attempted = self.compiled + self.compile_failures;
        if attempted == 0 {
            return 100.0;
        }

        (self.compiled as f64 / attempted as f64) * 100.0
    }
}

//! Compilation operator and its program cache.
//!
//! [`jit`] wraps a [`ScalarFn`] so that its first call at a given input
//! signature records a [`BytecodeTape`]; later calls replay the cached tape.
//! [`jit_grad`] compiles the gradient itself: the recorded tape is turned into
//! an adjoint program whose plain forward replay yields `∇f`.
//!
//! Compiled programs live in an explicit [`JitCache`]. Nothing is global:
//! callers own the cache, share it by reference and invalidate it with
//! [`JitCache::clear`].

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::api::{record, ScalarFn};
use crate::bytecode_tape::{BtapeThreadLocal, BytecodeTape};
use crate::error::Result;
use crate::float::Float;

static NEXT_FUNCTION_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of a compiled function, unique per [`jit`] / [`jit_grad`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(u64);

impl FunctionId {
    fn fresh() -> Self {
        FunctionId(NEXT_FUNCTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Which program a cache entry holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transform {
    /// The function itself.
    Primal,
    /// The adjoint program computing its gradient.
    Adjoint,
}

/// Input shape and dtype a program was compiled for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    pub len: usize,
    pub dtype: &'static str,
}

impl Signature {
    pub fn of<F: Float>(x: &[F]) -> Self {
        Signature {
            len: x.len(),
            dtype: F::DTYPE,
        }
    }
}

/// Cache key: function identity, transform and input signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub function: FunctionId,
    pub transform: Transform,
    pub signature: Signature,
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub compilations: usize,
    pub entries: usize,
    pub invalidations: usize,
}

/// Compiled programs keyed by [`CacheKey`].
///
/// `Sync`: lookups take a read lock and programs are handed out as
/// `Arc<BytecodeTape<F>>`, replayed through `&self`.
pub struct JitCache<F: Float> {
    programs: RwLock<HashMap<CacheKey, Arc<BytecodeTape<F>>>>,
    stats: RwLock<CacheStats>,
}

impl<F: Float> Default for JitCache<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> std::fmt::Debug for JitCache<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JitCache")
            .field("stats", &self.stats())
            .finish()
    }
}

impl<F: Float> JitCache<F> {
    pub fn new() -> Self {
        JitCache {
            programs: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// Number of cached programs.
    pub fn len(&self) -> usize {
        self.programs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> CacheStats {
        *self.stats.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_stats(&self, f: impl FnOnce(&mut CacheStats)) {
        f(&mut self.stats.write().unwrap_or_else(PoisonError::into_inner));
    }

    /// Look up a program, counting the hit or miss.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<BytecodeTape<F>>> {
        let found = self
            .programs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        self.update_stats(|s| {
            if found.is_some() {
                s.hits += 1;
            } else {
                s.misses += 1;
            }
        });
        found
    }

    /// Return the cached program for `key`, compiling it on a miss.
    ///
    /// Compilation runs without holding the lock. A failed compilation
    /// leaves the cache untouched and its error is returned as is.
    pub fn get_or_compile(
        &self,
        key: CacheKey,
        compile: impl FnOnce() -> Result<BytecodeTape<F>>,
    ) -> Result<Arc<BytecodeTape<F>>> {
        if let Some(program) = self.get(&key) {
            log::trace!("jit cache hit: {key:?}");
            return Ok(program);
        }

        let program = Arc::new(compile()?);
        log::debug!(
            "compiled {:?} program for {:?}: {} ops, {} pivot guards",
            key.transform,
            key.signature,
            program.len(),
            program.guards().len()
        );

        let mut programs = self
            .programs
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // Another thread may have compiled the same key meanwhile; its
        // program wins and this compilation is discarded uncounted.
        let (program, inserted) = match programs.entry(key) {
            Entry::Occupied(slot) => (slot.get().clone(), false),
            Entry::Vacant(slot) => (slot.insert(program).clone(), true),
        };
        let entries = programs.len();
        drop(programs);

        self.update_stats(|s| {
            if inserted {
                s.compilations += 1;
            }
            s.entries = entries;
        });
        Ok(program)
    }

    /// Drop every compiled program.
    ///
    /// Counters other than `entries` are kept so that a benchmark can read
    /// them after invalidating.
    pub fn clear(&self) {
        let removed = {
            let mut programs = self
                .programs
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let removed = programs.len();
            programs.clear();
            removed
        };
        log::debug!("jit cache cleared ({removed} programs)");
        self.update_stats(|s| {
            s.invalidations += 1;
            s.entries = 0;
        });
    }

    /// Reset every counter to zero without touching the programs.
    pub fn reset_stats(&self) {
        let entries = self.len();
        self.update_stats(|s| {
            *s = CacheStats {
                entries,
                ..CacheStats::default()
            };
        });
    }
}

/// A compiled scalar function. See [`jit`].
pub struct Jit<'c, F: Float, G> {
    func: G,
    id: FunctionId,
    cache: &'c JitCache<F>,
}

/// Compile `func`: each input signature is traced once, then replayed.
///
/// ```
/// use trisolve::{jit, JitCache, NormObjective};
///
/// let cache = JitCache::new();
/// let f = jit(NormObjective::<f64>::default(), &cache);
/// let g = f.grad(&[0.1, 0.2, 0.3]).unwrap();
/// assert_eq!(g.len(), 3);
/// assert_eq!(cache.stats().compilations, 1);
/// ```
pub fn jit<F, G>(func: G, cache: &JitCache<F>) -> Jit<'_, F, G>
where
    F: Float + BtapeThreadLocal,
    G: ScalarFn<F>,
{
    Jit {
        func,
        id: FunctionId::fresh(),
        cache,
    }
}

impl<F, G> Jit<'_, F, G>
where
    F: Float + BtapeThreadLocal,
    G: ScalarFn<F>,
{
    pub fn id(&self) -> FunctionId {
        self.id
    }

    /// The compiled primal program for inputs shaped like `x`.
    pub fn program(&self, x: &[F]) -> Result<Arc<BytecodeTape<F>>> {
        let key = CacheKey {
            function: self.id,
            transform: Transform::Primal,
            signature: Signature::of(x),
        };
        self.cache
            .get_or_compile(key, || record(|v| self.func.eval(v), x).map(|(tape, _)| tape))
    }

    /// Evaluate the compiled function.
    pub fn call(&self, x: &[F]) -> Result<F> {
        self.program(x)?.eval_scalar(x)
    }

    /// Value and gradient: replay the compiled program, then sweep it in
    /// reverse.
    pub fn value_and_grad(&self, x: &[F]) -> Result<(F, Vec<F>)> {
        self.program(x)?.value_and_gradient(x)
    }

    pub fn grad(&self, x: &[F]) -> Result<Vec<F>> {
        self.program(x)?.gradient(x)
    }
}

/// A compiled gradient. See [`jit_grad`].
pub struct JitGrad<'c, F: Float, G> {
    func: G,
    id: FunctionId,
    cache: &'c JitCache<F>,
}

/// Compile the gradient of `func`.
///
/// The primal is traced once per signature and transformed into an adjoint
/// program; calls only replay that program forward.
pub fn jit_grad<F, G>(func: G, cache: &JitCache<F>) -> JitGrad<'_, F, G>
where
    F: Float + BtapeThreadLocal,
    G: ScalarFn<F>,
{
    JitGrad {
        func,
        id: FunctionId::fresh(),
        cache,
    }
}

impl<F, G> JitGrad<'_, F, G>
where
    F: Float + BtapeThreadLocal,
    G: ScalarFn<F>,
{
    pub fn id(&self) -> FunctionId {
        self.id
    }

    /// The compiled adjoint program for inputs shaped like `x`.
    pub fn program(&self, x: &[F]) -> Result<Arc<BytecodeTape<F>>> {
        let key = CacheKey {
            function: self.id,
            transform: Transform::Adjoint,
            signature: Signature::of(x),
        };
        self.cache.get_or_compile(key, || {
            let (primal, _) = record(|v| self.func.eval(v), x)?;
            primal.adjoint_program()
        })
    }

    /// Evaluate the compiled gradient at `x`.
    pub fn call(&self, x: &[F]) -> Result<Vec<F>> {
        self.program(x)?.eval(x)
    }
}

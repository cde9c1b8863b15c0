use std::cell::RefCell;
use std::marker::PhantomData;
use std::thread::LocalKey;

use crate::float::Float;

use super::BytecodeTape;

thread_local! {
    static BTAPES_F32: RefCell<Vec<BytecodeTape<f32>>> = const { RefCell::new(Vec::new()) };
    static BTAPES_F64: RefCell<Vec<BytecodeTape<f64>>> = const { RefCell::new(Vec::new()) };
}

/// Selects the thread-local stack of recording bytecode tapes for a float type.
pub trait BtapeThreadLocal: Float {
    fn btape_stack() -> &'static LocalKey<RefCell<Vec<BytecodeTape<Self>>>>;
}

impl BtapeThreadLocal for f32 {
    fn btape_stack() -> &'static LocalKey<RefCell<Vec<BytecodeTape<Self>>>> {
        &BTAPES_F32
    }
}

impl BtapeThreadLocal for f64 {
    fn btape_stack() -> &'static LocalKey<RefCell<Vec<BytecodeTape<Self>>>> {
        &BTAPES_F64
    }
}

/// Access the active bytecode tape for the current thread.
///
/// # Panics
///
/// Panics if no recording is in progress, i.e. a [`crate::BReverse`] value
/// is combined outside of [`crate::record`] or a compiled function's trace.
#[inline]
pub fn with_active_btape<F: BtapeThreadLocal, R>(f: impl FnOnce(&mut BytecodeTape<F>) -> R) -> R {
    F::btape_stack().with(|stack| {
        let mut stack = stack.borrow_mut();
        let tape = stack.last_mut().unwrap_or_else(|| {
            panic!("no active bytecode tape; use trisolve::record() or trisolve::jit()")
        });
        f(tape)
    })
}

/// RAII recording scope for a bytecode tape; see [`crate::tape::TapeScope`].
pub struct BtapeScope<F: BtapeThreadLocal> {
    finished: bool,
    _marker: PhantomData<*const F>,
}

impl<F: BtapeThreadLocal> BtapeScope<F> {
    /// Make `tape` the active bytecode tape until the scope ends.
    pub fn new(tape: BytecodeTape<F>) -> Self {
        F::btape_stack().with(|stack| stack.borrow_mut().push(tape));
        BtapeScope {
            finished: false,
            _marker: PhantomData,
        }
    }

    /// Close the scope and hand back the recorded tape.
    pub fn finish(mut self) -> BytecodeTape<F> {
        self.finished = true;
        Self::pop()
    }

    fn pop() -> BytecodeTape<F> {
        F::btape_stack().with(|stack| {
            stack
                .borrow_mut()
                .pop()
                .unwrap_or_else(|| panic!("bytecode tape stack underflow"))
        })
    }
}

impl<F: BtapeThreadLocal> Drop for BtapeScope<F> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = Self::pop();
        }
    }
}

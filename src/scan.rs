//! Sequential scan primitives.
//!
//! A scan threads a carry through a sequence, emitting one output per
//! element: `(carry, x) -> (carry', y)`. Both solver passes are scans, which
//! keeps every step a pure function of the previous carry and lets the AD
//! types record the recurrence without any in-place mutation.

/// Fold `xs` with `step`, collecting every emitted output.
///
/// Returns the final carry and the outputs in iteration order. To scan in
/// reverse, pass a reversed iterator and reverse the outputs afterwards.
pub fn scan<C, X, Y>(
    init: C,
    xs: impl IntoIterator<Item = X>,
    mut step: impl FnMut(C, X) -> (C, Y),
) -> (C, Vec<Y>) {
    let iter = xs.into_iter();
    let mut ys = Vec::with_capacity(iter.size_hint().0);
    let mut carry = init;
    for x in iter {
        let (next, y) = step(carry, x);
        carry = next;
        ys.push(y);
    }
    (carry, ys)
}

/// Fallible [`scan`]: stops at the first error and returns it, discarding
/// everything emitted so far.
pub fn try_scan<C, X, Y, E>(
    init: C,
    xs: impl IntoIterator<Item = X>,
    mut step: impl FnMut(C, X) -> Result<(C, Y), E>,
) -> Result<(C, Vec<Y>), E> {
    let iter = xs.into_iter();
    let mut ys = Vec::with_capacity(iter.size_hint().0);
    let mut carry = init;
    for x in iter {
        let (next, y) = step(carry, x)?;
        carry = next;
        ys.push(y);
    }
    Ok((carry, ys))
}

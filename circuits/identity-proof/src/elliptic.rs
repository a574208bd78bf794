//! Cubic curve circuit: knowledge of `x` with `y = x^3 + x + 5`.

use crate::{Assignment, CircuitError, Result};

/// Evaluate the curve at `x`, `None` on overflow.
pub fn evaluate(x: u64) -> Option<u64> {
    x.checked_pow(3)?.checked_add(x)?.checked_add(5)
}

pub fn assign(x: u64) -> Result<Assignment> {
    let y = evaluate(x)
        .ok_or_else(|| CircuitError::InvalidAssignment(format!("x = {x} overflows the curve")))?;
    Ok(Assignment::Elliptic { x, y })
}

pub(crate) fn is_satisfied(x: u64, y: u64) -> bool {
    evaluate(x) == Some(y)
}

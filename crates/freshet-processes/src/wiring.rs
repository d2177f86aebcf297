//! Connection wiring shared by the variant constructors.

use freshet_core::{ProcessError, SlotIndex, StateRegistry, StateVar, SvKind};
use freshet_process::{Connection, Connections};

/// Resolve a list of `(from, to)` pairs for `process`.
pub(crate) fn connect(
    registry: &StateRegistry,
    process: &str,
    pairs: &[(StateVar, StateVar)],
) -> Result<Connections, ProcessError> {
    pairs
        .iter()
        .map(|&(from, to)| Connection::resolve(registry, process, from, to))
        .collect()
}

/// Resolve a single slot for `process`.
pub(crate) fn slot(
    registry: &StateRegistry,
    process: &str,
    var: StateVar,
) -> Result<SlotIndex, ProcessError> {
    registry
        .resolve(var)
        .map_err(|e| ProcessError::registry(process, e))
}

/// Fail unless the registry holds at least `required` soil layers.
pub(crate) fn require_soil_layers(
    registry: &StateRegistry,
    process: &str,
    required: usize,
) -> Result<(), ProcessError> {
    let available = registry.layer_count(SvKind::Soil);
    if available < required {
        return Err(ProcessError::InsufficientSoilLayers {
            process: process.to_string(),
            required,
            available,
        });
    }
    Ok(())
}

/// Fail unless connection `index` ends in a slot of kind `expected`.
pub(crate) fn expect_sink(
    registry: &StateRegistry,
    process: &str,
    connections: &[Connection],
    index: usize,
    expected: SvKind,
) -> Result<(), ProcessError> {
    let Some(c) = connections.get(index) else {
        return Err(ProcessError::invalid(
            process,
            format!("missing connection {index}"),
        ));
    };
    match registry.var_of(c.to) {
        Some(var) if var.kind == expected => Ok(()),
        Some(found) => Err(ProcessError::UnexpectedStateVar {
            process: process.to_string(),
            connection: index,
            expected,
            found,
        }),
        None => Err(ProcessError::invalid(
            process,
            format!("connection {index} ends in unregistered slot {}", c.to),
        )),
    }
}

/// Fraction `stored / capacity` clamped to `[0, 1]`. A storage without
/// capacity counts as saturated.
#[inline]
pub(crate) fn saturation(stored: f64, capacity: f64) -> f64 {
    if capacity > 0.0 {
        (stored / capacity).clamp(0.0, 1.0)
    } else {
        1.0
    }
}

use std::collections::HashSet;

use common::{Instrument, InstrumentKind, Position};

/// Instruments the bot is allowed to trade at all.
///
/// With `currencies_only`, anything the broker does not classify as a
/// currency pair (CFDs, metals, ...) is dropped.
pub fn tradable_instruments(all: Vec<Instrument>, currencies_only: bool) -> Vec<Instrument> {
    all.into_iter()
        .filter(|i| !currencies_only || i.kind == InstrumentKind::Currency)
        .collect()
}

/// `all` minus every instrument that has an open position, keyed by name.
///
/// Keeps the relative order of `all` and drops repeated names, so each
/// instrument is evaluated at most once per cycle.
pub fn instruments_without_positions(all: &[Instrument], open_positions: &[Position]) -> Vec<Instrument> {
    let held: HashSet<&str> = open_positions.iter().map(|p| p.instrument.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(all.len());

    all.iter()
        .filter(|i| !held.contains(i.name.as_str()))
        .filter(|i| seen.insert(i.name.as_str()))
        .cloned()
        .collect()
}

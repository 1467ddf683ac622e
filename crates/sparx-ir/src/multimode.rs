//! Lifting relations into the `port × mode` product space and back.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{IrError, IrResult};
use crate::port::{is_mode_resolved, split_mode, with_mode};
use crate::sdict::SDict;

/// Whether every port of `s` carries a mode tag.
///
/// Returns `Ok(false)` for plain relations and an error when the two kinds
/// are mixed. A relation with no ports counts as plain.
pub fn is_multimode(s: &SDict) -> IrResult<bool> {
    let mut ports = s.ports();
    let Some(first) = ports.next() else {
        return Ok(false);
    };
    let resolved = is_mode_resolved(first);
    match ports.find(|p| is_mode_resolved(p) != resolved) {
        Some(p) => Err(IrError::MixedModes(p.to_string())),
        None => Ok(resolved),
    }
}

/// Every mode tag used by the ports of `s`.
pub fn modes_of(s: &SDict) -> BTreeSet<String> {
    s.ports()
        .filter_map(|p| split_mode(p).1.map(str::to_string))
        .collect()
}

/// Expand plain port names into `port@mode` for every mode.
pub fn expand_ports<S: AsRef<str>>(ports: &[String], modes: &[S]) -> Vec<String> {
    ports
        .iter()
        .flat_map(|p| modes.iter().map(move |m| with_mode(p, m.as_ref())))
        .collect()
}

/// Lift `s` into the product space over `modes`.
///
/// Plain relations are replicated on the mode diagonal with all cross-mode
/// entries zero. Relations that are already mode-resolved pass through
/// unchanged, but every mode they use must be one of `modes`.
pub fn multimode<S: AsRef<str>>(s: &SDict, modes: &[S]) -> IrResult<SDict> {
    if is_multimode(s)? {
        for port in s.ports() {
            let Some(mode) = split_mode(port).1 else {
                continue;
            };
            if !modes.iter().any(|m| m.as_ref() == mode) {
                return Err(IrError::UndeclaredMode {
                    port: port.to_string(),
                    mode: mode.to_string(),
                });
            }
        }
        return Ok(s.clone());
    }

    debug!("Lifting {} ports into {} modes", s.num_ports(), modes.len());
    let mut out = SDict::new();
    for mode in modes {
        let mode = mode.as_ref();
        for port in s.ports() {
            out.add_port(with_mode(port, mode));
        }
        for (p, q, v) in s.entries() {
            out.insert(with_mode(p, mode), with_mode(q, mode), v.clone());
        }
    }
    Ok(out)
}

/// Restrict a mode-resolved relation to a single mode.
///
/// Keeps only entries whose ports both carry `mode` and strips the tag.
/// Plain relations are returned unchanged.
pub fn singlemode(s: &SDict, mode: &str) -> IrResult<SDict> {
    if !is_multimode(s)? {
        return Ok(s.clone());
    }
    let strip = |port: &str| match split_mode(port) {
        (base, Some(m)) if m == mode => Some(base.to_string()),
        _ => None,
    };
    let mut out = SDict::new();
    for port in s.ports() {
        if let Some(base) = strip(port) {
            out.add_port(base);
        }
    }
    for (p, q, v) in s.entries() {
        if let (Some(p), Some(q)) = (strip(p), strip(q)) {
            out.insert(p, q, v.clone());
        }
    }
    Ok(out)
}

//! Reciprocal completion of sparse relations.

use crate::sdict::SDict;

/// Mirror every one-directional entry.
///
/// For each declared `(p, q) -> v` with no `(q, p)` entry, `(q, p) -> v` is
/// added. Pairs declared in both directions keep their values.
pub fn reciprocal(s: &SDict) -> SDict {
    let mut out = s.clone();
    for (p, q, v) in s.entries() {
        if !s.contains(q, p) {
            out.insert(q, p, v.clone());
        }
    }
    out
}

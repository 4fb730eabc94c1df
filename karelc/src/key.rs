//! Deterministic encoding of the Instance deduplication key described
//! in spec §4.5/§9: `(prototype.name, continuation.emitted_name|⊥,
//! hash(template_values ⊕ inherited_values))`, packed into the
//! `emitted_name` a TGT segment is addressed by.
//!
//! The original folds Python's built-in `hash()` into this name,
//! which is randomized per process unless `PYTHONHASHSEED` is
//! pinned — meaning the reference implementation's own output is not
//! byte-stable across runs. Determinism is an explicit, testable
//! property here (spec §8), so we use a seedless FNV-1a 64-bit hash
//! instead: same inputs, same digest, on every process, forever.

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Folds an ordered list of strings into a single 64-bit digest. Each
/// element is hashed with its length as a separator so that
/// `["ab", "c"]` and `["a", "bc"]` never collide.
pub fn hash_values(values: &[String]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for v in values {
        hash ^= fnv1a(&(v.len() as u64).to_le_bytes());
        hash = hash.wrapping_mul(FNV_PRIME);
        hash ^= fnv1a(v.as_bytes());
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Builds the emitted_name for a non-top-level-implicit Instance.
///
/// `debug` mirrors the original's `-g` flag: instead of an opaque
/// digest, emit a human-readable `name<v1,v2|cont>` form for
/// inspection. Either way, distinct `(name, continuation, values)`
/// triples are guaranteed to produce distinct strings — the sole
/// collision-avoidance mechanism TGT has, since it has no scoping.
pub fn emitted_name(
    proto_name: &str,
    segment_index: usize,
    continuation_emitted_name: Option<&str>,
    template_values: &[String],
    inherited_values: &[String],
) -> String {
    let seg_suffix = if segment_index == 0 { String::new() } else { format!("_seg{}", segment_index) };

    let mut combined_values = Vec::with_capacity(template_values.len() + inherited_values.len());
    combined_values.extend_from_slice(template_values);
    combined_values.extend_from_slice(inherited_values);

    format!(
        "{}{}<ch{:016x}-th{:016x}>",
        proto_name,
        seg_suffix,
        continuation_emitted_name.map(|c| fnv1a(c.as_bytes())).unwrap_or(0),
        hash_values(&combined_values),
    )
}

/// The `-g` debug-mode counterpart of `emitted_name`: same inputs,
/// a readable encoding instead of an opaque digest.
pub fn emitted_name_debug(
    proto_name: &str,
    segment_index: usize,
    continuation_emitted_name: Option<&str>,
    template_values: &[String],
    inherited_values: &[String],
) -> String {
    let seg_suffix = if segment_index == 0 { String::new() } else { format!("_seg{}", segment_index) };

    let mut args = format!("{:?}", template_values);
    if !inherited_values.is_empty() {
        args.push_str(&format!("+inherited={:?}", inherited_values));
    }

    format!(
        "{}{}<commit-loc={}|template-args={}>",
        proto_name,
        seg_suffix,
        continuation_emitted_name.unwrap_or("none"),
        args,
    )
    .replace(' ', "")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deterministic_across_calls() {
        let values = vec!["wall".to_string()];
        let a = emitted_name("wrap", 0, None, &values, &[]);
        let b = emitted_name("wrap", 0, None, &values, &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_template_values_produce_distinct_names() {
        let a = emitted_name("wrap", 0, None, &["wall".to_string()], &[]);
        let b = emitted_name("wrap", 0, None, &["flag".to_string()], &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn distinct_continuations_produce_distinct_names() {
        let values = vec!["wall".to_string()];
        let a = emitted_name("wrap", 0, Some("MAIN_seg1"), &values, &[]);
        let b = emitted_name("wrap", 0, Some("MAIN_seg2"), &values, &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn segment_suffix_only_past_zero() {
        assert!(!emitted_name("main", 0, None, &[], &[]).contains("_seg"));
        assert!(emitted_name("main", 1, None, &[], &[]).contains("_seg1"));
    }
}

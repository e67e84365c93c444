//! Memorable `<adjective>_<noun>` suffixes for per-worktree database names.

use anyhow::{anyhow, Result};

use crate::util::sanitize_name;

/// PostgreSQL's identifier limit; MySQL allows 64.
pub const MAX_DB_NAME_LEN: usize = 63;

/// Prefix used when nothing better is known.
pub const FALLBACK_PREFIX: &str = "app";

pub const ADJECTIVES: [&str; 80] = [
    "agile", "amber", "ancient", "azure", "bold", "brave", "breezy", "bright", "brisk", "calm",
    "clever", "cosmic", "crimson", "crisp", "curious", "dapper", "daring", "dusty", "eager",
    "early", "electric", "emerald", "fancy", "fearless", "fierce", "floral", "fluffy", "frosty",
    "gentle", "giant", "gilded", "glad", "golden", "graceful", "happy", "hidden", "humble",
    "icy", "jolly", "keen", "kind", "lively", "lucky", "lunar", "mellow", "merry", "mighty",
    "misty", "modest", "noble", "nimble", "odd", "patient", "plucky", "polar", "proud", "quick",
    "quiet", "rapid", "rustic", "scarlet", "shiny", "silent", "silver", "sleepy", "snowy",
    "solar", "stormy", "sunny", "swift", "tidy", "tiny", "vast", "velvet", "vivid", "wandering",
    "wild", "wise", "witty", "zesty",
];

pub const NOUNS: [&str; 60] = [
    "anchor", "badger", "beacon", "bison", "blossom", "brook", "canyon", "cedar", "comet",
    "coral", "crane", "delta", "dune", "falcon", "fern", "finch", "fjord", "forest", "fox",
    "glacier", "grove", "harbor", "hawk", "heron", "island", "jaguar", "lagoon", "lantern",
    "lark", "lotus", "maple", "meadow", "mesa", "moose", "nebula", "oasis", "orchid", "otter",
    "owl", "panda", "pebble", "pine", "prairie", "quartz", "raven", "reef", "ridge", "river",
    "runner", "sparrow", "summit", "tiger", "tundra", "valley", "walrus", "willow", "wolf",
    "wren", "yak", "zephyr",
];

/// Uniform index in `0..n` from the OS CSPRNG (rejection sampling, no modulo bias).
fn random_index(n: usize) -> Result<usize> {
    debug_assert!(n > 0 && n <= u32::MAX as usize);
    let n = n as u32;
    let zone = u32::MAX - (u32::MAX % n);
    loop {
        let mut buf = [0u8; 4];
        getrandom::getrandom(&mut buf).map_err(|e| anyhow!("system random source failed: {e}"))?;
        let v = u32::from_le_bytes(buf);
        if v < zone {
            return Ok((v % n) as usize);
        }
    }
}

/// Fresh `<adjective>_<noun>`.
pub fn generate_suffix() -> Result<String> {
    let adj = ADJECTIVES[random_index(ADJECTIVES.len())?];
    let noun = NOUNS[random_index(NOUNS.len())?];
    Ok(format!("{}_{}", adj, noun))
}

/// Fresh suffix different from every entry in `avoid` (best effort after a few draws).
pub fn generate_suffix_excluding(avoid: &[String]) -> Result<String> {
    let mut candidate = generate_suffix()?;
    for _ in 0..32 {
        if !avoid.contains(&candidate) {
            break;
        }
        candidate = generate_suffix()?;
    }
    Ok(candidate)
}

/// `<sanitize(prefix)>_<suffix>`, capped at `MAX_DB_NAME_LEN` by shortening the prefix.
pub fn database_name(prefix: &str, suffix: &str) -> String {
    let mut prefix = sanitize_name(prefix);
    if prefix.is_empty() {
        prefix = FALLBACK_PREFIX.to_string();
    }
    let tail = format!("_{}", suffix);
    if prefix.len() + tail.len() > MAX_DB_NAME_LEN {
        let keep = MAX_DB_NAME_LEN.saturating_sub(tail.len()).max(1);
        prefix.truncate(keep.min(prefix.len()));
        let trimmed = prefix.trim_end_matches('_');
        prefix = if trimmed.is_empty() {
            prefix[..1].to_string()
        } else {
            trimmed.to_string()
        };
    }
    let mut name = format!("{}{}", prefix, tail);
    // Only reachable with an oversized suffix; keep the hard limit.
    name.truncate(MAX_DB_NAME_LEN);
    name
}

/// Generate a new name for `prefix`, returning `(name, suffix)`.
pub fn generate_database_name(prefix: &str, avoid: &[String]) -> Result<(String, String)> {
    let suffix = generate_suffix_excluding(avoid)?;
    let name = database_name(prefix, &suffix);
    let extracted = extract_suffix(&name).unwrap_or(suffix);
    Ok((name, extracted))
}

/// The trailing `<adjective>_<noun>` of a database name.
pub fn extract_suffix(name: &str) -> Option<String> {
    let mut parts = name.rsplitn(3, '_');
    let noun = parts.next()?;
    let adj = parts.next()?;
    if noun.is_empty() || adj.is_empty() {
        return None;
    }
    Some(format!("{}_{}", adj, noun))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_wordlists_are_clean_and_unique() {
        let adjs: HashSet<_> = ADJECTIVES.iter().collect();
        let nouns: HashSet<_> = NOUNS.iter().collect();
        assert_eq!(adjs.len(), ADJECTIVES.len());
        assert_eq!(nouns.len(), NOUNS.len());
        for w in ADJECTIVES.iter().chain(NOUNS.iter()) {
            assert!(w.chars().all(|c| c.is_ascii_lowercase()), "bad word {w}");
        }
    }

    #[test]
    fn test_generate_suffix_shape() {
        for _ in 0..50 {
            let s = generate_suffix().expect("suffix");
            let (adj, noun) = s.split_once('_').expect("underscore");
            assert!(ADJECTIVES.contains(&adj));
            assert!(NOUNS.contains(&noun));
        }
    }

    #[test]
    fn test_random_index_in_range() {
        for _ in 0..500 {
            assert!(random_index(7).expect("rand") < 7);
        }
    }

    #[test]
    fn test_database_name_sanitizes_prefix() {
        assert_eq!(database_name("My-App", "swift_runner"), "my_app_swift_runner");
        assert_eq!(database_name("---", "calm_owl"), "app_calm_owl");
    }

    #[test]
    fn test_database_name_truncates_prefix_not_suffix() {
        let long = "x".repeat(100);
        let name = database_name(&long, "wandering_glacier");
        assert!(name.len() <= MAX_DB_NAME_LEN);
        assert!(name.ends_with("_wandering_glacier"), "{name}");
        assert_eq!(extract_suffix(&name).as_deref(), Some("wandering_glacier"));

        let underscored = format!("{}_{}", "a".repeat(44), "b".repeat(30));
        let name = database_name(&underscored, "wandering_glacier");
        assert!(!name.contains("__"), "{name}");
        assert!(name.len() <= MAX_DB_NAME_LEN);
    }

    #[test]
    fn test_extract_suffix() {
        assert_eq!(extract_suffix("myapp_swift_runner").as_deref(), Some("swift_runner"));
        assert_eq!(extract_suffix("my_app_swift_runner").as_deref(), Some("swift_runner"));
        assert_eq!(extract_suffix("single"), None);
    }

    #[test]
    fn test_generate_database_name_round_trip() {
        let (name, suffix) = generate_database_name("myapp", &[]).expect("name");
        assert_eq!(name, format!("myapp_{}", suffix));
    }

    #[test]
    fn test_excluding_avoids_previous() {
        let first = generate_suffix().expect("suffix");
        for _ in 0..20 {
            let next = generate_suffix_excluding(std::slice::from_ref(&first)).expect("suffix");
            assert_ne!(next, first);
        }
    }
}

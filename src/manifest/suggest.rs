use strsim::levenshtein;

fn leaf(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

fn close(needle: &str, candidate: &str) -> Option<usize> {
    let dist = levenshtein(needle, candidate);
    let max_dist = (needle.len() / 4).clamp(1, 4);
    (dist <= max_dist).then_some(dist)
}

/// Edit-distance hint for a name that matched nothing. Slash-separated ids
/// are also compared by final segment, so `tools/alhpa` finds `tools/alpha`.
pub fn did_you_mean(needle: &str, candidates: impl IntoIterator<Item = String>) -> Option<String> {
    let needle = needle.trim();
    if needle.is_empty() {
        return None;
    }
    let mut best: Option<(usize, String)> = None;
    for cand in candidates {
        if cand.is_empty() || cand == needle {
            continue;
        }
        let full = close(needle, &cand);
        let by_leaf = close(leaf(needle), leaf(&cand));
        let Some(dist) = [full, by_leaf].into_iter().flatten().min() else {
            continue;
        };
        let better = match &best {
            Some((bd, bc)) => dist < *bd || (dist == *bd && cand.len() < bc.len()),
            None => true,
        };
        if better {
            best = Some((dist, cand));
        }
    }
    best.map(|(_, name)| format!("did you mean `{}`?", name))
}

#[cfg(test)]
mod tests {
    use super::did_you_mean;

    #[test]
    fn close_submodule_paths_are_suggested() {
        let keys = ["third_party/alpha".to_string(), "tools/beta".to_string()];
        let hint = did_you_mean("third_party/alhpa", keys.clone()).expect("close enough");
        assert!(hint.contains("third_party/alpha"), "got: {hint}");
        assert!(did_you_mean("nothing/like/it", keys).is_none());
    }

    #[test]
    fn leaf_typos_match_across_parent_dirs() {
        let keys = ["libs/zlib".to_string()];
        let hint = did_you_mean("libs/zlb", keys).expect("leaf match");
        assert!(hint.contains("libs/zlib"), "got: {hint}");
    }
}

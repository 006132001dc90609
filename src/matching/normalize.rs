/// Canonical form of an artist name for equality comparison.
///
/// Trims surrounding whitespace and lowercases. Nothing else is folded:
/// "Sigur Rós" and "Sigur Ros" stay distinct. Must be applied to both the
/// user's artists and the show's artists.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_and_lowercases() {
        assert_eq!(normalize(" Radiohead "), "radiohead");
        assert_eq!(normalize("\tMGMT\n"), "mgmt");
        assert_eq!(normalize("The National"), "the national");
    }

    #[test]
    fn test_idempotent() {
        for s in ["  Big Thief", "boygenius ", "ALVVAYS", "", "   ", "Sigur Rós"] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_inner_whitespace_and_punctuation_kept() {
        assert_eq!(normalize("Godspeed You!  Black Emperor"), "godspeed you!  black emperor");
        assert_ne!(normalize("Sigur Rós"), normalize("Sigur Ros"));
    }
}

//! Filename sanitization utilities

/// Characters that are illegal in filenames on at least one major OS
const DISALLOWED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*', '\0'];

/// Sanitize a string for safe use as a filesystem name
///
/// Replaces runs of disallowed characters with a single underscore and
/// trims surrounding whitespace. Sanitizing an already-clean string is
/// a no-op, so the function is idempotent.
///
/// # Examples
///
/// ```
/// use saavndl::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("AC/DC"), "AC_DC");
/// assert_eq!(sanitize_filename("Who? What?!"), "Who_ What_!");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;

    for c in name.chars() {
        if DISALLOWED.contains(&c) {
            if !in_run {
                out.push('_');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_every_disallowed_character() {
        let dirty = r#"a<b>c:d"e/f\g|h?i*j"#;
        let clean = sanitize_filename(dirty);
        for c in ['<', '>', ':', '"', '/', '\\', '|', '?', '*'] {
            assert!(!clean.contains(c), "found {:?} in {:?}", c, clean);
        }
        assert_eq!(clean, "a_b_c_d_e_f_g_h_i_j");
    }

    #[test]
    fn test_collapses_runs() {
        assert_eq!(sanitize_filename("LOVE /// DISCONNECT"), "LOVE _ DISCONNECT");
        assert_eq!(sanitize_filename("a?*<>b"), "a_b");
    }

    #[test]
    fn test_clean_string_is_untouched() {
        assert_eq!(sanitize_filename("Normal Album Name"), "Normal Album Name");
    }

    #[test]
    fn test_idempotent() {
        let once = sanitize_filename("Kabhi: Kabhie / Mere?");
        assert_eq!(sanitize_filename(&once), once);
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(sanitize_filename("  Album Name  "), "Album Name");
    }

    #[test]
    fn test_all_disallowed_yields_empty_after_trim() {
        assert_eq!(sanitize_filename("///"), "_");
        assert_eq!(sanitize_filename("   "), "");
    }
}

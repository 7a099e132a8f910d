/// Fallback display name when a page carries no title metadata.
pub const DEFAULT_FILE_NAME: &str = "default_file_name";

/// Filesystem-safe destination name: every char outside `[A-Za-z0-9.-]`
/// becomes `_`. Idempotent; an empty input yields `_`.
pub fn sanitize_file_name(input: &str) -> String {
    if input.is_empty() {
        return "_".to_string();
    }
    input
        .chars()
        .map(|c| if is_allowed(c) { c } else { '_' })
        .collect()
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::sanitize_file_name;

    #[test]
    fn replaces_everything_outside_the_allowed_set() {
        assert_eq!(sanitize_file_name("Game Title"), "Game_Title");
        assert_eq!(sanitize_file_name("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_file_name("a\\b:c*d?.zip"), "a_b_c_d_.zip");
        assert_eq!(sanitize_file_name("Ünïcode–name"), "_n_code_name");
    }

    #[test]
    fn sanitizing_is_idempotent() {
        for raw in ["Game Title", "x/y", "already_ok-1.2.bin", "", "  "] {
            let once = sanitize_file_name(raw);
            assert_eq!(sanitize_file_name(&once), once);
            assert!(once
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')));
        }
    }

    #[test]
    fn empty_name_still_yields_a_path_component() {
        assert_eq!(sanitize_file_name(""), "_");
    }
}

//! Canonical Message-ID handling and deep-link construction.

/// Host serving the Gmail web UI.
pub const DEFAULT_MAIL_HOST: &str = "mail.google.com";

/// Strips the angle brackets (and stray whitespace) around a Message-ID.
///
/// `<CAF=abc@mail.gmail.com>` becomes `CAF=abc@mail.gmail.com`; a value
/// without brackets is returned as is, so applying this twice is the same as
/// applying it once.
#[must_use]
pub fn normalize_message_id(raw: &str) -> &str {
    raw.trim_start_matches(|c: char| c == '<' || c.is_whitespace())
        .trim_end_matches(|c: char| c == '>' || c.is_whitespace())
}

/// Builds the search link for a canonical Message-ID.
///
/// The link carries no `/u/N/` account segment, so it opens in whichever
/// account the recipient has selected.
#[must_use]
pub fn build_link(mail_host: &str, message_id: &str) -> String {
    format!(
        "https://{mail_host}/mail/#search/rfc822msgid%3A{}",
        urlencoding::encode(message_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_strips_brackets() {
        assert_eq!(normalize_message_id("<a@b>"), "a@b");
        assert_eq!(normalize_message_id("a@b"), "a@b");
        assert_eq!(normalize_message_id(" <a@b>\r\n"), "a@b");
        assert_eq!(normalize_message_id(""), "");
    }

    #[test]
    fn test_normalize_strips_bracket_runs() {
        assert_eq!(normalize_message_id("<<a@b>>"), "a@b");
        assert_eq!(normalize_message_id(" < a@b > "), "a@b");
        assert_eq!(normalize_message_id("<>"), "");
        assert_eq!(normalize_message_id(" < > "), "");
    }

    #[test]
    fn test_build_link() {
        let link = build_link(DEFAULT_MAIL_HOST, "CAF+x=1@mail.gmail.com");
        assert_eq!(
            link,
            "https://mail.google.com/mail/#search/rfc822msgid%3ACAF%2Bx%3D1%40mail.gmail.com"
        );
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(raw in ".*") {
            let once = normalize_message_id(&raw);
            prop_assert_eq!(normalize_message_id(once), once);
        }

        #[test]
        fn link_embeds_encoded_id_without_account_segment(id in "[A-Za-z0-9.=+_@-]{1,64}") {
            let link = build_link(DEFAULT_MAIL_HOST, &id);
            let expected = format!("rfc822msgid%3A{}", urlencoding::encode(&id));
            prop_assert!(link.ends_with(&expected));
            prop_assert!(!link.contains("/u/"));
        }
    }
}

//! Embedded browser client

/// Single-page chat client served at `/`
pub const INDEX_HTML: &str = include_str!("../../assets/index.html");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_posts_expected_fields() {
        assert!(INDEX_HTML.contains("'text_input'"));
        assert!(INDEX_HTML.contains("'audio_input'"));
        assert!(INDEX_HTML.contains("recording.wav"));
        assert!(INDEX_HTML.contains("/reset"));
        assert!(INDEX_HTML.contains("患者基本信息："));
    }

    #[test]
    fn test_user_bubble_is_drawn_only_for_accepted_sends() {
        assert_eq!(INDEX_HTML.matches("appendBubble(userBubble, 'user')").count(), 1);
        assert!(!INDEX_HTML.contains("appendBubble(text, 'user')"));
        assert!(INDEX_HTML.contains("if (pending) return false;"));
        assert!(INDEX_HTML.contains("if (send(form, text))"));
    }
}

// src/utils/html.rs

/// Strips unsafe markup from user-written text before it is stored or
/// forwarded to the tutor. Safe formatting tags survive; `<script>` and
/// event-handler attributes do not.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_are_removed_and_text_kept() {
        let cleaned = clean_html("Why is <b>x</b> = 2?<script>alert(1)</script>");
        assert_eq!(cleaned, "Why is <b>x</b> = 2?");
    }

    #[test]
    fn latex_passes_through() {
        assert_eq!(clean_html("$x^2 + 1$"), "$x^2 + 1$");
    }
}

// src/utils/html.rs

/// Sanitizes user-supplied rich text (store descriptions, review text) with ammonia.
///
/// Safe formatting tags such as `<b>` and `<p>` survive, while `<script>`,
/// `<iframe>` and event-handler attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input.trim())
}

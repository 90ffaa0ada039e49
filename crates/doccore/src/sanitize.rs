use ammonia::Builder;

pub fn sanitize_html(html: &str) -> String {
    // Scripts, event handlers and javascript: URLs never survive
    create_clipboard_sanitizer().clean(html).to_string()
}

fn create_clipboard_sanitizer() -> Builder<'static> {
    let mut builder = Builder::default();
    builder
        .add_tags(&["mark", "hr", "br"])
        .add_generic_attributes(&["style"])
        .add_generic_attribute_prefixes(&["data-"])
        .add_tag_attributes("ol", &["start"])
        .link_rel(None);
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_annotation_attributes() {
        let html = r##"<p style="text-align: center"><span data-bookmark-id="b1" data-color="#fff">x</span></p>"##;
        let sanitized = sanitize_html(html);
        assert!(sanitized.contains("data-bookmark-id=\"b1\""));
        assert!(sanitized.contains("text-align: center"));
    }

    #[test]
    fn test_sanitize_removes_scripts_and_handlers() {
        let html = r#"<p onclick="steal()">Hi</p><script>alert('XSS')</script>"#;
        let sanitized = sanitize_html(html);
        assert!(!sanitized.contains("<script"));
        assert!(!sanitized.contains("alert"));
        assert!(!sanitized.contains("onclick"));
        assert!(sanitized.contains("Hi"));
    }

    #[test]
    fn test_sanitize_removes_javascript_links() {
        let sanitized = sanitize_html(r#"<a href="javascript:alert(1)">x</a>"#);
        assert!(!sanitized.contains("javascript:"));
    }
}

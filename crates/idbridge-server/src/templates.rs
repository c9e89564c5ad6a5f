//! Server-rendered HTML for the login page.
//!
//! Plain string building with hand-rolled escaping. The page only lists
//! provider links, so a template engine would be overkill.

/// Shared CSS for the login page.
const SHARED_STYLES: &str = r#"
* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
    background: #10131c;
    color: #f3f4f8;
    min-height: 100vh;
    display: flex;
    justify-content: center;
    align-items: center;
    line-height: 1.5;
}

.container {
    width: 100%;
    max-width: 380px;
    padding: 1rem;
}

.card {
    background: #1a1e2c;
    border: 1px solid rgba(255, 255, 255, 0.08);
    border-radius: 10px;
    padding: 1.5rem;
}

.card-title {
    font-size: 1.25rem;
    font-weight: 600;
    margin-bottom: 1rem;
}

.provider-list {
    list-style: none;
}

.provider-list li + li {
    margin-top: 0.5rem;
}

.provider-link {
    display: block;
    padding: 0.625rem 0.75rem;
    background: #242a3d;
    border: 1px solid rgba(255, 255, 255, 0.08);
    border-radius: 6px;
    color: #f3f4f8;
    text-decoration: none;
    text-align: center;
    font-weight: 500;
}

.provider-link:hover {
    background: #2d3550;
}

.hint {
    font-size: 0.875rem;
    color: #8a90a3;
    text-align: center;
}
"#;

/// Renders the provider picker.
///
/// # Arguments
///
/// * `providers` - Registry names of the configured providers, in display
///   order
pub fn render_login_page(providers: &[String]) -> String {
    let mut content = String::with_capacity(1024);

    content.push_str("<div class=\"card\">\n");
    content.push_str("<div class=\"card-title\">Sign in with</div>\n\n");

    if providers.is_empty() {
        content.push_str("<div class=\"hint\">No identity providers are configured.</div>\n");
    } else {
        content.push_str("<ul class=\"provider-list\">\n");
        for provider in providers {
            let escaped = html_escape(provider);
            content.push_str("<li><a class=\"provider-link\" href=\"/login/");
            content.push_str(&escaped);
            content.push_str("\">");
            content.push_str(&display_name(&escaped));
            content.push_str("</a></li>\n");
        }
        content.push_str("</ul>\n");
    }

    content.push_str("</div>");

    html_page("Sign in", &content)
}

fn html_page(title: &str, content: &str) -> String {
    let mut html = String::with_capacity(content.len() + SHARED_STYLES.len() + 512);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("    <meta charset=\"UTF-8\">\n");
    html.push_str(
        "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html.push_str("    <title>");
    html.push_str(&html_escape(title));
    html.push_str(" - idbridge</title>\n");
    html.push_str("    <style>");
    html.push_str(SHARED_STYLES);
    html.push_str("</style>\n</head>\n<body>\n    <div class=\"container\">\n");
    html.push_str(content);
    html.push_str("\n    </div>\n</body>\n</html>");
    html
}

/// Capitalizes the first character for display ("google" -> "Google").
fn display_name(provider: &str) -> String {
    let mut chars = provider.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

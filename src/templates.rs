//! Login page templates.
//!
//! A template is an opaque function `render(host, follow_page, error)`
//! looked up by the name a host's configuration carries. Unknown names are a
//! configuration mistake surfaced as a 500 by the handler.

use std::collections::HashMap;
use std::sync::OnceLock;

pub type TemplateFn = fn(host: &str, follow_page: &str, error: bool) -> String;

static REGISTRY: OnceLock<HashMap<&'static str, TemplateFn>> = OnceLock::new();

pub fn lookup(name: &str) -> Option<TemplateFn> {
    registry().get(name).copied()
}

fn registry() -> &'static HashMap<&'static str, TemplateFn> {
    REGISTRY.get_or_init(|| {
        let mut map: HashMap<&'static str, TemplateFn> = HashMap::new();
        map.insert("default", render_default);
        map
    })
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_default(host: &str, follow_page: &str, error: bool) -> String {
    let error_block = if error {
        "<p class=\"error\">Invalid username, password or code</p>"
    } else {
        ""
    };
    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html>\n<head>\n",
            "<meta charset=\"utf-8\">\n",
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
            "<title>Login - {host}</title>\n",
            "<style>\n",
            "body {{ font-family: sans-serif; background: #f4f4f4; }}\n",
            ".box {{ max-width: 22em; margin: 10vh auto; padding: 2em; background: #fff;\n",
            "        border-radius: 6px; box-shadow: 0 1px 4px rgba(0,0,0,.2); }}\n",
            "input {{ width: 100%; margin: .4em 0 1em; padding: .5em; box-sizing: border-box; }}\n",
            "button {{ width: 100%; padding: .6em; }}\n",
            ".error {{ color: #b00; }}\n",
            "</style>\n</head>\n<body>\n",
            "<div class=\"box\">\n",
            "<h1>{host}</h1>\n",
            "{error_block}\n",
            "<form method=\"post\" action=\"/login\">\n",
            "<label>Username</label>\n",
            "<input type=\"text\" name=\"username\" autofocus>\n",
            "<label>Password</label>\n",
            "<input type=\"password\" name=\"password\">\n",
            "<label>One-time code</label>\n",
            "<input type=\"text\" name=\"totp\" inputmode=\"numeric\" autocomplete=\"one-time-code\">\n",
            "<input type=\"hidden\" name=\"follow_page\" value=\"{follow_page}\">\n",
            "<button type=\"submit\">Sign in</button>\n",
            "</form>\n</div>\n</body>\n</html>\n",
        ),
        host = html_escape(host),
        follow_page = html_escape(follow_page),
        error_block = error_block,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert!(lookup("default").is_some());
        assert!(lookup("no-such-template").is_none());
    }

    #[test]
    fn test_render_reflects_inputs() {
        let render = lookup("default").unwrap();

        let page = render("example.com", "/home", false);
        assert!(page.contains("example.com"));
        assert!(page.contains("name=\"follow_page\" value=\"/home\""));
        assert!(!page.contains("class=\"error\""));

        let page = render("example.com", "/", true);
        assert!(page.contains("class=\"error\""));
    }

    #[test]
    fn test_render_escapes_markup() {
        let render = lookup("default").unwrap();
        let page = render("<script>", "/\"><script>", false);
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;"));
    }
}

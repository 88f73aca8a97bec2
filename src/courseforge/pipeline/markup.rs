//! Local cleanup of the enhancement stage's raw reply.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static ARTICLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<article.*?</article>").unwrap());
static OPEN_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*```(?:html)?\s*").unwrap());
static CLOSE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```\s*$").unwrap());
static HEADING_ONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h1[^>]*>.*?</h1>").unwrap());
static PRE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)(<pre\b[^>]*>)(.*?)(</pre>)").unwrap());
static CODE_WRAPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^(\s*<code\b[^>]*>)(.*?)(</code>\s*)$").unwrap());

/// Extracts the lesson article, drops page-level `<h1>` titles and escapes raw markup inside
/// `<pre>` blocks.
pub fn normalize_enhanced(reply: &str) -> String {
    let body = match ARTICLE.find(reply) {
        Some(article) => article.as_str().to_string(),
        None => {
            let unfenced = OPEN_FENCE.replace(reply, "");
            CLOSE_FENCE.replace(&unfenced, "").into_owned()
        }
    };
    let body = HEADING_ONE.replace_all(&body, "");
    escape_preformatted(&body)
}

/// Code samples inside `<pre>` must render as text, so stray angle brackets are escaped.
/// An inner `<code>` wrapper is kept as markup.
pub fn escape_preformatted(markup: &str) -> String {
    PRE_BLOCK
        .replace_all(markup, |caps: &Captures| {
            let inner = &caps[2];
            let inner = match CODE_WRAPPER.captures(inner) {
                Some(code) => format!("{}{}{}", &code[1], escape_angles(&code[2]), &code[3]),
                None => escape_angles(inner),
            };
            format!("{}{}{}", &caps[1], inner, &caps[3])
        })
        .into_owned()
}

fn escape_angles(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

//! Image directive resolution.
//!
//! Lesson markup marks illustration spots with directives:
//!
//! ```text
//! <ai-image-placeholder prompt="flat vector of a database, NO TEXT" style="max-width:60%">
//! ```
//!
//! Resolution is all-or-nothing. Directives are generated one at a time in document order;
//! the first failure aborts the whole lesson and no partial markup is returned. On success
//! every directive is swapped for an `<img>` carrying the payload as a data URI.
//!
//! Attribute values may hold `>` inside quotes and HTML entities; prompts are decoded before
//! the call and re-escaped in the `alt` text. A placeholder whose prompt cannot be read
//! counts as a failure.

use super::StatusSink;
use crate::error::{CourseError, Result};
use crate::service::{GenerativeService, ServiceError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

static DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)(<ai-image-placeholder\b(?:[^>"']|"[^"]*"|'[^']*')*>)(?:\s*</ai-image-placeholder\s*>)?"#,
    )
    .unwrap()
});

static OPENING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<ai-image-placeholder\b").unwrap());

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)\b(prompt|style)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`/]+))"#).unwrap()
});

static PROMPT_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bprompt\b").unwrap());

static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
enum Prompt {
    Text(String),
    /// No prompt, or only whitespace: the directive is removed without a call.
    Blank,
    /// A `prompt` attribute that carries no readable value.
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Directive {
    span: Range<usize>,
    prompt: Prompt,
    style: Option<String>,
}

fn find_directives(markup: &str) -> Vec<Directive> {
    DIRECTIVE
        .captures_iter(markup)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let tag = caps.get(1)?.as_str();
            let mut prompt = None;
            let mut style = None;
            for attr in ATTRIBUTE.captures_iter(tag) {
                let value = attr
                    .get(2)
                    .or_else(|| attr.get(3))
                    .or_else(|| attr.get(4))
                    .map(|m| decode_entities(m.as_str()));
                match attr.get(1).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
                    Some("prompt") => prompt = value,
                    Some("style") => style = value,
                    _ => {}
                }
            }
            let prompt = match prompt {
                Some(p) if p.trim().is_empty() => Prompt::Blank,
                Some(p) => Prompt::Text(p),
                None if PROMPT_NAME.is_match(tag) => Prompt::Malformed,
                None => Prompt::Blank,
            };
            Some(Directive {
                span: whole.range(),
                prompt,
                style,
            })
        })
        .collect()
}

/// Opening tags of every directive, in document order, exactly as written.
pub fn directive_tags(markup: &str) -> Vec<&str> {
    DIRECTIVE
        .captures_iter(markup)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Quota failures get their own wait-and-retry error, everything else is an image failure.
pub fn classify_image_failure(source: ServiceError) -> CourseError {
    if source.is_quota_exhausted() {
        CourseError::QuotaExceeded { source }
    } else {
        CourseError::ImageGeneration { source }
    }
}

fn malformed_directive(index: usize) -> CourseError {
    CourseError::ImageGeneration {
        source: ServiceError::new(
            None,
            format!("image placeholder {} has no readable prompt", index + 1),
        ),
    }
}

fn decode_entities(value: &str) -> String {
    ENTITY
        .replace_all(value, |caps: &regex::Captures| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => name
                    .strip_prefix("#x")
                    .or_else(|| name.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| name.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn image_tag(src: &str, alt: &str, style: Option<&str>) -> String {
    let alt = escape_attribute(alt);
    match style {
        Some(style) => format!(
            r#"<img src="{}" alt="{}" style="{}">"#,
            src,
            alt,
            escape_attribute(style)
        ),
        None => format!(r#"<img src="{}" alt="{}">"#, src, alt),
    }
}

pub struct ImageResolver<'a> {
    service: &'a dyn GenerativeService,
    cancel: &'a CancellationToken,
}

impl<'a> ImageResolver<'a> {
    pub fn new(service: &'a dyn GenerativeService, cancel: &'a CancellationToken) -> Self {
        Self { service, cancel }
    }

    /// Returns markup with every directive replaced, or the first failure.
    pub async fn resolve(&self, markup: &str, status: StatusSink<'_>) -> Result<String> {
        let directives = find_directives(markup);
        let openings = OPENING.find_iter(markup).count();
        if openings > directives.len() {
            warn!(openings, parsed = directives.len(), "unparseable image placeholder");
            return Err(malformed_directive(directives.len()));
        }
        if directives.is_empty() {
            return Ok(markup.to_string());
        }

        let total = directives.len();
        super::report(status, format!("Preparing {} images...", total));

        let mut replacements = Vec::with_capacity(total);
        for (i, directive) in directives.iter().enumerate() {
            super::report(status, format!("Generating image {} of {}...", i + 1, total));

            let prompt = match &directive.prompt {
                Prompt::Text(prompt) => prompt.as_str(),
                Prompt::Blank => {
                    debug!(index = i, "dropping directive without a prompt");
                    replacements.push(String::new());
                    continue;
                }
                Prompt::Malformed => return Err(malformed_directive(i)),
            };

            if self.cancel.is_cancelled() {
                return Err(CourseError::Cancelled);
            }
            let payload = self.service.generate_image(prompt).await.map_err(|err| {
                warn!(index = i, total, "image generation failed: {}", err);
                classify_image_failure(err)
            })?;
            replacements.push(image_tag(
                &payload.data_uri(),
                prompt,
                directive.style.as_deref(),
            ));
        }

        let mut resolved = String::with_capacity(markup.len());
        let mut cursor = 0;
        for (directive, replacement) in directives.iter().zip(replacements) {
            resolved.push_str(&markup[cursor..directive.span.start]);
            resolved.push_str(&replacement);
            cursor = directive.span.end;
        }
        resolved.push_str(&markup[cursor..]);
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::scripted::{quota_error, server_error, Call, ScriptedService};
    use std::sync::Mutex;

    const TWO_IMAGES: &str = r#"<article><section><p>a</p><ai-image-placeholder prompt="first picture" style="width:50%"></ai-image-placeholder><p>b</p><ai-image-placeholder prompt='second picture'/></section></article>"#;

    async fn resolve(service: &ScriptedService, markup: &str) -> Result<String> {
        let cancel = CancellationToken::new();
        ImageResolver::new(service, &cancel).resolve(markup, None).await
    }

    #[tokio::test]
    async fn no_directives_means_no_calls() {
        let service = ScriptedService::new();
        let markup = "<article><p>plain</p></article>";
        assert_eq!(resolve(&service, markup).await.unwrap(), markup);
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn replaces_directives_in_order() {
        let service = ScriptedService::new();
        let resolved = resolve(&service, TWO_IMAGES).await.unwrap();

        assert!(!resolved.contains("ai-image-placeholder"));
        assert!(resolved.contains(
            r#"<img src="data:image/png;base64,IMG1" alt="first picture" style="width:50%">"#
        ));
        assert!(resolved.contains(r#"<img src="data:image/png;base64,IMG2" alt="second picture">"#));
        assert!(resolved.find("IMG1").unwrap() < resolved.find("IMG2").unwrap());
        assert_eq!(
            service.calls(),
            vec![
                Call::Image("first picture".into()),
                Call::Image("second picture".into())
            ]
        );
    }

    #[tokio::test]
    async fn first_failure_stops_remaining_directives() {
        let service = ScriptedService::new().fail_image("first", server_error());
        let err = resolve(&service, TWO_IMAGES).await.unwrap_err();

        assert!(matches!(err, CourseError::ImageGeneration { .. }));
        assert_eq!(service.image_calls(), vec!["first picture".to_string()]);
    }

    #[tokio::test]
    async fn quota_failure_is_distinguished() {
        let service = ScriptedService::new().fail_image("second", quota_error());
        let err = resolve(&service, TWO_IMAGES).await.unwrap_err();
        assert!(matches!(err, CourseError::QuotaExceeded { .. }));
        assert_eq!(service.image_calls().len(), 2);
    }

    #[tokio::test]
    async fn empty_prompt_is_dropped_without_a_call() {
        let service = ScriptedService::new();
        let markup = r#"<p>x</p><ai-image-placeholder prompt=""><p>y</p>"#;
        let resolved = resolve(&service, markup).await.unwrap();
        assert_eq!(resolved, "<p>x</p><p>y</p>");
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn reports_progress_per_image() {
        let service = ScriptedService::new();
        let cancel = CancellationToken::new();
        let seen = Mutex::new(Vec::new());
        let sink = |s: &str| seen.lock().unwrap().push(s.to_string());

        ImageResolver::new(&service, &cancel)
            .resolve(TWO_IMAGES, Some(&sink))
            .await
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "Preparing 2 images...",
                "Generating image 1 of 2...",
                "Generating image 2 of 2...",
            ]
        );
    }

    #[tokio::test]
    async fn cancelled_before_first_call() {
        let service = ScriptedService::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = ImageResolver::new(&service, &cancel)
            .resolve(TWO_IMAGES, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CourseError::Cancelled));
        assert!(service.calls().is_empty());
    }

    #[test]
    fn tags_are_reported_verbatim() {
        assert_eq!(
            directive_tags(TWO_IMAGES),
            vec![
                r#"<ai-image-placeholder prompt="first picture" style="width:50%">"#,
                r#"<ai-image-placeholder prompt='second picture'/>"#,
            ]
        );
    }

    #[tokio::test]
    async fn angle_bracket_inside_prompt_stays_in_the_prompt() {
        let service = ScriptedService::new();
        let markup = r#"<p>a</p><ai-image-placeholder prompt="request -> response flow"></ai-image-placeholder><p>b</p>"#;
        let resolved = resolve(&service, markup).await.unwrap();

        assert_eq!(
            resolved,
            r#"<p>a</p><img src="data:image/png;base64,IMG1" alt="request -&gt; response flow"><p>b</p>"#
        );
        assert_eq!(
            service.calls(),
            vec![Call::Image("request -> response flow".into())]
        );
    }

    #[tokio::test]
    async fn unreadable_prompt_fails_the_lesson() {
        for markup in [
            r#"<p>a</p><ai-image-placeholder prompt="never closed></p>"#,
            r#"<p>a</p><ai-image-placeholder prompt style="width:50%"><p>b</p>"#,
        ] {
            let service = ScriptedService::new();
            let err = resolve(&service, markup).await.unwrap_err();
            assert!(matches!(err, CourseError::ImageGeneration { .. }), "{markup}");
            assert!(service.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn quotes_in_prompt_are_escaped_in_alt() {
        let service = ScriptedService::new();
        let markup = r#"<ai-image-placeholder prompt='a sign saying "STOP"' style='font-family:"Inter"'>"#;
        let resolved = resolve(&service, markup).await.unwrap();

        assert_eq!(
            resolved,
            r#"<img src="data:image/png;base64,IMG1" alt="a sign saying &quot;STOP&quot;" style="font-family:&quot;Inter&quot;">"#
        );
        assert_eq!(
            service.calls(),
            vec![Call::Image(r#"a sign saying "STOP""#.into())]
        );
    }

    #[tokio::test]
    async fn entities_are_decoded_before_the_call() {
        let service = ScriptedService::new();
        let markup = r#"<ai-image-placeholder prompt="salt &amp; pepper &#8594; &quot;seasoning&quot;">"#;
        let resolved = resolve(&service, markup).await.unwrap();

        assert_eq!(
            service.image_calls(),
            vec!["salt & pepper \u{2192} \"seasoning\"".to_string()]
        );
        assert!(resolved.contains(r#"alt="salt &amp; pepper → &quot;seasoning&quot;""#));
    }

    #[test]
    fn unknown_entities_are_left_alone() {
        assert_eq!(decode_entities("a &bogus; b &amp c"), "a &bogus; b &amp c");
    }
}

//! Selector and text matching over an HTML snapshot
//!
//! These helpers are pure functions over page source so every engine (and the
//! tests) can share them. `scraper::Html` is not `Send`, so documents are
//! parsed and dropped inside each call and only owned results escape.

use scraper::{ElementRef, Html, Selector};

use super::{Element, ElementMatcher};
use crate::errors::{SessionError, SessionResult};

/// HTTP method of a form submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMethod {
    Get,
    Post,
}

/// A form submission triggered by activating a submit control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    /// Raw `action` (or `formaction`), resolved by the caller
    pub action: Option<String>,
    pub method: FormMethod,
    pub fields: Vec<(String, String)>,
}

/// What activating an element does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Navigate to the raw `href`
    Follow(String),
    /// In-page link (`#...`); the document does not change
    InPage,
    /// Submit the enclosing form
    Submit(FormSubmission),
}

/// Collapse runs of whitespace into single spaces and trim
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a CSS selector, mapping failures to `SessionError::InvalidSelector`
pub fn parse_selector(selector: &str) -> SessionResult<Selector> {
    Selector::parse(selector).map_err(|_| SessionError::InvalidSelector {
        selector: selector.to_string(),
    })
}

/// Check whether the document's text contains `needle` (case-insensitive)
pub fn contains_text(html: &str, needle: &str) -> bool {
    let document = Html::parse_document(html);
    let haystack = normalize_text(&document.root_element().text().collect::<String>());
    haystack
        .to_lowercase()
        .contains(&normalize_text(needle).to_lowercase())
}

fn element_text(element: &ElementRef<'_>) -> String {
    normalize_text(&element.text().collect::<String>())
}

fn text_matches(element: &ElementRef<'_>, wanted: Option<&str>) -> bool {
    match wanted {
        Some(wanted) => element_text(element)
            .to_lowercase()
            .contains(&normalize_text(wanted).to_lowercase()),
        None => true,
    }
}

fn snapshot(element: &ElementRef<'_>) -> Element {
    Element {
        tag: element.value().name().to_ascii_lowercase(),
        text: element_text(element),
        href: element.value().attr("href").map(str::to_string),
    }
}

/// All elements matched by `matcher`, in document order
pub fn query(html: &str, matcher: &ElementMatcher) -> SessionResult<Vec<Element>> {
    let selector = parse_selector(&matcher.selector)?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selector)
        .filter(|element| text_matches(element, matcher.text.as_deref()))
        .map(|element| snapshot(&element))
        .collect())
}

/// Work out what activating the first element matched by `matcher` does
///
/// # Errors
///
/// - `ElementNotFound` when nothing matches
/// - `NotActivatable` for `javascript:` links and controls outside any form
pub fn activation(html: &str, matcher: &ElementMatcher) -> SessionResult<Activation> {
    let selector = parse_selector(&matcher.selector)?;
    let document = Html::parse_document(html);

    let element = document
        .select(&selector)
        .find(|element| text_matches(element, matcher.text.as_deref()))
        .ok_or_else(|| SessionError::ElementNotFound {
            selector: matcher.to_string(),
        })?;

    let not_activatable = || SessionError::NotActivatable {
        selector: matcher.to_string(),
        tag: element.value().name().to_string(),
    };

    if let Some(href) = element.value().attr("href") {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return Ok(Activation::InPage);
        }
        if href.to_ascii_lowercase().starts_with("javascript:") {
            return Err(not_activatable());
        }
        return Ok(Activation::Follow(href.to_string()));
    }

    let form = element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name().eq_ignore_ascii_case("form"))
        .ok_or_else(not_activatable)?;

    Ok(Activation::Submit(form_submission(&form, &element)?))
}

fn form_submission(form: &ElementRef<'_>, submitter: &ElementRef<'_>) -> SessionResult<FormSubmission> {
    let action = submitter
        .value()
        .attr("formaction")
        .or_else(|| form.value().attr("action"))
        .map(str::trim)
        .filter(|action| !action.is_empty())
        .map(str::to_string);

    let method = match submitter
        .value()
        .attr("formmethod")
        .or_else(|| form.value().attr("method"))
    {
        Some(method) if method.eq_ignore_ascii_case("post") => FormMethod::Post,
        _ => FormMethod::Get,
    };

    let mut fields = Vec::new();

    let inputs = parse_selector("input[name]")?;
    for input in form.select(&inputs) {
        let value = input.value();
        let kind = value.attr("type").unwrap_or("text").to_ascii_lowercase();
        match kind.as_str() {
            "submit" | "button" | "image" | "reset" | "file" => continue,
            "checkbox" | "radio" if value.attr("checked").is_none() => continue,
            _ => {}
        }
        let default = if kind == "checkbox" { "on" } else { "" };
        if let Some(name) = value.attr("name") {
            fields.push((name.to_string(), value.attr("value").unwrap_or(default).to_string()));
        }
    }

    let textareas = parse_selector("textarea[name]")?;
    for textarea in form.select(&textareas) {
        if let Some(name) = textarea.value().attr("name") {
            fields.push((name.to_string(), textarea.text().collect()));
        }
    }

    if let Some(name) = submitter.value().attr("name") {
        let value = submitter.value().attr("value").unwrap_or("");
        fields.push((name.to_string(), value.to_string()));
    }

    Ok(FormSubmission {
        action,
        method,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GATE_PAGE: &str = r#"
        <html><body>
            <div class="age-gate">
                <p>Are you 18 years
                   of age or older?</p>
                <a href="/age-verify?answer=yes" class="btn">Yes</a>
                <a href="https://www.example.gov/" class="btn">No</a>
            </div>
        </body></html>
    "#;

    #[test]
    fn test_contains_text_normalizes_whitespace_and_case() {
        assert!(contains_text(GATE_PAGE, "are you 18 years of age or older?"));
        assert!(!contains_text(GATE_PAGE, "Access denied"));
    }

    #[test]
    fn test_query_filters_by_text() {
        let yes = query(GATE_PAGE, &ElementMatcher::css("a").with_text("yes")).unwrap();
        assert_eq!(yes.len(), 1);
        assert_eq!(yes[0].tag, "a");
        assert_eq!(yes[0].text, "Yes");
        assert_eq!(yes[0].href.as_deref(), Some("/age-verify?answer=yes"));

        let all = query(GATE_PAGE, &ElementMatcher::css("a.btn")).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_invalid_selector() {
        let result = query(GATE_PAGE, &ElementMatcher::css("a[href"));
        assert!(matches!(result, Err(SessionError::InvalidSelector { .. })));
    }

    #[test]
    fn test_activation_follows_links() {
        let activation = activation(GATE_PAGE, &ElementMatcher::css("a").with_text("Yes")).unwrap();
        assert_eq!(activation, Activation::Follow("/age-verify?answer=yes".to_string()));
    }

    #[test]
    fn test_activation_of_fragment_and_script_links() {
        let html = r##"<a href="#top">Top</a><a href="javascript:void(0)">Yes</a>"##;
        assert_eq!(
            activation(html, &ElementMatcher::css("a").with_text("Top")).unwrap(),
            Activation::InPage
        );
        assert!(matches!(
            activation(html, &ElementMatcher::css("a").with_text("Yes")),
            Err(SessionError::NotActivatable { .. })
        ));
    }

    #[test]
    fn test_activation_missing_element() {
        let result = activation(GATE_PAGE, &ElementMatcher::css("button").with_text("Yes"));
        assert!(matches!(result, Err(SessionError::ElementNotFound { .. })));
    }

    #[test]
    fn test_activation_submits_enclosing_form() {
        let html = r#"
            <form action="/consent" method="POST">
                <input type="hidden" name="token" value="abc123">
                <input type="checkbox" name="remember">
                <input type="checkbox" name="agree" checked>
                <input type="submit" name="ignored" value="x">
                <button type="submit" name="answer" value="yes">Yes</button>
            </form>
        "#;

        let activation = activation(html, &ElementMatcher::css("button").with_text("Yes")).unwrap();
        assert_eq!(
            activation,
            Activation::Submit(FormSubmission {
                action: Some("/consent".to_string()),
                method: FormMethod::Post,
                fields: vec![
                    ("token".to_string(), "abc123".to_string()),
                    ("agree".to_string(), "on".to_string()),
                    ("answer".to_string(), "yes".to_string()),
                ],
            })
        );
    }

    #[test]
    fn test_button_outside_form_is_not_activatable() {
        let html = r#"<div role="button">Yes</div>"#;
        let result = activation(html, &ElementMatcher::css("[role='button']").with_text("Yes"));
        assert!(matches!(result, Err(SessionError::NotActivatable { .. })));
    }
}

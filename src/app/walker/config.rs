//! Page walker configuration

use std::time::Duration;

use crate::app::models::DocumentFormat;
use crate::app::session::{dom, ElementMatcher};
use crate::constants::walker;
use crate::errors::{ConfigError, ConfigResult};

/// Configuration for walking listing pages
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Pause before activating each "next" control
    pub page_delay: Duration,
    /// Pause after dismissing the consent gate
    pub gate_settle_delay: Duration,
    /// Visible text identifying the consent prompt
    pub consent_prompt: String,
    /// Affirmative consent controls, tried in order
    pub consent_controls: Vec<ElementMatcher>,
    /// "Next page" controls, tried in order; first match wins
    pub next_controls: Vec<ElementMatcher>,
    /// Which links count as documents
    pub format: DocumentFormat,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            page_delay: walker::PAGE_DELAY,
            gate_settle_delay: walker::GATE_SETTLE_DELAY,
            consent_prompt: walker::CONSENT_PROMPT_TEXT.to_string(),
            consent_controls: default_consent_controls(),
            next_controls: default_next_controls(),
            format: DocumentFormat::pdf(),
        }
    }
}

impl WalkerConfig {
    /// Same matchers, no pauses
    pub fn without_delays(mut self) -> Self {
        self.page_delay = Duration::ZERO;
        self.gate_settle_delay = Duration::ZERO;
        self
    }

    /// Check that every matcher selector parses
    pub fn validate(&self) -> ConfigResult<()> {
        let groups = [
            ("walker.consent_controls", &self.consent_controls),
            ("walker.next_controls", &self.next_controls),
        ];

        for (field, matchers) in groups {
            for (index, matcher) in matchers.iter().enumerate() {
                if dom::parse_selector(&matcher.selector).is_err() {
                    return Err(ConfigError::InvalidValue {
                        field: format!("{}[{}].selector", field, index),
                        value: matcher.selector.clone(),
                        reason: "Not a valid CSS selector".to_string(),
                    });
                }
            }
        }

        if self.next_controls.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "walker.next_controls".to_string(),
                value: "[]".to_string(),
                reason: "At least one next-page matcher is required".to_string(),
            });
        }

        Ok(())
    }
}

/// `a`, `button` and `[role='button']` controls reading "Yes"
pub fn default_consent_controls() -> Vec<ElementMatcher> {
    walker::CONSENT_SELECTORS
        .iter()
        .map(|selector| ElementMatcher::css(*selector).with_text(walker::CONSENT_AFFIRMATIVE_TEXT))
        .collect()
}

/// Listing pager first, `rel=next` second, then "Next" links that paginate
pub fn default_next_controls() -> Vec<ElementMatcher> {
    vec![
        ElementMatcher::css(walker::NEXT_PAGER_SELECTOR),
        ElementMatcher::css(walker::NEXT_REL_SELECTOR),
        ElementMatcher::css(".pager a").with_text(walker::NEXT_TEXT),
        ElementMatcher::css(walker::PAGE_QUERY_LINK_SELECTOR).with_text(walker::NEXT_TEXT),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WalkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.consent_controls.len(), 3);
        assert_eq!(config.next_controls[0].selector, walker::NEXT_PAGER_SELECTOR);
    }

    #[test]
    fn test_invalid_selector_is_reported_with_field() {
        let mut config = WalkerConfig::default();
        config.next_controls.push(ElementMatcher::css("a[rel="));

        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "walker.next_controls[4].selector");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_without_delays() {
        let config = WalkerConfig::default().without_delays();
        assert_eq!(config.page_delay, Duration::ZERO);
        assert_eq!(config.gate_settle_delay, Duration::ZERO);
    }
}

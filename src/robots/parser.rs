//! Robots.txt rule extraction
//!
//! The `robotstxt` crate tokenizes the file and reports each directive through
//! its parse callbacks; this module keeps only the Disallow values of the
//! wildcard (`User-agent: *`) groups and compiles each one into an anchored
//! regex.

use regex::Regex;
use robotstxt::{parse_robotstxt, RobotsParseHandler};
use std::collections::BTreeMap;

/// Disallow patterns that apply to every user agent
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    disallow: BTreeMap<String, Regex>,
}

impl PartialEq for RobotsRules {
    fn eq(&self, other: &Self) -> bool {
        self.disallow.keys().eq(other.disallow.keys())
    }
}

impl Eq for RobotsRules {}

impl RobotsRules {
    /// Parses raw robots.txt content
    ///
    /// Consecutive `User-agent` lines form one group; a `User-agent` line that
    /// follows a rule starts a new group. Empty `Disallow:` values allow
    /// everything and are therefore dropped.
    pub fn from_content(content: &str) -> Self {
        let mut collector = WildcardGroupCollector::default();
        parse_robotstxt(content, &mut collector);
        Self::from_patterns(collector.disallow)
    }

    /// Builds rules directly from a list of patterns
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let disallow = patterns
            .into_iter()
            .map(Into::into)
            .filter(|p: &String| !p.is_empty())
            .filter_map(|pattern| match compile_pattern(&pattern) {
                Ok(regex) => Some((pattern, regex)),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, "Ignoring robots.txt pattern: {}", e);
                    None
                }
            })
            .collect();
        Self { disallow }
    }

    /// Rules that allow everything
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Checks whether a base-relative path (plus query) is disallowed
    pub fn is_disallowed(&self, path: &str) -> bool {
        self.disallow.values().any(|regex| regex.is_match(path))
    }

    /// Returns the disallow patterns in sorted order
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.disallow.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.disallow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disallow.is_empty()
    }
}

/// Translates a Disallow value into a regex anchored at the start of the path
///
/// `*` matches any run of characters and a trailing `$` anchors the end;
/// everything else is literal.
fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let (body, anchored) = match pattern.strip_suffix('$') {
        Some(head) => (head, true),
        None => (pattern, false),
    };
    let literal: Vec<String> = body.split('*').map(regex::escape).collect();
    let mut source = format!("^{}", literal.join(".*"));
    if anchored {
        source.push('$');
    }
    Regex::new(&source)
}

#[derive(Default)]
struct WildcardGroupCollector {
    in_wildcard_group: bool,
    seen_rule_in_group: bool,
    disallow: Vec<String>,
}

impl RobotsParseHandler for WildcardGroupCollector {
    fn handle_robots_start(&mut self) {}

    fn handle_robots_end(&mut self) {}

    fn handle_user_agent(&mut self, _line_num: u32, user_agent: &str) {
        if self.seen_rule_in_group {
            self.in_wildcard_group = false;
            self.seen_rule_in_group = false;
        }
        if user_agent.trim() == "*" {
            self.in_wildcard_group = true;
        }
    }

    fn handle_allow(&mut self, _line_num: u32, _value: &str) {
        self.seen_rule_in_group = true;
    }

    fn handle_disallow(&mut self, _line_num: u32, value: &str) {
        self.seen_rule_in_group = true;
        let value = value.trim();
        if self.in_wildcard_group && !value.is_empty() {
            self.disallow.push(value.to_string());
        }
    }

    fn handle_sitemap(&mut self, _line_num: u32, _value: &str) {}

    fn handle_unknown_action(&mut self, _line_num: u32, _action: &str, _value: &str) {}
}

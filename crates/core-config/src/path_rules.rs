//! Per-path configuration rules (spec §6 "Configuration").
//!
//! A rule is a file-path glob plus a set of options (syntax language, tab
//! size, tab-expand, auto-indent, show-tabs, show-spaces,
//! show-line-numbers, styles by token role). `ConfigForPath` merges every
//! rule whose glob matches a given path, later rules overriding earlier
//! ones field by field, and returns the resulting effective configuration.

use globset::{Glob, GlobMatcher};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// A display style attached to a token role by a `[rule.styles]` table.
/// Colour representation is left as plain strings (e.g. `"red"` or
/// `"#ff8800"`) — interpreting them into a concrete palette is the
/// rendering layer's job, out of scope here.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RoleStyle {
    #[serde(default)]
    pub fg: Option<String>,
    #[serde(default)]
    pub bg: Option<String>,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

/// The options half of a rule; every field is optional so a rule can
/// override just the settings it cares about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleOptions {
    pub syntax: Option<String>,
    pub tab_size: Option<u8>,
    pub tab_expand: Option<bool>,
    pub auto_indent: Option<bool>,
    pub show_tabs: Option<bool>,
    pub show_spaces: Option<bool>,
    pub show_line_numbers: Option<bool>,
    #[serde(default)]
    pub styles: HashMap<String, RoleStyle>,
}

/// One `[[rule]]` table: a glob plus the options it sets.
#[derive(Debug, Clone, Deserialize)]
pub struct PathRule {
    pub glob: String,
    #[serde(flatten)]
    pub options: RuleOptions,
}

/// Defaults applied when no rule (or no matching rule) names a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub syntax: Option<String>,
    pub tab_size: u8,
    pub tab_expand: bool,
    pub auto_indent: bool,
    pub show_tabs: bool,
    pub show_spaces: bool,
    pub show_line_numbers: bool,
    pub styles: HashMap<String, RoleStyle>,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            syntax: None,
            tab_size: 4,
            tab_expand: true,
            auto_indent: true,
            show_tabs: false,
            show_spaces: false,
            show_line_numbers: true,
            styles: HashMap::new(),
        }
    }
}

/// Compiled rule set: each rule's glob precompiled once, reused for every
/// `config_for_path` call rather than recompiled per lookup.
#[derive(Debug, Clone, Default)]
pub struct PathRuleSet {
    rules: Vec<(GlobMatcher, RuleOptions)>,
}

impl PathRuleSet {
    pub fn compile(rules: &[PathRule]) -> Result<Self, globset::Error> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let matcher = Glob::new(&rule.glob)?.compile_matcher();
            compiled.push((matcher, rule.options.clone()));
        }
        Ok(PathRuleSet { rules: compiled })
    }

    /// Merge every rule whose glob matches `path`, later rules in file
    /// order overriding earlier ones field by field.
    pub fn config_for_path(&self, path: &Path) -> EffectiveConfig {
        let mut effective = EffectiveConfig::default();
        for (matcher, options) in &self.rules {
            if !matcher.is_match(path) {
                continue;
            }
            if let Some(v) = &options.syntax {
                effective.syntax = Some(v.clone());
            }
            if let Some(v) = options.tab_size {
                effective.tab_size = v;
            }
            if let Some(v) = options.tab_expand {
                effective.tab_expand = v;
            }
            if let Some(v) = options.auto_indent {
                effective.auto_indent = v;
            }
            if let Some(v) = options.show_tabs {
                effective.show_tabs = v;
            }
            if let Some(v) = options.show_spaces {
                effective.show_spaces = v;
            }
            if let Some(v) = options.show_line_numbers {
                effective.show_line_numbers = v;
            }
            for (role, style) in &options.styles {
                effective.styles.insert(role.clone(), style.clone());
            }
        }
        effective
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(glob: &str, options: RuleOptions) -> PathRule {
        PathRule {
            glob: glob.to_string(),
            options,
        }
    }

    #[test]
    fn unmatched_path_gets_defaults() {
        let set = PathRuleSet::compile(&[]).unwrap();
        let eff = set.config_for_path(Path::new("foo.rs"));
        assert_eq!(eff, EffectiveConfig::default());
    }

    #[test]
    fn matching_glob_sets_syntax() {
        let set = PathRuleSet::compile(&[rule(
            "*.rs",
            RuleOptions {
                syntax: Some("rust".into()),
                tab_size: Some(4),
                tab_expand: Some(true),
                ..Default::default()
            },
        )])
        .unwrap();
        let eff = set.config_for_path(Path::new("main.rs"));
        assert_eq!(eff.syntax.as_deref(), Some("rust"));
        assert_eq!(eff.tab_size, 4);
        assert!(eff.tab_expand);

        let unmatched = set.config_for_path(Path::new("main.go"));
        assert_eq!(unmatched.syntax, None);
    }

    #[test]
    fn later_rule_overrides_earlier_field_by_field() {
        let set = PathRuleSet::compile(&[
            rule(
                "*.go",
                RuleOptions {
                    syntax: Some("go".into()),
                    tab_size: Some(4),
                    tab_expand: Some(true),
                    ..Default::default()
                },
            ),
            rule(
                "vendor/*.go",
                RuleOptions {
                    tab_size: Some(8),
                    ..Default::default()
                },
            ),
        ])
        .unwrap();
        let eff = set.config_for_path(Path::new("vendor/dep.go"));
        // Still comes from the first rule: the second rule never set it.
        assert_eq!(eff.syntax.as_deref(), Some("go"));
        // Overridden by the second, later-matching rule.
        assert_eq!(eff.tab_size, 8);
        assert!(eff.tab_expand);
    }

    #[test]
    fn styles_merge_by_role_name() {
        let mut styles_a = HashMap::new();
        styles_a.insert(
            "keyword".to_string(),
            RoleStyle {
                fg: Some("blue".into()),
                ..Default::default()
            },
        );
        let mut styles_b = HashMap::new();
        styles_b.insert(
            "comment".to_string(),
            RoleStyle {
                fg: Some("green".into()),
                ..Default::default()
            },
        );
        let set = PathRuleSet::compile(&[
            rule(
                "*.rs",
                RuleOptions {
                    styles: styles_a,
                    ..Default::default()
                },
            ),
            rule(
                "*.rs",
                RuleOptions {
                    styles: styles_b,
                    ..Default::default()
                },
            ),
        ])
        .unwrap();
        let eff = set.config_for_path(Path::new("lib.rs"));
        assert_eq!(eff.styles.len(), 2);
        assert_eq!(eff.styles["keyword"].fg.as_deref(), Some("blue"));
        assert_eq!(eff.styles["comment"].fg.as_deref(), Some("green"));
    }
}

//! # Route Permissions
//!
//! Maps navigation paths to the single [`Capability`] required to open them.
//!
//! Resolution runs in three tiers, most specific first:
//!
//! 1. **Exact**: the normalized path equals a literal template.
//! 2. **Parameterized**: templates with `:param` segments, matched segment by
//!    segment. The first match in table order wins.
//! 3. **Prefix fallback**: a small fixed set of protected prefixes, each with
//!    a default capability.
//!
//! Anything else needs no capability. Resolution is total: every string,
//! including the empty one, produces either a match or `None`.
//!
//! Templates that the segment matcher cannot express (an empty parameter
//! name, or modifier and group characters such as `?`, `*`, `(`, `{`) are
//! compiled into an anchored regex where each `:name` run matches one
//! non-empty segment.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::permissions::Capability;
use crate::subjects::Subject;

/// Characters that make a template unsuitable for the segment matcher.
const MODIFIER_CHARS: [char; 7] = ['?', '*', '+', '(', ')', '{', '}'];

/// Which tier produced a [`RouteMatch`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RouteMatchTier {
    /// Literal template equal to the path.
    Exact,
    /// Template with parameter segments.
    Parameterized,
    /// Protected top-level prefix default.
    PrefixFallback,
}

impl RouteMatchTier {
    /// Get the string representation of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMatchTier::Exact => "exact",
            RouteMatchTier::Parameterized => "parameterized",
            RouteMatchTier::PrefixFallback => "prefix_fallback",
        }
    }
}

/// Successful route resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteMatch {
    /// Capability required to open the path.
    pub capability: Capability,
    /// Tier that matched.
    pub tier: RouteMatchTier,
    /// Template (or prefix) that matched.
    pub template: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
enum Matcher {
    /// Literal template; only reachable through the exact tier.
    Literal,
    Segments(Vec<Segment>),
    Regex(Regex),
    /// Fallback regex failed to compile; matches nothing.
    Never,
}

/// A path template bound to one capability.
///
/// # Example
///
/// ```
/// use portal_rbac::routes::RoutePattern;
/// use portal_rbac::{Action, Capability, Subject};
///
/// let pattern = RoutePattern::new(
///     "/dashboard/forms/:formId",
///     Capability::new(Subject::Forms, Action::Read),
/// );
/// assert!(pattern.is_parameterized());
/// assert!(pattern.matches("/dashboard/forms/123"));
/// assert!(!pattern.matches("/dashboard/forms/123/edit"));
/// ```
#[derive(Debug, Clone)]
pub struct RoutePattern {
    template: String,
    capability: Capability,
    matcher: Matcher,
}

impl RoutePattern {
    /// Compile a template.
    pub fn new(template: impl Into<String>, capability: Capability) -> Self {
        let template = template.into();
        let matcher = compile(&template);
        Self {
            template,
            capability,
            matcher,
        }
    }

    /// The template text.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The capability this template requires.
    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Check if the template has parameter segments.
    pub fn is_parameterized(&self) -> bool {
        !matches!(self.matcher, Matcher::Literal)
    }

    /// Check if the template is handled by the regex fallback.
    pub fn uses_regex_fallback(&self) -> bool {
        matches!(self.matcher, Matcher::Regex(_) | Matcher::Never)
    }

    /// Check whether a normalized path matches this template.
    pub fn matches(&self, path: &str) -> bool {
        match &self.matcher {
            Matcher::Literal => self.template == path,
            Matcher::Segments(segments) => match_segments(segments, path),
            Matcher::Regex(re) => re.is_match(path),
            Matcher::Never => false,
        }
    }
}

fn compile(template: &str) -> Matcher {
    if !template.contains(':') && !template.contains(MODIFIER_CHARS) {
        return Matcher::Literal;
    }

    let mut segments = Vec::new();
    for part in template.split('/') {
        match parse_segment(part) {
            Some(segment) => segments.push(segment),
            None => return compile_regex(template),
        }
    }
    Matcher::Segments(segments)
}

/// `None` when the segment needs the regex fallback.
fn parse_segment(part: &str) -> Option<Segment> {
    if let Some(name) = part.strip_prefix(':') {
        let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        return valid.then(|| Segment::Param(name.to_string()));
    }
    if part.contains(':') || part.contains(MODIFIER_CHARS) {
        return None;
    }
    Some(Segment::Literal(part.to_string()))
}

fn compile_regex(template: &str) -> Matcher {
    let body: Vec<String> = template
        .split('/')
        .map(|part| match part.find(':') {
            // `:` followed by at least one character swallows the rest of the segment.
            Some(idx) if idx + 1 < part.len() => format!("{}[^/]+", regex::escape(&part[..idx])),
            _ => regex::escape(part),
        })
        .collect();
    let source = format!("^{}$", body.join("/"));

    match Regex::new(&source) {
        Ok(re) => {
            tracing::debug!(template, regex = %source, "route template compiled with regex fallback");
            Matcher::Regex(re)
        }
        Err(err) => {
            tracing::warn!(template, error = %err, "route template unusable, it will never match");
            Matcher::Never
        }
    }
}

fn match_segments(segments: &[Segment], path: &str) -> bool {
    let mut parts = path.split('/');
    for segment in segments {
        let Some(part) = parts.next() else {
            return false;
        };
        let ok = match segment {
            Segment::Literal(lit) => lit == part,
            Segment::Param(_) => !part.is_empty(),
        };
        if !ok {
            return false;
        }
    }
    parts.next().is_none()
}

/// A protected top-level prefix and its default capability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrefixRule {
    /// Raw prefix; compared with `starts_with`.
    pub prefix: String,
    /// Capability assumed for unmapped paths under the prefix.
    pub capability: Capability,
}

/// Strip query, fragment and trailing slashes.
///
/// # Returns
///
/// `None` for the empty string; `"/"` when nothing but slashes remain.
///
/// # Example
///
/// ```
/// use portal_rbac::routes::normalize_path;
///
/// assert_eq!(normalize_path("/dashboard/overview/?tab=1"), Some("/dashboard/overview"));
/// assert_eq!(normalize_path("///"), Some("/"));
/// assert_eq!(normalize_path(""), None);
/// ```
pub fn normalize_path(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() {
        Some("/")
    } else {
        Some(trimmed)
    }
}

/// Static, ordered route configuration.
///
/// Literal templates go to a hash map; when the same literal appears twice
/// the first entry is kept. Parameterized templates keep insertion order,
/// which is their priority.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    exact: HashMap<String, Capability>,
    parameterized: Vec<RoutePattern>,
    prefixes: Vec<PrefixRule>,
}

impl RouteTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route template.
    pub fn route(mut self, template: &str, subject: Subject, action: Action) -> Self {
        let pattern = RoutePattern::new(template, Capability::new(subject, action));
        if pattern.is_parameterized() {
            self.parameterized.push(pattern);
        } else {
            self.exact
                .entry(pattern.template)
                .or_insert(pattern.capability);
        }
        self
    }

    /// Add a protected prefix with its default capability.
    pub fn prefix(mut self, prefix: &str, subject: Subject, action: Action) -> Self {
        self.prefixes.push(PrefixRule {
            prefix: prefix.to_string(),
            capability: Capability::new(subject, action),
        });
        self
    }

    /// Number of literal templates.
    pub fn exact_len(&self) -> usize {
        self.exact.len()
    }

    /// Parameterized templates in priority order.
    pub fn parameterized(&self) -> &[RoutePattern] {
        &self.parameterized
    }

    /// Prefix rules in priority order.
    pub fn prefixes(&self) -> &[PrefixRule] {
        &self.prefixes
    }

    /// Resolve a path against the three tiers.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        let path = normalize_path(path)?;

        if let Some((template, capability)) = self.exact.get_key_value(path) {
            return Some(RouteMatch {
                capability: *capability,
                tier: RouteMatchTier::Exact,
                template: template.clone(),
            });
        }

        if let Some(pattern) = self.parameterized.iter().find(|p| p.matches(path)) {
            return Some(RouteMatch {
                capability: pattern.capability,
                tier: RouteMatchTier::Parameterized,
                template: pattern.template.clone(),
            });
        }

        self.prefixes
            .iter()
            .find(|rule| path.starts_with(&rule.prefix))
            .map(|rule| RouteMatch {
                capability: rule.capability,
                tier: RouteMatchTier::PrefixFallback,
                template: rule.prefix.clone(),
            })
    }

    /// Check whether a path falls under a protected prefix.
    pub fn is_protected(&self, path: &str) -> bool {
        normalize_path(path)
            .map(|path| self.prefixes.iter().any(|rule| path.starts_with(&rule.prefix)))
            .unwrap_or(false)
    }

    /// The portal's route configuration.
    pub fn portal() -> Self {
        use Action::{Create, Read};
        use Subject::*;

        RouteTable::new()
            .route("/dashboard", Dashboard, Read)
            .route("/dashboard/onboarding", Onboarding, Read)
            .route("/dashboard/overview", Dashboard, Read)
            .route("/dashboard/documents", Documents, Read)
            .route("/dashboard/requests", Requests, Read)
            .route("/dashboard/reporting-obligations", Reporting, Read)
            .route("/dashboard/reporting-obligations/obligations", Reporting, Read)
            .route("/dashboard/reporting-obligations/submitted", Reporting, Read)
            .route("/dashboard/reporting-obligations/received", Reporting, Read)
            .route("/dashboard/profile", Profile, Read)
            .route("/dashboard/settings", Settings, Read)
            .route("/dashboard/support", Dashboard, Read)
            .route("/dashboard/chat-support", Dashboard, Read)
            .route("/dashboard/help-center", HelpCenter, Read)
            .route("/dashboard/forms/book-consultation-for-entrepreneurship", Forms, Create)
            .route("/dashboard/forms/cancel-loan", Forms, Create)
            .route("/dashboard/forms/collateral-user-guide", Forms, Read)
            .route("/dashboard/forms/disburse-approved-loan", Forms, Create)
            .route("/dashboard/forms/facilitate-communication", Forms, Create)
            .route("/dashboard/forms/issue-support-letter", Forms, Create)
            .route("/dashboard/forms/needs-assessment-form", Forms, Create)
            .route("/dashboard/forms/reallocation-of-loan-disbursement", Forms, Create)
            .route("/dashboard/forms/request-for-funding", Forms, Create)
            .route("/dashboard/forms/request-for-membership", Forms, Create)
            .route("/dashboard/forms/request-to-amend-existing-loan-details", Forms, Create)
            .route("/dashboard/forms/training-in-entrepreneurship", Forms, Create)
            .route("/forms/needs-assessment", Forms, Create)
            .route("/forms/request-for-membership", Forms, Create)
            .route("/forms/request-for-funding", Forms, Create)
            .route("/forms/book-consultation", Forms, Create)
            .route("/forms/cancel-loan", Forms, Create)
            .route("/forms/collateral-user-guide", Forms, Read)
            .route("/forms/disburse-approved-loan", Forms, Create)
            .route("/forms/facilitate-communication", Forms, Create)
            .route("/forms/reallocation-of-loan-disbursement", Forms, Create)
            .route("/forms/request-to-amend-existing-loan-details", Forms, Create)
            .route("/forms/training-in-entrepreneurship", Forms, Create)
            .route("/forms/issue-support-letter", Forms, Create)
            .route("/marketplace", Marketplace, Read)
            .route("/courses", Marketplace, Read)
            .route("/financial", Marketplace, Read)
            .route("/non-financial", Marketplace, Read)
            .route("/knowledge-hub", Marketplace, Read)
            .route("/dashboard/forms/:formId", Forms, Read)
            .route("/dashboard/documents/:documentId", Documents, Read)
            .route("/dashboard/requests/:requestId", Requests, Read)
            .route("/dashboard/reporting-obligations/:section/:obligationId", Reporting, Read)
            .prefix("/dashboard", Dashboard, Read)
            .prefix("/forms", Forms, Create)
    }
}

fn portal_table() -> &'static Arc<RouteTable> {
    static TABLE: OnceLock<Arc<RouteTable>> = OnceLock::new();
    TABLE.get_or_init(|| Arc::new(RouteTable::portal()))
}

/// Resolves paths to required capabilities over a shared [`RouteTable`].
///
/// Cloning is cheap; clones share the table.
#[derive(Debug, Clone)]
pub struct RoutePermissionResolver {
    table: Arc<RouteTable>,
}

impl Default for RoutePermissionResolver {
    fn default() -> Self {
        Self {
            table: Arc::clone(portal_table()),
        }
    }
}

impl RoutePermissionResolver {
    /// Resolver over a custom table.
    pub fn new(table: RouteTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// The underlying table.
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Full resolution result, including the tier and template.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        let resolved = self.table.resolve(path);
        if let Some(m) = &resolved {
            tracing::trace!(path, template = %m.template, tier = m.tier.as_str(), capability = %m.capability, "route resolved");
        }
        resolved
    }

    /// The capability required for `path`, or `None` when no capability is needed.
    ///
    /// # Example
    ///
    /// ```
    /// use portal_rbac::{Action, Capability, RoutePermissionResolver, Subject};
    ///
    /// let resolver = RoutePermissionResolver::default();
    /// assert_eq!(
    ///     resolver.required_capability("/dashboard/forms/123"),
    ///     Some(Capability::new(Subject::Forms, Action::Read))
    /// );
    /// assert_eq!(resolver.required_capability("/about"), None);
    /// ```
    pub fn required_capability(&self, path: &str) -> Option<Capability> {
        self.resolve(path).map(|m| m.capability)
    }

    /// Check whether `path` sits under a protected prefix.
    pub fn is_protected(&self, path: &str) -> bool {
        self.table.is_protected(path)
    }
}

/// [`RoutePermissionResolver::required_capability`] over the portal table.
pub fn resolve_required_capability(path: &str) -> Option<Capability> {
    portal_table().resolve(path).map(|m| m.capability)
}

/// [`RoutePermissionResolver::is_protected`] over the portal table.
pub fn is_protected(path: &str) -> bool {
    portal_table().is_protected(path)
}

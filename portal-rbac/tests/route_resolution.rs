//! Property tests for route resolution.
//!
//! Paths are generated from a mix of portal segments, random unicode,
//! parameter-like values, trailing slashes and query strings.

use portal_rbac::{
    is_protected, resolve_required_capability, Action, CapabilityMatrixBuilder, EffectiveRole,
    RouteMatchTier, RoutePermissionResolver, Subject,
};
use proptest::prelude::*;

fn known_segment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("dashboard".to_string()),
        Just("forms".to_string()),
        Just("documents".to_string()),
        Just("requests".to_string()),
        Just("reporting-obligations".to_string()),
        Just("onboarding".to_string()),
        Just("overview".to_string()),
        Just("marketplace".to_string()),
        Just("".to_string()),
        "[0-9]{1,6}",
        "[a-z\\-]{1,12}",
        "\\PC{1,8}",
    ]
}

fn generated_path() -> impl Strategy<Value = String> {
    let structured = (
        proptest::collection::vec(known_segment(), 0..6),
        prop_oneof![Just(""), Just("/"), Just("//")],
        prop_oneof![Just(String::new()), "\\?[a-z]{1,5}=[^#]{0,6}", "#[a-z]{0,4}"],
    )
        .prop_map(|(segments, trailing, suffix)| {
            format!("/{}{}{}", segments.join("/"), trailing, suffix)
        });

    prop_oneof![3 => structured, 1 => "\\PC{0,40}", 1 => ".{0,40}"]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn test_resolution_is_total(path in generated_path()) {
        let resolver = RoutePermissionResolver::default();
        let resolved = resolver.resolve(&path);

        if let Some(m) = &resolved {
            prop_assert!(!m.template.is_empty());
        }
        prop_assert_eq!(resolved.map(|m| m.capability), resolve_required_capability(&path));
    }

    #[test]
    fn test_trailing_slash_and_query_are_ignored(path in generated_path()) {
        let base = resolve_required_capability(&path);
        prop_assert_eq!(resolve_required_capability(&format!("{path}/")), base);
        prop_assert_eq!(resolve_required_capability(&format!("{path}?tab=2")), base);
    }

    #[test]
    fn test_protected_paths_always_need_a_capability(path in generated_path()) {
        if is_protected(&path) {
            prop_assert!(resolve_required_capability(&path).is_some());
        }
    }

    #[test]
    fn test_unresolved_role_is_denied_on_every_route(path in generated_path()) {
        let unresolved = CapabilityMatrixBuilder::shared(EffectiveRole::Unresolved);
        if let Some(required) = resolve_required_capability(&path) {
            prop_assert!(!unresolved.allows(required));
        }
    }
}

#[test]
fn test_dashboard_form_detail_resolves_to_forms_read() {
    let resolver = RoutePermissionResolver::default();
    let m = resolver.resolve("/dashboard/forms/123").unwrap();
    assert_eq!(m.capability.subject, Subject::Forms);
    assert_eq!(m.capability.action, Action::Read);
    assert_eq!(m.tier, RouteMatchTier::Parameterized);
}

//! Unit tests for filter resolution and application

use backup_orchestrator::config::FilterRule;
use backup_orchestrator::managers::filter::{resolve, ResolvedFilter, StaticCatalog, SYSTEM_SCHEMAS};
use rstest::rstest;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn rule(include: &[&str], exclude: &[&str], include_prefix: &[&str], exclude_prefix: &[&str]) -> FilterRule {
    FilterRule {
        include: names(include),
        exclude: names(exclude),
        include_prefix: names(include_prefix),
        exclude_prefix: names(exclude_prefix),
    }
}

const SERVER: [&str; 7] = [
    "information_schema",
    "app_main",
    "app_tmp",
    "billing",
    "logs_2024",
    "mysql",
    "sys",
];

#[rstest]
#[case::empty_rule(rule(&[], &[], &[], &[]), &["app_main", "app_tmp", "billing", "logs_2024"])]
#[case::exclude_exact(rule(&[], &["billing"], &[], &[]), &["app_main", "app_tmp", "logs_2024"])]
#[case::include_prefix(rule(&[], &[], &["app_"], &[]), &["app_main", "app_tmp"])]
#[case::exclude_wins(rule(&[], &["app_tmp"], &["app_"], &[]), &["app_main"])]
#[case::exclude_prefix(rule(&[], &[], &[], &["logs_"]), &["app_main", "app_tmp", "billing"])]
#[case::include_mixed(rule(&["billing"], &[], &["app_"], &[]), &["app_main", "app_tmp", "billing"])]
#[case::unknown_include(rule(&["missing"], &[], &[], &[]), &[])]
#[case::system_never_selected(rule(&["mysql", "billing"], &[], &[], &[]), &["billing"])]
#[tokio::test]
async fn test_schema_selection(#[case] rule: FilterRule, #[case] expected: &[&str]) {
    let server = names(&SERVER);
    let resolved = resolve(&rule, &StaticCatalog::new(server.clone()))
        .await
        .unwrap()
        .with_reserved(&SYSTEM_SCHEMAS);

    assert_eq!(resolved.apply(&server), names(expected));
}

#[tokio::test]
async fn test_names_only_reserved_when_asked() {
    let server = names(&["mysql", "gitlab"]);
    let resolved = resolve(&rule(&[], &[], &[], &[]), &StaticCatalog::new(server.clone()))
        .await
        .unwrap();

    assert_eq!(resolved.apply(&server), server);
}

#[tokio::test]
async fn test_prefix_resolution_is_case_sensitive() {
    let server = names(&["App_main", "app_main"]);
    let resolved = resolve(&rule(&[], &[], &["app_"], &[]), &StaticCatalog::new(server.clone()))
        .await
        .unwrap();

    assert_eq!(resolved.include, names(&["app_main"]));
}

#[test]
fn test_apply_keeps_input_order() {
    let resolved = ResolvedFilter {
        include: names(&["c", "a"]),
        ..Default::default()
    };
    assert_eq!(resolved.apply(&names(&["a", "b", "c"])), names(&["a", "c"]));
}

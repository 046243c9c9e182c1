//! Unit tests for plan loading and serialization.

use super::*;
use rstest::{fixture, rstest};

fn digest(c: char) -> String {
    c.to_string().repeat(64)
}

fn entry(table: &str, name: &str, c: char) -> String {
    format!(
        "[{table}]\nname = \"{name}\"\nurl = \"https://x.test/{name}-1.0.tar.gz\"\nsha256 = \"{}\"\n\n",
        digest(c)
    )
}

#[fixture]
fn three_spec_source() -> String {
    let mut source = String::from(
        "[formula]\ndescription = \"Demo tool\"\nhomepage = \"https://x.test/demo\"\nruntime = \"python3.11\"\nmin_runtime_version = \"3.8\"\n\n",
    );
    source.push_str(&entry("package", "demo", 'a'));
    source.push_str(&entry("[resource]", "requests", 'b'));
    source.push_str(&entry("[resource]", "urllib3", 'c'));
    source
}

#[rstest]
fn parses_primary_and_resources_in_order(three_spec_source: String) {
    let plan = parse_plan(&three_spec_source).expect("valid plan");

    let names: Vec<&str> = plan.specs().map(|(_, s)| s.name().as_str()).collect();
    assert_eq!(names, ["demo", "requests", "urllib3"]);
    assert_eq!(plan.len(), 3);
    assert_eq!(plan.primary().sha256().as_str(), digest('a'));

    let roles: Vec<PackageRole> = plan.specs().map(|(role, _)| role).collect();
    assert_eq!(
        roles,
        [
            PackageRole::Primary,
            PackageRole::Resource,
            PackageRole::Resource
        ]
    );
}

#[rstest]
fn parses_formula_metadata(three_spec_source: String) {
    let plan = parse_plan(&three_spec_source).expect("valid plan");
    let metadata = plan.metadata();
    assert_eq!(metadata.description(), Some("Demo tool"));
    assert_eq!(metadata.homepage(), Some("https://x.test/demo"));
    assert_eq!(metadata.runtime(), "python3.11");
    assert_eq!(metadata.min_runtime_version(), RuntimeVersion::new(3, 8, 0));
}

#[test]
fn metadata_defaults_when_formula_table_absent() {
    let plan = parse_plan(&entry("package", "pkg", 'a')).expect("valid plan");
    assert_eq!(plan.metadata(), &FormulaMetadata::default());
    assert_eq!(plan.metadata().runtime(), DEFAULT_RUNTIME);
}

#[rstest]
fn round_trip_preserves_every_spec(three_spec_source: String) {
    let plan = parse_plan(&three_spec_source).expect("valid plan");
    let rendered = plan.to_toml().expect("serializable");
    let reloaded = parse_plan(&rendered).expect("rendered plan parses");

    assert_eq!(reloaded, plan);
    for ((_, before), (_, after)) in plan.specs().zip(reloaded.specs()) {
        assert_eq!(before.name().as_str(), after.name().as_str());
        assert_eq!(before.url().as_str(), after.url().as_str());
        assert_eq!(before.sha256().as_str(), after.sha256().as_str());
    }
}

#[test]
fn missing_package_table_is_rejected() {
    let result = parse_plan(&entry("[resource]", "six", 'a'));
    assert_eq!(result, Err(SpecError::MissingPrimary));
}

#[rstest]
#[case::name("name")]
#[case::url("url")]
#[case::sha256("sha256")]
fn missing_field_is_reported_with_location(#[case] field: &str) {
    let mut source = entry("package", "pkg", 'a');
    let resource: String = entry("[resource]", "six", 'b')
        .lines()
        .filter(|line| !line.starts_with(&format!("{field} =")))
        .map(|line| format!("{line}\n"))
        .collect();
    source.push_str(&resource);

    let err = parse_plan(&source).expect_err("missing field");
    assert!(
        matches!(
            &err,
            SpecError::MissingField { entry, field: f } if entry == "resource[0]" && *f == field
        ),
        "unexpected error: {err}"
    );
}

#[rstest]
#[case::short_digest("sha256 = \"abc\"", "invalid SHA-256 digest")]
#[case::upper_digest(
    "sha256 = \"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA\"",
    "lowercase"
)]
#[case::bad_url("url = \"not a url\"", "invalid source URL")]
#[case::bad_name("name = \"bad name\"", "invalid package name")]
fn invalid_field_is_reported_with_location(#[case] replacement: &str, #[case] expected: &str) {
    let key = replacement.split(' ').next().expect("key");
    let source: String = entry("package", "pkg", 'a')
        .lines()
        .map(|line| {
            if line.starts_with(&format!("{key} =")) {
                format!("{replacement}\n")
            } else {
                format!("{line}\n")
            }
        })
        .collect();

    let err = parse_plan(&source).expect_err("invalid field");
    let message = err.to_string();
    assert!(message.starts_with("package: "), "message: {message}");
    assert!(message.contains(expected), "message: {message}");
}

#[test]
fn duplicate_names_are_rejected_after_normalization() {
    let mut source = entry("package", "python-dateutil", 'a');
    source.push_str(&entry("[resource]", "Python_DateUtil", 'b'));

    let err = parse_plan(&source).expect_err("duplicate");
    assert!(matches!(
        err,
        SpecError::DuplicateName { ref first, ref second, .. }
            if first == "package" && second == "resource[0]"
    ));
}

#[rstest]
#[case::unknown_top_level("[extra]\nkey = 1\n")]
#[case::unknown_entry_key("[package]\nname = \"p\"\nmirror = \"x\"\n")]
#[case::not_toml("[package\nname = ")]
fn unparseable_sources_are_parse_errors(#[case] source: &str) {
    let result = parse_plan(source);
    assert!(
        matches!(result, Err(SpecError::Parse { .. })),
        "expected parse error, got {result:?}"
    );
}

#[test]
fn invalid_min_runtime_version_names_formula_table() {
    let mut source = String::from("[formula]\nmin_runtime_version = \"three\"\n\n");
    source.push_str(&entry("package", "pkg", 'a'));
    let err = parse_plan(&source).expect_err("bad version");
    assert!(err.to_string().starts_with("formula: invalid runtime version"));
}

#[test]
fn load_plan_file_reports_missing_file() {
    let temp = tempfile::tempdir().expect("temp dir");
    let path = camino::Utf8PathBuf::try_from(temp.path().join("absent.toml")).expect("UTF-8");
    let err = load_plan_file(&path).expect_err("missing file");
    assert!(matches!(err, SpecError::Read { .. }));
}

#[test]
fn load_plan_file_reads_from_disk() {
    let temp = tempfile::tempdir().expect("temp dir");
    let path = camino::Utf8PathBuf::try_from(temp.path().join("plan.toml")).expect("UTF-8");
    std::fs::write(&path, entry("package", "pkg", 'd')).expect("write plan");

    let plan = load_plan_file(&path).expect("valid plan");
    assert_eq!(plan.name().as_str(), "pkg");
}

//! Tests for the JSON and SARIF report shapes.

use std::path::PathBuf;

use oasregex::config::AuditConfig;
use oasregex::report::{JsonReport, Rendered, SarifReport};
use oasregex::{AuditReport, Document, Runner};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn run_profile() -> AuditReport {
    let config = AuditConfig::parse_file(testdata_path().join("profile.yaml"))
        .expect("should parse profile");
    let doc = Document::load(testdata_path().join("petstore.yaml")).expect("should load document");
    Runner::new(&config).run(&doc)
}

fn json_value(report: &AuditReport, id: Option<&str>) -> serde_json::Value {
    let rendered = [Rendered { report, id }];
    let json = JsonReport::build(&rendered, false);
    serde_json::to_value(&json).expect("should serialize")
}

#[test]
fn test_json_top_level_fields() {
    let report = run_profile();
    let value = json_value(&report, Some("1a2b3c4d"));

    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(value["passed"], false);

    let doc = &value["documents"][0];
    assert_eq!(doc["id"], "1a2b3c4d");
    assert_eq!(doc["spec_version"], "3.0.3");
    assert_eq!(
        doc["dialects"],
        serde_json::json!(["PCRE", "ECMAScript", "RE2"])
    );
    assert_eq!(doc["summary"]["total_locations"], 15);
    assert_eq!(doc["summary"]["errors_by_dialect"]["RE2"], 6);
    assert_eq!(doc["results"].as_array().unwrap().len(), 15);
    assert_eq!(doc["skipped"].as_array().unwrap().len(), 2);
}

#[test]
fn test_json_group_fields() {
    let report = run_profile();
    let value = json_value(&report, None);
    let doc = &value["documents"][0];
    assert!(doc.get("id").is_none());

    let results = doc["results"].as_array().unwrap();
    let tag = results
        .iter()
        .find(|r| r["location"] == "#/components/schemas/Pet/properties/tag")
        .unwrap();
    assert_eq!(tag["pattern"], "[a-z");
    assert_eq!(tag["line"], 56);
    assert_eq!(tag["status"], "error");

    let first = &tag["findings"][0];
    assert_eq!(first["source"], "PCRE");
    assert_eq!(first["rule"], "dialect_syntax");
    assert_eq!(first["severity"], "error");
    assert_eq!(first["is_syntactically_valid"], false);
    assert!(first["message"].as_str().is_some_and(|m| !m.is_empty()));

    let clean = results.iter().find(|r| r["status"] == "valid").unwrap();
    assert!(clean["findings"]
        .as_array()
        .unwrap()
        .iter()
        .all(|f| f["severity"] == "valid" && f.get("suggestion").is_none()));
}

#[test]
fn test_json_report_reads_back() {
    let report = run_profile();
    let rendered = [Rendered {
        report: &report,
        id: None,
    }];
    let text = serde_json::to_string(&JsonReport::build(&rendered, true)).unwrap();
    let parsed: JsonReport = serde_json::from_str(&text).unwrap();

    assert!(parsed.passed);
    assert_eq!(parsed.documents[0].summary, report.summary);
    assert_eq!(parsed.documents[0].results.len(), report.groups.len());
}

#[test]
fn test_sarif_structure() {
    let report = run_profile();
    let sarif = SarifReport::build(&[&report]);
    let value = serde_json::to_value(&sarif).unwrap();

    assert_eq!(value["version"], "2.1.0");
    assert!(value["$schema"].as_str().unwrap().contains("sarif-schema-2.1.0"));
    assert_eq!(value["runs"][0]["tool"]["driver"]["name"], "oasregex");

    let rule_ids: Vec<&str> = sarif.runs[0]
        .tool
        .driver
        .rules
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(
        rule_ids,
        vec![
            "backtracking_risk",
            "dialect_syntax",
            "missing_anchors",
            "overly_permissive"
        ]
    );
}

#[test]
fn test_sarif_results_skip_valid_findings() {
    let report = run_profile();
    let sarif = SarifReport::build(&[&report]);
    let results = &sarif.runs[0].results;

    // 12 dialect errors and 10 quality warnings
    assert_eq!(results.len(), 22);
    assert_eq!(results.iter().filter(|r| r.level == "error").count(), 12);
    assert_eq!(results.iter().filter(|r| r.level == "warning").count(), 10);
    assert!(results.iter().all(|r| r.level != "none"));

    let tag = results
        .iter()
        .find(|r| {
            r.locations[0].logical_locations[0].fully_qualified_name
                == "#/components/schemas/Pet/properties/tag"
        })
        .unwrap();
    assert_eq!(tag.locations[0].physical_location.region.start_line, 56);
    assert!(tag.locations[0]
        .physical_location
        .artifact_location
        .uri
        .ends_with("testdata/petstore.yaml"));
    assert!(tag.message.text.starts_with("[PCRE]"));
    assert!(tag.message.text.ends_with("(pattern: [a-z)"));
}

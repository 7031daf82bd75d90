use std::fs;
use std::path::Path;

use form_model::FieldKind;
use form_schema::hash::sha256_hex;
use form_schema::{SchemaError, verify_and_load};

const SCHEMA: &str = r#"{
  "fields": [
    {
      "name": "ctl00_SiteContentPlaceHolder_FormView1_tbxAPP_SURNAME",
      "type": "text",
      "value": "",
      "text_phrase": "Surnames",
      "maxlength": "40"
    },
    {
      "name": "ctl00_SiteContentPlaceHolder_FormView1_rblPREV_US_TRAVEL_IND",
      "type": "radio",
      "value": ["Y", "N"],
      "text_phrase": "Have you ever been in the U.S.?",
      "button_ids": {
        "Y": "ctl00_SiteContentPlaceHolder_FormView1_rblPREV_US_TRAVEL_IND_0",
        "N": "ctl00_SiteContentPlaceHolder_FormView1_rblPREV_US_TRAVEL_IND_1"
      }
    }
  ],
  "dependencies": {
    "ctl00_SiteContentPlaceHolder_FormView1_rblPREV_US_TRAVEL_IND_0.Y": {
      "shows": [
        {
          "name": "ctl00_SiteContentPlaceHolder_FormView1_dtlPREV_US_VISIT_ctl00_tbxPREV_US_VISIT_LOS",
          "type": "text",
          "value": "",
          "text_phrase": "Length of Stay",
          "parent_text_phrase": "Previous Travel Details",
          "add_group": true
        }
      ],
      "hides": []
    }
  },
  "buttons": []
}"#;

const MAPPING: &str = r#"{
  "form_mapping": {
    "personal_info.surname": "ctl00_SiteContentPlaceHolder_FormView1_tbxAPP_SURNAME",
    "travel.previous_travel": "ctl00_SiteContentPlaceHolder_FormView1_rblPREV_US_TRAVEL_IND",
    "previous_travel_details.length_of_stay": "ctl00_SiteContentPlaceHolder_FormView1_dtlPREV_US_VISIT_ctl00_tbxPREV_US_VISIT_LOS"
  }
}"#;

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn write_catalog(dir: &Path, schema: &str, schema_pin: Option<&str>) {
    write(&dir.join("schemas/travel_page.json"), schema);
    write(&dir.join("mappings/travel_page_mapping.json"), MAPPING);
    let pin = schema_pin
        .map(|sha| format!("schema_sha256 = \"{sha}\"\n"))
        .unwrap_or_default();
    write(
        &dir.join("manifest.toml"),
        &format!(
            r#"[manifest]
schema = "form-engine.catalog"
schema_version = 1

[[pages]]
name = "travel_page"
title = "Travel"
category = "travel"
schema = "schemas/travel_page.json"
{pin}mapping = "mappings/travel_page_mapping.json"
mapping_sha256 = "{mapping_sha}"
"#,
            mapping_sha = sha256_hex(MAPPING.as_bytes()),
        ),
    );
}

#[test]
fn loads_pinned_catalog() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path(), SCHEMA, Some(&sha256_hex(SCHEMA.as_bytes())));

    let (catalog, summary) = verify_and_load(dir.path()).unwrap();

    assert_eq!(summary.page_count, 1);
    assert_eq!(summary.field_count, 3);
    assert_eq!(summary.rule_count, 1);
    assert_eq!(summary.mapping_count, 3);
    assert_eq!(summary.pinned_file_count, 2);

    let page = catalog.page("travel_page").unwrap();
    assert_eq!(page.category.as_deref(), Some("travel"));
    let surname = page
        .schema
        .field("ctl00_SiteContentPlaceHolder_FormView1_tbxAPP_SURNAME")
        .unwrap();
    assert_eq!(surname.max_length, Some(40));
    assert_eq!(surname.kind, FieldKind::ShortText);

    let revealed = page
        .schema
        .find_field("ctl00_SiteContentPlaceHolder_FormView1_dtlPREV_US_VISIT_ctl00_tbxPREV_US_VISIT_LOS")
        .unwrap();
    assert!(revealed.repeatable);
    assert_eq!(revealed.group_key().as_deref(), Some("previous_travel_details"));

    insta::assert_json_snapshot!(
        page.schema.field("ctl00_SiteContentPlaceHolder_FormView1_rblPREV_US_TRAVEL_IND"),
        @r#"
    {
      "name": "ctl00_SiteContentPlaceHolder_FormView1_rblPREV_US_TRAVEL_IND",
      "prompt": "Have you ever been in the U.S.?",
      "kind": {
        "kind": "single_choice",
        "choices": {
          "N": "ctl00_SiteContentPlaceHolder_FormView1_rblPREV_US_TRAVEL_IND_1",
          "Y": "ctl00_SiteContentPlaceHolder_FormView1_rblPREV_US_TRAVEL_IND_0"
        }
      },
      "optional": false,
      "repeatable": false
    }
    "#
    );
}

#[test]
fn rejects_sha_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path(), SCHEMA, Some(&"0".repeat(64)));

    let err = verify_and_load(dir.path()).unwrap_err();
    assert!(matches!(err, SchemaError::Sha256Mismatch { .. }), "{err}");
}

#[test]
fn rejects_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path(), SCHEMA, None);
    fs::remove_file(dir.path().join("schemas/travel_page.json")).unwrap();

    let err = verify_and_load(dir.path()).unwrap_err();
    assert!(matches!(err, SchemaError::MissingFile { .. }), "{err}");
}

#[test]
fn rejects_dependency_cycles() {
    let cyclic = r#"{
      "fields": [
        {"name": "rblA", "type": "radio", "value": ["Y"], "button_ids": {"Y": "rblA_0"}}
      ],
      "dependencies": {
        "rblA_0.Y": {
          "shows": [
            {"name": "rblB", "type": "radio", "value": ["Y"], "button_ids": {"Y": "rblB_0"}}
          ],
          "dependencies": {
            "rblB_0.Y": {
              "shows": [
                {"name": "rblA", "type": "radio", "value": ["Y"], "button_ids": {"Y": "rblA_0"}}
              ]
            }
          }
        }
      }
    }"#;
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path(), cyclic, None);

    let err = verify_and_load(dir.path()).unwrap_err();
    match err {
        SchemaError::DependencyCycle { page, cycle } => {
            assert_eq!(page, "travel_page");
            assert_eq!(cycle, "rblA -> rblB -> rblA");
        }
        other => panic!("expected cycle error, got {other}"),
    }
}

#[test]
fn rejects_paths_outside_catalog() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("manifest.toml"),
        r#"[manifest]
schema = "form-engine.catalog"
schema_version = 1

[[pages]]
name = "p"
title = "P"
schema = "../p.json"
mapping = "p_mapping.json"
"#,
    );
    let err = verify_and_load(dir.path()).unwrap_err();
    assert!(matches!(err, SchemaError::InvalidPath { .. }), "{err}");
}

//! End-to-end contract tests: files in, contract and tables out

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use tempfile::TempDir;

use schema_toolkit::export::contract_to_string;
use schema_toolkit::import::load_render_view;
use schema_toolkit::{
    ColumnType, ConfigError, Delimiter, InferenceConfig, PipelineError, PrepareFiles,
    PrepareOutput, load_csv, prepare_schema, render_table, write_contract, write_csv,
};

fn generated_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap()
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn files(data: &Path) -> PrepareFiles {
    PrepareFiles {
        data: data.to_path_buf(),
        ..Default::default()
    }
}

fn prepare(files: &PrepareFiles, config: &InferenceConfig) -> PrepareOutput {
    prepare_schema(files.load().unwrap(), config, generated_at()).unwrap()
}

fn contract_json(output: &PrepareOutput) -> Value {
    serde_json::from_str(&contract_to_string(&output.contract).unwrap()).unwrap()
}

mod scenario_tests {
    use super::*;

    #[test]
    fn test_integer_bounds_and_missing_rate() {
        let dir = TempDir::new().unwrap();
        let data = write(&dir, "people.csv", "age,name\n25,ann\n31,bob\n,cy\n40,dee\n");
        let output = prepare(&files(&data), &InferenceConfig::default());
        let contract = contract_json(&output);

        assert_eq!(contract["column_types"]["age"], "integer");
        assert_eq!(contract["public_bounds"]["age"], json!([25, 40]));
        assert_eq!(contract["missing_value_rates"]["age"], json!(0.25));
        assert_eq!(contract["dataset"], "people");
        assert_eq!(contract["schema_version"], "2.0.0");
    }

    #[test]
    fn test_binary_column_promoted_to_ordinal() {
        let dir = TempDir::new().unwrap();
        let data = write(&dir, "flags.csv", "flag,score\n0,1.5\n1,2.5\n1,3.5\n0,4.5\n");
        let config = InferenceConfig::builder().infer_binary_domain(true).build();
        let contract = contract_json(&prepare(&files(&data), &config));

        assert_eq!(contract["column_types"]["flag"], "ordinal");
        assert_eq!(contract["public_categories"]["flag"], json!(["0", "1"]));
        assert!(contract["public_bounds"].get("flag").is_none());
        assert_eq!(contract["column_types"]["score"], "continuous");
    }

    #[test]
    fn test_binary_column_stays_integer_without_promotion() {
        let dir = TempDir::new().unwrap();
        let data = write(&dir, "flags.csv", "flag\n0\n1\n1\n0\n");
        let contract = contract_json(&prepare(&files(&data), &InferenceConfig::default()));

        assert_eq!(contract["column_types"]["flag"], "integer");
        assert_eq!(contract["public_bounds"]["flag"], json!([0, 1]));
    }

    #[test]
    fn test_survival_target_document_generates_constraint() {
        let dir = TempDir::new().unwrap();
        let data = write(
            &dir,
            "trial.csv",
            "event,time_to_event,age\n1,12.5,60\n0,30.0,55\n1,4.25,71\n",
        );
        let target = write(
            &dir,
            "target.json",
            r#"{"targets": ["event", "time_to_event"], "kind": "survival_pair"}"#,
        );
        let mut files = files(&data);
        files.target_spec = Some(target);
        let contract = contract_json(&prepare(&files, &InferenceConfig::default()));

        let cross = contract["constraints"]["cross_column_constraints"]
            .as_array()
            .unwrap();
        assert_eq!(cross.len(), 1);
        assert_eq!(cross[0]["event_col"], "event");
        assert_eq!(cross[0]["time_col"], "time_to_event");
        assert_eq!(cross[0]["type"], "survival_pair");
        assert_eq!(
            contract["target_spec"]["survival"],
            json!({"event_column": "event", "time_column": "time_to_event"})
        );
        assert_eq!(contract["target_col"], Value::Null);
        assert_eq!(contract["label_domain"], json!([]));
    }

    #[test]
    fn test_overlay_merge_keeps_other_columns_intact() {
        let dir = TempDir::new().unwrap();
        let data = write(
            &dir,
            "ids.csv",
            "id,age\n\
             123e4567-e89b-12d3-a456-426614174000,30\n\
             123e4567-e89b-12d3-a456-426614174001,41\n",
        );
        let overlay = write(
            &dir,
            "constraints.json",
            r#"{"column_constraints": {"age": {"min_exclusive": 0}},
                "row_group_constraints": [{"name": "one_row_per_id"}]}"#,
        );
        let mut files = files(&data);
        files.constraints = Some(overlay);
        let mut output = prepare(&files, &InferenceConfig::default());

        let constraints = &mut output.contract.constraints;
        assert_eq!(
            Value::Object(constraints.column_constraints["age"].clone()),
            json!({"min_exclusive": 0})
        );
        assert_eq!(
            Value::Object(constraints.column_constraints["id"].clone()),
            json!({"semantic_role": "identifier"})
        );
        assert_eq!(constraints.row_group_constraints.len(), 1);

        constraints
            .column_constraints
            .get_mut("age")
            .unwrap()
            .insert("max".to_string(), json!(120));
        assert_eq!(
            Value::Object(constraints.column_constraints["id"].clone()),
            json!({"semantic_role": "identifier"})
        );
        assert_eq!(output.contract.provenance.guid_like_columns, vec!["id"]);
    }

    #[test]
    fn test_category_cap_suppresses_domain() {
        let dir = TempDir::new().unwrap();
        let data = write(&dir, "colors.csv", "color,size\nred,s\nblue,m\ngreen,s\n,m\n");
        let config = InferenceConfig::builder()
            .infer_categories(true)
            .max_categories(2)
            .build();
        let contract = contract_json(&prepare(&files(&data), &config));

        assert!(contract["public_categories"].get("color").is_none());
        assert_eq!(contract["missing_value_rates"]["color"], json!(0.25));
        assert_eq!(contract["public_categories"]["size"], json!(["m", "s"]));
        assert_eq!(contract["column_types"]["color"], "categorical");
    }
}

mod datetime_tests {
    use super::*;

    const VISITS: &str = "visit,weight\n\
                          2024-01-15 10:30:00,70.5\n\
                          2024-02-01 08:00:15,71.0\n\
                          ,69.8\n\
                          2024-03-20 23:59:59,70.1\n";

    #[test]
    fn test_encode_then_render_through_files() {
        let dir = TempDir::new().unwrap();
        let data = write(&dir, "visits.csv", VISITS);
        let schema_path = dir.path().join("out/schema.json");
        let encoded_path = dir.path().join("out/encoded.csv");
        let rendered_path = dir.path().join("out/rendered.csv");

        let config = InferenceConfig::builder().infer_datetimes(true).build();
        let output = prepare(&files(&data), &config);
        write_contract(&output.contract, &schema_path).unwrap();
        write_csv(&output.encoded, &encoded_path, b',').unwrap();

        assert_eq!(output.contract.column_types["visit"], ColumnType::Datetime);
        let entry = &output.contract.datetime_spec["visit"];
        assert_eq!(entry.output_format, "%Y-%m-%d %H:%M:%S");
        assert_eq!(entry.storage, "epoch_ns");
        assert_eq!(entry.timezone, "UTC");

        let encoded = load_csv(&encoded_path, Delimiter::Auto).unwrap();
        assert_eq!(
            encoded.table.column("visit").unwrap().values[0].as_deref(),
            Some("1705314600000000000")
        );

        let view = load_render_view(&schema_path).unwrap();
        let rendered = render_table(&encoded.table, &view, None, false).unwrap();
        write_csv(&rendered, &rendered_path, b',').unwrap();

        let original = load_csv(&data, Delimiter::Auto).unwrap();
        let reloaded = load_csv(&rendered_path, Delimiter::Auto).unwrap();
        assert_eq!(
            reloaded.table.column("visit").unwrap().values,
            original.table.column("visit").unwrap().values
        );
        assert_eq!(
            reloaded.table.column("weight").unwrap().values,
            original.table.column("weight").unwrap().values
        );
    }

    #[test]
    fn test_render_keep_original_appends_column() {
        let dir = TempDir::new().unwrap();
        let data = write(&dir, "visits.csv", VISITS);
        let config = InferenceConfig::builder().infer_datetimes(true).build();
        let output = prepare(&files(&data), &config);

        let schema_path = dir.path().join("schema.json");
        write_contract(&output.contract, &schema_path).unwrap();
        let view = load_render_view(&schema_path).unwrap();

        let rendered = render_table(&output.encoded, &view, None, true).unwrap();
        assert_eq!(
            rendered.column_names(),
            vec!["visit", "weight", "visit__rendered"]
        );
        assert_eq!(
            rendered.column("visit__rendered").unwrap().values[0].as_deref(),
            Some("2024-01-15 10:30:00")
        );
    }

    #[test]
    fn test_forced_output_format_recorded() {
        let dir = TempDir::new().unwrap();
        let data = write(&dir, "visits.csv", VISITS);
        let config = InferenceConfig::builder()
            .infer_datetimes(true)
            .datetime_output_format("%d/%m/%Y")
            .build();
        let contract = contract_json(&prepare(&files(&data), &config));

        assert_eq!(contract["datetime_spec"]["visit"]["output_format"], "%d/%m/%Y");
        assert_eq!(contract["datetime_spec"]["visit"]["format_source"], "forced");
    }

    #[test]
    fn test_render_requires_spec_entry() {
        let dir = TempDir::new().unwrap();
        let data = write(&dir, "visits.csv", VISITS);
        let output = prepare(&files(&data), &InferenceConfig::default());
        let schema_path = dir.path().join("schema.json");
        write_contract(&output.contract, &schema_path).unwrap();
        let view = load_render_view(&schema_path).unwrap();

        let columns = vec!["visit".to_string()];
        let result = render_table(&output.encoded, &view, Some(&columns), false);
        assert!(matches!(
            result,
            Err(PipelineError::Config(ConfigError::MissingDatetimeSpec(_)))
        ));
    }
}

mod target_tests {
    use super::*;

    const LABELLED: &str = "x,label\n1.5,yes\n2.5,no\n3.5,yes\n";

    #[test]
    fn test_label_domain_published_for_categorical_target() {
        let dir = TempDir::new().unwrap();
        let data = write(&dir, "labelled.csv", LABELLED);
        let contract = contract_json(&prepare(&files(&data), &InferenceConfig::default()));

        assert_eq!(contract["target_col"], "label");
        assert_eq!(contract["label_domain"], json!(["no", "yes"]));
        assert_eq!(contract["public_categories"]["label"], json!(["no", "yes"]));
        assert_eq!(contract["target_spec"]["kind"], "single");
    }

    #[test]
    fn test_no_publish_label_domain_withholds_target_domain() {
        let dir = TempDir::new().unwrap();
        let data = write(&dir, "labelled.csv", LABELLED);
        let config = InferenceConfig::builder()
            .infer_categories(true)
            .no_publish_label_domain(true)
            .build();
        let contract = contract_json(&prepare(&files(&data), &config));

        assert_eq!(contract["label_domain"], json!([]));
        assert!(contract["public_categories"].get("label").is_none());
    }

    #[test]
    fn test_unpaired_survival_column_aborts() {
        let dir = TempDir::new().unwrap();
        let data = write(&dir, "labelled.csv", LABELLED);
        let mut config = InferenceConfig::default();
        config.target.survival_time_col = Some("x".to_string());

        let result = prepare_schema(files(&data).load().unwrap(), &config, generated_at());
        assert!(matches!(
            result,
            Err(PipelineError::Config(ConfigError::UnpairedSurvivalColumn { .. }))
        ));
    }
}

mod provenance_tests {
    use super::*;

    #[test]
    fn test_redacted_source_path() {
        let dir = TempDir::new().unwrap();
        let data = write(&dir, "secret.csv", "a\n1\n");
        let config = InferenceConfig::builder().redact_source_path(true).build();
        let contract = contract_json(&prepare(&files(&data), &config));

        assert_eq!(
            contract["provenance"]["source_csv"],
            "example_data_path_to_csv_file"
        );
        assert_eq!(
            contract["provenance"]["effective_parameters"]["redact_source_path"],
            true
        );
    }

    #[test]
    fn test_provenance_records_inputs() {
        let dir = TempDir::new().unwrap();
        let data = write(&dir, "semi.csv", "a;b\n1;x\n2;y\n");
        let types = write(&dir, "types.json", r#"{"a": "continuous"}"#);
        let mut files = files(&data);
        files.column_types = Some(types.clone());
        let contract = contract_json(&prepare(&files, &InferenceConfig::default()));

        assert_eq!(contract["provenance"]["source_delimiter"], ";");
        assert_eq!(
            contract["provenance"]["source_csv"],
            data.display().to_string()
        );
        assert_eq!(
            contract["provenance"]["column_types_overrides"],
            types.display().to_string()
        );
        assert_eq!(contract["column_types"]["a"], "continuous");
        assert_eq!(contract["provenance"]["generated_at_utc"], "2025-03-14T09:26:53Z");
    }

    #[test]
    fn test_output_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let data = write(&dir, "d.csv", "z,a,m\n1,x,2.5\n2,y,3.5\n");
        let config = InferenceConfig::builder().infer_categories(true).build();

        let first = contract_to_string(&prepare(&files(&data), &config).contract).unwrap();
        let second = contract_to_string(&prepare(&files(&data), &config).contract).unwrap();
        assert_eq!(first, second);
        assert!(first.ends_with("}\n"));
    }

    #[test]
    fn test_identifier_override_domain_published() {
        let dir = TempDir::new().unwrap();
        let data = write(&dir, "d.csv", "code,n\nA1,1\nB2,2\n,3\n");
        let types = write(
            &dir,
            "types.json",
            r#"{"code": {"type": "identifier", "domain": ["A1", "B2"]}}"#,
        );
        let mut files = files(&data);
        files.column_types = Some(types);

        let output = prepare(&files, &InferenceConfig::default());
        let contract = contract_json(&output);
        assert_eq!(contract["column_types"]["code"], "identifier");
        assert_eq!(contract["public_categories"]["code"], json!(["A1", "B2"]));
        assert!(contract["public_bounds"].get("code").is_none());
    }

    #[test]
    fn test_malformed_override_document_fails_load() {
        let dir = TempDir::new().unwrap();
        let data = write(&dir, "d.csv", "a\n1\n");
        let types = write(&dir, "types.json", r#"{"a": "numberish"}"#);
        let mut files = files(&data);
        files.column_types = Some(types);

        let err = files.load().unwrap_err();
        assert!(matches!(
            err.config_error(),
            Some(ConfigError::InvalidColumnType { .. })
        ));
    }
}

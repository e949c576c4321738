//! Export and run-log behavior across a full successful run.

use anyhow::Result;
use cadgen_engine::director::{Director, RunOutcome};
use cadgen_engine::export::export_solid;
use cadgen_engine::geometry::ExportFormat;
use cadgen_engine::geometry::mocks::MockBackend;
use cadgen_engine::llm::mocks::MockTextGenerator;
use cadgen_engine::logging::RunLogger;
use serde_json::{Value, json};

fn washer_spec_response() -> String {
    json!({
        "part_name": "washer",
        "description": "flat washer",
        "cad_operations": [{"primitive": "cylinder"}, {"op": "hole"}],
        "parameters": {"outer_diameter": 12.0, "inner_diameter": 6.0}
    })
    .to_string()
}

#[tokio::test]
async fn successful_run_exports_under_the_chosen_name() -> Result<()> {
    let client = MockTextGenerator::default();
    client.push_response(washer_spec_response());
    client.push_response("import cadquery as cq\nresult = cq.Workplane(\"XY\").cylinder(1, 6)");

    let backend = MockBackend::new();
    backend.push_success();

    let outcome = Director::new(client, backend.clone()).run("a flat washer").await?;
    let solid = match outcome {
        RunOutcome::Success { solid, .. } => solid,
        other => panic!("expected Success, got {other:?}"),
    };

    let tmp = tempfile::tempdir()?;
    let out_dir = tmp.path().join("models");
    let path = export_solid(&backend, &solid, &out_dir, ExportFormat::Stl, Some("washer")).await?;

    assert_eq!(path, out_dir.join("washer.stl"));
    assert!(path.is_file());
    assert_eq!(backend.exports(), vec![(path, ExportFormat::Stl)]);
    Ok(())
}

#[tokio::test]
async fn run_log_traces_the_whole_loop() -> Result<()> {
    let client = MockTextGenerator::default();
    client.push_response(washer_spec_response());
    client.push_response("bad script");
    client.push_response("use a cylinder");
    client.push_response("import cadquery as cq\nresult = cq.Workplane(\"XY\").cylinder(1, 6)");

    let backend = MockBackend::new();
    backend.push_failure("no valid 'result' object found");
    backend.push_success();

    let tmp = tempfile::tempdir()?;
    let logger = RunLogger::new(tmp.path()).await?;
    let log_path = logger.log_file_path().to_path_buf();

    let outcome = Director::new(client, backend)
        .with_run_logger(logger)
        .run("a flat washer")
        .await?;
    assert!(matches!(outcome, RunOutcome::Success { iterations: 2, .. }));

    let content = tokio::fs::read_to_string(&log_path).await?;
    let events: Vec<Value> = content
        .trim()
        .lines()
        .map(|line| serde_json::from_str(line).expect("every line is one JSON event"))
        .collect();

    let types: Vec<&str> = events
        .iter()
        .map(|e| e["event_type"].as_str().unwrap())
        .collect();
    assert_eq!(
        types,
        vec![
            "run_start",
            "spec_generated",
            "attempt_start",
            "script_generated",
            "validation_result",
            "feedback_generated",
            "attempt_start",
            "script_generated",
            "validation_result",
            "run_complete",
        ]
    );

    let failed_validation = &events[4];
    assert_eq!(failed_validation["details"]["success"], false);
    assert_eq!(
        failed_validation["details"]["diagnostic"],
        "no valid 'result' object found"
    );

    let completion = events.last().unwrap();
    assert_eq!(completion["details"]["status"], "success");
    assert_eq!(completion["details"]["attempts"], 2);
    Ok(())
}

//! End-to-end runs of the director loop against scripted collaborators:
//! the generate → validate → feedback cycle, its budget, and its
//! terminal outcomes.

use anyhow::Result;
use cadgen_engine::director::{Director, RunOutcome};
use cadgen_engine::error::SpecificationError;
use cadgen_engine::geometry::mocks::MockBackend;
use cadgen_engine::llm::mocks::MockTextGenerator;
use serde_json::json;
use tokio_util::sync::CancellationToken;

const MAX_ITERATIONS: usize = 3;

fn spacer_spec_response() -> String {
    json!({
        "part_name": "spacer",
        "description": "cylindrical spacer",
        "cad_operations": [{"primitive": "cylinder"}]
    })
    .to_string()
}

const GOOD_SCRIPT: &str = "import cadquery as cq\nresult = cq.Workplane(\"XY\").cylinder(10, 5)";

fn director(
    client: &MockTextGenerator,
    backend: &MockBackend,
) -> Director<MockTextGenerator, MockBackend> {
    Director::new(client.clone(), backend.clone()).with_max_iterations(MAX_ITERATIONS)
}

#[tokio::test]
async fn first_valid_script_succeeds_in_one_iteration() -> Result<()> {
    let client = MockTextGenerator::default();
    client.push_response(spacer_spec_response());
    client.push_response(GOOD_SCRIPT);

    let backend = MockBackend::new();
    backend.push_success();

    let outcome = director(&client, &backend).run("a cylindrical spacer").await?;
    match outcome {
        RunOutcome::Success {
            iterations,
            script,
            specification,
            solid,
        } => {
            assert_eq!(iterations, 1);
            assert_eq!(script, GOOD_SCRIPT);
            assert_eq!(specification.part_name, "spacer");
            assert!(solid.is_realized());
        }
        other => panic!("expected Success, got {other:?}"),
    }

    // Exactly one spec call and one script call; no feedback.
    assert_eq!(client.call_count(), 2);
    assert_eq!(backend.run_count(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_attempt_feeds_back_into_the_next_one() -> Result<()> {
    let client = MockTextGenerator::default();
    client.push_response(spacer_spec_response());
    client.push_response("result = undefined_thing()"); // attempt 1 script
    client.push_response("bind `result` to a cq.Workplane cylinder"); // feedback
    client.push_response(GOOD_SCRIPT); // attempt 2 script

    let backend = MockBackend::new();
    backend.push_failure("no valid result");
    backend.push_success();

    let outcome = director(&client, &backend).run("a cylindrical spacer").await?;
    match outcome {
        RunOutcome::Success { iterations, .. } => assert_eq!(iterations, 2),
        other => panic!("expected Success, got {other:?}"),
    }

    let calls = client.calls();
    assert_eq!(calls.len(), 4, "spec, script, feedback, script");

    // The feedback request carries the failed script, the exact
    // diagnostic and the original specification.
    let feedback_request = &calls[2][1].content;
    assert!(feedback_request.contains("ERROR: no valid result"));
    assert!(feedback_request.contains("result = undefined_thing()"));
    assert!(feedback_request.contains("\"part_name\": \"spacer\""));

    // The second script request layers the feedback on top of the spec.
    let retry_request = &calls[3][1].content;
    assert!(retry_request.contains("\"part_name\": \"spacer\""));
    assert!(retry_request.contains("INCORPORATE THIS FEEDBACK"));
    assert!(retry_request.contains("bind `result` to a cq.Workplane cylinder"));
    Ok(())
}

#[tokio::test]
async fn budget_exhaustion_reports_the_last_diagnostic() -> Result<()> {
    let client = MockTextGenerator::default();
    client.push_response(spacer_spec_response());
    // Script and feedback calls alternate; content is irrelevant here.

    let backend = MockBackend::new();
    backend.push_failure("diagnostic one");
    backend.push_failure("diagnostic two");
    backend.push_failure("diagnostic three");

    let outcome = director(&client, &backend).run("a cylindrical spacer").await?;
    match outcome {
        RunOutcome::Exhausted {
            attempts,
            last_error,
            specification,
        } => {
            assert_eq!(attempts, MAX_ITERATIONS);
            assert_eq!(last_error, "diagnostic three");
            assert_eq!(specification.part_name, "spacer");
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }

    assert_eq!(backend.run_count(), MAX_ITERATIONS);
    // spec + 3 × (script + feedback)
    assert_eq!(client.call_count(), 1 + 2 * MAX_ITERATIONS);
    Ok(())
}

#[tokio::test]
async fn unusable_specification_is_fatal_before_any_attempt() {
    let cases = [
        "   \n\t  ",                                          // whitespace only
        "[1, 2, 3]",                                          // list, not mapping
        r#"{"part_name": "x", "description": "y"}"#,          // missing cad_operations
    ];

    for raw in cases {
        let client = MockTextGenerator::default();
        client.push_response(raw);
        let backend = MockBackend::new();

        let err = director(&client, &backend)
            .run("anything")
            .await
            .expect_err("bad spec must be fatal");
        assert!(
            matches!(
                err,
                SpecificationError::EmptyResponse
                    | SpecificationError::NotAMapping
                    | SpecificationError::MissingKey(_)
            ),
            "unexpected error for {raw:?}: {err:?}"
        );
        assert_eq!(backend.run_count(), 0, "no attempt may run for {raw:?}");
    }
}

#[tokio::test]
async fn transport_fault_consumes_one_retry_slot() -> Result<()> {
    let client = MockTextGenerator::default();
    client.push_response(spacer_spec_response());
    client.push_error("connection reset by peer"); // attempt 1 script call dies
    client.push_response(GOOD_SCRIPT); // attempt 2 script

    let backend = MockBackend::new();
    backend.push_success();

    let outcome = director(&client, &backend).run("a cylindrical spacer").await?;
    match outcome {
        RunOutcome::Success { iterations, .. } => assert_eq!(iterations, 2),
        other => panic!("expected Success, got {other:?}"),
    }

    // The failed call became feedback for attempt 2 without an extra
    // feedback-synthesis request.
    let calls = client.calls();
    assert_eq!(calls.len(), 3, "spec, failed script call, retry script call");
    let retry_request = &calls[2][1].content;
    assert!(retry_request.contains("Previous attempt failed with error:"));
    assert!(retry_request.contains("connection reset by peer"));

    assert_eq!(backend.run_count(), 1, "only the retry reached validation");
    Ok(())
}

#[tokio::test]
async fn backend_fault_is_charged_like_any_failed_attempt() -> Result<()> {
    let client = MockTextGenerator::default();
    client.push_response(spacer_spec_response());

    let backend = MockBackend::new();
    backend.push_error("python3: command not found");
    backend.push_success();

    let outcome = director(&client, &backend).run("a cylindrical spacer").await?;
    match outcome {
        RunOutcome::Success { iterations, .. } => assert_eq!(iterations, 2),
        other => panic!("expected Success, got {other:?}"),
    }
    assert_eq!(backend.run_count(), 2);
    Ok(())
}

#[tokio::test]
async fn failed_feedback_synthesis_degrades_to_a_fallback() -> Result<()> {
    let client = MockTextGenerator::default();
    client.push_response(spacer_spec_response());
    client.push_response("result = undefined_thing()"); // attempt 1 script
    client.push_error("rate limited"); // feedback synthesis dies
    client.push_response(GOOD_SCRIPT); // attempt 2 script

    let backend = MockBackend::new();
    backend.push_failure("NameError: name 'undefined_thing' is not defined");
    backend.push_success();

    let outcome = director(&client, &backend).run("a cylindrical spacer").await?;
    match outcome {
        RunOutcome::Success { iterations, .. } => assert_eq!(iterations, 2),
        other => panic!("expected Success, got {other:?}"),
    }

    // The retry still received feedback: the fallback embeds the original
    // diagnostic and the synthesis error.
    let retry_request = &client.calls()[3][1].content;
    assert!(retry_request.contains("INCORPORATE THIS FEEDBACK"));
    assert!(retry_request.contains("NameError: name 'undefined_thing' is not defined"));
    assert!(retry_request.contains("feedback synthesis also failed"));
    Ok(())
}

#[tokio::test]
async fn cancellation_yields_a_distinct_terminal_status() -> Result<()> {
    let client = MockTextGenerator::default();
    let backend = MockBackend::new();

    let token = CancellationToken::new();
    token.cancel();

    let outcome = Director::new(client.clone(), backend.clone())
        .with_max_iterations(MAX_ITERATIONS)
        .with_cancellation(token)
        .run("a cylindrical spacer")
        .await?;

    assert!(matches!(outcome, RunOutcome::Cancelled { attempts: 0 }));
    assert_eq!(client.call_count(), 0);
    assert_eq!(backend.run_count(), 0);
    Ok(())
}

//! End-to-end properties of the orchestration loop, driven through scripted
//! providers.

mod common;

use std::sync::Arc;

use baton_core::agent::{AgentDefinition, FinalOutput};
use baton_core::error::Error;
use baton_core::guardrail::GuardrailKind;
use baton_core::message::Message;
use baton_guardrails::{GuardrailEngine, KeywordBlocklist};
use baton_runner::{CancelToken, RunConfig, RunEvent, Runner};
use serde_json::json;

use common::*;

#[tokio::test]
async fn plain_text_run_completes_on_first_turn() {
    let provider = Arc::new(ScriptedProvider::new(vec![text_response("pong")]));
    let agent = AgentDefinition::builder("echo")
        .instructions("Reply to pings.")
        .build()
        .unwrap();

    let result = Runner::new(provider.clone()).run(agent, "ping").await.unwrap();

    assert_eq!(result.final_output, FinalOutput::Text("pong".into()));
    assert_eq!(result.turns, 1);
    assert_eq!(result.last_agent, "echo");
    assert_eq!(provider.call_count(), 1);

    // The request carried the instructions and the seeded history.
    let requests = provider.requests();
    assert_eq!(requests[0].instructions, "Reply to pings.");
    assert_eq!(requests[0].history.len(), 1);
    assert_eq!(requests[0].history[0].text(), Some("ping"));
}

#[tokio::test]
async fn turn_limit_fails_after_exactly_max_turns_model_calls() {
    // The model never terminates: every response requests another tool call.
    let provider = Arc::new(ScriptedProvider::repeating(tool_call_response(
        "",
        vec![make_call("c", "spin", json!({}))],
    )));
    let agent = AgentDefinition::builder("looper")
        .tools(registry_of(vec![Arc::new(SleepTool {
            name: "spin".into(),
            delay_ms: 0,
        })]))
        .build()
        .unwrap();

    let config = RunConfig { max_turns: 2, ..Default::default() };
    let failure = Runner::new(provider.clone())
        .with_config(config)
        .run(agent, "go")
        .await
        .unwrap_err();

    assert!(matches!(failure.error, Error::MaxTurnsExceeded { max_turns: 2 }));
    assert_eq!(provider.call_count(), 2, "exactly max_turns model calls");
    assert_eq!(failure.state.turn(), 2);

    // Both turns' tool results made it into the partial history:
    // user, assistant+calls, result, assistant+calls, result.
    let kinds: Vec<&str> = failure.state.history().iter().map(Message::kind).collect();
    assert_eq!(kinds, vec!["user", "assistant", "tool_result", "assistant", "tool_result"]);
}

#[tokio::test]
async fn tripped_input_guardrail_aborts_before_any_model_call() {
    let provider = Arc::new(ScriptedProvider::new(vec![]));
    let agent = AgentDefinition::builder("guarded").build().unwrap();

    let guardrails = GuardrailEngine::new().with(Arc::new(KeywordBlocklist::new(
        "blocklist",
        GuardrailKind::Input,
        vec!["forbidden".into()],
    )));

    let failure = Runner::new(provider.clone())
        .with_guardrails(guardrails)
        .run(agent, "this is forbidden input")
        .await
        .unwrap_err();

    match &failure.error {
        Error::GuardrailTripwire { guardrail, kind, reason } => {
            assert_eq!(guardrail, "blocklist");
            assert_eq!(*kind, GuardrailKind::Input);
            assert!(reason.contains("forbidden"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(provider.call_count(), 0, "the model must never be called");
}

#[tokio::test]
async fn tripped_output_guardrail_aborts_completed_output() {
    let provider = Arc::new(ScriptedProvider::new(vec![text_response(
        "the secret password is hunter2",
    )]));
    let agent = AgentDefinition::builder("leaky").build().unwrap();

    let guardrails = GuardrailEngine::new().with(Arc::new(KeywordBlocklist::new(
        "no-secrets",
        GuardrailKind::Output,
        vec!["hunter2".into()],
    )));

    let failure = Runner::new(provider.clone())
        .with_guardrails(guardrails)
        .run(agent, "what is the password?")
        .await
        .unwrap_err();

    assert!(matches!(failure.error, Error::GuardrailTripwire { .. }));
    assert_eq!(provider.call_count(), 1);
    // The offending assistant turn is preserved in the partial history.
    assert_eq!(failure.state.history().last().unwrap().kind(), "assistant");
}

#[tokio::test]
async fn tool_results_append_in_request_order_despite_completion_order() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_call_response(
            "",
            vec![
                make_call("call_a", "slow", json!({})),
                make_call("call_b", "fast", json!({})),
            ],
        ),
        text_response("done"),
    ]));
    let agent = AgentDefinition::builder("worker")
        .tools(registry_of(vec![
            Arc::new(SleepTool { name: "slow".into(), delay_ms: 80 }),
            Arc::new(SleepTool { name: "fast".into(), delay_ms: 1 }),
        ]))
        .build()
        .unwrap();

    let result = Runner::new(provider.clone()).run(agent, "go").await.unwrap();

    // History: user, assistant+calls, result(slow), result(fast), assistant.
    let results: Vec<(&str, &str)> = result
        .history
        .iter()
        .filter_map(|m| match m {
            Message::ToolResult { call_id, content, .. } => {
                Some((call_id.as_str(), content.as_str()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0], ("call_a", "slow finished"), "slow tool first despite finishing last");
    assert_eq!(results[1], ("call_b", "fast finished"));

    // The second model call saw both results, in order.
    let second_request = &provider.requests()[1];
    let request_kinds: Vec<&str> = second_request.history.iter().map(Message::kind).collect();
    assert_eq!(request_kinds, vec!["user", "assistant", "tool_result", "tool_result"]);
}

#[tokio::test]
async fn handoff_replaces_active_agent_and_preserves_history() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        handoff_response("billing", vec![]),
        text_response("your invoice is settled"),
    ]));

    let billing = AgentDefinition::builder("billing")
        .instructions("You handle invoices.")
        .build()
        .unwrap();
    let triage = AgentDefinition::builder("triage")
        .instructions("Route the user.")
        .handoff(&billing)
        .build()
        .unwrap();

    let result = Runner::new(provider.clone())
        .run(triage, "I have a billing question")
        .await
        .unwrap();

    assert_eq!(result.last_agent, "billing");
    assert_eq!(result.turns, 2);

    // The hand-off marker sits in history between the turns.
    let kinds: Vec<&str> = result.history.iter().map(Message::kind).collect();
    assert_eq!(kinds, vec!["user", "handoff", "assistant"]);

    // Billing's model call received the full prior history and billing's
    // own instructions.
    let requests = provider.requests();
    assert_eq!(requests[1].instructions, "You handle invoices.");
    assert_eq!(requests[1].history[0].text(), Some("I have a billing question"));
    assert!(requests[1].history.iter().any(|m| m.kind() == "handoff"));
}

#[tokio::test]
async fn handoff_suppresses_tool_calls_in_same_response() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        handoff_response("billing", vec![make_call("c1", "lookup", json!({}))]),
        text_response("handled"),
    ]));

    let billing = AgentDefinition::builder("billing").build().unwrap();
    let triage = AgentDefinition::builder("triage")
        .tools(registry_of(vec![Arc::new(SleepTool {
            name: "lookup".into(),
            delay_ms: 1,
        })]))
        .handoff(&billing)
        .build()
        .unwrap();

    let result = Runner::new(provider).run(triage, "help").await.unwrap();

    // No tool result was recorded for the suppressed call.
    assert!(
        !result.history.iter().any(|m| m.kind() == "tool_result"),
        "tool calls accompanying a hand-off must not execute"
    );
    // The marker records how many calls were skipped.
    match result
        .history
        .iter()
        .find(|m| m.kind() == "handoff")
        .unwrap()
    {
        Message::Handoff { from, to, skipped_tool_calls, .. } => {
            assert_eq!(from, "triage");
            assert_eq!(to, "billing");
            assert_eq!(*skipped_tool_calls, 1);
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn handoff_to_unknown_target_is_fatal() {
    let provider = Arc::new(ScriptedProvider::new(vec![handoff_response("ghost", vec![])]));
    let triage = AgentDefinition::builder("triage").build().unwrap();

    let failure = Runner::new(provider).run(triage, "help").await.unwrap_err();
    match failure.error {
        Error::HandoffNotFound { from, target } => {
            assert_eq!(from, "triage");
            assert_eq!(target, "ghost");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn agents_can_hand_off_back_and_forth_until_turn_limit() {
    // a and b hand off to each other forever; only the turn limit stops it.
    let provider = Arc::new(ScriptedProvider::new(vec![
        handoff_response("b", vec![]),
        handoff_response("a", vec![]),
        handoff_response("b", vec![]),
        handoff_response("a", vec![]),
    ]));
    let a = AgentDefinition::builder("a").build().unwrap();
    let b = AgentDefinition::builder("b").build().unwrap();
    a.add_handoff(&b);
    b.add_handoff(&a);

    let config = RunConfig { max_turns: 4, ..Default::default() };
    let failure = Runner::new(provider.clone())
        .with_config(config)
        .run(a, "bounce")
        .await
        .unwrap_err();

    assert!(matches!(failure.error, Error::MaxTurnsExceeded { max_turns: 4 }));
    assert_eq!(provider.call_count(), 4);
    let handoffs = failure
        .state
        .history()
        .iter()
        .filter(|m| m.kind() == "handoff")
        .count();
    assert_eq!(handoffs, 4);
}

#[tokio::test]
async fn structured_output_retries_until_schema_validates() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        // Not JSON at all.
        text_response("let me think about the shape"),
        // JSON, wrong shape.
        text_response(r#"{"answer": 42}"#),
        // Valid.
        text_response(r#"{"answer": "42", "confidence": 0.9}"#),
    ]));
    let agent = AgentDefinition::builder("extractor")
        .output_schema(json!({
            "type": "object",
            "properties": {
                "answer": { "type": "string" },
                "confidence": { "type": "number" }
            },
            "required": ["answer"]
        }))
        .build()
        .unwrap();

    let result = Runner::new(provider.clone()).run(agent, "extract").await.unwrap();

    assert_eq!(result.turns, 3);
    assert_eq!(provider.call_count(), 3);
    assert_eq!(
        result.final_output,
        FinalOutput::Structured(json!({"answer": "42", "confidence": 0.9}))
    );
    // The failed attempts stayed on the record for the model to see.
    let assistant_turns = result
        .history
        .iter()
        .filter(|m| m.kind() == "assistant")
        .count();
    assert_eq!(assistant_turns, 3);
}

#[tokio::test]
async fn structured_output_never_validating_exhausts_turns() {
    let provider = Arc::new(ScriptedProvider::repeating(text_response("not json")));
    let agent = AgentDefinition::builder("extractor")
        .output_schema(json!({
            "type": "object",
            "properties": { "answer": { "type": "string" } },
            "required": ["answer"]
        }))
        .build()
        .unwrap();

    let config = RunConfig { max_turns: 3, ..Default::default() };
    let failure = Runner::new(provider.clone())
        .with_config(config)
        .run(agent, "extract")
        .await
        .unwrap_err();

    // Wrong shape surfaces as turn exhaustion, not a validation error.
    assert!(matches!(failure.error, Error::MaxTurnsExceeded { .. }));
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn cancellation_mid_run_stops_before_next_model_call() {
    let cancel = CancelToken::new();

    // Cancel while the first turn's tool executes; the loop must observe
    // the signal after the batch joins and stop without a second model
    // call.
    struct CancellingTool {
        cancel: CancelToken,
    }

    #[async_trait::async_trait]
    impl baton_core::Tool for CancellingTool {
        fn name(&self) -> &str {
            "side_effect"
        }
        fn description(&self) -> &str {
            "Cancels the run from inside"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        async fn execute(
            &self,
            _arguments: serde_json::Value,
            _ctx: &baton_core::RunContext,
        ) -> Result<baton_core::ToolOutput, baton_core::ToolError> {
            self.cancel.cancel();
            Ok(baton_core::ToolOutput::text("done"))
        }
    }

    let provider = Arc::new(ScriptedProvider::repeating(tool_call_response(
        "",
        vec![make_call("c", "side_effect", json!({}))],
    )));
    let agent = AgentDefinition::builder("worker")
        .tools(registry_of(vec![Arc::new(CancellingTool {
            cancel: cancel.clone(),
        })]))
        .build()
        .unwrap();

    let failure = Runner::new(provider.clone())
        .run_with_cancel(agent, "go", cancel)
        .await
        .unwrap_err();

    assert!(failure.is_cancelled());
    assert_eq!(provider.call_count(), 1, "no model call after cancellation");
    // The in-flight tool finished and its result is on record.
    assert!(failure.state.history().iter().any(|m| m.kind() == "tool_result"));
}

#[tokio::test]
async fn streamed_run_emits_partial_text_then_completion() {
    let provider = Arc::new(ChunkingProvider {
        text: "pong".into(),
        chunk_size: 2,
    });
    let agent = AgentDefinition::builder("echo").build().unwrap();

    let mut streamed = Runner::new(provider).run_streamed(agent, "ping");

    let mut events = Vec::new();
    while let Some(event) = streamed.events.recv().await {
        events.push(event);
    }
    let result = streamed.handle.await.unwrap().unwrap();

    assert_eq!(result.final_output, FinalOutput::Text("pong".into()));

    let types: Vec<&str> = events.iter().map(RunEvent::event_type).collect();
    assert_eq!(
        types,
        vec!["response.partial_text", "response.partial_text", "run.completed"]
    );
    let text: String = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::PartialText { delta } => Some(delta.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "pong");
}

#[tokio::test]
async fn streamed_run_reports_tool_and_handoff_events() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_call_response("", vec![make_call("c1", "fast", json!({}))]),
        handoff_response("billing", vec![]),
        text_response("done"),
    ]));
    let billing = AgentDefinition::builder("billing").build().unwrap();
    let triage = AgentDefinition::builder("triage")
        .tools(registry_of(vec![Arc::new(SleepTool {
            name: "fast".into(),
            delay_ms: 1,
        })]))
        .handoff(&billing)
        .build()
        .unwrap();

    let mut streamed = Runner::new(provider).run_streamed(triage, "go");
    let mut types = Vec::new();
    while let Some(event) = streamed.events.recv().await {
        types.push(event.event_type().to_string());
    }
    let result = streamed.handle.await.unwrap().unwrap();
    assert_eq!(result.last_agent, "billing");

    assert_eq!(
        types,
        vec![
            "tool_call.started",
            "tool_call.finished",
            "handoff.occurred",
            "run.completed"
        ]
    );
}

#[tokio::test]
async fn streamed_guardrail_trip_emits_failure_events() {
    let provider = Arc::new(ScriptedProvider::new(vec![]));
    let agent = AgentDefinition::builder("guarded").build().unwrap();
    let guardrails = GuardrailEngine::new().with(Arc::new(KeywordBlocklist::new(
        "blocklist",
        GuardrailKind::Input,
        vec!["forbidden".into()],
    )));

    let mut streamed = Runner::new(provider)
        .with_guardrails(guardrails)
        .run_streamed(agent, "forbidden");

    let mut types = Vec::new();
    while let Some(event) = streamed.events.recv().await {
        types.push(event.event_type().to_string());
    }
    let failure = streamed.handle.await.unwrap().unwrap_err();
    assert!(matches!(failure.error, Error::GuardrailTripwire { .. }));
    assert_eq!(types, vec!["guardrail.tripped", "run.failed"]);
}

#[tokio::test]
async fn unknown_tool_feeds_error_result_and_run_recovers() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_call_response("", vec![make_call("c1", "ghost", json!({}))]),
        text_response("recovered"),
    ]));
    let agent = AgentDefinition::builder("worker").build().unwrap();

    let result = Runner::new(provider).run(agent, "go").await.unwrap();

    assert_eq!(result.final_output, FinalOutput::Text("recovered".into()));
    match result
        .history
        .iter()
        .find(|m| m.kind() == "tool_result")
        .unwrap()
    {
        Message::ToolResult { is_error, content, .. } => {
            assert!(is_error);
            assert!(content.contains("ghost"));
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn independent_runs_share_no_state() {
    let agent = AgentDefinition::builder("echo").build().unwrap();

    let runner_a = Runner::new(Arc::new(ScriptedProvider::new(vec![text_response("one")])));
    let runner_b = Runner::new(Arc::new(ScriptedProvider::new(vec![text_response("two")])));

    let (a, b) = tokio::join!(
        runner_a.run(Arc::clone(&agent), "first"),
        runner_b.run(agent, "second"),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(a.output_text(), "one");
    assert_eq!(b.output_text(), "two");
    assert_eq!(a.history[0].text(), Some("first"));
    assert_eq!(b.history[0].text(), Some("second"));
}

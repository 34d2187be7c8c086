use super::*;
use crate::agent::agent_logic::TOOL_CALL_REQUIRED;
use crate::events::tests::RecordingHost;
use crate::execution::{Execution, Step};
use crate::tools::executors::{Ask, AskQuestion};
use crate::tools::tests::{count_events, drive};
use crate::transcript::Role;
use serde_json::json;

fn goal(text: &str) -> Goal {
    Goal { goal: text.to_string() }
}

#[tokio::test]
async fn test_echo_call_result_reaches_transcript() {
    let model = scripted(vec![
        call("call_1", "Echo", json!({"question": "ping"})),
        call("call_2", "Response", json!({"answer": "pong"})),
    ]);
    let mut host = RecordingHost::default();

    let (response, events) = drive(echo_agent(&model), goal("ping it"), &mut host).await;

    assert_eq!(response.unwrap(), Verdict { answer: "pong".to_string() });
    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    let last = requests[1].messages.last().unwrap();
    assert_eq!(last.role, Role::Tool);
    assert_eq!(last.tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(last.content.as_deref(), Some(r#"{"response":"ping"}"#));

    // The dispatched request, then the agent's own response.
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0].downcast_ref::<AskRequest>().unwrap().question,
        "ping"
    );
    assert_eq!(events[1].downcast_ref::<Verdict>().unwrap().answer, "pong");
}

#[tokio::test]
async fn test_transcript_is_seeded_with_directive_and_request() {
    let model = scripted(vec![call("call_1", "Response", json!({"answer": "ok"}))]);
    let mut host = RecordingHost::default();

    drive(echo_agent(&model), goal("ship"), &mut host).await.0.unwrap();

    let first = &model.requests()[0];
    assert_eq!(first.model, "test-model");
    assert_eq!(first.messages.len(), 1);
    assert_eq!(first.messages[0].role, Role::System);
    assert_eq!(
        first.messages[0].content.as_deref(),
        Some("Answer the goal.\nrequest:\n{\"goal\":\"ship\"}")
    );
    assert_eq!(first.tools, vec!["Echo", "Response"]);
}

#[tokio::test]
async fn test_assistant_turns_are_kept_in_order() {
    let model = scripted(vec![
        call("call_1", "Echo", json!({"question": "a"})),
        call("call_2", "Echo", json!({"question": "b"})),
        call("call_3", "Response", json!({"answer": "ab"})),
    ]);
    let mut host = RecordingHost::default();

    drive(echo_agent(&model), goal("concat"), &mut host).await.0.unwrap();

    let messages = &model.requests()[2].messages;
    let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::Assistant, Role::Tool, Role::Assistant, Role::Tool]
    );
    assert_eq!(messages[1].tool_calls[0].id, "call_1");
    assert_eq!(messages[4].tool_call_id.as_deref(), Some("call_2"));
}

#[tokio::test]
async fn test_multiple_calls_in_one_reply_run_in_order() {
    let model = scripted(vec![
        calls(&[
            ("call_a", "Echo", json!({"question": "first"})),
            ("call_b", "Echo", json!({"question": "second"})),
        ]),
        call("call_c", "Response", json!({"answer": "done"})),
    ]);
    let mut host = RecordingHost::default();

    let (_, events) = drive(echo_agent(&model), goal("two"), &mut host).await;

    let asked: Vec<&str> = events
        .iter()
        .filter_map(|e| e.downcast_ref::<AskRequest>())
        .map(|r| r.question.as_str())
        .collect();
    assert_eq!(asked, vec!["first", "second"]);
    let messages = &model.requests()[1].messages;
    assert_eq!(messages[2].tool_call_id.as_deref(), Some("call_a"));
    assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_b"));
}

#[tokio::test]
async fn test_malformed_arguments_are_recoverable() {
    let model = scripted(vec![
        raw_call("call_1", "Echo", "{\"question\": "),
        call("call_2", "Response", json!({"answer": "recovered"})),
    ]);
    let mut host = RecordingHost::default();

    let (response, events) = drive(echo_agent(&model), goal("x"), &mut host).await;

    assert_eq!(response.unwrap().answer, "recovered");
    assert_eq!(count_events::<AskRequest>(&events), 0);
    let result = model.requests()[1].messages.last().unwrap().clone();
    assert_eq!(result.tool_call_id.as_deref(), Some("call_1"));
    let body: Value = serde_json::from_str(result.content.as_deref().unwrap()).unwrap();
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_invalid_response_is_recoverable() {
    let model = scripted(vec![
        call("call_1", "Response", json!({"answer": "  "})),
        call("call_2", "Response", json!({"answer": "real"})),
    ]);
    let mut host = RecordingHost::default();

    let (response, events) = drive(echo_agent(&model), goal("x"), &mut host).await;

    assert_eq!(response.unwrap().answer, "real");
    assert_eq!(count_events::<Verdict>(&events), 1);
    let rejected = model.requests()[1].messages.last().unwrap().clone();
    assert_eq!(rejected.role, Role::Tool);
    assert_eq!(
        rejected.content.as_deref(),
        Some(r#"{"error":"answer must not be empty"}"#)
    );
}

#[tokio::test]
async fn test_reply_without_tool_call_gets_reminder() {
    let model = scripted(vec![
        ChatMessage::assistant("I think the answer is 4."),
        call("call_1", "Response", json!({"answer": "4"})),
    ]);
    let mut host = RecordingHost::default();

    let (response, _) = drive(echo_agent(&model), goal("2+2"), &mut host).await;

    assert_eq!(response.unwrap().answer, "4");
    let reminder = model.requests()[1].messages.last().unwrap().clone();
    assert_eq!(reminder, ChatMessage::user(TOOL_CALL_REQUIRED));
}

#[tokio::test]
async fn test_iterations_are_bounded() {
    let model = scripted(vec![
        ChatMessage::assistant("thinking"),
        call("call_1", "Echo", json!({"question": "still thinking"})),
        call("call_2", "Response", json!({"answer": "too late"})),
    ]);
    let agent: Agent<Goal, Verdict> = Agent::builder("Slow")
        .directive("Answer.")
        .tool(EchoTool { name: "Echo" })
        .max_iter(2)
        .build(model.clone(), "test-model")
        .unwrap();
    let mut host = RecordingHost::default();

    let (response, _) = drive(agent, goal("x"), &mut host).await;

    match response {
        Err(AgentError::IterationsExhausted { agent, max_iter }) => {
            assert_eq!(agent, "Slow");
            assert_eq!(max_iter, 2);
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert_eq!(model.remaining(), 1);
}

#[tokio::test]
async fn test_unknown_tool_is_fatal() {
    let model = scripted(vec![
        call("call_1", "Deploy", json!({})),
        call("call_2", "Response", json!({"answer": "never"})),
    ]);
    let mut host = RecordingHost::default();

    let (response, events) = drive(echo_agent(&model), goal("x"), &mut host).await;

    match response {
        Err(AgentError::UnknownTool { agent, name }) => {
            assert_eq!(agent, "Solver");
            assert_eq!(name, "Deploy");
        }
        other => panic!("expected unknown tool, got {:?}", other),
    }
    assert!(events.is_empty());
    assert_eq!(model.remaining(), 1);
}

#[tokio::test]
async fn test_tool_errors_propagate() {
    let model = scripted(vec![call("call_1", "Failing", json!({"question": "?"}))]);
    let agent: Agent<Goal, Verdict> = Agent::builder("Fragile")
        .tool(Failing)
        .build(model.clone(), "test-model")
        .unwrap();
    let mut host = RecordingHost::default();

    let (response, _) = drive(agent, goal("x"), &mut host).await;

    match response {
        Err(AgentError::Tool { tool, message }) => {
            assert_eq!(tool, "Failing");
            assert_eq!(message, "disk full");
        }
        other => panic!("expected tool error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_model_errors_propagate() {
    let model = scripted(vec![]);
    let mut host = RecordingHost::default();

    let (response, _) = drive(echo_agent(&model), goal("x"), &mut host).await;

    assert!(matches!(response, Err(AgentError::Model(_))));
}

#[tokio::test]
async fn test_calls_after_response_are_ignored() {
    let model = scripted(vec![calls(&[
        ("call_1", "Response", json!({"answer": "early"})),
        ("call_2", "Echo", json!({"question": "late"})),
    ])]);
    let mut host = RecordingHost::default();

    let (response, events) = drive(echo_agent(&model), goal("x"), &mut host).await;

    assert_eq!(response.unwrap().answer, "early");
    assert_eq!(count_events::<AskRequest>(&events), 0);
}

#[tokio::test]
async fn test_nested_agent_relays_events_and_replies() {
    let model = scripted(vec![
        call("outer_1", "Inner", json!({"goal": "find the port"})),
        call("inner_1", "Ask", json!({"question": "Which port?"})),
        call("inner_2", "Response", json!({"answer": "8080"})),
        call("outer_2", "Response", json!({"answer": "port is 8080"})),
    ]);
    let inner: Agent<Goal, Verdict> = Agent::builder("Inner")
        .description("Finds things out.")
        .directive("Ask the user.")
        .tool(Ask)
        .build(model.clone(), "test-model")
        .unwrap();
    let outer: Agent<Goal, Verdict> = Agent::builder("Outer")
        .directive("Delegate.")
        .tool(inner)
        .build(model.clone(), "test-model")
        .unwrap();
    let mut host = RecordingHost::default();
    host.answers.push_back("8080".to_string());

    let (response, events) = drive(outer, goal("deploy"), &mut host).await;

    assert_eq!(response.unwrap().answer, "port is 8080");
    assert_eq!(events.len(), 5);
    assert_eq!(events[0].downcast_ref::<Goal>().unwrap().goal, "find the port");
    assert!(events[1].is::<AskRequest>());
    assert!(events[2].is::<AskQuestion>());
    assert_eq!(events[3].downcast_ref::<Verdict>().unwrap().answer, "8080");
    assert_eq!(events[4].downcast_ref::<Verdict>().unwrap().answer, "port is 8080");

    let requests = model.requests();
    assert_eq!(requests[0].tools, vec!["Inner", "Response"]);
    assert_eq!(requests[1].tools, vec!["Ask", "Response"]);
    assert_eq!(
        requests[2].messages.last().unwrap().content.as_deref(),
        Some(r#"{"response":"8080"}"#)
    );
    assert_eq!(
        requests[3].messages.last().unwrap().content.as_deref(),
        Some(r#"{"answer":"8080"}"#)
    );
}

#[tokio::test]
async fn test_dropping_execution_cancels_nested_work() {
    let dropped = Arc::new(AtomicBool::new(false));
    let model = scripted(vec![call("call_1", "Lingering", json!({"question": "?"}))]);
    let agent: Agent<Goal, Verdict> = Agent::builder("Patient")
        .tool(Lingering {
            dropped: dropped.clone(),
        })
        .build(model.clone(), "test-model")
        .unwrap();

    let mut execution = Execution::start(Arc::new(agent), goal("wait"));
    let mut reply = None;
    loop {
        match execution.resume(reply.take()).await.unwrap() {
            Step::Yielded(event) if event.is::<Message>() => break,
            Step::Yielded(_) => {}
            Step::Complete(_) => panic!("should still be running"),
        }
    }
    assert!(!dropped.load(Ordering::SeqCst));

    drop(execution);
    assert!(dropped.load(Ordering::SeqCst));
}

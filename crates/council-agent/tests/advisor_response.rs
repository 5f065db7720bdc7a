//! End-to-end advisor responses against a scripted reasoning service.

use council_agent::CouncilEngine;
use council_core::{AppConfig, ChatMessage, CouncilError, FALLBACK_PLAN_SPEECH, HistoryKind};
use council_testkit::{ScriptedLlm, TestWorkspace, sample_data, text_response, tool_call_response};

fn engine(ws: &TestWorkspace, llm: &ScriptedLlm) -> CouncilEngine {
    engine_with(ws, llm, AppConfig::default())
}

fn engine_with(ws: &TestWorkspace, llm: &ScriptedLlm, cfg: AppConfig) -> CouncilEngine {
    CouncilEngine::with_llm(ws.path(), cfg, sample_data(), Box::new(llm.clone()))
        .expect("engine")
}

fn tool_contents(messages: &[ChatMessage]) -> Vec<(String, String)> {
    messages
        .iter()
        .filter_map(|m| match m {
            ChatMessage::Tool {
                tool_call_id,
                content,
            } => Some((tool_call_id.clone(), content.clone())),
            _ => None,
        })
        .collect()
}

#[test]
fn tool_round_trip_produces_a_draft() {
    let ws = TestWorkspace::seeded().expect("workspace");
    let llm = ScriptedLlm::new(vec![
        tool_call_response(&[
            ("call_travel", "get_travel_time", r#"{"origin":"T","destination":"C"}"#),
            ("call_threat", "get_threat_future", r#"{"threatId":"reavers","months":5}"#),
        ]),
        text_response(
            r#"{"support": 8, "speech": "Six days to C is acceptable. The coast falls by then. We must move."}"#,
        ),
    ]);
    let engine = engine(&ws, &llm);
    engine.set_plan("gm", "March the First Legion to C").expect("plan");

    let draft = engine.generate_response("vess").expect("response");
    assert_eq!(draft.support, Some(8));
    assert_eq!(
        draft.speech,
        "Six days to C is acceptable. The coast falls by then. We must move."
    );
    assert_eq!(engine.updated_index().expect("version"), 2);

    let requests = llm.requests();
    assert_eq!(requests.len(), 2);
    let results = tool_contents(&requests[1].messages);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "call_travel");
    assert!(results[0].1.contains("\"days\":6.0"));
    assert_eq!(results[1].0, "call_threat");
    assert!(results[1].1.contains("The southern coast falls."));

    let history = engine.history("vess").expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, HistoryKind::Draft);
}

#[test]
fn support_is_null_without_a_plan() {
    let ws = TestWorkspace::seeded().expect("workspace");
    let llm = ScriptedLlm::new(vec![text_response(
        r#"{"support": 9, "speech": "Bring me a plan. Then we talk."}"#,
    )]);
    let engine = engine(&ws, &llm);
    let draft = engine.generate_response("vess").expect("response");
    assert_eq!(draft.support, None);
}

#[test]
fn prompts_carry_persona_plan_and_transcript() {
    let ws = TestWorkspace::seeded().expect("workspace");
    let llm = ScriptedLlm::new(vec![text_response(r#"{"support": 5, "speech": "Aye. We go."}"#)]);
    let engine = engine(&ws, &llm);
    engine.set_plan("gm", "Hold at B").expect("plan");
    engine
        .record_input("players", Some("Lady Vess"), "Can B be held?")
        .expect("input");
    engine.generate_response("vess").expect("response");

    let request = &llm.requests()[0];
    let ChatMessage::System { content: system } = &request.messages[0] else {
        panic!("first message is not the system prompt");
    };
    assert!(system.starts_with("You are Lady Vess, Marshal of Northmarch."));
    assert!(system.contains("Secure the succession for her nephew"));
    let ChatMessage::User { content: user } = &request.messages[1] else {
        panic!("second message is not the user prompt");
    };
    assert!(user.contains("Current plan: Hold at B"));
    assert!(user.contains("Last input: PLAYERS @Lady Vess: Can B be held?"));
    assert!(user.contains("PLAYERS: @Lady Vess Can B be held?"));
    assert!(!user.contains("Secure the succession"));
    assert_eq!(request.tools.len(), 4);
}

#[test]
fn unparseable_answer_falls_back() {
    let ws = TestWorkspace::seeded().expect("workspace");
    let llm = ScriptedLlm::new(vec![text_response("Certainly! I support this plan.")]);
    let engine = engine(&ws, &llm);
    engine.set_plan("gm", "Sail at dawn").expect("plan");
    let draft = engine.generate_response("orrin").expect("response");
    assert_eq!(draft.support, None);
    assert_eq!(draft.speech, FALLBACK_PLAN_SPEECH);
}

#[test]
fn long_speech_is_normalized() {
    let ws = TestWorkspace::seeded().expect("workspace");
    let llm = ScriptedLlm::new(vec![text_response(
        r#"{"support": 4, "speech": "One; two. Three. Four. Five. Six. Seven."}"#,
    )]);
    let engine = engine(&ws, &llm);
    engine.set_plan("gm", "Wait").expect("plan");
    let draft = engine.generate_response("vess").expect("response");
    assert_eq!(draft.speech, "One. two. Three. Four. Five.");
}

#[test]
fn service_failure_leaves_state_untouched() {
    let ws = TestWorkspace::seeded().expect("workspace");
    let llm = ScriptedLlm::default();
    llm.push_failure("Reasoning service error (HTTP 503)");
    let engine = engine(&ws, &llm);
    engine.set_plan("gm", "Hold").expect("plan");

    let err = engine.generate_response("vess").expect_err("service down");
    assert!(format!("{err:#}").contains("HTTP 503"));
    assert_eq!(engine.updated_index().expect("version"), 1);
    assert!(engine.history("vess").expect("history").is_empty());
    assert_eq!(llm.requests().len(), 1);
}

#[test]
fn round_guard_forces_a_final_answer() {
    let ws = TestWorkspace::seeded().expect("workspace");
    let llm = ScriptedLlm::new(vec![
        tool_call_response(&[("c1", "get_armies", "{}")]),
        text_response(r#"{"support": 6, "speech": "The legion is ready. Send it."}"#),
    ]);
    let mut cfg = AppConfig::default();
    cfg.council.max_tool_rounds = 1;
    let engine = engine_with(&ws, &llm, cfg);
    engine.set_plan("gm", "Send the legion").expect("plan");
    let draft = engine.generate_response("vess").expect("response");
    assert_eq!(draft.support, Some(6));
    let requests = llm.requests();
    assert_eq!(requests[1].tool_choice.0, "none");
}

#[test]
fn model_that_never_stops_calling_tools_fails() {
    let ws = TestWorkspace::seeded().expect("workspace");
    let llm = ScriptedLlm::new(vec![
        tool_call_response(&[("c1", "get_armies", "{}")]),
        tool_call_response(&[("c2", "get_armies", "{}")]),
    ]);
    let mut cfg = AppConfig::default();
    cfg.council.max_tool_rounds = 1;
    let engine = engine_with(&ws, &llm, cfg);
    let err = engine.generate_response("vess").expect_err("round limit");
    assert!(err.to_string().contains("kept requesting tools"));
    assert_eq!(engine.updated_index().expect("version"), 0);
}

#[test]
fn unknown_advisor_is_rejected_before_any_request() {
    let ws = TestWorkspace::seeded().expect("workspace");
    let llm = ScriptedLlm::default();
    let engine = engine(&ws, &llm);
    let err = engine.generate_response("nobody").expect_err("unknown");
    assert!(matches!(
        err.downcast_ref::<CouncilError>(),
        Some(CouncilError::UnknownAdvisor(_))
    ));
    assert!(llm.requests().is_empty());
}

#[test]
fn commit_and_speak_promote_the_draft() {
    let ws = TestWorkspace::seeded().expect("workspace");
    let llm = ScriptedLlm::new(vec![text_response(
        r#"{"support": 3, "speech": "Too far. Too slow."}"#,
    )]);
    let engine = engine(&ws, &llm);
    engine.set_plan("gm", "March to Isle").expect("plan");

    let err = engine.commit("vess").expect_err("no draft yet");
    assert!(matches!(
        err.downcast_ref::<CouncilError>(),
        Some(CouncilError::MissingDraft(_))
    ));

    engine.generate_response("vess").expect("response");
    let committed = engine.commit("vess").expect("commit");
    assert_eq!(committed.support, Some(3));
    let spoken = engine.speak("vess").expect("speak");
    assert_eq!(spoken, "Too far. Too slow.");

    let snapshot = engine.snapshot().expect("snapshot");
    let vess = snapshot
        .council
        .iter()
        .find(|a| a.advisor.id == "vess")
        .expect("vess in snapshot");
    assert_eq!(vess.support, Some(3));
    assert!(vess.last_spoken.is_some());
    assert_eq!(snapshot.updated_index, 4);

    let kinds: Vec<_> = engine
        .history("vess")
        .expect("history")
        .iter()
        .map(|h| h.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![HistoryKind::Commit, HistoryKind::Commit, HistoryKind::Draft]
    );
}

#[test]
fn snapshot_never_exposes_private_agendas() {
    let ws = TestWorkspace::seeded().expect("workspace");
    let engine = engine(&ws, &ScriptedLlm::default());
    let value = serde_json::to_value(engine.snapshot().expect("snapshot")).expect("json");
    assert!(!value.to_string().contains("succession"));
    assert_eq!(value["council"][0]["public_agenda"], "Keep the legions near the passes");
}

#[test]
fn session_survives_engine_restart() {
    let ws = TestWorkspace::seeded().expect("workspace");
    {
        let engine = engine(&ws, &ScriptedLlm::default());
        engine.set_plan("gm", "Fortify C").expect("plan");
        engine.add_world_update("Saltmere has fallen.").expect("update");
    }
    let engine = engine(&ws, &ScriptedLlm::default());
    assert_eq!(engine.updated_index().expect("version"), 2);
    assert_eq!(engine.snapshot().expect("snapshot").plan_text, "Fortify C");
    assert_eq!(
        engine.world_updates().expect("updates"),
        vec!["Saltmere has fallen.".to_string()]
    );
    assert!(ws.state_path().exists());
}

#[test]
fn reset_advances_version_once() {
    let ws = TestWorkspace::seeded().expect("workspace");
    let engine = engine(&ws, &ScriptedLlm::default());
    engine.record_input("gm", None, "Council is in session.").expect("input");
    engine.reset().expect("reset");
    assert_eq!(engine.updated_index().expect("version"), 2);
    assert!(engine.chat().expect("chat").is_empty());
}

#[test]
fn nameless_tool_call_gets_an_error_result_and_the_loop_continues() {
    let ws = TestWorkspace::seeded().expect("workspace");
    let llm = ScriptedLlm::new(vec![
        tool_call_response(&[("call_1", "", "{}")]),
        text_response(r#"{"support": 5, "speech": "The tool failed. We hold."}"#),
    ]);
    let engine = engine(&ws, &llm);
    engine.set_plan("gm", "Hold at B").expect("plan");
    let draft = engine.generate_response("vess").expect("response");
    assert_eq!(draft.speech, "The tool failed. We hold.");

    let requests = llm.requests();
    assert_eq!(requests.len(), 2);
    let results = tool_contents(&requests[1].messages);
    assert_eq!(
        results,
        vec![("call_1".to_string(), r#"{"error":"Unknown tool."}"#.to_string())]
    );
}

#[test]
fn unwritable_event_log_does_not_fail_a_response() {
    let ws = TestWorkspace::seeded().expect("workspace");
    // A directory where the log file should be makes every append fail.
    std::fs::create_dir_all(ws.path().join(".council/observe.log")).expect("block log");
    let llm = ScriptedLlm::new(vec![
        tool_call_response(&[("c1", "get_armies", "{}")]),
        text_response(r#"{"support": 6, "speech": "Ready. Send them."}"#),
    ]);
    let engine = engine(&ws, &llm);
    engine.set_plan("gm", "Send the legion").expect("plan");
    let draft = engine.generate_response("vess").expect("response");
    assert_eq!(draft.support, Some(6));
    assert_eq!(engine.updated_index().expect("version"), 2);
}

// Tests for the study tool router

use sage_voice::tools::{NavIntent, StudyToolRouter, ToolHandler};
use serde_json::json;
use tokio::sync::mpsc;

fn router() -> (StudyToolRouter, mpsc::Receiver<NavIntent>) {
    let (nav_tx, nav_rx) = mpsc::channel(16);
    (StudyToolRouter::new(nav_tx), nav_rx)
}

#[tokio::test]
async fn test_recognized_tools_map_to_intents() {
    let (router, mut nav_rx) = router();

    let cases = vec![
        ("open_notes_generator", NavIntent::OpenNotesGenerator),
        ("start_quiz", NavIntent::StartQuiz),
        ("show_history", NavIntent::ShowHistory),
        ("get_motivation", NavIntent::GetMotivation),
        ("go_home", NavIntent::GoHome),
    ];

    for (name, intent) in cases {
        let result = router.invoke(name, &json!({})).await;
        assert!(!result.is_empty());
        assert_eq!(nav_rx.recv().await, Some(intent));
    }
}

#[tokio::test]
async fn test_focus_timer_reads_minutes_from_args() {
    let (router, mut nav_rx) = router();

    let result = router.invoke("set_focus_timer", &json!({ "minutes": 40 })).await;
    assert_eq!(result, "Focus timer set for 40 minutes");
    assert_eq!(
        nav_rx.recv().await,
        Some(NavIntent::SetFocusTimer { minutes: 40 })
    );
}

#[tokio::test]
async fn test_focus_timer_defaults_to_25_minutes() {
    let (router, mut nav_rx) = router();

    router.invoke("set_focus_timer", &json!({})).await;
    assert_eq!(
        nav_rx.recv().await,
        Some(NavIntent::SetFocusTimer { minutes: 25 })
    );

    // Non-numeric minutes fall back the same way.
    router
        .invoke("set_focus_timer", &json!({ "minutes": "soon" }))
        .await;
    assert_eq!(
        nav_rx.recv().await,
        Some(NavIntent::SetFocusTimer { minutes: 25 })
    );
}

#[tokio::test]
async fn test_unknown_tool_answers_without_an_intent() {
    let (router, mut nav_rx) = router();

    let result = router.invoke("summon_dragon", &json!({})).await;
    assert_eq!(result, "Unsupported tool");
    assert!(nav_rx.try_recv().is_err());
}

#[test]
fn test_declarations_cover_every_intent() {
    let names: Vec<String> = StudyToolRouter::declarations()
        .into_iter()
        .map(|d| d.name)
        .collect();

    for expected in [
        "open_notes_generator",
        "start_quiz",
        "show_history",
        "set_focus_timer",
        "get_motivation",
        "go_home",
    ] {
        assert!(names.contains(&expected.to_string()), "missing {}", expected);
    }
}

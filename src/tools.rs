use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Local action the assistant can trigger in the embedding application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavIntent {
    OpenNotesGenerator,
    StartQuiz,
    ShowHistory,
    SetFocusTimer { minutes: u32 },
    GetMotivation,
    GoHome,
}

/// Tool declaration advertised to the live endpoint at session open
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
}

/// Handles tool calls arriving on a live session
///
/// Every invocation must be answered on the same session; unrecognized names
/// get a generic result rather than leaving the endpoint waiting.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, name: &str, args: &Value) -> String;
}

/// Routes the fixed set of study-assistant intents to the application
///
/// Each recognized tool maps to a [`NavIntent`] published on a channel the
/// UI drains, and answers with a short human-readable confirmation.
pub struct StudyToolRouter {
    nav_tx: mpsc::Sender<NavIntent>,
}

impl StudyToolRouter {
    pub fn new(nav_tx: mpsc::Sender<NavIntent>) -> Self {
        Self { nav_tx }
    }

    /// Declarations for every tool this router understands
    pub fn declarations() -> Vec<ToolDeclaration> {
        let declare = |name: &str, description: &str| ToolDeclaration {
            name: name.to_string(),
            description: description.to_string(),
        };

        vec![
            declare("open_notes_generator", "Open the study notes generator"),
            declare("start_quiz", "Start a quiz on the current topic"),
            declare("show_history", "Show the user's study history"),
            declare(
                "set_focus_timer",
                "Start a focus timer; takes 'minutes' as a number",
            ),
            declare("get_motivation", "Show a motivational message"),
            declare("go_home", "Return to the home screen"),
        ]
    }

    async fn dispatch(&self, intent: NavIntent, result: &str) -> String {
        if self.nav_tx.send(intent).await.is_err() {
            warn!("Navigation channel closed; intent dropped");
        }
        result.to_string()
    }
}

#[async_trait::async_trait]
impl ToolHandler for StudyToolRouter {
    async fn invoke(&self, name: &str, args: &Value) -> String {
        info!("Tool call: {}", name);

        match name {
            "open_notes_generator" => {
                self.dispatch(NavIntent::OpenNotesGenerator, "Opening the notes generator")
                    .await
            }
            "start_quiz" => self.dispatch(NavIntent::StartQuiz, "Starting a quiz").await,
            "show_history" => {
                self.dispatch(NavIntent::ShowHistory, "Showing your study history")
                    .await
            }
            "set_focus_timer" => {
                let minutes = args
                    .get("minutes")
                    .and_then(|m| m.as_u64())
                    .map(|m| m as u32)
                    .unwrap_or(25);
                self.dispatch(
                    NavIntent::SetFocusTimer { minutes },
                    &format!("Focus timer set for {} minutes", minutes),
                )
                .await
            }
            "get_motivation" => {
                self.dispatch(NavIntent::GetMotivation, "Here comes some motivation")
                    .await
            }
            "go_home" => self.dispatch(NavIntent::GoHome, "Going home").await,
            other => {
                warn!("Unrecognized tool call: {}", other);
                "Unsupported tool".to_string()
            }
        }
    }
}

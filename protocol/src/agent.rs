use serde::Deserialize;
use serde::Serialize;

use crate::Submission;

/// Requests from the front end to whatever runs the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentOp {
    Submit(Submission),
    /// Interrupt the task started by the latest `Submit`.
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// One line of agent output.
    Output { line: String },
    /// The task ended. `success` is false when it failed or was stopped.
    Finished { success: bool },
    /// The task could not be started at all.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ops_are_tagged_by_type() {
        let op = AgentOp::Submit(Submission {
            payload: "build it /tmp/a.png".to_string(),
            history_text: "build it".to_string(),
            attachments: vec!["/tmp/a.png".into()],
        });
        let json = serde_json::to_value(&op).expect("serialize");
        assert_eq!(json["type"], "submit");
        assert_eq!(json["payload"], "build it /tmp/a.png");

        let stop: AgentOp = serde_json::from_str(r#"{"type":"stop"}"#).expect("deserialize");
        assert_eq!(stop, AgentOp::Stop);
    }

    #[test]
    fn events_round_trip() {
        let event = AgentEvent::Finished { success: false };
        let json = serde_json::to_string(&event).expect("serialize");
        assert_eq!(json, r#"{"type":"finished","success":false}"#);
    }
}

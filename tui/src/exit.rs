/// Summary information produced when a draftpad session exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppExitInfo {
    /// Messages handed to the agent during the session.
    pub messages_sent: usize,
    /// Why the session ended.
    pub exit_reason: ExitReason,
}

/// Reason why the draftpad session terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The user pressed Ctrl+C on an empty composer.
    UserRequested,
    /// The terminal stopped delivering input.
    InputClosed,
}

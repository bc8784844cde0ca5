//! Application-level events used to coordinate UI actions.

use draftpad_protocol::SaveImageResponse;

#[derive(Debug)]
pub enum AppEvent {
    /// A temp-file save finished (successfully or not) for the attachment named in the response.
    ImageSaved(SaveImageResponse),

    /// The composer asked for the file picker. The event loop owns the terminal, so it runs the
    /// picker and feeds the result back through `InputSession::on_file_picked`.
    OpenFilePicker,
}

//! Reply-anchor selection (spec §4.6 step 4): decides whether the last
//! analysis group actually has something for the assistant to respond to.
//! "For the last group, if the last content item is text use it verbatim;
//! if it is an image, scan that image's dialogs in reverse and pick the
//! last line whose speaker is talker/left. If none exists, fail with
//! `no_talker_message`."

use crate::error::CoordinatorError;
use crate::grouping::AnalysisGroup;
use crate::response::ImageResult;

/// `Ok(())` when a reply can be anchored; `Err(NoDialogForReply)` otherwise
/// (spec §6.1's "400 ... no dialog").
pub fn validate_reply_anchor(group: &AnalysisGroup, image_result: &ImageResult) -> Result<(), CoordinatorError> {
    if group.last_item_is_text() {
        return Ok(());
    }

    let has_counterpart_line = image_result.dialogs.iter().rev().any(|dialog| !dialog.from_user);
    if has_counterpart_line {
        Ok(())
    } else {
        Err(CoordinatorError::NoDialogForReply)
    }
}

//! Text shown to the subject and the operator.

use super::error::{AdapterResultExt, SessionResult};
use super::phase::SessionPhase;
use crate::presentation::{Key, SessionUi};

pub const SUBJECT_PROMPT: &str = "Please enter the subject name and then press enter.";

pub const FIRST_INSTRUCTIONS: &str = "We will now review the basics of the study, and the experimenter will answer any questions that you have.\n\n\
1) Words will come onscreen one at a time.\n\
2) After each word leaves the screen, pause briefly, then speak the word you just saw.\n\
3) If you began speaking too early, a message will appear onscreen to notify you. Try to minimize the number of trials where this occurs.\n\n\
Press RETURN to continue.";

pub const SECOND_INSTRUCTIONS: &str = "4) It is very important for you to avoid all unnecessary motion while engaged in the study.\n\
5) Please try to avoid blinking from the time that a word appears on the screen until you have spoken the word.\n\
6) If you miss a word, just say 'pass' to proceed to the next word.\n\n\
You are now ready to begin the study!\n\n\
If you have any remaining questions, please ask the experimenter now. Otherwise, press RETURN to continue.";

pub const FIRST_RECALL_INSTRUCTIONS: &str = "We would like you to recall as many words as you can remember from all previous sessions, in any order. \
You may begin as soon as the prompt appears ('******').\n\n\
As you attempt to recall these words, other words that did not appear in previous sessions may come to mind. \
Please go ahead and say these words aloud even if you believe they have not been presented or if you have already said them during this recall period.\n\n\
Press RETURN to continue.";

pub const SECOND_RECALL_INSTRUCTIONS: &str = "The recall bonus will increase with the number of words from the previous sessions you recall.\n\
It will not be affected by any words you say that were not shown in previous sessions or that you have already recalled.\n\n\
Press RETURN to begin.";

pub const FREE_RECALL_PROMPT: &str = "******";

pub const MICROPHONE_TEST_BANNER: &str = "Microphone Test";
pub const MICROPHONE_TEST_PROMPT: &str = "Press the spacebar to record a sound after the beep.";
pub const MICROPHONE_TEST_RECORDING: &str = "Recording...";
pub const MICROPHONE_TEST_PLAYING: &str = "Playing...";
pub const MICROPHONE_TEST_CONFIRMATION: &str =
    "Did you hear the recording? \n(Y=Continue / N=Try Again / C=Cancel).";
pub const MISSING_RECORDING_WARNING: &str =
    "WARNING: Wav output file not detected.  Sounds may not be successfully recorded to disk.";

pub const END_MESSAGE: &str = "Yay, the session is over!";

/// Show `text` until every key in `keys` has been pressed, then clear it.
pub(crate) fn press_keys(
    ui: &mut dyn SessionUi,
    phase: SessionPhase,
    text: &str,
    keys: &[Key],
) -> SessionResult<()> {
    ui.display("press any key prompt", text).interface(phase)?;
    ui.wait_for_keys(keys).interface(phase)?;
    ui.clear().interface(phase)
}

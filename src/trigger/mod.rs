// Trigger module
// Polls the request file and replays the host's "run last script" shortcut when requests arrive

pub mod journal;
pub mod osascript;
pub mod poller;
pub mod waker;

pub use journal::{read_journal, JournalError, JournalWriter, TriggerOutcome, TriggerRecord};
pub use osascript::OsaScriptWaker;
pub use poller::{DispatchOutcome, PollSettings, Poller, PollerState};
pub use waker::{AutomationError, AutomationResult, HostWaker};

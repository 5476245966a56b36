//! Domain services for QuickPoll.
//!
//! Services hold the poll/vote consistency logic and talk to storage only
//! through the ports in [`ports`].

pub mod clock;
pub mod live;
pub mod memory;
pub mod polls;
pub mod ports;
pub mod tally;
pub mod viewer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use live::{LiveUpdateHub, Subscription, SubscriptionItem, DEFAULT_CHANNEL_CAPACITY};
pub use memory::InMemoryStore;
pub use polls::{CastOutcome, PollService};
pub use ports::{IdentityProvider, OptionStore, PollStore, Stores, VoteLedger};
pub use tally::{ReconcileReport, RetryPolicy, TallyEngine, TallySnapshot};
pub use viewer::{PollView, ViewError, ViewerState};

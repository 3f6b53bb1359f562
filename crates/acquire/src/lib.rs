pub mod collect;
pub mod session;

pub use collect::{collect, AcqConfig, AcqEvent, SampleMatrix};
pub use session::{SessionBusy, SessionManager, SessionToken};

pub mod classify;
pub mod supervisor;

pub use classify::{classify_termination, locate_crash_report, Termination};
pub use supervisor::{GameEvent, GameHandle, ProcessSupervisor};

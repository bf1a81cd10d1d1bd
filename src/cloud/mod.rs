pub mod client;
pub mod db;
pub mod friend;
pub mod listener;
pub mod state;
pub mod types;

pub use client::{ClientConfig, CloudClient};
pub use state::{CloudState, CloudStateMachine, LoggedInState};
pub use types::{CloudRecordId, UserInfo};

#![doc = include_str!("../README.md")]

pub mod consumer;
pub mod controller;
pub mod error;
pub mod generator;
pub mod http;
pub mod session;
pub mod snapshot;
pub mod stream;
pub mod subscriber;

pub use consumer::{ChunkUpdate, StreamConsumer};
pub use controller::Controller;
pub use error::{ClientError, ClientResult};
pub use generator::{GenerateRequest, Generator};
pub use http::HttpGenerator;
pub use session::{SessionContext, SessionHandle, SessionOutcome, SessionStatus};
pub use snapshot::{Snapshot, SnapshotStore, TreeDelta};
pub use stream::ChunkStream;
pub use subscriber::{IntoSubscribers, SessionParams, UiSubscriber};

pub use genui_core as core;

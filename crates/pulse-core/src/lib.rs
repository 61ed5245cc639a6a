//! Core KemSU Pulse library (session, gateway, resources, actions, push channel, calendar).

pub mod actions;
pub mod calendar;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod gateway;
pub mod ics;
pub mod logging;
pub mod models;
pub mod push;
pub mod resources;
pub mod session;
pub mod toast;
pub mod token_store;

pub use error::{ClientError, ClientResult};
pub use gateway::{Gateway, GatewayError, RequestBody};
pub use session::{SessionSnapshot, SessionStore};
pub use toast::{Toast, ToastLevel, ToastSink};

pub mod message_types;
mod ws_manager;

pub use ws_manager::ReconnectConfig;
pub(crate) use ws_manager::WsManager;

pub mod buffered_sender;
pub mod connection_events;
pub mod direct_sender;
pub mod send_queue;
pub mod sender_receiver;
pub mod sync_receiver;

pub use buffered_sender::BufferedSender;
pub use connection_events::ChannelListener;
pub use direct_sender::DirectSender;
pub use send_queue::{QueueClosed, SendQueue};
pub use sender_receiver::BufferedSenderReceiver;
pub use sync_receiver::SyncReceiver;

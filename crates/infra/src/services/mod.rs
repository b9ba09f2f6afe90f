mod delivery;

pub use delivery::{DeliveryError, IDelivery, LogDelivery, TelegramDelivery};

mod sensitive;
mod timestamp;

pub use self::sensitive::Sensitive;
pub use self::timestamp::Timestamp;

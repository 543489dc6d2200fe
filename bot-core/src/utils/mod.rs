pub mod delay;
pub mod logger;
pub mod proxy;
pub mod wallet;

pub mod chrome;
pub mod driver;

pub use chrome::{ChromeDriver, ChromeElement};
pub use driver::Driver;

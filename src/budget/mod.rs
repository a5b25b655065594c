pub mod gateway;
pub mod pricing;
pub mod store;
pub mod tracker;
pub mod window;

pub use self::gateway::{
    BUDGET_REMAINING_HEADER, Gateway, MeteringStream, Precheck, insert_remaining_header,
};
pub use self::pricing::Pricing;
pub use self::store::{UsageRecord, UsageStore};
pub use self::tracker::{Availability, BudgetError, BudgetTracker};
pub use self::window::{Clock, DayWindow, ManualClock, SystemClock};

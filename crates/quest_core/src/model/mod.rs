mod task;

pub use task::{DisplayStatus, Recurrence, RewardEntry, Task, TaskLevel};

pub(crate) use task::{local_offset, now_rfc3339, parse_local_date};

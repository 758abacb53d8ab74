pub mod add;
pub mod catch_up;
pub mod delete;
pub mod done;
pub mod edit;
pub mod list;
pub mod preview;

pub mod elevation;
pub mod policy;
pub mod role;
pub mod token;

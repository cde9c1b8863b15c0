pub mod breverse_ops;
pub mod std_ops;

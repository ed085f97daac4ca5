// Built-in drivers

pub mod sqlmock;

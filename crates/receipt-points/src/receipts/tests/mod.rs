mod common;
mod points;

/// User access level resolution.
pub mod levels;
/// Discord markdown helpers.
pub mod markdown;
/// Pure parser helpers.
pub mod parse;
